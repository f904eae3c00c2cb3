//! Tests focusing on flow typing.

use crate::check::{Builder, Checked};
use kestrel_analyze::Init;
use kestrel_tree::{BinOp, Collection, ExprData, Stmt, Type, Value};
use pretty_assertions::assert_eq;

#[test]
fn smoke() {
  // int f(int|[int] x):
  //   if x is int:
  //     return x
  //   else:
  //     return |x|
  let mut b = Builder::new("m");
  let x1 = b.name("x");
  let is = b.is(x1, Type::Int);
  let x2 = b.name("x");
  let x3 = b.name("x");
  let len = b.length(x3);
  let body = vec![Stmt::IfElse {
    cond: is,
    yes: vec![Stmt::Return(Some(x2))],
    no: Some(vec![Stmt::Return(Some(len))]),
  }];
  let param = Type::Union(vec![Type::Int, Type::list(Type::Int)]);
  b.function("f", &[("x", param)], Type::Int, body);
  let c = Checked::get(Init::default(), b);
  c.assert_no_errors();
  assert_eq!(c.ty(x1), "int|[int]");
  assert_eq!(c.ty(x2), "int");
  assert_eq!(c.ty(x3), "[int]");
  assert_eq!(c.ty(len), "int");
  assert_eq!(c.decl_ty("f"), "int(int|[int])");
  assert!(matches!(c.file.exprs[len], ExprData::Length { of: Some(Collection::List), .. }));
  let want = "  is_tag number
  if_true L1
  load x
  store x as [int] (list)
  goto L2
L1:
  load x
  store x as int (number)
  goto L0
L2:
success = L0";
  assert_eq!(c.compiled(is), want);
}

#[test]
fn not_null() {
  // int f(null|int x):
  //   if x != null:
  //     return x
  //   return 0
  let mut b = Builder::new("m");
  let x1 = b.name("x");
  let null = b.file.alloc(ExprData::Const(Value::Null));
  let neq = b.bin(x1, BinOp::Neq, null);
  let x2 = b.name("x");
  let zero = b.int(0);
  let body = vec![
    Stmt::IfElse { cond: neq, yes: vec![Stmt::Return(Some(x2))], no: None },
    Stmt::Return(Some(zero)),
  ];
  let param = Type::Union(vec![Type::Null, Type::Int]);
  b.function("f", &[("x", param)], Type::Int, body);
  let c = Checked::get(Init::default(), b);
  c.assert_no_errors();
  assert_eq!(c.ty(x2), "int");
  assert!(c.result.compiled.get(neq).is_none());
}

#[test]
fn unreachable_has_no_types() {
  // int f(int x):
  //   return x
  //   return y
  let mut b = Builder::new("m");
  let x = b.name("x");
  let y = b.name("y");
  let body = vec![Stmt::Return(Some(x)), Stmt::Return(Some(y))];
  b.function("f", &[("x", Type::Int)], Type::Int, body);
  let c = Checked::get(Init::default(), b);
  c.assert_no_errors();
  assert!(c.result.expr_tys.get(y).is_none());
  assert!(matches!(c.file.exprs[y], ExprData::Name(_)));
}

#[test]
fn errors_per_declaration() {
  let mut b = Builder::new("m");
  let y = b.name("y");
  b.function("bad", &[], Type::Int, vec![Stmt::Return(Some(y))]);
  let t = b.bool(true);
  b.function("good", &[], Type::Bool, vec![Stmt::Return(Some(t))]);
  let c = Checked::get(Init::default(), b);
  assert_eq!(c.errors(), ["undefined: `y`"]);
  assert_eq!(c.result.errors[0].decl().as_str(), "bad");
  assert_eq!(c.result.errors[0].expr(), Some(y));
  assert!(!c.result.errors[0].is_internal());
  assert_eq!(c.decl_ty("good"), "bool()");
}

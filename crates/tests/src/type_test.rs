//! Tests focusing on compiling type tests.

use crate::check::{Builder, Checked};
use kestrel_analyze::Init;
use kestrel_tree::{ExprMust, Name, Stmt, Type};
use pretty_assertions::assert_eq;

/// bool name(int|null y):
///   if y is int:
///     return true
///   return false
fn simple_test(b: &mut Builder, name: &str) -> ExprMust {
  let y = b.name("y");
  let is = b.is(y, Type::Int);
  let t = b.bool(true);
  let f = b.bool(false);
  let body = vec![
    Stmt::IfElse { cond: is, yes: vec![Stmt::Return(Some(t))], no: None },
    Stmt::Return(Some(f)),
  ];
  b.function(name, &[("y", Type::Union(vec![Type::Int, Type::Null]))], Type::Bool, body);
  is
}

fn linked(data: Type, next: &str) -> Type {
  Type::Union(vec![Type::Null, Type::record([("data", data), ("next", Type::nominal(next))])])
}

#[test]
fn unsupported_stops_its_declaration() {
  let mut b = Builder::new("m");
  b.type_def("IntList", linked(Type::Int, "IntList"));
  b.type_def("AnyList", linked(Type::Union(vec![Type::Int, Type::Bool]), "AnyList"));
  // bool g(AnyList x):
  //   if x is IntList:
  //     return true
  //   return false
  let x = b.name("x");
  let bad = b.is(x, Type::nominal("IntList"));
  let t = b.bool(true);
  let f = b.bool(false);
  let body = vec![
    Stmt::IfElse { cond: bad, yes: vec![Stmt::Return(Some(t))], no: None },
    Stmt::Return(Some(f)),
  ];
  b.function("g", &[("x", Type::nominal("AnyList"))], Type::Bool, body);
  let good = simple_test(&mut b, "h");
  let c = Checked::get(Init::default(), b);
  let errors = c.errors();
  assert_eq!(errors.len(), 1, "{errors:?}");
  assert!(errors[0].starts_with("unsupported type test: recursive"), "{errors:?}");
  assert_eq!(c.result.errors[0].decl().as_str(), "g");
  assert_eq!(c.result.errors[0].expr(), Some(bad));
  assert!(c.result.test_sites.get(bad).is_some());
  assert!(c.result.compiled.get(bad).is_none());
  let want = "  is_tag number
  if_true L1
  load y
  store y as null (null)
  goto L2
L1:
  load y
  store y as int (number)
  goto L0
L2:
success = L0";
  assert_eq!(c.compiled(good), want);
}

#[test]
fn definite() {
  // int f([int] xs):
  //   if |xs| is int:
  //     return 1
  //   return 0
  let build = || {
    let mut b = Builder::new("m");
    let xs = b.name("xs");
    let len = b.length(xs);
    let is = b.is(len, Type::Int);
    let one = b.int(1);
    let zero = b.int(0);
    let body = vec![
      Stmt::IfElse { cond: is, yes: vec![Stmt::Return(Some(one))], no: None },
      Stmt::Return(Some(zero)),
    ];
    b.function("f", &[("xs", Type::list(Type::Int))], Type::Int, body);
    (b, is)
  };
  let (b, _) = build();
  let c = Checked::get(Init::default(), b);
  assert_eq!(c.errors(), ["type test is always true: `int` is `int`"]);
  assert!(c.result.compiled.iter().next().is_none());
  let (b, is) = build();
  let c = Checked::get(Init { allow_definite_type_tests: true, ..Init::default() }, b);
  c.assert_no_errors();
  assert_eq!(c.compiled(is), "  pop\n  goto L0\nsuccess = L0");
}

#[test]
fn not_compiled() {
  let mut b = Builder::new("m");
  let is = simple_test(&mut b, "h");
  let c = Checked::get(Init { compile_type_tests: false, ..Init::default() }, b);
  c.assert_no_errors();
  let site = c.result.test_sites.get(is).expect("recorded");
  assert_eq!(site.decl.as_str(), "h");
  assert_eq!(site.local.as_ref().map(Name::as_str), Some("y"));
  assert!(c.result.compiled.get(is).is_none());
}

//! Tests for checking many files at once.

use crate::check::{Builder, init_logger};
use kestrel_analyze::{Init, St};
use kestrel_statics::resolve::TableResolver;
use kestrel_tree::{Decl, ExprData, Name, QualName, Stmt, Type};
use pretty_assertions::assert_eq;

/// int name({int x} r):
///   return r.x
fn field_of(module: &str, name: &str) -> Builder {
  let mut b = Builder::new(module);
  let r = b.name("r");
  let dot = b.file.alloc(ExprData::Dot { on: r, field: Name::new("x") });
  let body = vec![Stmt::Return(Some(dot))];
  b.function(name, &[("r", Type::record([("x", Type::Int)]))], Type::Int, body);
  b
}

#[test]
fn parallel_files_share_types() {
  init_logger();
  let mut files = vec![field_of("a", "f").file, field_of("b", "g").file];
  let resolver = TableResolver::new(&files);
  let mut st = St::init(Init::default());
  let results = st.check_files(&mut files, &resolver);
  assert_eq!(results.len(), 2);
  for result in &results {
    let errors: Vec<_> = result.errors.iter().map(|e| e.display(st.tys()).to_string()).collect();
    assert!(errors.is_empty(), "{errors:?}");
  }
  let f = results[0].decl_tys[&Name::new("f")].expanded;
  let g = results[1].decl_tys[&Name::new("g")].expanded;
  assert_eq!(f, g);
  assert_eq!(f.display(st.tys()).to_string(), "int({int x})");
  for file in &files {
    let Decl::Function(func) = &file.decls[0] else { panic!("not a function") };
    let Some(Stmt::Return(Some(ret))) = func.body.first() else { panic!("not a return") };
    assert!(matches!(file.exprs[*ret], ExprData::RecordAccess { .. }));
  }
}

#[test]
fn constant_from_other_module() {
  init_logger();
  // a: N = 3
  let mut a = Builder::new("a");
  let three = a.int(3);
  a.file.decls.push(Decl::Constant { name: Name::new("N"), value: three });
  // b imports a: int get(): return N
  let mut b = Builder::new("b");
  b.file.imports.push(Name::new("a"));
  let n = b.name("N");
  b.function("get", &[], Type::Int, vec![Stmt::Return(Some(n))]);
  let mut files = vec![a.file, b.file];
  let resolver = TableResolver::new(&files);
  let mut st = St::init(Init::default());
  let results = st.check_files(&mut files, &resolver);
  assert!(results.iter().all(|r| r.errors.is_empty()));
  let ExprData::ConstantAccess { name, .. } = &files[1].exprs[n] else {
    panic!("not re-tagged: {:?}", files[1].exprs[n])
  };
  assert_eq!(*name, QualName::new("a", "N"));
  let ty = results[1].expr_tys.get(n).expect("typed").expanded;
  assert_eq!(ty.display(st.tys()).to_string(), "int");
}

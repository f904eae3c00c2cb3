//! Helpers for building files by hand and checking them.

use kestrel_analyze::{FileResult, Init, St};
use kestrel_statics::resolve::TableResolver;
use kestrel_tree::{
  BinOp, Decl, ExprData, ExprMust, File, FunctionDecl, FunctionKind, Name, Stmt, Type, Value,
};

pub(crate) fn init_logger() {
  _ = env_logger::builder().is_test(true).try_init();
}

/// A file being built.
pub(crate) struct Builder {
  pub(crate) file: File,
}

impl Builder {
  pub(crate) fn new(module: &str) -> Self {
    Self { file: File::new(module) }
  }

  pub(crate) fn name(&mut self, s: &str) -> ExprMust {
    self.file.alloc(ExprData::Name(Name::new(s)))
  }

  pub(crate) fn int(&mut self, n: i64) -> ExprMust {
    self.file.alloc(ExprData::Const(Value::Int(n)))
  }

  pub(crate) fn bool(&mut self, b: bool) -> ExprMust {
    self.file.alloc(ExprData::Const(Value::Bool(b)))
  }

  pub(crate) fn is(&mut self, operand: ExprMust, test: Type) -> ExprMust {
    self.file.alloc(ExprData::Is { operand, test })
  }

  pub(crate) fn bin(&mut self, lhs: ExprMust, op: BinOp, rhs: ExprMust) -> ExprMust {
    self.file.alloc(ExprData::BinOp { lhs, op, rhs })
  }

  pub(crate) fn length(&mut self, on: ExprMust) -> ExprMust {
    self.file.alloc(ExprData::Length { on, of: None })
  }

  pub(crate) fn function(
    &mut self,
    name: &str,
    params: &[(&str, Type)],
    ret: Type,
    body: Vec<Stmt>,
  ) {
    self.file.decls.push(Decl::Function(FunctionDecl {
      name: Name::new(name),
      kind: FunctionKind::Function,
      receiver: None,
      params: params.iter().map(|(n, t)| (Name::new(n), t.clone())).collect(),
      ret,
      precondition: None,
      postcondition: None,
      body,
    }));
  }

  pub(crate) fn type_def(&mut self, name: &str, ty: Type) {
    self.file.decls.push(Decl::TypeDef { name: Name::new(name), ty, constraint: None });
  }
}

/// The results of checking a file.
pub(crate) struct Checked {
  pub(crate) st: St,
  pub(crate) file: File,
  pub(crate) result: FileResult,
}

impl Checked {
  pub(crate) fn get(init: Init, b: Builder) -> Self {
    init_logger();
    let mut file = b.file;
    let resolver = TableResolver::new(std::slice::from_ref(&file));
    let mut st = St::init(init);
    let result = st.check_file(&mut file, &resolver);
    Self { st, file, result }
  }

  pub(crate) fn errors(&self) -> Vec<String> {
    self.result.errors.iter().map(|e| e.display(self.st.tys()).to_string()).collect()
  }

  pub(crate) fn assert_no_errors(&self) {
    let errors = self.errors();
    assert!(errors.is_empty(), "{errors:?}");
  }

  /// The type of the expression, as it would be written.
  pub(crate) fn ty(&self, expr: ExprMust) -> String {
    let ty = self.result.expr_tys.get(expr).expect("expr should have a type");
    ty.expanded.display(self.st.tys()).to_string()
  }

  pub(crate) fn decl_ty(&self, name: &str) -> String {
    let ty = self.result.decl_tys.get(&Name::new(name)).expect("decl should have a type");
    ty.expanded.display(self.st.tys()).to_string()
  }

  /// The compiled type test at the `is` expression.
  pub(crate) fn compiled(&self, expr: ExprMust) -> String {
    let compiled = self.result.compiled.get(expr).expect("type test should be compiled");
    compiled.display(self.st.tys()).to_string()
  }
}

//! The tree of declarations, statements and expressions shared by every later stage.
//!
//! Expressions live in an arena and are referred to by index. Later stages record facts about
//! expressions in side tables keyed by that index, and re-tag ambiguous expressions in place.

#![allow(missing_docs)]

mod name;
mod ty;
mod value;

pub use name::{Name, QualName};
pub use text_size::{TextRange, TextSize};
pub use ty::Type;
pub use value::{NotFinite, Real, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExprMust(la_arena::Idx<ExprData>);

#[derive(Debug, Default, Clone)]
pub struct ExprArena(la_arena::Arena<ExprData>);

impl std::ops::Index<ExprMust> for ExprArena {
  type Output = ExprData;

  fn index(&self, index: ExprMust) -> &Self::Output {
    &self.0[index.0]
  }
}

impl std::ops::IndexMut<ExprMust> for ExprArena {
  fn index_mut(&mut self, index: ExprMust) -> &mut Self::Output {
    &mut self.0[index.0]
  }
}

impl ExprArena {
  pub fn alloc(&mut self, data: ExprData) -> ExprMust {
    ExprMust(self.0.alloc(data))
  }

  pub fn iter(&self) -> impl Iterator<Item = (ExprMust, &ExprData)> {
    self.0.iter().map(|(a, b)| (ExprMust(a), b))
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

#[derive(Debug, Clone)]
pub struct ExprMap<T>(la_arena::ArenaMap<la_arena::Idx<ExprData>, T>);

impl<T> Default for ExprMap<T> {
  fn default() -> Self {
    Self(la_arena::ArenaMap::default())
  }
}

impl<T> ExprMap<T> {
  pub fn insert(&mut self, key: ExprMust, val: T) {
    self.0.insert(key.0, val);
  }

  #[must_use]
  pub fn get(&self, key: ExprMust) -> Option<&T> {
    self.0.get(key.0)
  }

  pub fn get_mut(&mut self, key: ExprMust) -> Option<&mut T> {
    self.0.get_mut(key.0)
  }

  pub fn iter(&self) -> impl Iterator<Item = (ExprMust, &T)> {
    self.0.iter().map(|(a, b)| (ExprMust(a), b))
  }

  pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
    self.0.values_mut()
  }
}

/// An expression.
///
/// Some variants are only written by the parser and are re-tagged by type propagation into their
/// resolved forms. Those are noted.
#[derive(Debug, Clone)]
pub enum ExprData {
  Const(Value),
  /// An identifier not yet known to be a local, a constant, a module or a package. Re-tagged.
  Name(Name),
  LocalVar(Name),
  ConstantAccess {
    name: QualName,
    value: Value,
  },
  ModuleAccess(Name),
  PackageAccess(Name),
  BinOp {
    lhs: ExprMust,
    op: BinOp,
    rhs: ExprMust,
  },
  UnOp {
    op: UnOp,
    inner: ExprMust,
  },
  /// A dynamic type test, `operand is test`.
  Is {
    operand: ExprMust,
    test: Type,
  },
  Comprehension {
    kind: Quantifier,
    sources: Vec<(Name, ExprMust)>,
    cond: Option<ExprMust>,
    value: Option<ExprMust>,
  },
  /// An explicit conversion, `(ty) inner`.
  Convert {
    ty: Type,
    inner: ExprMust,
  },
  List(Vec<ExprMust>),
  Set(Vec<ExprMust>),
  Dictionary(Vec<(ExprMust, ExprMust)>),
  Record(Vec<(Name, ExprMust)>),
  Tuple(Vec<ExprMust>),
  /// `on[idx]`. `of` is filled in by type propagation.
  Index {
    on: ExprMust,
    idx: ExprMust,
    of: Option<Collection>,
  },
  /// `|on|`. `of` is filled in by type propagation.
  Length {
    on: ExprMust,
    of: Option<Collection>,
  },
  SubList {
    on: ExprMust,
    start: ExprMust,
    end: ExprMust,
  },
  /// `on.field`. Re-tagged.
  Dot {
    on: ExprMust,
    field: Name,
  },
  RecordAccess {
    on: ExprMust,
    field: Name,
  },
  /// `receiver.name(args)` or `name(args)`. Re-tagged.
  Invoke {
    receiver: Option<ExprMust>,
    name: Name,
    args: Vec<ExprMust>,
  },
  FunctionCall {
    name: QualName,
    args: Vec<ExprMust>,
  },
  MethodCall {
    name: QualName,
    args: Vec<ExprMust>,
  },
  IndirectFunctionCall {
    func: ExprMust,
    args: Vec<ExprMust>,
  },
  IndirectMethodCall {
    func: ExprMust,
    args: Vec<ExprMust>,
  },
  /// `&name`, a reference to a function by name. Re-tagged.
  FunctionRef(Name),
  Function(QualName),
  Deref(ExprMust),
  New(ExprMust),
}

/// A kind of collection, used to say which operation an index or length expression is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
  String,
  List,
  Set,
  Dictionary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
  SetComp,
  ListComp,
  Some,
  None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
  /// Re-tagged when the operands are strings, lists or sets.
  Add,
  /// Re-tagged when the operands are sets.
  Sub,
  Mul,
  Div,
  Rem,
  /// Re-tagged when the operands are sets.
  BitAnd,
  BitOr,
  BitXor,
  Shl,
  Shr,
  Eq,
  Neq,
  Lt,
  LtEq,
  Gt,
  GtEq,
  And,
  Or,
  Xor,
  ElementOf,
  Subset,
  SubsetEq,
  Range,
  StringAppend,
  ListAppend,
  Union,
  Intersection,
  Difference,
}

impl BinOp {
  /// Whether this is a condition, one that may narrow the types of variables.
  #[must_use]
  pub fn is_condition(self) -> bool {
    matches!(
      self,
      BinOp::Eq
        | BinOp::Neq
        | BinOp::Lt
        | BinOp::LtEq
        | BinOp::Gt
        | BinOp::GtEq
        | BinOp::And
        | BinOp::Or
        | BinOp::Xor
        | BinOp::ElementOf
        | BinOp::Subset
        | BinOp::SubsetEq
    )
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
  Neg,
  Not,
  Invert,
}

/// A statement.
#[derive(Debug, Clone)]
pub enum Stmt {
  /// `lhs = rhs`, or a destructuring `(a, b) = rhs` when there is more than one `lhs`.
  Assign {
    lhs: Vec<ExprMust>,
    rhs: ExprMust,
  },
  Assert(ExprMust),
  Debug(ExprMust),
  Return(Option<ExprMust>),
  Throw(ExprMust),
  IfElse {
    cond: ExprMust,
    yes: Vec<Stmt>,
    no: Option<Vec<Stmt>>,
  },
  While {
    cond: ExprMust,
    invariant: Option<ExprMust>,
    body: Vec<Stmt>,
  },
  DoWhile {
    body: Vec<Stmt>,
    cond: ExprMust,
    invariant: Option<ExprMust>,
  },
  For {
    vars: Vec<Name>,
    source: ExprMust,
    invariant: Option<ExprMust>,
    body: Vec<Stmt>,
  },
  Switch {
    on: ExprMust,
    cases: Vec<Case>,
  },
  Break,
  Continue,
  Skip,
  /// An expression evaluated for its effects, like an invocation.
  Expr(ExprMust),
}

/// A case in a switch. No labels means this is the default case.
#[derive(Debug, Clone)]
pub struct Case {
  pub labels: Vec<ExprMust>,
  pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FunctionKind {
  Function,
  Method,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
  pub name: Name,
  pub kind: FunctionKind,
  /// The type of `this`, for methods bound to a receiver.
  pub receiver: Option<Type>,
  pub params: Vec<(Name, Type)>,
  pub ret: Type,
  pub precondition: Option<ExprMust>,
  pub postcondition: Option<ExprMust>,
  pub body: Vec<Stmt>,
}

impl FunctionDecl {
  /// The type of this function or method as written.
  #[must_use]
  pub fn ty(&self) -> Type {
    Type::Function {
      kind: self.kind,
      receiver: self.receiver.clone().map(Box::new),
      params: self.params.iter().map(|(_, t)| t.clone()).collect(),
      ret: Box::new(self.ret.clone()),
    }
  }
}

#[derive(Debug, Clone)]
pub enum Decl {
  Function(FunctionDecl),
  Constant { name: Name, value: ExprMust },
  TypeDef { name: Name, ty: Type, constraint: Option<ExprMust> },
}

impl Decl {
  #[must_use]
  pub fn name(&self) -> &Name {
    match self {
      Decl::Function(f) => &f.name,
      Decl::Constant { name, .. } | Decl::TypeDef { name, .. } => name,
    }
  }
}

/// A source file, aka a module.
#[derive(Debug, Clone)]
pub struct File {
  /// The module this file defines.
  pub module: Name,
  /// The modules and packages imported, in order. Passed to name resolution.
  pub imports: Vec<Name>,
  pub decls: Vec<Decl>,
  pub exprs: ExprArena,
  /// Where in the source each expression came from, if known.
  pub ranges: ExprMap<TextRange>,
}

impl File {
  #[must_use]
  pub fn new(module: &str) -> Self {
    Self {
      module: Name::new(module),
      imports: Vec::new(),
      decls: Vec::new(),
      exprs: ExprArena::default(),
      ranges: ExprMap::default(),
    }
  }

  pub fn alloc(&mut self, data: ExprData) -> ExprMust {
    self.exprs.alloc(data)
  }

  pub fn alloc_at(&mut self, data: ExprData, range: TextRange) -> ExprMust {
    let ret = self.exprs.alloc(data);
    self.ranges.insert(ret, range);
    ret
  }

  #[must_use]
  pub fn range(&self, expr: ExprMust) -> Option<TextRange> {
    self.ranges.get(expr).copied()
  }
}

#[cfg(test)]
mod tests {
  use super::{ExprData, File, Name, TextRange, TextSize, Value};

  #[test]
  fn alloc_and_retag() {
    let mut file = File::new("m");
    let r = TextRange::new(TextSize::from(3), TextSize::from(4));
    let x = file.alloc_at(ExprData::Name(Name::new("x")), r);
    let one = file.alloc(ExprData::Const(Value::Int(1)));
    assert_eq!(file.range(x), Some(r));
    assert_eq!(file.range(one), None);
    file.exprs[x] = ExprData::LocalVar(Name::new("x"));
    assert!(matches!(&file.exprs[x], ExprData::LocalVar(n) if n.as_str() == "x"));
    assert_eq!(file.exprs.len(), 2);
  }
}

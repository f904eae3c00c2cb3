//! Types as written in the source, before resolution.

use crate::{FunctionKind, Name};

/// A type as written, possibly naming other types that are not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Type {
  Void,
  Any,
  Null,
  Bool,
  Int,
  Real,
  Char,
  String,
  List(Box<Type>),
  Set(Box<Type>),
  Dictionary(Box<Type>, Box<Type>),
  Tuple(Vec<Type>),
  Record { fields: Vec<(Name, Type)>, open: bool },
  Union(Vec<Type>),
  Reference(Box<Type>),
  Function {
    kind: FunctionKind,
    receiver: Option<Box<Type>>,
    params: Vec<Type>,
    ret: Box<Type>,
  },
  /// A reference to a named type definition, maybe qualified like `m::T`.
  Nominal(Name),
}

impl Type {
  #[must_use]
  pub fn list(elem: Type) -> Self {
    Self::List(Box::new(elem))
  }

  #[must_use]
  pub fn set(elem: Type) -> Self {
    Self::Set(Box::new(elem))
  }

  #[must_use]
  pub fn dictionary(key: Type, val: Type) -> Self {
    Self::Dictionary(Box::new(key), Box::new(val))
  }

  #[must_use]
  pub fn reference(elem: Type) -> Self {
    Self::Reference(Box::new(elem))
  }

  #[must_use]
  pub fn nominal(name: &str) -> Self {
    Self::Nominal(Name::new(name))
  }

  /// A closed record with these fields.
  #[must_use]
  pub fn record<const N: usize>(fields: [(&str, Type); N]) -> Self {
    let fields = fields.into_iter().map(|(n, t)| (Name::new(n), t)).collect();
    Self::Record { fields, open: false }
  }

  /// An open record with at least these fields.
  #[must_use]
  pub fn open_record<const N: usize>(fields: [(&str, Type); N]) -> Self {
    let fields = fields.into_iter().map(|(n, t)| (Name::new(n), t)).collect();
    Self::Record { fields, open: true }
  }

  #[must_use]
  pub fn function(params: Vec<Type>, ret: Type) -> Self {
    Self::Function { kind: FunctionKind::Function, receiver: None, params, ret: Box::new(ret) }
  }

  #[must_use]
  pub fn method(params: Vec<Type>, ret: Type) -> Self {
    Self::Function { kind: FunctionKind::Method, receiver: None, params, ret: Box::new(ret) }
  }
}

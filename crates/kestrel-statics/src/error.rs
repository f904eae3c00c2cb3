//! Errors.

use crate::resolve::ResolveError;
use kestrel_tree::{ExprMust, Name};
use kestrel_ty::coerce::Ambiguous;
use kestrel_ty::{Subst, Ty, Tys};
use std::fmt;

/// An error. Stops the checking of the declaration it is in.
#[derive(Debug)]
pub struct Error {
  pub(crate) decl: Name,
  pub(crate) expr: Option<ExprMust>,
  pub(crate) kind: Kind,
}

impl Error {
  /// Display the error.
  #[must_use]
  pub fn display<'a, T>(&'a self, tys: &'a T) -> impl fmt::Display + 'a
  where
    T: Tys + ?Sized,
  {
    Display { kind: &self.kind, tys }
  }

  /// Returns the name of the declaration this error is in.
  #[must_use]
  pub fn decl(&self) -> &Name {
    &self.decl
  }

  /// Returns the expr this error is for, if there is one.
  #[must_use]
  pub fn expr(&self) -> Option<ExprMust> {
    self.expr
  }

  /// Whether this is a bug in the checker, not in the program being checked.
  #[must_use]
  pub fn is_internal(&self) -> bool {
    matches!(self.kind, Kind::Internal(_))
  }

  /// Apply a subst.
  pub fn apply(&mut self, subst: &Subst) {
    match &mut self.kind {
      Kind::Subtype { want, got } => {
        want.apply(subst);
        got.apply(subst);
      }
      Kind::AmbiguousCoercion(amb) => {
        amb.to.apply(subst);
        amb.from.apply(subst);
      }
      Kind::Expected(_, ty) | Kind::MissingField(_, ty) => ty.apply(subst),
      Kind::DefiniteTypeTest { operand, test, .. } => {
        operand.apply(subst);
        test.apply(subst);
      }
      Kind::Resolve(_)
      | Kind::NotAValue(_)
      | Kind::Undefined(_)
      | Kind::AlreadyDefined(_)
      | Kind::DuplicateField(_)
      | Kind::ArityMismatch { .. }
      | Kind::InvalidLval
      | Kind::NoFixedPoint
      | Kind::NotInLoop
      | Kind::Internal(_) => {}
    }
  }
}

/// What a value was expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
  Number,
  Int,
  List,
  Set,
  Record,
  Tuple,
  Reference,
  Function,
  Indexable,
  Sized,
  Iterable,
}

impl fmt::Display for Shape {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Shape::Number => "a number",
      Shape::Int => "an int",
      Shape::List => "a list",
      Shape::Set => "a set",
      Shape::Record => "a record",
      Shape::Tuple => "a tuple",
      Shape::Reference => "a reference",
      Shape::Function => "a function",
      Shape::Indexable => "a string, list or dictionary",
      Shape::Sized => "a string, list, set or dictionary",
      Shape::Iterable => "something to iterate over",
    };
    f.write_str(s)
  }
}

#[derive(Debug)]
pub(crate) enum Kind {
  Subtype { want: Ty, got: Ty },
  Resolve(ResolveError),
  AmbiguousCoercion(Ambiguous),
  Expected(Shape, Ty),
  MissingField(Name, Ty),
  NotAValue(Name),
  Undefined(Name),
  AlreadyDefined(Name),
  DuplicateField(Name),
  ArityMismatch { want: usize, got: usize },
  DefiniteTypeTest { operand: Ty, test: Ty, outcome: bool },
  InvalidLval,
  NoFixedPoint,
  NotInLoop,
  Internal(String),
}

impl From<ResolveError> for Kind {
  fn from(e: ResolveError) -> Self {
    Kind::Resolve(e)
  }
}

struct Display<'a, T: ?Sized> {
  kind: &'a Kind,
  tys: &'a T,
}

impl<T> fmt::Display for Display<'_, T>
where
  T: Tys + ?Sized,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.kind {
      Kind::Subtype { want, got } => {
        let want = want.display(self.tys);
        let got = got.display(self.tys);
        write!(f, "expected `{want}`, found `{got}`")
      }
      Kind::Resolve(e) => write!(f, "{e}"),
      Kind::AmbiguousCoercion(amb) => write!(f, "{}", amb.display(self.tys)),
      Kind::Expected(shape, got) => {
        write!(f, "expected {shape}, found `{}`", got.display(self.tys))
      }
      Kind::MissingField(name, ty) => {
        write!(f, "no field `{name}` on `{}`", ty.display(self.tys))
      }
      Kind::NotAValue(name) => write!(f, "not a value: `{name}`"),
      Kind::Undefined(name) => write!(f, "undefined: `{name}`"),
      Kind::AlreadyDefined(name) => write!(f, "already defined: `{name}`"),
      Kind::DuplicateField(name) => write!(f, "duplicate field: `{name}`"),
      Kind::ArityMismatch { want, got } => write!(f, "expected {want} items, found {got}"),
      Kind::DefiniteTypeTest { operand, test, outcome } => {
        let operand = operand.display(self.tys);
        let test = test.display(self.tys);
        write!(f, "type test is always {outcome}: `{operand}` is `{test}`")
      }
      Kind::InvalidLval => f.write_str("cannot assign to this"),
      Kind::NoFixedPoint => f.write_str("types in this loop do not stabilize"),
      Kind::NotInLoop => f.write_str("not inside a loop or switch"),
      Kind::Internal(msg) => write!(f, "internal error: {msg}"),
    }
  }
}

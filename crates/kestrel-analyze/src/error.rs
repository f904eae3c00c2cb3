//! Errors from any stage of checking a file.

use kestrel_tree::{ExprMust, Name};
use kestrel_ty::{Subst, Tys};
use std::fmt;

/// An error in one declaration. The declaration gets no further results after it.
#[derive(Debug)]
pub struct Error {
  decl: Name,
  expr: Option<ExprMust>,
  kind: Kind,
}

#[derive(Debug)]
enum Kind {
  Statics(kestrel_statics::error::Error),
  TypeTest(kestrel_type_test::error::Error),
}

impl Error {
  pub(crate) fn statics(e: kestrel_statics::error::Error) -> Self {
    Self { decl: e.decl().clone(), expr: e.expr(), kind: Kind::Statics(e) }
  }

  pub(crate) fn type_test(decl: Name, expr: ExprMust, e: kestrel_type_test::error::Error) -> Self {
    Self { decl, expr: Some(expr), kind: Kind::TypeTest(e) }
  }

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
    match &self.kind {
      Kind::Statics(e) => e.is_internal(),
      Kind::TypeTest(_) => false,
    }
  }

  pub(crate) fn apply(&mut self, subst: &Subst) {
    match &mut self.kind {
      Kind::Statics(e) => e.apply(subst),
      Kind::TypeTest(e) => e.apply(subst),
    }
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
      Kind::Statics(e) => write!(f, "{}", e.display(self.tys)),
      Kind::TypeTest(e) => write!(f, "{}", e.display(self.tys)),
    }
  }
}

//! Errors.

use kestrel_ty::{Subst, Ty, Tys};
use std::fmt;

/// A type test that cannot be compiled.
#[derive(Debug)]
pub struct Error {
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

  /// Apply a subst.
  pub fn apply(&mut self, subst: &Subst) {
    match &mut self.kind {
      Kind::RecursiveVsRecursive { operand, test } | Kind::Indistinguishable { operand, test } => {
        operand.apply(subst);
        test.apply(subst);
      }
      Kind::TooDeep => {}
    }
  }
}

#[derive(Debug)]
pub(crate) enum Kind {
  RecursiveVsRecursive { operand: Ty, test: Ty },
  /// The runtime representation cannot tell these apart.
  Indistinguishable { operand: Ty, test: Ty },
  TooDeep,
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
    f.write_str("unsupported type test: ")?;
    match self.kind {
      Kind::RecursiveVsRecursive { operand, test } => {
        let operand = operand.display(self.tys);
        let test = test.display(self.tys);
        write!(f, "recursive `{operand}` against recursive `{test}`")
      }
      Kind::Indistinguishable { operand, test } => {
        let operand = operand.display(self.tys);
        let test = test.display(self.tys);
        write!(f, "`{test}` cannot be told apart from the rest of `{operand}` at runtime")
      }
      Kind::TooDeep => f.write_str("nested too deeply"),
    }
  }
}

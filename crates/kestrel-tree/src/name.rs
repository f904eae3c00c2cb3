//! Names of things.

use std::fmt;
use std::sync::Arc;

/// A name, like a variable, field, module, or type name.
///
/// Cheap to clone and safe to share across threads.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(Arc<str>);

impl Name {
  /// Makes a new name.
  #[must_use]
  pub fn new(s: &str) -> Self {
    Self(Arc::from(s))
  }

  /// Returns the contents.
  #[must_use]
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// The name bound to the receiver of a method.
  #[must_use]
  pub fn this() -> Self {
    Self::new("this")
  }

  /// The name bound to the return value in a postcondition, or the value under constraint in a type
  /// definition.
  #[must_use]
  pub fn dollar() -> Self {
    Self::new("$")
  }
}

impl From<&str> for Name {
  fn from(s: &str) -> Self {
    Self::new(s)
  }
}

impl fmt::Display for Name {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A name qualified by the module that defines it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualName {
  /// The module.
  pub module: Name,
  /// The name in that module.
  pub name: Name,
}

impl QualName {
  /// Makes a new one.
  #[must_use]
  pub fn new(module: &str, name: &str) -> Self {
    Self { module: Name::new(module), name: Name::new(name) }
  }
}

impl fmt::Display for QualName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}::{}", self.module, self.name)
  }
}

//! Constant values.

use crate::Name;
use always::always;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A constant value, as written in the source or produced by a resolved constant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
  Null,
  Bool(bool),
  Int(i64),
  Real(Real),
  Char(char),
  String(String),
  List(Vec<Value>),
  Set(BTreeSet<Value>),
  Tuple(Vec<Value>),
  Record(BTreeMap<Name, Value>),
  Dictionary(BTreeMap<Value, Value>),
}

/// A finite real number, that is, one that is not NaN or infinity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Real(f64);

impl Real {
  /// Exposes the inner value of this number. It will be finite.
  #[must_use]
  pub fn value(&self) -> f64 {
    self.0
  }

  /// Whether this has no fractional part, and so shares a representation with an int.
  #[must_use]
  #[allow(clippy::float_cmp)]
  pub fn is_integral(&self) -> bool {
    self.0.fract() == 0.0
  }

  /// Delegates to `try_from`, and uses always! to assert the Err case is not hit. But if it is, use
  /// `0.0` instead.
  #[must_use]
  pub fn always_from_f64(n: f64) -> Self {
    match Self::try_from(n) {
      Ok(n) => n,
      Err(e) => {
        always!(false, "not finite: {e}");
        Self(0.0)
      }
    }
  }
}

/// OK because NaN is not allowed
impl Eq for Real {}

impl PartialOrd for Real {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Real {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    if let Some(x) = self.value().partial_cmp(&other.value()) {
      x
    } else {
      always!(false, "should not be NaN");
      std::cmp::Ordering::Equal
    }
  }
}

impl TryFrom<f64> for Real {
  type Error = NotFinite;

  fn try_from(value: f64) -> Result<Self, Self::Error> {
    if value.is_nan() {
      return Err(NotFinite::Nan);
    }
    if value.is_infinite() {
      let inf = if value.is_sign_positive() { NotFinite::PosInf } else { NotFinite::NegInf };
      return Err(inf);
    }
    Ok(Self(value))
  }
}

impl fmt::Display for Real {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_integral() { write!(f, "{:.1}", self.0) } else { self.0.fmt(f) }
  }
}

/// An error when a real is not finite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFinite {
  /// Not a number.
  Nan,
  /// Positive infinity.
  PosInf,
  /// Negative infinity.
  NegInf,
}

impl fmt::Display for NotFinite {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NotFinite::Nan => f.write_str("NaN"),
      NotFinite::PosInf => f.write_str("positive infinity"),
      NotFinite::NegInf => f.write_str("negative infinity"),
    }
  }
}

impl std::error::Error for NotFinite {}

//! Errors.

use crate::Label;
use std::fmt;

/// A block whose jumps or loops do not line up. A bug in whatever made the block.
#[derive(Debug)]
pub struct Error {
  kind: Kind,
}

impl Error {
  pub(crate) fn new(kind: Kind) -> Self {
    Self { kind }
  }
}

#[derive(Debug)]
pub(crate) enum Kind {
  UnknownLabel(Label),
  UnmatchedEnd(Label),
  UnmatchedStart(Label),
}

impl fmt::Display for Error {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("internal error: ")?;
    match self.kind {
      Kind::UnknownLabel(label) => write!(f, "jump to `{label}`, which is not later in the block"),
      Kind::UnmatchedEnd(label) => write!(f, "end of loop `{label}` with no start"),
      Kind::UnmatchedStart(label) => write!(f, "start of loop `{label}` with no end"),
    }
  }
}

impl std::error::Error for Error {}

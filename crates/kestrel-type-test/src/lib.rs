//! Compiling dynamic type tests, like `x is int`, into instructions for a stack machine.
//!
//! The static type of the tested value cuts down what needs checking at runtime. Testing a value of
//! type `int|[int]` for `int` only needs one tag check, but testing `[int]|[bool]` for `[int]` has
//! to look at an element.
//!
//! Lists, sets and dictionaries are checked by looking at just one element. This is not enough for
//! collections holding values of many types, but it is what we do.

mod compile;
mod fields;
mod instr;

pub mod error;

pub use instr::{Compiled, Instr, Intrinsic, Label, Repr};

use kestrel_tree::Name;
use kestrel_ty::{MutStore, Ty};

/// Compiles a test of a value of type `operand` against `test`.
///
/// When the tested value came from a local, the local is stored back narrowed on both outcomes.
///
/// # Errors
///
/// When the test can't be decided at runtime, or we don't know how to.
pub fn get(
  tys: &mut MutStore<'_>,
  local: Option<&Name>,
  operand: Ty,
  test: Ty,
) -> Result<Compiled, error::Error> {
  compile::get(tys, local, operand, test)
}

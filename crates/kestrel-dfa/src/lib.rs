//! A framework for backward flow analyses over blocks of code with labels, jumps and loops.
//!
//! An analysis says what happens to its store across each statement, conditional jump and loop,
//! and how stores join. The framework walks a block from the end to the start, remembering the
//! store at each label so that jumps to it can pick it up, and collects the code the analysis puts
//! in place of each step.

pub mod error;

use rustc_hash::FxHashMap;
use std::fmt;

/// A jump target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(pub u32);

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "L{}", self.0)
  }
}

/// A piece of code in a block. `C` is whatever the analysis treats as one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code<C> {
  /// A jump target.
  Label(Label),
  /// Jumps, always.
  Goto(Label),
  /// Jumps when the condition is true.
  IfGoto {
    /// Where to jump.
    target: Label,
    /// The condition.
    cond: C,
  },
  /// The start of a loop body.
  Start {
    /// Names the loop.
    label: Label,
  },
  /// The end of a loop body, going back to the start with the same label.
  End {
    /// The loop.
    target: Label,
  },
  /// Leaves the function.
  Return,
  /// Anything else. Control goes on to the next piece of code.
  Stmt(C),
}

/// An ordered sequence of code.
pub type Block<C> = [Code<C>];

/// The stores at labels already passed in the walk.
#[derive(Debug)]
pub struct Labels<S>(FxHashMap<Label, S>);

impl<S> Default for Labels<S> {
  fn default() -> Self {
    Self(FxHashMap::default())
  }
}

impl<S> Labels<S> {
  /// Returns the store at the label, if it was passed.
  #[must_use]
  pub fn get(&self, label: Label) -> Option<&S> {
    self.0.get(&label)
  }
}

/// A backward flow analysis.
///
/// Each step also says what code to put in its place, so an analysis may rewrite the block as it
/// goes, for instance to drop code it has shown to be useless.
pub trait BackwardFlowAnalysis {
  /// One step of code.
  type Code;

  /// What the analysis knows at a point.
  type Store: Clone;

  /// The store at the end of the function.
  fn last_store(&self) -> Self::Store;

  /// Returns the code to put in place of the statement, if any, and the store before it, given
  /// the store after it.
  fn propagate_stmt(
    &mut self,
    stmt: &Self::Code,
    store: Self::Store,
  ) -> (Option<Code<Self::Code>>, Self::Store);

  /// Returns the code to put in place of a conditional jump to `target`, if any, and the store
  /// before it, given the store at its target and the store after it when it doesn't jump.
  ///
  /// When the condition is known, the jump may become a `Goto` or be dropped.
  fn propagate_if_goto(
    &mut self,
    target: Label,
    cond: &Self::Code,
    true_store: Self::Store,
    false_store: Self::Store,
  ) -> (Option<Code<Self::Code>>, Self::Store);

  /// Returns the code to put in place of the loop and the store before it, given the store after
  /// it. Usually runs [`Self::propagate_block`] on the body until the store settles.
  ///
  /// The returned code includes the loop's `Start` and `End`, so a loop may be dropped entirely.
  ///
  /// # Errors
  ///
  /// If the body is malformed.
  fn propagate_loop(
    &mut self,
    labels: &mut Labels<Self::Store>,
    label: Label,
    body: &Block<Self::Code>,
    store: Self::Store,
  ) -> Result<(Vec<Code<Self::Code>>, Self::Store), error::Error>;

  /// Joins the stores from two paths.
  fn join(&self, lhs: Self::Store, rhs: Self::Store) -> Self::Store;

  /// Runs the analysis on a whole function body, returning the rewritten body and the store at
  /// the start.
  ///
  /// # Errors
  ///
  /// If the block is malformed.
  fn run(
    &mut self,
    block: &Block<Self::Code>,
  ) -> Result<(Vec<Code<Self::Code>>, Self::Store), error::Error> {
    let mut labels = Labels::default();
    let last = self.last_store();
    self.propagate_block(&mut labels, block, last)
  }

  /// Walks the block backwards from the store at its end, returning the rewritten block and the
  /// store at its start.
  ///
  /// # Errors
  ///
  /// If a jump goes to a label not later in the block, or loop starts and ends don't match.
  fn propagate_block(
    &mut self,
    labels: &mut Labels<Self::Store>,
    block: &Block<Self::Code>,
    mut store: Self::Store,
  ) -> Result<(Vec<Code<Self::Code>>, Self::Store), error::Error> {
    // built back to front.
    let mut out = Vec::<Code<Self::Code>>::with_capacity(block.len());
    let mut idx = block.len();
    while idx > 0 {
      idx -= 1;
      let code = match &block[idx] {
        Code::Label(label) => {
          labels.0.insert(*label, store.clone());
          Some(Code::Label(*label))
        }
        Code::Goto(target) => {
          store = at(labels, *target)?;
          Some(Code::Goto(*target))
        }
        Code::IfGoto { target, cond } => {
          let true_store = at(labels, *target)?;
          let (code, before) = self.propagate_if_goto(*target, cond, true_store, store);
          store = before;
          code
        }
        Code::Return => {
          store = self.last_store();
          Some(Code::Return)
        }
        Code::Stmt(stmt) => {
          let (code, before) = self.propagate_stmt(stmt, store);
          store = before;
          code
        }
        Code::End { target } => {
          let end = idx;
          let start = loop {
            if idx == 0 {
              return Err(error::Error::new(error::Kind::UnmatchedEnd(*target)));
            }
            idx -= 1;
            if matches!(&block[idx], Code::Start { label } if label == target) {
              break idx;
            }
          };
          log::debug!("loop `{target}` spans {} pieces of code", end - start - 1);
          let (code, before) =
            self.propagate_loop(labels, *target, &block[start + 1..end], store)?;
          store = before;
          out.extend(code.into_iter().rev());
          None
        }
        Code::Start { label } => {
          return Err(error::Error::new(error::Kind::UnmatchedStart(*label)));
        }
      };
      out.extend(code);
    }
    out.reverse();
    Ok((out, store))
  }
}

fn at<S: Clone>(labels: &Labels<S>, label: Label) -> Result<S, error::Error> {
  labels.get(label).cloned().ok_or_else(|| error::Error::new(error::Kind::UnknownLabel(label)))
}

#[cfg(test)]
mod tests;

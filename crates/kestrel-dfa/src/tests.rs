#![allow(clippy::disallowed_methods)]

use crate::{BackwardFlowAnalysis, Block, Code, Label, Labels, error};
use std::collections::BTreeSet;

/// Defines at most one variable, after using some.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
  def: Option<&'static str>,
  uses: Vec<&'static str>,
}

fn def(var: &'static str, uses: &[&'static str]) -> Code<Step> {
  Code::Stmt(Step { def: Some(var), uses: uses.to_vec() })
}

fn uses(uses: &[&'static str]) -> Step {
  Step { def: None, uses: uses.to_vec() }
}

type Live = BTreeSet<&'static str>;

/// Which variables may be read before they are next written. Definitions of variables that are
/// not live are dropped, keeping the uses.
#[derive(Debug, Default)]
struct Liveness {
  loop_iterations: usize,
}

impl BackwardFlowAnalysis for Liveness {
  type Code = Step;
  type Store = Live;

  fn last_store(&self) -> Live {
    Live::new()
  }

  fn propagate_stmt(&mut self, stmt: &Step, mut store: Live) -> (Option<Code<Step>>, Live) {
    let code = match stmt.def {
      Some(var) if !store.contains(var) => {
        log::debug!("dropping the definition of `{var}`");
        (!stmt.uses.is_empty()).then(|| Code::Stmt(uses(&stmt.uses)))
      }
      _ => Some(Code::Stmt(stmt.clone())),
    };
    if let Some(var) = stmt.def {
      store.remove(var);
    }
    store.extend(stmt.uses.iter().copied());
    (code, store)
  }

  fn propagate_if_goto(
    &mut self,
    target: Label,
    cond: &Step,
    true_store: Live,
    false_store: Live,
  ) -> (Option<Code<Step>>, Live) {
    let store = self.join(true_store, false_store);
    let (_, store) = self.propagate_stmt(cond, store);
    (Some(Code::IfGoto { target, cond: cond.clone() }), store)
  }

  fn propagate_loop(
    &mut self,
    labels: &mut Labels<Live>,
    label: Label,
    body: &Block<Step>,
    store: Live,
  ) -> Result<(Vec<Code<Step>>, Live), error::Error> {
    let mut head = store.clone();
    loop {
      self.loop_iterations += 1;
      let (new_body, start) = self.propagate_block(labels, body, head.clone())?;
      let next = self.join(store.clone(), start);
      if next == head {
        let mut code = vec![Code::Start { label }];
        code.extend(new_body);
        code.push(Code::End { target: label });
        return Ok((code, head));
      }
      head = next;
    }
  }

  fn join(&self, mut lhs: Live, rhs: Live) -> Live {
    lhs.extend(rhs);
    lhs
  }
}

#[test]
fn branch() {
  let l0 = Label(0);
  let block = [
    def("a", &[]),
    def("b", &["a"]),
    Code::IfGoto { target: l0, cond: uses(&["b"]) },
    def("c", &["a", "z"]),
    Code::Return,
    Code::Label(l0),
    def("d", &["b", "y"]),
  ];
  let (code, live) = Liveness::default().run(&block).expect("ok");
  assert_eq!(live, Live::from(["y", "z"]));
  let want = [
    def("a", &[]),
    def("b", &["a"]),
    Code::IfGoto { target: l0, cond: uses(&["b"]) },
    Code::Stmt(uses(&["a", "z"])),
    Code::Return,
    Code::Label(l0),
    Code::Stmt(uses(&["b", "y"])),
  ];
  assert_eq!(code, want);
}

#[test]
fn loop_to_fixed_point() {
  let (l0, l1) = (Label(0), Label(1));
  // i = 0; loop { if i >= n goto l1; s = s + i; i = i + 1 } l1: use s
  let block = [
    def("i", &[]),
    Code::Start { label: l0 },
    Code::IfGoto { target: l1, cond: uses(&["i", "n"]) },
    def("s", &["s", "i"]),
    def("i", &["i"]),
    Code::End { target: l0 },
    Code::Label(l1),
    Code::Stmt(uses(&["s"])),
  ];
  let mut liveness = Liveness::default();
  let (code, live) = liveness.run(&block).expect("ok");
  assert_eq!(live, Live::from(["n", "s"]));
  assert_eq!(liveness.loop_iterations, 2);
  assert_eq!(code, block);
}

#[test]
fn drop_dead_definitions() {
  let (l0, l1) = (Label(0), Label(1));
  // x = 0; y = 0; loop { if x >= n goto l1; t = x; x = t } l1: use x
  let block = [
    def("x", &[]),
    def("y", &[]),
    Code::Start { label: l0 },
    Code::IfGoto { target: l1, cond: uses(&["x", "n"]) },
    def("t", &["x"]),
    def("x", &["t"]),
    def("y", &["x"]),
    Code::End { target: l0 },
    Code::Label(l1),
    Code::Stmt(uses(&["x"])),
  ];
  let (code, live) = Liveness::default().run(&block).expect("ok");
  assert_eq!(live, Live::from(["n"]));
  let want = [
    def("x", &[]),
    Code::Start { label: l0 },
    Code::IfGoto { target: l1, cond: uses(&["x", "n"]) },
    def("t", &["x"]),
    def("x", &["t"]),
    Code::Stmt(uses(&["x"])),
    Code::End { target: l0 },
    Code::Label(l1),
    Code::Stmt(uses(&["x"])),
  ];
  assert_eq!(code, want);
}

#[test]
fn malformed() {
  let block: [Code<Step>; 2] = [Code::Label(Label(3)), Code::Goto(Label(3))];
  let err = Liveness::default().run(&block).expect_err("backward jump");
  assert_eq!(err.to_string(), "internal error: jump to `L3`, which is not later in the block");
  let block: [Code<Step>; 1] = [Code::End { target: Label(0) }];
  let err = Liveness::default().run(&block).expect_err("no start");
  assert_eq!(err.to_string(), "internal error: end of loop `L0` with no start");
  let block: [Code<Step>; 1] = [Code::Start { label: Label(0) }];
  assert!(Liveness::default().run(&block).is_err());
}

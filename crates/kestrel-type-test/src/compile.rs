//! Compiling a test of a value of one static type against another type.
//!
//! Every helper here has the same contract as the whole: the tested value is on top of the stack,
//! and it is consumed both when jumping to the success label and when falling off the end.

use crate::error::{Error, Kind};
use crate::fields;
use crate::instr::{Compiled, Instr, Intrinsic, Label, Repr};
use always::always;
use kestrel_tree::Name;
use kestrel_ty::logic::{difference, glb, is_subtype};
use kestrel_ty::{Data, MutStore, Prim, Record, Ty, effective};
use std::collections::BTreeMap;

/// Tests nested deeper than this are not compiled.
const MAX_DEPTH: usize = 64;

type Result<T = (), E = Error> = std::result::Result<T, E>;

struct St<'a, 'g> {
  tys: &'a mut MutStore<'g>,
  code: Vec<Instr>,
  next_label: u32,
  depth: usize,
}

impl St<'_, '_> {
  fn label(&mut self) -> Label {
    let ret = Label(self.next_label);
    self.next_label += 1;
    ret
  }

  fn emit(&mut self, instr: Instr) {
    self.code.push(instr);
  }
}

pub(crate) fn get(
  tys: &mut MutStore<'_>,
  local: Option<&Name>,
  operand: Ty,
  test: Ty,
) -> Result<Compiled> {
  let mut st = St { tys, code: Vec::new(), next_label: 0, depth: 0 };
  let success = st.label();
  match local {
    None => go(&mut st, operand, test, success)?,
    Some(local) => {
      let hit = st.label();
      let exit = st.label();
      go(&mut st, operand, test, hit)?;
      let no = difference(st.tys, operand, test);
      store(&mut st, local, no);
      st.emit(Instr::Goto(exit));
      st.emit(Instr::Label(hit));
      let yes = glb(st.tys, operand, test);
      store(&mut st, local, yes);
      st.emit(Instr::Goto(success));
      st.emit(Instr::Label(exit));
    }
  }
  log::debug!("compiled a type test into {} instructions", st.code.len());
  Ok(Compiled { code: st.code, success })
}

/// Puts the local back narrowed to the type. Nothing to do on a path that can't happen.
fn store(st: &mut St<'_, '_>, local: &Name, ty: Ty) {
  if ty == Ty::VOID {
    return;
  }
  let repr = Repr::of(&*st.tys, ty);
  st.emit(Instr::Load(local.clone()));
  st.emit(Instr::Store { local: local.clone(), ty, repr });
}

fn go(st: &mut St<'_, '_>, operand: Ty, test: Ty, success: Label) -> Result {
  if st.depth >= MAX_DEPTH {
    return Err(Error { kind: Kind::TooDeep });
  }
  st.depth += 1;
  let ret = go_inner(st, operand, test, success);
  st.depth -= 1;
  ret
}

fn go_inner(st: &mut St<'_, '_>, operand: Ty, test: Ty, success: Label) -> Result {
  let test = glb(st.tys, operand, test);
  if test == Ty::VOID {
    st.emit(Instr::Pop);
    return Ok(());
  }
  if is_subtype(&*st.tys, test, operand) {
    st.emit(Instr::Pop);
    st.emit(Instr::Goto(success));
    return Ok(());
  }
  if matches!(
    (st.tys.data(operand), st.tys.data(test)),
    (Data::Recursive(_, Some(_)), Data::Recursive(_, Some(_)))
  ) {
    return Err(Error { kind: Kind::RecursiveVsRecursive { operand, test } });
  }
  let bounds = effective::bounds(st.tys, test);
  match bounds.as_slice() {
    [] => {
      st.emit(Instr::Pop);
      Ok(())
    }
    &[one] => shape(st, operand, one, success),
    _ => union(st, operand, &bounds, success),
  }
}

/// Tries each bound in turn. Each later bound is tested knowing the earlier ones failed.
fn union(st: &mut St<'_, '_>, operand: Ty, bounds: &[Ty], success: Label) -> Result {
  let hit = st.label();
  let miss = st.label();
  let mut rest = operand;
  for &bound in bounds {
    st.emit(Instr::Dup);
    go(st, rest, bound, hit)?;
    rest = difference(st.tys, rest, bound);
  }
  st.emit(Instr::Goto(miss));
  st.emit(Instr::Label(hit));
  st.emit(Instr::Pop);
  st.emit(Instr::Goto(success));
  st.emit(Instr::Label(miss));
  st.emit(Instr::Pop);
  Ok(())
}

fn shape(st: &mut St<'_, '_>, operand: Ty, test: Ty, success: Label) -> Result {
  match st.tys.data(test).clone() {
    Data::Prim(Prim::Int) => {
      tagged(st, operand, test, Ty::REAL, Repr::Number, success, |st, _, _, reject| {
        st.emit(Instr::Dup);
        st.emit(Instr::Call(Intrinsic::IsIntegral));
        st.emit(Instr::IfFalse(reject));
        Ok(())
      })
    }
    Data::Prim(prim) => {
      let (top, repr) = match prim {
        Prim::Null => (Ty::NULL, Repr::Null),
        Prim::Bool => (Ty::BOOL, Repr::Bool),
        Prim::Int | Prim::Real => (Ty::REAL, Repr::Number),
        Prim::Char => (Ty::CHAR, Repr::Char),
        Prim::String => (Ty::STRING, Repr::String),
        Prim::Any => {
          always!(false, "any should have passed already");
          st.emit(Instr::Pop);
          st.emit(Instr::Goto(success));
          return Ok(());
        }
      };
      tagged(st, operand, test, top, repr, success, |_, _, _, _| Ok(()))
    }
    Data::List(elem) => {
      tagged(st, operand, test, Ty::LIST_ANY, Repr::List, success, |st, narrowed, accept, reject| {
        let src = effective::list(st.tys, narrowed);
        representative(st, src, elem, Intrinsic::First, accept, reject)
      })
    }
    Data::Set(elem) => {
      tagged(st, operand, test, Ty::SET_ANY, Repr::Set, success, |st, narrowed, accept, reject| {
        let src = effective::set(st.tys, narrowed);
        representative(st, src, elem, Intrinsic::AnyElement, accept, reject)
      })
    }
    Data::Dictionary(k, v) => {
      let top = Ty::DICTIONARY_ANY;
      tagged(st, operand, test, top, Repr::Dictionary, success, |st, narrowed, accept, reject| {
        let src = effective::dictionary(st.tys, narrowed)
          .map(|(sk, sv)| st.tys.get(Data::Tuple(vec![sk, sv])));
        let entry = st.tys.get(Data::Tuple(vec![k, v]));
        representative(st, src, entry, Intrinsic::AnyEntry, accept, reject)
      })
    }
    Data::Tuple(elems) => {
      let top = st.tys.get(Data::Tuple(vec![Ty::ANY; elems.len()]));
      let repr = Repr::Tuple(elems.len());
      tagged(st, operand, test, top, repr, success, |st, narrowed, _, reject| {
        let src = effective::tuple(st.tys, narrowed).unwrap_or_else(|| {
          always!(false, "narrowed to a tuple but no effective tuple");
          vec![Ty::ANY; elems.len()]
        });
        for (idx, (&src, &elem)) in src.iter().zip(elems.iter()).enumerate() {
          if !is_subtype(&*st.tys, elem, src) {
            probe(st, Instr::Call(Intrinsic::Element(idx)), src, elem, reject)?;
          }
        }
        Ok(())
      })
    }
    Data::Record(rec) => record(st, operand, test, &rec, success),
    Data::Reference(_) => tag_only(st, operand, test, Repr::Reference, success),
    Data::Function(_) => tag_only(st, operand, test, Repr::Function, success),
    Data::Union(_) | Data::Named(_, _) | Data::Recursive(_, _) => {
      always!(false, "should have looked through to a shape");
      Err(Error { kind: Kind::Indistinguishable { operand, test } })
    }
  }
}

/// Checks the tag, unless every value of the operand type already has it, then runs `rest` on the
/// operand narrowed to things with that tag.
///
/// `rest` jumps to the accept label to pass early, to the reject label to fail, and falls through
/// to pass.
fn tagged<'a, 'g, F>(
  st: &mut St<'a, 'g>,
  operand: Ty,
  test: Ty,
  top: Ty,
  repr: Repr,
  success: Label,
  rest: F,
) -> Result
where
  F: FnOnce(&mut St<'a, 'g>, Ty, Label, Label) -> Result,
{
  let guaranteed = is_subtype(&*st.tys, top, operand);
  let narrowed = if guaranteed { operand } else { glb(st.tys, operand, top) };
  if !guaranteed && is_subtype(&*st.tys, test, narrowed) {
    st.emit(Instr::IsTag(repr));
    st.emit(Instr::IfTrue(success));
    return Ok(());
  }
  let accept = st.label();
  let reject = st.label();
  if !guaranteed {
    st.emit(Instr::Dup);
    st.emit(Instr::IsTag(repr));
    st.emit(Instr::IfFalse(reject));
  }
  rest(st, narrowed, accept, reject)?;
  st.emit(Instr::Label(accept));
  st.emit(Instr::Pop);
  st.emit(Instr::Goto(success));
  st.emit(Instr::Label(reject));
  st.emit(Instr::Pop);
  Ok(())
}

/// Tests one element of a collection known to have this representation. Empty collections pass.
fn representative(
  st: &mut St<'_, '_>,
  src: Option<Ty>,
  test: Ty,
  get: Intrinsic,
  accept: Label,
  reject: Label,
) -> Result {
  let src = src.unwrap_or_else(|| {
    always!(false, "narrowed to a collection but no effective element");
    Ty::ANY
  });
  if is_subtype(&*st.tys, test, src) {
    return Ok(());
  }
  st.emit(Instr::Dup);
  st.emit(Instr::Call(Intrinsic::IsEmpty));
  st.emit(Instr::IfTrue(accept));
  probe(st, Instr::Call(get), src, test, reject)
}

/// Gets part of the value on top of the stack with `get`, and tests it, leaving the value there.
fn probe(st: &mut St<'_, '_>, get: Instr, src: Ty, test: Ty, reject: Label) -> Result {
  let ok = st.label();
  st.emit(Instr::Dup);
  st.emit(get);
  go(st, src, test, ok)?;
  st.emit(Instr::Goto(reject));
  st.emit(Instr::Label(ok));
  Ok(())
}

fn record(st: &mut St<'_, '_>, operand: Ty, test: Ty, rec: &Record, success: Label) -> Result {
  tagged(st, operand, test, Ty::RECORD_ANY, Repr::Record, success, |st, narrowed, _, reject| {
    let bounds = effective::bounds(st.tys, narrowed);
    let candidates: Vec<Record> = bounds
      .into_iter()
      .filter_map(|b| match st.tys.data(b) {
        Data::Record(r) => Some(r.clone()),
        _ => None,
      })
      .collect();
    let (probes, left) = fields::distinguishing(candidates, rec.fields.keys().cloned());
    for name in probes {
      st.emit(Instr::Dup);
      st.emit(Instr::HasField(name));
      st.emit(Instr::IfFalse(reject));
    }
    let extra = |c: &Record| c.open || c.fields.keys().any(|k| !rec.fields.contains_key(k));
    if !rec.open && left.iter().any(extra) {
      st.emit(Instr::Dup);
      st.emit(Instr::FieldCountIs(rec.fields.len()));
      st.emit(Instr::IfFalse(reject));
    }
    let exact = Record {
      fields: rec.fields.keys().map(|name| (name.clone(), Ty::ANY)).collect(),
      open: rec.open,
    };
    let exact = st.tys.get(Data::Record(exact));
    let narrowed = glb(st.tys, narrowed, exact);
    let src = match effective::record(st.tys, narrowed) {
      Some(r) => r.fields,
      None => {
        always!(false, "narrowed to a record but no effective record");
        BTreeMap::new()
      }
    };
    for (name, &field_test) in &rec.fields {
      let field_src = src.get(name).copied().unwrap_or(Ty::ANY);
      if !is_subtype(&*st.tys, field_test, field_src) {
        probe(st, Instr::GetField(name.clone()), field_src, field_test, reject)?;
      }
    }
    Ok(())
  })
}

/// References and functions carry no runtime information past their tag, so the tag must be
/// enough.
fn tag_only(st: &mut St<'_, '_>, operand: Ty, test: Ty, repr: Repr, success: Label) -> Result {
  let bounds = effective::bounds(st.tys, operand);
  let all = bounds.len();
  let same: Vec<Ty> = bounds.into_iter().filter(|&b| Repr::of(&*st.tys, b) == repr).collect();
  let guaranteed = same.len() == all;
  let narrowed = st.tys.union(same);
  if guaranteed || !is_subtype(&*st.tys, test, narrowed) {
    return Err(Error { kind: Kind::Indistinguishable { operand, test } });
  }
  st.emit(Instr::IsTag(repr));
  st.emit(Instr::IfTrue(success));
  Ok(())
}

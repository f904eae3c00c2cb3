//! Propagating environments through statements.

use crate::cond;
use crate::env::Env;
use crate::error::{Kind, Shape};
use crate::expr;
use crate::st::{Result, Scope, ScopeKind, St};
use kestrel_tree::{Case, Collection, ExprArena, ExprData, ExprMust, Name, Stmt};
use kestrel_ty::logic::is_subtype;
use kestrel_ty::{Data, MutStore, Nominal, Record, Ty, coerce, effective};

/// How many times a loop body is propagated before giving up on its types settling down.
const MAX_ITERATIONS: usize = 16;

/// Returns the environment after the statements. Statements that cannot be reached are skipped.
pub(crate) fn block(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  stmts: &[Stmt],
  mut env: Env,
) -> Result<Env> {
  for (idx, stmt) in stmts.iter().enumerate() {
    if env.is_bottom() {
      log::debug!("skipping {} unreachable statements", stmts.len() - idx);
      break;
    }
    env = get(st, ar, stmt, env)?;
  }
  Ok(env)
}

fn get(st: &mut St<'_, '_>, ar: &mut ExprArena, stmt: &Stmt, env: Env) -> Result<Env> {
  match stmt {
    Stmt::Assign { lhs, rhs } => assign(st, ar, lhs, *rhs, env),
    Stmt::Assert(e) => cond::get(st, ar, env, *e, true),
    Stmt::Debug(e) => {
      let got = expr::get(st, ar, &env, *e)?;
      st.require(*e, Nominal::raw(Ty::STRING), got)?;
      Ok(env)
    }
    Stmt::Return(e) => {
      ret(st, ar, *e, &env)?;
      Ok(Env::Bottom)
    }
    Stmt::Throw(e) => {
      expr::get(st, ar, &env, *e)?;
      Ok(Env::Bottom)
    }
    Stmt::IfElse { cond, yes, no } => {
      let yes_env = cond::get(st, ar, env.clone(), *cond, true)?;
      let no_env = cond::get(st, ar, env, *cond, false)?;
      let yes_env = block(st, ar, yes, yes_env)?;
      let no_env = match no {
        Some(no) => block(st, ar, no, no_env)?,
        None => no_env,
      };
      Ok(st.join(yes_env, no_env))
    }
    Stmt::While { cond, invariant, body } => while_loop(st, ar, *cond, *invariant, body, env),
    Stmt::DoWhile { body, cond, invariant } => do_while_loop(st, ar, body, *cond, *invariant, env),
    Stmt::For { vars, source, invariant, body } => {
      for_loop(st, ar, vars, *source, *invariant, body, env)
    }
    Stmt::Switch { on, cases } => switch(st, ar, *on, cases, env),
    Stmt::Break => {
      st.add_break(env)?;
      Ok(Env::Bottom)
    }
    Stmt::Continue => {
      st.add_continue(env)?;
      Ok(Env::Bottom)
    }
    Stmt::Skip => Ok(env),
    Stmt::Expr(e) => {
      expr::get(st, ar, &env, *e)?;
      Ok(env)
    }
  }
}

fn ret(st: &mut St<'_, '_>, ar: &mut ExprArena, e: Option<ExprMust>, env: &Env) -> Result<()> {
  let Some(want) = st.ret else {
    return Err(st.err_no_expr(Kind::Internal("return outside a function".to_owned())));
  };
  match e {
    Some(e) => {
      let got = expr::get(st, ar, env, e)?;
      st.require_unambiguous(e, want, got)
    }
    None if want.expanded == Ty::VOID => Ok(()),
    None => Err(st.err_no_expr(Kind::Subtype { want: want.surface, got: Ty::VOID })),
  }
}

/// Propagates a loop body, collecting the environments that leave it early.
fn loop_body(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  body: &[Stmt],
  env: Env,
) -> Result<(Env, Scope)> {
  let m = st.enter_scope(ScopeKind::Loop);
  let out = block(st, ar, body, env);
  let scope = st.exit_scope(m);
  Ok((out?, scope))
}

fn invariant(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  invariant: Option<ExprMust>,
  env: Env,
) -> Result<Env> {
  match invariant {
    Some(inv) => cond::get(st, ar, env, inv, true),
    None => Ok(env),
  }
}

fn while_loop(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  cond: ExprMust,
  inv: Option<ExprMust>,
  body: &[Stmt],
  entry: Env,
) -> Result<Env> {
  let mut head = entry.clone();
  for iteration in 1..=MAX_ITERATIONS {
    let top = invariant(st, ar, inv, head.clone())?;
    let body_env = cond::get(st, ar, top.clone(), cond, true)?;
    let (out, scope) = loop_body(st, ar, body, body_env)?;
    let back = st.join(out, scope.continues);
    let next = st.join(entry.clone(), back);
    if next == head {
      log::debug!("while loop settled after {iteration} iterations");
      let exit = cond::get(st, ar, top, cond, false)?;
      return Ok(st.join(exit, scope.breaks));
    }
    head = next;
  }
  Err(st.err(cond, Kind::NoFixedPoint))
}

fn do_while_loop(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  body: &[Stmt],
  cond: ExprMust,
  inv: Option<ExprMust>,
  entry: Env,
) -> Result<Env> {
  let mut head = entry.clone();
  for iteration in 1..=MAX_ITERATIONS {
    let (out, scope) = loop_body(st, ar, body, head.clone())?;
    let end = st.join(out, scope.continues);
    let end = invariant(st, ar, inv, end)?;
    let again = cond::get(st, ar, end.clone(), cond, true)?;
    let next = st.join(entry.clone(), again);
    if next == head {
      log::debug!("do while loop settled after {iteration} iterations");
      let exit = cond::get(st, ar, end, cond, false)?;
      return Ok(st.join(exit, scope.breaks));
    }
    head = next;
  }
  Err(st.err(cond, Kind::NoFixedPoint))
}

fn for_loop(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  vars: &[Name],
  source: ExprMust,
  inv: Option<ExprMust>,
  body: &[Stmt],
  entry: Env,
) -> Result<Env> {
  let source_ty = expr::get(st, ar, &entry, source)?;
  let var_tys = for_vars(st, source, source_ty, vars.len())?;
  if let Some(var) = vars.iter().find(|v| entry.get(v).is_some()) {
    return Err(st.err(source, Kind::AlreadyDefined(var.clone())));
  }
  let mut head = entry.clone();
  for iteration in 1..=MAX_ITERATIONS {
    let mut body_env = head.clone();
    for (var, &ty) in vars.iter().zip(&var_tys) {
      body_env.insert(var.clone(), Nominal::raw(ty));
    }
    let body_env = invariant(st, ar, inv, body_env)?;
    let (out, scope) = loop_body(st, ar, body, body_env)?;
    let mut back = st.join(out, scope.continues);
    let mut breaks = scope.breaks;
    for var in vars {
      back.remove(var);
      breaks.remove(var);
    }
    let next = st.join(entry.clone(), back);
    if next == head {
      log::debug!("for loop settled after {iteration} iterations");
      return Ok(st.join(head, breaks));
    }
    head = next;
  }
  Err(st.err(source, Kind::NoFixedPoint))
}

/// The types of the variables bound by iterating over a value. Iterating over a dictionary binds
/// either a key-value pair, or a key and a value.
fn for_vars(st: &mut St<'_, '_>, source: ExprMust, ty: Nominal, n: usize) -> Result<Vec<Ty>> {
  match n {
    1 => match expr::elem_of(st.tys, ty.expanded) {
      Some(elem) => Ok(vec![elem]),
      None => Err(st.err(source, Kind::Expected(Shape::Iterable, ty.surface))),
    },
    2 => match effective::dictionary(st.tys, ty.expanded) {
      Some((k, v)) => Ok(vec![k, v]),
      None => Err(st.err(source, Kind::ArityMismatch { want: 1, got: 2 })),
    },
    _ => Err(st.err(source, Kind::ArityMismatch { want: 1, got: n })),
  }
}

fn switch(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  on: ExprMust,
  cases: &[Case],
  entry: Env,
) -> Result<Env> {
  let on_ty = expr::get(st, ar, &entry, on)?;
  let mut ret = Env::Bottom;
  let mut has_default = false;
  for case in cases {
    has_default |= case.labels.is_empty();
    for &label in &case.labels {
      let label_ty = expr::get(st, ar, &entry, label)?;
      st.require(label, on_ty, label_ty)?;
    }
    let m = st.enter_scope(ScopeKind::Switch);
    let out = block(st, ar, &case.body, entry.clone());
    let scope = st.exit_scope(m);
    let out = st.join(out?, scope.breaks);
    ret = st.join(ret, out);
  }
  if !has_default {
    ret = st.join(ret, entry);
  }
  Ok(ret)
}

fn assign(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  lhs: &[ExprMust],
  rhs: ExprMust,
  env: Env,
) -> Result<Env> {
  let got = expr::get(st, ar, &env, rhs)?;
  if let &[one] = lhs {
    return lval(st, ar, env, one, got);
  }
  // a rational destructures into its numerator and denominator.
  let elems = match effective::tuple(st.tys, got.expanded) {
    Some(elems) => elems,
    None if coerce::is_implicit_coercive_subtype(&*st.tys, Ty::REAL, got.expanded) => {
      vec![Ty::INT, Ty::INT]
    }
    None => return Err(st.err(rhs, Kind::Expected(Shape::Tuple, got.surface))),
  };
  if elems.len() != lhs.len() {
    return Err(st.err(rhs, Kind::ArityMismatch { want: lhs.len(), got: elems.len() }));
  }
  let mut env = env;
  for (&target, ty) in lhs.iter().zip(elems) {
    env = lval(st, ar, env, target, Nominal::raw(ty))?;
  }
  Ok(env)
}

/// Writes a value of the type into the target. Writing into part of a variable gives the variable
/// a new type that also allows what was written.
fn lval(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  mut env: Env,
  target: ExprMust,
  val: Nominal,
) -> Result<Env> {
  match ar[target].clone() {
    ExprData::Name(name) | ExprData::LocalVar(name) => {
      ar[target] = ExprData::LocalVar(name.clone());
      st.insert_expr_ty(target, val);
      env.insert(name, val);
      Ok(env)
    }
    ExprData::Dot { on, field } | ExprData::RecordAccess { on, field } => {
      let old = expr::get(st, ar, &env, on)?;
      match effective::record(st.tys, old.expanded) {
        Some(rec) if rec.fields.contains_key(&field) => {}
        Some(_) => return Err(st.err(target, Kind::MissingField(field, old.surface))),
        None => return Err(st.err(on, Kind::Expected(Shape::Record, old.surface))),
      }
      ar[target] = ExprData::RecordAccess { on, field: field.clone() };
      st.insert_expr_ty(target, val);
      let written = with_field(st.tys, old.expanded, &field, val.expanded);
      let new = widen(st.tys, old, written);
      lval(st, ar, env, on, new)
    }
    ExprData::Index { on, idx, .. } => {
      let old = expr::get(st, ar, &env, on)?;
      let idx_ty = expr::get(st, ar, &env, idx)?;
      st.insert_expr_ty(target, val);
      if is_subtype(&*st.tys, Ty::STRING, old.expanded) {
        return Err(st.err(target, Kind::InvalidLval));
      }
      let (of, written) = if let Some(elem) = effective::list(st.tys, old.expanded) {
        st.require_int(idx, idx_ty)?;
        let elem = st.tys.union([elem, val.expanded]);
        (Collection::List, st.tys.get(Data::List(elem)))
      } else if let Some((k, v)) = effective::dictionary(st.tys, old.expanded) {
        let k = st.tys.union([k, idx_ty.expanded]);
        let v = st.tys.union([v, val.expanded]);
        (Collection::Dictionary, st.tys.get(Data::Dictionary(k, v)))
      } else {
        return Err(st.err(on, Kind::Expected(Shape::Indexable, old.surface)));
      };
      ar[target] = ExprData::Index { on, idx, of: Some(of) };
      let new = widen(st.tys, old, written);
      lval(st, ar, env, on, new)
    }
    ExprData::Deref(inner) => {
      let r = expr::get(st, ar, &env, inner)?;
      let Some(elem) = effective::reference(st.tys, r.expanded) else {
        return Err(st.err(inner, Kind::Expected(Shape::Reference, r.surface)));
      };
      st.insert_expr_ty(target, Nominal::raw(elem));
      st.require(target, Nominal::raw(elem), val)?;
      Ok(env)
    }
    _ => Err(st.err(target, Kind::InvalidLval)),
  }
}

/// The old type, now also allowing what was written.
fn widen(tys: &mut MutStore<'_>, old: Nominal, written: Ty) -> Nominal {
  let expanded = tys.union([old.expanded, written]);
  if expanded == old.expanded { old } else { Nominal::raw(expanded) }
}

/// Replaces the field in every record bound that has it.
fn with_field(tys: &mut MutStore<'_>, ty: Ty, field: &Name, val: Ty) -> Ty {
  let mut new = Vec::<Ty>::new();
  for b in effective::bounds(tys, ty) {
    let rec = match tys.data(b) {
      Data::Record(rec) if rec.fields.contains_key(field) => rec.clone(),
      _ => {
        new.push(b);
        continue;
      }
    };
    let mut fields = rec.fields;
    fields.insert(field.clone(), val);
    new.push(tys.get(Data::Record(Record { fields, open: rec.open })));
  }
  tys.union(new)
}

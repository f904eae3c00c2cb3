//! Conditions, which may narrow the types of local variables.
//!
//! A condition is propagated assuming it turned out a certain way, the sign. The result is the
//! environment in which that is so.

use crate::env::Env;
use crate::error::Kind;
use crate::expr;
use crate::st::{Result, St, TestSite};
use kestrel_tree::{BinOp, ExprArena, ExprData, ExprMust, Name, Type, UnOp, Value};
use kestrel_ty::logic::{difference, glb, is_subtype};
use kestrel_ty::{Nominal, Ty};

/// Returns the environment after the condition evaluates to `sign`.
pub(crate) fn get(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  env: Env,
  expr: ExprMust,
  sign: bool,
) -> Result<Env> {
  if env.is_bottom() {
    return Ok(Env::Bottom);
  }
  let ret = match ar[expr].clone() {
    ExprData::UnOp { op: UnOp::Not, inner } => get(st, ar, env, inner, !sign)?,
    ExprData::BinOp { lhs, op: BinOp::And, rhs } if sign => {
      let env = get(st, ar, env, lhs, true)?;
      get(st, ar, env, rhs, true)?
    }
    ExprData::BinOp { lhs, op: BinOp::Or, rhs } if !sign => {
      let env = get(st, ar, env, lhs, false)?;
      get(st, ar, env, rhs, false)?
    }
    // the outcome was decided either by the left side alone, or by the right side after the left
    // side went the other way.
    ExprData::BinOp { lhs, op: BinOp::And | BinOp::Or, rhs } => {
      let short = get(st, ar, env.clone(), lhs, sign)?;
      let long = get(st, ar, env, lhs, !sign)?;
      let long = get(st, ar, long, rhs, sign)?;
      st.join(short, long)
    }
    ExprData::Is { operand, test } => is(st, ar, env, expr, operand, &test, sign)?,
    ExprData::BinOp { lhs, op: op @ (BinOp::Eq | BinOp::Neq), rhs } => {
      expr::get(st, ar, &env, expr)?;
      let is_null = sign == (op == BinOp::Eq);
      match null_test(ar, lhs, rhs) {
        Some(name) => match env.get(&name) {
          Some(operand) => narrow(st, env, name, operand, Nominal::raw(Ty::NULL), is_null),
          None => env,
        },
        None => env,
      }
    }
    _ => {
      let got = expr::get(st, ar, &env, expr)?;
      st.require(expr, Nominal::raw(Ty::BOOL), got)?;
      env
    }
  };
  st.insert_expr_ty(expr, Nominal::raw(Ty::BOOL));
  Ok(ret)
}

fn is(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  env: Env,
  expr: ExprMust,
  operand: ExprMust,
  test: &Type,
  sign: bool,
) -> Result<Env> {
  let operand_ty = expr::get(st, ar, &env, operand)?;
  let test_ty = st.resolve_type(Some(expr), test)?;
  let local = match &ar[operand] {
    ExprData::LocalVar(name) => Some(name.clone()),
    _ => None,
  };
  st.statics.test_sites.insert(
    expr,
    TestSite { decl: st.decl.clone(), local: local.clone(), operand: operand_ty, test: test_ty },
  );
  if !st.options.allow_definite_type_tests {
    let meet = glb(st.tys, operand_ty.expanded, test_ty.expanded);
    let outcome = if meet == Ty::VOID {
      Some(false)
    } else if is_subtype(&*st.tys, test_ty.expanded, operand_ty.expanded) {
      Some(true)
    } else {
      None
    };
    // loop bodies are propagated again with wider types, so only the last verdict counts.
    match outcome {
      Some(outcome) => {
        let kind =
          Kind::DefiniteTypeTest { operand: operand_ty.surface, test: test_ty.surface, outcome };
        st.definite.insert(expr, kind);
      }
      None => {
        st.definite.remove(&expr);
      }
    }
  }
  Ok(match local {
    Some(name) => narrow(st, env, name, operand_ty, test_ty, sign),
    None => env,
  })
}

/// Returns the local compared with `null`, in `x == null` or `null == x`.
fn null_test(ar: &ExprArena, lhs: ExprMust, rhs: ExprMust) -> Option<Name> {
  match (&ar[lhs], &ar[rhs]) {
    (ExprData::LocalVar(name), ExprData::Const(Value::Null))
    | (ExprData::Const(Value::Null), ExprData::LocalVar(name)) => Some(name.clone()),
    _ => None,
  }
}

/// Narrows the local after a test for `test` came out as `sign`. A test that can never come out
/// that way leaves an unreachable environment.
fn narrow(
  st: &mut St<'_, '_>,
  mut env: Env,
  name: Name,
  operand: Nominal,
  test: Nominal,
  sign: bool,
) -> Env {
  let ty = if sign {
    let meet = glb(st.tys, operand.expanded, test.expanded);
    let surface = if meet == test.expanded {
      test.surface
    } else if meet == operand.expanded {
      operand.surface
    } else {
      meet
    };
    Nominal { surface, expanded: meet }
  } else {
    let rest = difference(st.tys, operand.expanded, test.expanded);
    let surface = if rest == operand.expanded { operand.surface } else { rest };
    Nominal { surface, expanded: rest }
  };
  if ty.expanded == Ty::VOID {
    log::debug!("`{name}` can never be tested {sign} here");
    return Env::Bottom;
  }
  env.insert(name, ty);
  env
}

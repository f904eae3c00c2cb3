//! Flow-sensitive type propagation.
//!
//! Types flow forward through each declaration, statement by statement, in an environment mapping
//! local variables to their types at that point. Conditions narrow the types of the locals they
//! test. Loops are propagated again and again until the environment at their head stops changing.
//!
//! Along the way, every expression gets a type, expressions the parser could not tell apart are
//! re-tagged in place, and every dynamic type test is recorded for later compilation.

mod cond;
mod env;
mod expr;
mod st;
mod stmt;

pub mod error;
pub mod resolve;

pub use env::Env;
pub use st::{Options, Statics, TestSite};

use kestrel_tree::{Decl, ExprArena, File, FunctionDecl, Name};
use kestrel_ty::{MutStore, Nominal};

/// Propagates types through every declaration in the file, re-tagging its expressions in place.
///
/// An error stops the declaration it is in, but not the others.
pub fn get(
  tys: &mut MutStore<'_>,
  resolver: &dyn resolve::Resolver,
  options: Options,
  file: &mut File,
) -> Statics {
  let mut imports = vec![file.module.clone()];
  imports.extend(file.imports.iter().cloned());
  let module = file.module.clone();
  let mut st = st::St::new(tys, resolver, options, imports);
  let File { decls, exprs, .. } = file;
  for decl in decls.iter() {
    let name = decl.name().clone();
    log::info!("checking `{module}::{name}`");
    st.decl = name.clone();
    st.ret = None;
    st.definite.clear();
    let res = get_decl(&mut st, exprs, decl).and_then(|ty| match st.definite.pop_first() {
      None => Ok(ty),
      Some((expr, kind)) => Err(st.err(expr, kind)),
    });
    match res {
      Ok(ty) => {
        st.statics.decl_tys.insert(name, ty);
      }
      Err(e) => {
        if e.is_internal() {
          log::error!("internal error in `{module}::{name}`: {}", e.display(&*st.tys));
        } else {
          log::debug!("error in `{module}::{name}`: {}", e.display(&*st.tys));
        }
        st.statics.errors.push(e);
      }
    }
  }
  st.finish()
}

fn get_decl(st: &mut st::St<'_, '_>, ar: &mut ExprArena, decl: &Decl) -> st::Result<Nominal> {
  match decl {
    Decl::Function(func) => get_function(st, ar, func),
    Decl::Constant { value, .. } => expr::get(st, ar, &Env::default(), *value),
    Decl::TypeDef { ty, constraint, .. } => {
      let ty = st.resolve_type(None, ty)?;
      if let Some(constraint) = *constraint {
        let mut env = Env::default();
        env.insert(Name::dollar(), ty);
        cond::get(st, ar, env, constraint, true)?;
      }
      Ok(ty)
    }
  }
}

fn get_function(
  st: &mut st::St<'_, '_>,
  ar: &mut ExprArena,
  func: &FunctionDecl,
) -> st::Result<Nominal> {
  let mut env = Env::default();
  if let Some(receiver) = &func.receiver {
    let ty = st.resolve_type(None, receiver)?;
    env.insert(Name::this(), ty);
  }
  for (name, ty) in &func.params {
    let ty = st.resolve_type(None, ty)?;
    if env.get(name).is_some() {
      return Err(st.err_no_expr(error::Kind::AlreadyDefined(name.clone())));
    }
    env.insert(name.clone(), ty);
  }
  let ret = st.resolve_type(None, &func.ret)?;
  let func_ty = st.resolve_type(None, &func.ty())?;
  if let Some(pre) = func.precondition {
    env = cond::get(st, ar, env, pre, true)?;
  }
  if let Some(post) = func.postcondition {
    let mut post_env = env.clone();
    post_env.insert(Name::dollar(), ret);
    cond::get(st, ar, post_env, post, true)?;
  }
  st.ret = Some(ret);
  stmt::block(st, ar, &func.body, env)?;
  st.ret = None;
  Ok(func_ty)
}

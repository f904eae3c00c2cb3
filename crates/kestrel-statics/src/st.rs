//! The state of statics.

use crate::env::Env;
use crate::error::{Error, Kind, Shape};
use crate::resolve::Resolver;
use always::always;
use drop_bomb::DebugDropBomb;
use kestrel_tree::{ExprMap, ExprMust, Name, Type};
use kestrel_ty::{MutStore, Nominal, Subst, Ty, coerce};
use std::collections::BTreeMap;

/// Options for checking.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
  /// Whether type tests with an outcome known ahead of time are allowed.
  pub allow_definite_type_tests: bool,
}

/// A dynamic type test, `local is test` or `expr is test`.
#[derive(Debug, Clone)]
pub struct TestSite {
  /// The declaration the test is in.
  pub decl: Name,
  /// The local variable tested, if the operand was one.
  pub local: Option<Name>,
  /// The type of the operand.
  pub operand: Nominal,
  /// The type tested for.
  pub test: Nominal,
}

impl TestSite {
  /// Apply a subst.
  pub fn apply(&mut self, subst: &Subst) {
    self.operand.apply(subst);
    self.test.apply(subst);
  }
}

/// Results after doing statics on one file.
#[derive(Debug, Default)]
pub struct Statics {
  /// The errors, at most one per declaration.
  pub errors: Vec<Error>,
  /// Types of expressions.
  pub expr_tys: ExprMap<Nominal>,
  /// Every type test, by the `is` expression.
  pub test_sites: ExprMap<TestSite>,
  /// Types of the declarations that have one: functions, constants, and type definitions.
  pub decl_tys: BTreeMap<Name, Nominal>,
}

impl Statics {
  /// Apply a subst.
  pub fn apply(&mut self, subst: &Subst) {
    for e in &mut self.errors {
      e.apply(subst);
    }
    for ty in self.expr_tys.values_mut() {
      ty.apply(subst);
    }
    for site in self.test_sites.values_mut() {
      site.apply(subst);
    }
    for ty in self.decl_tys.values_mut() {
      ty.apply(subst);
    }
  }
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

/// Where a `break` or `continue` goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeKind {
  Loop,
  Switch,
}

/// The environments flowing out of a loop or switch other than by falling off the end.
#[derive(Debug)]
pub(crate) struct Scope {
  kind: ScopeKind,
  pub(crate) breaks: Env,
  pub(crate) continues: Env,
}

pub(crate) struct ScopeMarker {
  bomb: DebugDropBomb,
  depth: usize,
}

/// The state when checking statics.
pub(crate) struct St<'a, 'g> {
  pub(crate) tys: &'a mut MutStore<'g>,
  pub(crate) resolver: &'a dyn Resolver,
  pub(crate) options: Options,
  /// The module of the file, then its imports.
  pub(crate) imports: Vec<Name>,
  pub(crate) statics: Statics,
  /// The declaration being checked.
  pub(crate) decl: Name,
  /// The declared return type of the function being checked.
  pub(crate) ret: Option<Nominal>,
  /// Type tests in the declaration being checked whose outcome was known the last time they were
  /// propagated.
  pub(crate) definite: BTreeMap<ExprMust, Kind>,
  scopes: Vec<Scope>,
}

impl<'a, 'g> St<'a, 'g> {
  pub(crate) fn new(
    tys: &'a mut MutStore<'g>,
    resolver: &'a dyn Resolver,
    options: Options,
    imports: Vec<Name>,
  ) -> Self {
    Self {
      tys,
      resolver,
      options,
      imports,
      statics: Statics::default(),
      decl: Name::new(""),
      ret: None,
      definite: BTreeMap::new(),
      scopes: Vec::new(),
    }
  }

  pub(crate) fn err(&self, expr: ExprMust, kind: Kind) -> Error {
    Error { decl: self.decl.clone(), expr: Some(expr), kind }
  }

  pub(crate) fn err_no_expr(&self, kind: Kind) -> Error {
    Error { decl: self.decl.clone(), expr: None, kind }
  }

  pub(crate) fn insert_expr_ty(&mut self, expr: ExprMust, ty: Nominal) {
    // re-propagating a loop body writes again. the last write wins.
    self.statics.expr_tys.insert(expr, ty);
  }

  pub(crate) fn resolve_type(&mut self, expr: Option<ExprMust>, ty: &Type) -> Result<Nominal> {
    self.resolver.resolve_type(self.tys, ty, &self.imports).map_err(|e| Error {
      decl: self.decl.clone(),
      expr,
      kind: e.into(),
    })
  }

  /// Errors unless values of `got` may be used where `want` is expected.
  pub(crate) fn require(&mut self, expr: ExprMust, want: Nominal, got: Nominal) -> Result<()> {
    if coerce::is_implicit_coercive_subtype(&*self.tys, want.expanded, got.expanded) {
      Ok(())
    } else {
      Err(self.err(expr, Kind::Subtype { want: want.surface, got: got.surface }))
    }
  }

  /// Like `require`, and also errors when the implicit coercion would be ambiguous.
  pub(crate) fn require_unambiguous(
    &mut self,
    expr: ExprMust,
    want: Nominal,
    got: Nominal,
  ) -> Result<()> {
    self.require(expr, want, got)?;
    coerce::check(self.tys, want.expanded, got.expanded)
      .map_err(|amb| self.err(expr, Kind::AmbiguousCoercion(amb)))
  }

  pub(crate) fn require_int(&mut self, expr: ExprMust, got: Nominal) -> Result<()> {
    if coerce::is_implicit_coercive_subtype(&*self.tys, Ty::INT, got.expanded) {
      Ok(())
    } else {
      Err(self.err(expr, Kind::Expected(Shape::Int, got.surface)))
    }
  }

  pub(crate) fn enter_scope(&mut self, kind: ScopeKind) -> ScopeMarker {
    let depth = self.scopes.len();
    self.scopes.push(Scope { kind, breaks: Env::Bottom, continues: Env::Bottom });
    ScopeMarker { bomb: DebugDropBomb::new("must exit scope"), depth }
  }

  pub(crate) fn exit_scope(&mut self, mut m: ScopeMarker) -> Scope {
    m.bomb.defuse();
    always!(self.scopes.len() == m.depth + 1, "scopes out of sync");
    self.scopes.truncate(m.depth + 1);
    match self.scopes.pop() {
      Some(scope) => scope,
      None => Scope { kind: ScopeKind::Loop, breaks: Env::Bottom, continues: Env::Bottom },
    }
  }

  /// Sends the environment to the exit of the innermost loop or switch.
  pub(crate) fn add_break(&mut self, env: Env) -> Result<()> {
    let Some(scope) = self.scopes.last_mut() else {
      return Err(self.err_no_expr(Kind::NotInLoop));
    };
    let old = std::mem::replace(&mut scope.breaks, Env::Bottom);
    let new = Env::join(self.tys, old, env);
    if let Some(scope) = self.scopes.last_mut() {
      scope.breaks = new;
    }
    Ok(())
  }

  /// Sends the environment to the head of the innermost loop.
  pub(crate) fn add_continue(&mut self, env: Env) -> Result<()> {
    let Some(idx) = self.scopes.iter().rposition(|s| s.kind == ScopeKind::Loop) else {
      return Err(self.err_no_expr(Kind::NotInLoop));
    };
    let old = std::mem::replace(&mut self.scopes[idx].continues, Env::Bottom);
    self.scopes[idx].continues = Env::join(self.tys, old, env);
    Ok(())
  }

  pub(crate) fn join(&mut self, lhs: Env, rhs: Env) -> Env {
    Env::join(self.tys, lhs, rhs)
  }

  pub(crate) fn finish(self) -> Statics {
    always!(self.scopes.is_empty());
    self.statics
  }
}

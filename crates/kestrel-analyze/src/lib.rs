//! Check files: propagate types through them, then compile their type tests.

pub mod error;

use kestrel_statics::resolve::Resolver;
use kestrel_statics::{Options, TestSite};
use kestrel_tree::{ExprMap, File, Name};
use kestrel_ty::{GlobalStore, LocalStore, MutStore, Nominal, Subst};
use kestrel_type_test::Compiled;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

/// Options for initialization.
#[derive(Debug, Clone, Copy)]
pub struct Init {
  /// Whether type tests with an outcome known ahead of time are allowed.
  pub allow_definite_type_tests: bool,
  /// Whether to compile the type tests after checking.
  pub compile_type_tests: bool,
}

impl Default for Init {
  fn default() -> Self {
    Self { allow_definite_type_tests: false, compile_type_tests: true }
  }
}

/// The state of analysis.
#[derive(Debug)]
pub struct St {
  tys: GlobalStore,
  options: Options,
  compile_type_tests: bool,
}

/// The results of checking one file.
#[derive(Debug, Default)]
pub struct FileResult {
  /// The errors, at most one per declaration.
  pub errors: Vec<error::Error>,
  /// Types of expressions.
  pub expr_tys: ExprMap<Nominal>,
  /// Every type test, by the `is` expression.
  pub test_sites: ExprMap<TestSite>,
  /// The compiled type tests, for declarations with no errors.
  pub compiled: ExprMap<Compiled>,
  /// Types of the declarations.
  pub decl_tys: BTreeMap<Name, Nominal>,
}

impl FileResult {
  fn apply(&mut self, subst: &Subst) {
    for e in &mut self.errors {
      e.apply(subst);
    }
    for ty in self.expr_tys.values_mut() {
      ty.apply(subst);
    }
    for site in self.test_sites.values_mut() {
      site.apply(subst);
    }
    for compiled in self.compiled.values_mut() {
      compiled.apply(subst);
    }
    for ty in self.decl_tys.values_mut() {
      ty.apply(subst);
    }
  }
}

impl St {
  /// Returns a new `St` with the given init options.
  #[must_use]
  pub fn init(init: Init) -> Self {
    log::info!("make new St with {init:?}");
    Self {
      tys: GlobalStore::default(),
      options: Options { allow_definite_type_tests: init.allow_definite_type_tests },
      compile_type_tests: init.compile_type_tests,
    }
  }

  /// Returns the types, for displaying the types in results.
  #[must_use]
  pub fn tys(&self) -> &GlobalStore {
    &self.tys
  }

  /// Checks one file, re-tagging its expressions in place.
  pub fn check_file(&mut self, file: &mut File, resolver: &dyn Resolver) -> FileResult {
    let compile = self.compile_type_tests;
    let (result, local) = isolated(&self.tys, self.options, compile, file, resolver);
    self.combine(result, local)
  }

  /// Checks many files in parallel. The results are in the same order as the files.
  pub fn check_files(
    &mut self,
    files: &mut [File],
    resolver: &(dyn Resolver + Sync),
  ) -> Vec<FileResult> {
    log::info!("check {} files in parallel", files.len());
    let (tys, options, compile) = (&self.tys, self.options, self.compile_type_tests);
    let isolated: Vec<_> =
      files.par_iter_mut().map(|file| isolated(tys, options, compile, file, resolver)).collect();
    isolated.into_iter().map(|(result, local)| self.combine(result, local)).collect()
  }

  fn combine(&mut self, mut result: FileResult, local: LocalStore) -> FileResult {
    if let Some(subst) = Subst::get(&mut self.tys, local) {
      result.apply(&subst);
    }
    result
  }
}

/// Checks the file against the global types without changing them. The new types are in the
/// returned local store.
fn isolated(
  global: &GlobalStore,
  options: Options,
  compile_type_tests: bool,
  file: &mut File,
  resolver: &dyn Resolver,
) -> (FileResult, LocalStore) {
  log::info!("check module `{}`", file.module);
  let mut tys = MutStore::new(global);
  let statics = kestrel_statics::get(&mut tys, resolver, options, file);
  let mut ret = FileResult {
    errors: statics.errors.into_iter().map(error::Error::statics).collect(),
    expr_tys: statics.expr_tys,
    test_sites: statics.test_sites,
    compiled: ExprMap::default(),
    decl_tys: statics.decl_tys,
  };
  if compile_type_tests {
    let mut failed: FxHashSet<Name> = ret.errors.iter().map(|e| e.decl().clone()).collect();
    let mut done = Vec::new();
    for (expr, site) in ret.test_sites.iter() {
      if failed.contains(&site.decl) {
        continue;
      }
      let (operand, test) = (site.operand.expanded, site.test.expanded);
      match kestrel_type_test::get(&mut tys, site.local.as_ref(), operand, test) {
        Ok(compiled) => {
          log::debug!("compiled type test in `{}`: {}", site.decl, compiled.display(&tys));
          done.push((site.decl.clone(), expr, compiled));
        }
        Err(e) => {
          log::debug!("couldn't compile type test in `{}`: {}", site.decl, e.display(&tys));
          failed.insert(site.decl.clone());
          ret.errors.push(error::Error::type_test(site.decl.clone(), expr, e));
        }
      }
    }
    for (decl, expr, compiled) in done {
      if !failed.contains(&decl) {
        ret.compiled.insert(expr, compiled);
      }
    }
  }
  log::info!("module `{}` has {} errors", file.module, ret.errors.len());
  (ret, tys.into_local())
}

//! Resolving names to the things they name.

use kestrel_tree::{Decl, ExprData, File, Name, QualName, Type, Value};
use kestrel_ty::{Data, MutStore, Nominal, Record, Ty, coerce, logic};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::fmt;

/// Looks up types, constants, modules and functions by name.
///
/// The imports are the modules searched for unqualified names, in order.
pub trait Resolver {
  /// Resolves a type as written.
  ///
  /// # Errors
  ///
  /// If a named type is not defined.
  fn resolve_type(
    &self,
    tys: &mut MutStore<'_>,
    ty: &Type,
    imports: &[Name],
  ) -> Result<Nominal, ResolveError>;

  /// Resolves a name to the constant it names.
  ///
  /// # Errors
  ///
  /// If no imported module defines a constant with this name.
  fn resolve_name(&self, name: &Name, imports: &[Name]) -> Result<QualName, ResolveError>;

  /// Returns the value of the constant.
  ///
  /// # Errors
  ///
  /// If there is no such constant.
  fn resolve_constant(&self, name: &QualName) -> Result<Value, ResolveError>;

  /// Resolves a name to a module.
  ///
  /// # Errors
  ///
  /// If there is no such module.
  fn resolve_module(&self, name: &Name, imports: &[Name]) -> Result<Name, ResolveError>;

  /// Returns whether this names a package.
  fn is_package(&self, name: &Name) -> bool;

  /// Resolves a call to a function or method, given the types of the arguments. When `module` is
  /// given, only looks in that module.
  ///
  /// # Errors
  ///
  /// If no function fits, or more than one fits equally well.
  fn resolve_function(
    &self,
    tys: &mut MutStore<'_>,
    name: &Name,
    module: Option<&Name>,
    args: &[Ty],
    imports: &[Name],
  ) -> Result<(QualName, Nominal), ResolveError>;

  /// Resolves a function or method by name alone, as when taking a reference to it. When `module`
  /// is given, only looks in that module.
  ///
  /// # Errors
  ///
  /// If there is no such function, or the name is overloaded.
  fn resolve_function_ref(
    &self,
    tys: &mut MutStore<'_>,
    name: &Name,
    module: Option<&Name>,
    imports: &[Name],
  ) -> Result<(QualName, Nominal), ResolveError>;
}

/// An error when resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
  /// No such type.
  UnknownType(Name),
  /// A type defined only in terms of itself.
  CyclicType(QualName),
  /// No such constant.
  UnknownConstant(Name),
  /// No such module.
  UnknownModule(Name),
  /// No function with this name takes these arguments.
  NoMatchingFunction(Name),
  /// More than one function with this name takes these arguments.
  AmbiguousFunction(Name),
}

impl fmt::Display for ResolveError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ResolveError::UnknownType(n) => write!(f, "unknown type: `{n}`"),
      ResolveError::CyclicType(n) => write!(f, "type defined only in terms of itself: `{n}`"),
      ResolveError::UnknownConstant(n) => write!(f, "unknown constant: `{n}`"),
      ResolveError::UnknownModule(n) => write!(f, "unknown module: `{n}`"),
      ResolveError::NoMatchingFunction(n) => write!(f, "no function `{n}` takes these arguments"),
      ResolveError::AmbiguousFunction(n) => write!(f, "ambiguous call to `{n}`"),
    }
  }
}

impl std::error::Error for ResolveError {}

#[derive(Debug, Default)]
struct Module {
  imports: Vec<Name>,
  types: BTreeMap<Name, Type>,
  constants: BTreeMap<Name, Value>,
  functions: BTreeMap<Name, Vec<Type>>,
}

/// A resolver backed by tables built from files.
#[derive(Debug, Default)]
pub struct TableResolver {
  modules: FxHashMap<Name, Module>,
  packages: FxHashSet<Name>,
}

impl TableResolver {
  /// Builds the tables from the declarations in the files.
  ///
  /// Constants are only recorded when their value is written as a constant.
  #[must_use]
  pub fn new(files: &[File]) -> Self {
    let mut ret = Self::default();
    for file in files {
      ret.add_file(file);
    }
    ret
  }

  /// Adds the declarations in the file.
  pub fn add_file(&mut self, file: &File) {
    let module = self.modules.entry(file.module.clone()).or_default();
    module.imports.clone_from(&file.imports);
    for decl in &file.decls {
      match decl {
        Decl::Function(func) => {
          module.functions.entry(func.name.clone()).or_default().push(func.ty());
        }
        Decl::Constant { name, value } => match &file.exprs[*value] {
          ExprData::Const(v) => {
            module.constants.insert(name.clone(), v.clone());
          }
          _ => log::warn!("constant `{name}` is not a literal, not recording"),
        },
        Decl::TypeDef { name, ty, .. } => {
          module.types.insert(name.clone(), ty.clone());
        }
      }
    }
  }

  /// Adds a package.
  pub fn add_package(&mut self, name: Name) {
    self.packages.insert(name);
  }

  fn imports_of(&self, module: &Name) -> Vec<Name> {
    let mut ret = vec![module.clone()];
    if let Some(m) = self.modules.get(module) {
      ret.extend(m.imports.iter().cloned());
    }
    ret
  }

  fn find_type(&self, name: &Name, imports: &[Name]) -> Option<(QualName, &Type)> {
    if let Some((module, local)) = name.as_str().split_once("::") {
      let ty = self.modules.get(&Name::new(module))?.types.get(&Name::new(local))?;
      return Some((QualName::new(module, local), ty));
    }
    imports.iter().find_map(|module| {
      let ty = self.modules.get(module)?.types.get(name)?;
      Some((QualName { module: module.clone(), name: name.clone() }, ty))
    })
  }

  fn convert(
    &self,
    tys: &mut MutStore<'_>,
    ty: &Type,
    imports: &[Name],
    in_progress: &mut Vec<(QualName, bool)>,
  ) -> Result<Nominal, ResolveError> {
    let ret = match ty {
      Type::Void => Nominal::raw(Ty::VOID),
      Type::Any => Nominal::raw(Ty::ANY),
      Type::Null => Nominal::raw(Ty::NULL),
      Type::Bool => Nominal::raw(Ty::BOOL),
      Type::Int => Nominal::raw(Ty::INT),
      Type::Real => Nominal::raw(Ty::REAL),
      Type::Char => Nominal::raw(Ty::CHAR),
      Type::String => Nominal::raw(Ty::STRING),
      Type::List(elem) => {
        let elem = self.convert(tys, elem, imports, in_progress)?;
        both(tys, elem, Data::List)
      }
      Type::Set(elem) => {
        let elem = self.convert(tys, elem, imports, in_progress)?;
        both(tys, elem, Data::Set)
      }
      Type::Reference(elem) => {
        let elem = self.convert(tys, elem, imports, in_progress)?;
        both(tys, elem, Data::Reference)
      }
      Type::Dictionary(k, v) => {
        let k = self.convert(tys, k, imports, in_progress)?;
        let v = self.convert(tys, v, imports, in_progress)?;
        Nominal {
          surface: tys.get(Data::Dictionary(k.surface, v.surface)),
          expanded: tys.get(Data::Dictionary(k.expanded, v.expanded)),
        }
      }
      Type::Tuple(elems) => {
        let elems = self.convert_all(tys, elems, imports, in_progress)?;
        Nominal {
          surface: tys.get(Data::Tuple(elems.iter().map(|n| n.surface).collect())),
          expanded: tys.get(Data::Tuple(elems.iter().map(|n| n.expanded).collect())),
        }
      }
      Type::Union(parts) => {
        let parts = self.convert_all(tys, parts, imports, in_progress)?;
        Nominal {
          surface: tys.union(parts.iter().map(|n| n.surface)),
          expanded: tys.union(parts.iter().map(|n| n.expanded)),
        }
      }
      Type::Record { fields, open } => {
        let mut surface = BTreeMap::<Name, Ty>::new();
        let mut expanded = BTreeMap::<Name, Ty>::new();
        for (name, ty) in fields {
          let n = self.convert(tys, ty, imports, in_progress)?;
          surface.insert(name.clone(), n.surface);
          expanded.insert(name.clone(), n.expanded);
        }
        Nominal {
          surface: tys.get(Data::Record(Record { fields: surface, open: *open })),
          expanded: tys.get(Data::Record(Record { fields: expanded, open: *open })),
        }
      }
      Type::Function { kind, receiver, params, ret } => {
        let receiver = match receiver {
          None => None,
          Some(r) => Some(self.convert(tys, r, imports, in_progress)?),
        };
        let params = self.convert_all(tys, params, imports, in_progress)?;
        let ret = self.convert(tys, ret, imports, in_progress)?;
        let mk = |pick: fn(&Nominal) -> Ty| {
          Data::Function(kestrel_ty::Function {
            kind: *kind,
            receiver: receiver.as_ref().map(pick),
            params: params.iter().map(pick).collect(),
            ret: pick(&ret),
          })
        };
        let surface = mk(|n| n.surface);
        let expanded = mk(|n| n.expanded);
        Nominal { surface: tys.get(surface), expanded: tys.get(expanded) }
      }
      Type::Nominal(name) => self.convert_named(tys, name, imports, in_progress)?,
    };
    Ok(ret)
  }

  fn convert_all(
    &self,
    tys: &mut MutStore<'_>,
    types: &[Type],
    imports: &[Name],
    in_progress: &mut Vec<(QualName, bool)>,
  ) -> Result<Vec<Nominal>, ResolveError> {
    types.iter().map(|t| self.convert(tys, t, imports, in_progress)).collect()
  }

  fn convert_named(
    &self,
    tys: &mut MutStore<'_>,
    name: &Name,
    imports: &[Name],
    in_progress: &mut Vec<(QualName, bool)>,
  ) -> Result<Nominal, ResolveError> {
    let Some((qual, def)) = self.find_type(name, imports) else {
      return Err(ResolveError::UnknownType(name.clone()));
    };
    let binder = Name::new(&qual.to_string());
    if let Some(entry) = in_progress.iter_mut().rev().find(|(q, _)| *q == qual) {
      entry.1 = true;
      let back = tys.get(Data::Recursive(binder, None));
      let surface = tys.get(Data::Named(name.clone(), back));
      return Ok(Nominal { surface, expanded: back });
    }
    in_progress.push((qual.clone(), false));
    let def_imports = self.imports_of(&qual.module);
    let body = self.convert(tys, def, &def_imports, in_progress);
    let used = in_progress.pop().is_some_and(|(_, used)| used);
    let body = body?;
    let expanded = if used {
      if matches!(tys.data(body.expanded), Data::Recursive(n, None) if *n == binder) {
        return Err(ResolveError::CyclicType(qual));
      }
      tys.get(Data::Recursive(binder, Some(body.expanded)))
    } else {
      body.expanded
    };
    let surface = tys.get(Data::Named(name.clone(), expanded));
    Ok(Nominal { surface, expanded })
  }
}

fn both(tys: &mut MutStore<'_>, elem: Nominal, f: fn(Ty) -> Data) -> Nominal {
  Nominal { surface: tys.get(f(elem.surface)), expanded: tys.get(f(elem.expanded)) }
}

impl Resolver for TableResolver {
  fn resolve_type(
    &self,
    tys: &mut MutStore<'_>,
    ty: &Type,
    imports: &[Name],
  ) -> Result<Nominal, ResolveError> {
    let mut in_progress = Vec::<(QualName, bool)>::new();
    self.convert(tys, ty, imports, &mut in_progress)
  }

  fn resolve_name(&self, name: &Name, imports: &[Name]) -> Result<QualName, ResolveError> {
    imports
      .iter()
      .find(|module| self.modules.get(*module).is_some_and(|m| m.constants.contains_key(name)))
      .map(|module| QualName { module: module.clone(), name: name.clone() })
      .ok_or_else(|| ResolveError::UnknownConstant(name.clone()))
  }

  fn resolve_constant(&self, name: &QualName) -> Result<Value, ResolveError> {
    self
      .modules
      .get(&name.module)
      .and_then(|m| m.constants.get(&name.name))
      .cloned()
      .ok_or_else(|| ResolveError::UnknownConstant(name.name.clone()))
  }

  fn resolve_module(&self, name: &Name, imports: &[Name]) -> Result<Name, ResolveError> {
    if self.modules.contains_key(name) {
      return Ok(name.clone());
    }
    // a module may be imported by the last part of its path, like `math` for `std::math`.
    imports
      .iter()
      .find(|m| m.as_str().rsplit("::").next() == Some(name.as_str()))
      .filter(|m| self.modules.contains_key(*m))
      .cloned()
      .ok_or_else(|| ResolveError::UnknownModule(name.clone()))
  }

  fn is_package(&self, name: &Name) -> bool {
    self.packages.contains(name)
  }

  fn resolve_function(
    &self,
    tys: &mut MutStore<'_>,
    name: &Name,
    module: Option<&Name>,
    args: &[Ty],
    imports: &[Name],
  ) -> Result<(QualName, Nominal), ResolveError> {
    let modules = match module {
      Some(m) => vec![m.clone()],
      None => imports.to_vec(),
    };
    let mut matches = Vec::<(QualName, Nominal, Vec<Ty>)>::new();
    for module in modules {
      let Some(defs) = self.modules.get(&module).and_then(|m| m.functions.get(name)) else {
        continue;
      };
      let def_imports = self.imports_of(&module);
      for def in defs {
        let ty = self.resolve_type(tys, def, &def_imports)?;
        let Data::Function(func) = tys.data(ty.expanded) else { continue };
        let fits = func.params.len() == args.len()
          && func
            .params
            .iter()
            .zip(args)
            .all(|(&param, &arg)| coerce::is_implicit_coercive_subtype(&*tys, param, arg));
        if fits {
          let params = func.params.clone();
          matches.push((QualName { module: module.clone(), name: name.clone() }, ty, params));
        }
      }
    }
    // prefer the one whose params are all subtypes of every other's.
    let best: Vec<_> = matches
      .iter()
      .filter(|(_, _, ps)| {
        matches.iter().all(|(_, _, qs)| {
          ps.iter().zip(qs).all(|(&p, &q)| logic::is_subtype(&*tys, q, p))
        })
      })
      .collect();
    match best.as_slice() {
      [] if matches.is_empty() => Err(ResolveError::NoMatchingFunction(name.clone())),
      [(qual, ty, _)] => Ok((qual.clone(), *ty)),
      _ => Err(ResolveError::AmbiguousFunction(name.clone())),
    }
  }

  fn resolve_function_ref(
    &self,
    tys: &mut MutStore<'_>,
    name: &Name,
    module: Option<&Name>,
    imports: &[Name],
  ) -> Result<(QualName, Nominal), ResolveError> {
    let modules = match module {
      Some(m) => vec![m.clone()],
      None => imports.to_vec(),
    };
    let mut found = modules.into_iter().filter_map(|module| {
      let defs = self.modules.get(&module)?.functions.get(name)?;
      Some((module, defs))
    });
    let Some((module, defs)) = found.next() else {
      return Err(ResolveError::NoMatchingFunction(name.clone()));
    };
    let [def] = defs.as_slice() else {
      return Err(ResolveError::AmbiguousFunction(name.clone()));
    };
    let ty = self.resolve_type(tys, def, &self.imports_of(&module))?;
    Ok((QualName { module, name: name.clone() }, ty))
  }
}

//! Structural types, with unions and recursive types.
//!
//! Types are interned. A [`Ty`] is a cheap handle, and two handles are equal iff their data is
//! equal. New types are made in a [`MutStore`] layered over a shared [`GlobalStore`], and the new
//! types are later folded back into the global store with a [`Subst`].

pub mod coerce;
pub mod display;
pub mod effective;
pub mod logic;

mod generated {
  include!(concat!(env!("OUT_DIR"), "/generated.rs"));
}

use always::{always, convert};
use kestrel_tree::{FunctionKind, Name};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Data about a type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Data {
  /// A primitive type.
  Prim(Prim),
  /// A list with elements of the type.
  List(Ty),
  /// A set with elements of the type.
  Set(Ty),
  /// A dictionary from keys of the first type to values of the second.
  Dictionary(Ty, Ty),
  /// A tuple.
  Tuple(Vec<Ty>),
  /// A record.
  Record(Record),
  /// A union type.
  ///
  /// INVARIANT: no bound is itself a union, and there is never exactly one bound.
  ///
  /// A value whose type is the empty union can never exist. This type is called "void".
  Union(Union),
  /// A reference to a mutable cell holding a value of the type.
  Reference(Ty),
  /// A function or method.
  Function(Function),
  /// A type written by name, with its expansion. Only found in surface types.
  Named(Name, Ty),
  /// A recursive type binding the name in its body.
  ///
  /// A `None` body is a back reference to the nearest enclosing binder of the same name. Back
  /// references only make sense inside the body of that binder.
  Recursive(Name, Option<Ty>),
}

impl Data {
  /// A closed record with the fields.
  #[must_use]
  pub fn mk_record<const N: usize>(fields: [(&str, Ty); N]) -> Self {
    let fields = fields.into_iter().map(|(n, t)| (Name::new(n), t)).collect();
    Self::Record(Record { fields, open: false })
  }
}

/// A primitive type, containing no recursive data inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Prim {
  /// Anything at all. The top type.
  Any,
  /// The type of `null`.
  Null,
  /// `true` or `false`.
  Bool,
  /// An integer. Every int is also a real.
  Int,
  /// A real number.
  Real,
  /// A character.
  Char,
  /// A string.
  String,
}

/// A record type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Record {
  /// The fields.
  pub fields: BTreeMap<Name, Ty>,
  /// Whether values may have more fields than the known ones.
  pub open: bool,
}

/// A function or method type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Function {
  /// Whether this is a function or a method.
  pub kind: FunctionKind,
  /// The receiver, for methods bound to one.
  pub receiver: Option<Ty>,
  /// The parameters.
  pub params: Vec<Ty>,
  /// The return type.
  pub ret: Ty,
}

/// A union of types.
pub type Union = BTreeSet<Ty>;

/// A handle to the data of a type in some store.
///
/// Handles are interned, so two handles are equal iff their data is. Equal handles always mean
/// the same thing, but different handles can too: `{int x}|{real x}` and `{real x}` hold the same
/// values.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ty(u32);

impl fmt::Debug for Ty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let store = if self.is_local() { "local" } else { "global" };
    write!(f, "Ty({store} {})", self.idx())
  }
}

impl Ty {
  /// Set on handles into a local store. The builtin constants are global, so they have it unset.
  const LOCAL: u32 = 1 << 31;

  fn global(idx: usize) -> Self {
    let idx = convert::usize_to_u32(idx);
    always!(idx & Self::LOCAL == 0, "too many types");
    Self(idx)
  }

  fn local(idx: usize) -> Self {
    Self(Self::global(idx).0 | Self::LOCAL)
  }

  fn is_local(self) -> bool {
    self.0 & Self::LOCAL != 0
  }

  fn idx(self) -> usize {
    convert::u32_to_usize(self.0 & !Self::LOCAL)
  }

  /// Applies a subst to this.
  pub fn apply(&mut self, subst: &Subst) {
    if let Some(&new) = subst.to_global.get(self) {
      *self = new;
    }
  }
}

/// A type in two forms: the surface form keeps names as written, for diagnostics, and the expanded
/// form has every name replaced by what it stands for. All the logic works on the expanded form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nominal {
  /// The surface form.
  pub surface: Ty,
  /// The expanded form.
  pub expanded: Ty,
}

impl Nominal {
  /// A type with no names in it, so both forms are the same.
  #[must_use]
  pub const fn raw(ty: Ty) -> Self {
    Self { surface: ty, expanded: ty }
  }

  /// Applies a subst to both forms.
  pub fn apply(&mut self, subst: &Subst) {
    self.surface.apply(subst);
    self.expanded.apply(subst);
  }
}

/// Interned type data, indexed by handle.
#[derive(Debug, Default)]
struct Store {
  by_idx: Vec<Data>,
  by_data: FxHashMap<Data, Ty>,
}

impl Store {
  fn find(&self, data: &Data) -> Option<Ty> {
    self.by_data.get(data).copied()
  }

  fn get(&self, ty: Ty) -> &Data {
    match self.by_idx.get(ty.idx()) {
      Some(data) => data,
      None => {
        always!(false, "no data for {ty:?}");
        &Data::Prim(Prim::Any)
      }
    }
  }

  fn push(&mut self, data: Data, local: bool) -> Ty {
    let idx = self.by_idx.len();
    let ty = if local { Ty::local(idx) } else { Ty::global(idx) };
    self.by_idx.push(data.clone());
    always!(self.by_data.insert(data, ty).is_none());
    ty
  }
}

/// Something that can give the data for types.
pub trait Tys {
  /// Returns the data for the `Ty`.
  fn data(&self, ty: Ty) -> &Data;
}

/// New types made on top of a shared [`GlobalStore`].
#[derive(Debug)]
pub struct MutStore<'a> {
  global: &'a GlobalStore,
  local: LocalStore,
}

impl<'a> MutStore<'a> {
  /// Returns a new one with no types of its own yet.
  #[must_use]
  pub fn new(global: &'a GlobalStore) -> Self {
    Self { global, local: LocalStore::default() }
  }

  /// Returns the `Ty` for the data, making one if there is none yet.
  ///
  /// Unions are normalized: nested unions are flattened, a union with `any` is `any`, a bound that
  /// another bound already covers is dropped, and a union with just one bound is that bound.
  pub fn get(&mut self, data: Data) -> Ty {
    match data {
      Data::Union(bounds) => self.normalize(bounds),
      data => self.intern(data),
    }
  }

  fn normalize(&mut self, bounds: Union) -> Ty {
    let mut work: Vec<_> = bounds.into_iter().collect();
    let mut flat = Union::new();
    while let Some(ty) = work.pop() {
      match self.data(ty) {
        Data::Prim(Prim::Any) => return Ty::ANY,
        Data::Union(inner) => work.extend(inner),
        _ => {
          flat.insert(ty);
        }
      }
    }
    let flat = self.prune(flat);
    if let (1, Some(&only)) = (flat.len(), flat.first()) {
      return only;
    }
    self.intern(Data::Union(flat))
  }

  /// Removes each bound that is covered by another bound. When two bounds cover each other, keeps
  /// the lesser.
  fn prune(&self, parts: Union) -> Union {
    if parts.len() < 2 {
      return parts;
    }
    let covered: FxHashSet<Ty> = parts
      .iter()
      .filter(|&&b| {
        parts.iter().any(|&c| {
          c != b && logic::is_subtype(self, c, b) && (c < b || !logic::is_subtype(self, b, c))
        })
      })
      .copied()
      .collect();
    parts.into_iter().filter(|ty| !covered.contains(ty)).collect()
  }

  fn intern(&mut self, data: Data) -> Ty {
    match self.global.0.find(&data).or_else(|| self.local.0.find(&data)) {
      Some(ty) => ty,
      None => self.local.0.push(data, true),
    }
  }

  /// Returns the data for the `Ty`.
  #[must_use]
  pub fn data(&self, ty: Ty) -> &Data {
    if ty.is_local() { self.local.0.get(ty) } else { self.global.0.get(ty) }
  }

  /// Returns the union of the types.
  pub fn union<I>(&mut self, tys: I) -> Ty
  where
    I: IntoIterator<Item = Ty>,
  {
    self.get(Data::Union(tys.into_iter().collect()))
  }

  /// Gives up the global store, keeping just the types made here.
  #[must_use]
  pub fn into_local(self) -> LocalStore {
    self.local
  }
}

impl Tys for MutStore<'_> {
  fn data(&self, ty: Ty) -> &Data {
    MutStore::data(self, ty)
  }
}

/// The types every pass shares. Starts out with the builtin types.
#[derive(Debug)]
pub struct GlobalStore(Store);

impl Default for GlobalStore {
  fn default() -> Self {
    Self(Store::with_builtin())
  }
}

impl Tys for GlobalStore {
  fn data(&self, ty: Ty) -> &Data {
    if ty.is_local() {
      always!(false, "{ty:?} is not in the global store");
      return &Data::Prim(Prim::Any);
    }
    self.0.get(ty)
  }
}

/// The types made in one pass over a [`GlobalStore`].
#[derive(Debug, Default)]
pub struct LocalStore(Store);

/// How the types of a [`LocalStore`] were renamed when moved into a [`GlobalStore`].
#[derive(Debug, Default)]
pub struct Subst {
  /// INVARIANT: keys are local, values are global.
  to_global: FxHashMap<Ty, Ty>,
}

impl Subst {
  /// Moves the local types into the global store. Returns how to rename them, unless there were
  /// none.
  ///
  /// A type is always made after every type inside it, so moving them in order always finds its
  /// parts already moved.
  pub fn get(global: &mut GlobalStore, local: LocalStore) -> Option<Self> {
    let mut ret = Subst::default();
    for (idx, data) in local.0.by_idx.into_iter().enumerate() {
      let data = logic::map_children(&data, |ty| {
        let mut ty = ty;
        ty.apply(&ret);
        always!(!ty.is_local(), "{ty:?} was not moved before a type containing it");
        ty
      });
      let new = match global.0.find(&data) {
        Some(ty) => ty,
        None => global.0.push(data, false),
      };
      always!(ret.to_global.insert(Ty::local(idx), new).is_none());
    }
    log::debug!("moved {} local types into the global store", ret.to_global.len());
    (!ret.to_global.is_empty()).then_some(ret)
  }
}

#[cfg(test)]
mod tests;

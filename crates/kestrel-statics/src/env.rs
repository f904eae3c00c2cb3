//! The environment: the types of the variables at a point in a body.

use kestrel_tree::Name;
use kestrel_ty::{MutStore, Nominal};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// The types of the variables at a point.
///
/// Cloning is cheap. The map is shared until one of the clones changes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Env {
  /// An unreachable point, like after a `return`. Joining with this gives the other side.
  Bottom,
  /// A reachable point.
  Reachable(Rc<FxHashMap<Name, Nominal>>),
}

impl Default for Env {
  fn default() -> Self {
    Self::Reachable(Rc::default())
  }
}

impl Env {
  /// Returns whether this is unreachable.
  #[must_use]
  pub fn is_bottom(&self) -> bool {
    matches!(self, Env::Bottom)
  }

  /// Returns the type of the variable.
  #[must_use]
  pub fn get(&self, name: &Name) -> Option<Nominal> {
    match self {
      Env::Bottom => None,
      Env::Reachable(map) => map.get(name).copied(),
    }
  }

  /// Sets the type of the variable. Does nothing when unreachable.
  pub fn insert(&mut self, name: Name, ty: Nominal) {
    if let Env::Reachable(map) = self {
      Rc::make_mut(map).insert(name, ty);
    }
  }

  /// Forgets the variable.
  pub fn remove(&mut self, name: &Name) {
    if let Env::Reachable(map) = self {
      if map.contains_key(name) {
        Rc::make_mut(map).remove(name);
      }
    }
  }

  /// Returns the variables and their types, in no particular order.
  pub fn iter(&self) -> impl Iterator<Item = (&Name, &Nominal)> {
    let map = match self {
      Env::Bottom => None,
      Env::Reachable(map) => Some(map.iter()),
    };
    map.into_iter().flatten()
  }

  /// Joins two environments from the paths that meet at a point. A variable is only known after
  /// the join if it was known on both paths, and its type is the union of the two.
  #[must_use]
  pub fn join(tys: &mut MutStore<'_>, lhs: Env, rhs: Env) -> Env {
    let (lhs, rhs) = match (lhs, rhs) {
      (Env::Bottom, other) | (other, Env::Bottom) => return other,
      (Env::Reachable(lhs), Env::Reachable(rhs)) => (lhs, rhs),
    };
    if Rc::ptr_eq(&lhs, &rhs) || lhs == rhs {
      return Env::Reachable(lhs);
    }
    let mut ret = FxHashMap::<Name, Nominal>::default();
    for (name, a) in lhs.iter() {
      let Some(b) = rhs.get(name) else { continue };
      let ty = if a == b {
        *a
      } else {
        Nominal {
          surface: tys.union([a.surface, b.surface]),
          expanded: tys.union([a.expanded, b.expanded]),
        }
      };
      ret.insert(name.clone(), ty);
    }
    Env::Reachable(Rc::new(ret))
  }
}

#[cfg(test)]
mod tests {
  use super::Env;
  use kestrel_tree::Name;
  use kestrel_ty::{GlobalStore, MutStore, Nominal, Ty};

  #[test]
  fn join_keeps_common_and_unions() {
    let global = GlobalStore::default();
    let mut tys = MutStore::new(&global);
    let x = Name::new("x");
    let y = Name::new("y");
    let mut a = Env::default();
    a.insert(x.clone(), Nominal::raw(Ty::INT));
    a.insert(y.clone(), Nominal::raw(Ty::INT));
    let mut b = a.clone();
    b.insert(x.clone(), Nominal::raw(Ty::STRING));
    b.remove(&y);
    assert_eq!(a.get(&y), Some(Nominal::raw(Ty::INT)));
    let joined = Env::join(&mut tys, a.clone(), b);
    let int_or_string = tys.union([Ty::INT, Ty::STRING]);
    assert_eq!(joined.get(&x), Some(Nominal::raw(int_or_string)));
    assert_eq!(joined.get(&y), None);
    assert_eq!(Env::join(&mut tys, Env::Bottom, a.clone()), a);
    assert!(Env::join(&mut tys, Env::Bottom, Env::Bottom).is_bottom());
  }
}

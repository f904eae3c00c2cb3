//! Coercive subtyping, and finding coercions that are ambiguous.
//!
//! Implicit coercions happen without being asked for: `char` to `int` or `real`, `[T]` to
//! `{T}`, `{K->V}` to `{(K, V)}`, and `[T]` to `{int->T}`. Explicit coercions need a conversion
//! expression, and also allow `real` to `int` and `int` or `real` to `char`.

use crate::logic::{Mode, expand_named, is_subtype, subtype, unfold};
use crate::{Data, MutStore, Ty, Tys};
use rustc_hash::FxHashSet;
use std::fmt;

/// Returns whether values of `sub` may be used where `sup` is expected, allowing implicit
/// coercions.
pub fn is_implicit_coercive_subtype<T>(tys: &T, sup: Ty, sub: Ty) -> bool
where
  T: Tys + ?Sized,
{
  subtype(tys, Mode::Implicit, sup, sub)
}

/// Returns whether values of `sub` may be converted to `sup` with an explicit conversion.
pub fn is_explicit_coercive_subtype<T>(tys: &T, sup: Ty, sub: Ty) -> bool
where
  T: Tys + ?Sized,
{
  subtype(tys, Mode::Explicit, sup, sub)
}

/// A coercion into a union where more than one bound could take the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ambiguous {
  /// The union coerced into.
  pub to: Ty,
  /// The type coerced from.
  pub from: Ty,
}

impl Ambiguous {
  /// Displays this.
  #[must_use]
  pub fn display<'a, T>(&self, tys: &'a T) -> impl fmt::Display + 'a
  where
    T: Tys + ?Sized,
  {
    AmbiguousDisplay { this: *self, tys }
  }
}

struct AmbiguousDisplay<'a, T: ?Sized> {
  this: Ambiguous,
  tys: &'a T,
}

impl<T> fmt::Display for AmbiguousDisplay<'_, T>
where
  T: Tys + ?Sized,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let to = self.this.to.display(self.tys);
    let from = self.this.from.display(self.tys);
    write!(f, "ambiguous coercion from `{from}` to `{to}`")
  }
}

/// Checks that coercing a value of `from` into `to` is not ambiguous anywhere inside.
///
/// # Errors
///
/// When it is.
pub fn check(tys: &mut MutStore<'_>, to: Ty, from: Ty) -> Result<(), Ambiguous> {
  let mut visited = FxHashSet::<(Ty, Ty)>::default();
  go(tys, &mut visited, to, from)
}

fn go(
  tys: &mut MutStore<'_>,
  visited: &mut FxHashSet<(Ty, Ty)>,
  to: Ty,
  from: Ty,
) -> Result<(), Ambiguous> {
  let to = expand_named(tys, to);
  let from = expand_named(tys, from);
  if to == from || !visited.insert((to, from)) {
    return Ok(());
  }
  match (tys.data(to), tys.data(from)) {
    (_, Data::Union(froms)) => {
      let froms: Vec<_> = froms.iter().copied().collect();
      froms.into_iter().try_for_each(|from| go(tys, visited, to, from))
    }
    (Data::Union(tos), _) => {
      if tos.contains(&from) {
        return Ok(());
      }
      let tos: Vec<_> = tos.iter().copied().collect();
      let mut matches: Vec<_> =
        tos.iter().copied().filter(|&b| is_subtype(&*tys, b, from)).collect();
      if matches.is_empty() {
        matches =
          tos.iter().copied().filter(|&b| is_implicit_coercive_subtype(&*tys, b, from)).collect();
      }
      match matches.as_slice() {
        [] => Ok(()),
        &[b] => go(tys, visited, b, from),
        _ => Err(Ambiguous { to, from }),
      }
    }
    (Data::Recursive(_, Some(_)), _) | (_, Data::Recursive(_, Some(_))) => {
      let to = unfold(tys, to);
      let from = unfold(tys, from);
      go(tys, visited, to, from)
    }
    (&Data::List(a), &Data::List(b))
    | (&Data::Set(a), &Data::Set(b) | &Data::List(b))
    | (&Data::Reference(a), &Data::Reference(b)) => go(tys, visited, a, b),
    (&Data::Dictionary(k1, v1), &Data::Dictionary(k2, v2)) => {
      go(tys, visited, k1, k2)?;
      go(tys, visited, v1, v2)
    }
    (Data::Tuple(xs), Data::Tuple(ys)) if xs.len() == ys.len() => {
      let pairs: Vec<_> = xs.iter().copied().zip(ys.iter().copied()).collect();
      pairs.into_iter().try_for_each(|(a, b)| go(tys, visited, a, b))
    }
    (Data::Record(r1), Data::Record(r2)) => {
      let pairs: Vec<_> = r1
        .fields
        .iter()
        .filter_map(|(name, &a)| r2.fields.get(name).map(|&b| (a, b)))
        .collect();
      pairs.into_iter().try_for_each(|(a, b)| go(tys, visited, a, b))
    }
    _ => Ok(()),
  }
}

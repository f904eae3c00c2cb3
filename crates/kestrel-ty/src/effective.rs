//! Effective shapes: looking at a type, possibly a union, as a single list, set, dictionary, tuple
//! or record.
//!
//! For a union whose bounds all have the same outer shape, the effective shape is the pointwise
//! least upper bound of the bounds. When the bounds disagree, there is no effective shape.

use crate::logic::{expand_named, unfold};
use crate::{Data, Function, MutStore, Record, Ty};
use kestrel_tree::Name;
use std::collections::BTreeMap;

/// Returns the bounds of the type after looking through names and recursive binders. Returns an
/// empty list for void.
pub fn bounds(tys: &mut MutStore<'_>, ty: Ty) -> Vec<Ty> {
  let ty = head(tys, ty);
  match tys.data(ty) {
    Data::Union(parts) => {
      let parts: Vec<_> = parts.iter().copied().collect();
      parts.into_iter().map(|t| head(tys, t)).collect()
    }
    _ => vec![ty],
  }
}

/// Looks through names and unfolds recursive types until the outer shape is visible.
fn head(tys: &mut MutStore<'_>, mut ty: Ty) -> Ty {
  loop {
    ty = expand_named(tys, ty);
    let next = unfold(tys, ty);
    if next == ty {
      return ty;
    }
    ty = next;
  }
}

/// Returns the element type of the list.
pub fn list(tys: &mut MutStore<'_>, ty: Ty) -> Option<Ty> {
  let elems = shape(tys, ty, |data| match data {
    Data::List(elem) => Some(*elem),
    _ => None,
  })?;
  Some(tys.union(elems))
}

/// Returns the element type of the set.
pub fn set(tys: &mut MutStore<'_>, ty: Ty) -> Option<Ty> {
  let elems = shape(tys, ty, |data| match data {
    Data::Set(elem) => Some(*elem),
    _ => None,
  })?;
  Some(tys.union(elems))
}

/// Returns the key and value types of the dictionary.
pub fn dictionary(tys: &mut MutStore<'_>, ty: Ty) -> Option<(Ty, Ty)> {
  let pairs = shape(tys, ty, |data| match data {
    Data::Dictionary(k, v) => Some((*k, *v)),
    _ => None,
  })?;
  let (keys, vals): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
  let k = tys.union(keys);
  let v = tys.union(vals);
  Some((k, v))
}

/// Returns the type of the cell the reference points to.
pub fn reference(tys: &mut MutStore<'_>, ty: Ty) -> Option<Ty> {
  let elems = shape(tys, ty, |data| match data {
    Data::Reference(elem) => Some(*elem),
    _ => None,
  })?;
  Some(tys.union(elems))
}

/// Returns the function type, when every bound is the same function type.
pub fn function(tys: &mut MutStore<'_>, ty: Ty) -> Option<Function> {
  let all = shape(tys, ty, |data| match data {
    Data::Function(func) => Some(func.clone()),
    _ => None,
  })?;
  let (first, rest) = all.split_first()?;
  rest.iter().all(|f| f == first).then(|| first.clone())
}

/// Returns the element types of the tuple. Every bound must have the same arity.
pub fn tuple(tys: &mut MutStore<'_>, ty: Ty) -> Option<Vec<Ty>> {
  let all = shape(tys, ty, |data| match data {
    Data::Tuple(elems) => Some(elems.clone()),
    _ => None,
  })?;
  let (first, rest) = all.split_first()?;
  if rest.iter().any(|xs| xs.len() != first.len()) {
    return None;
  }
  let ret = (0..first.len())
    .map(|idx| {
      let column: Vec<_> = all.iter().map(|xs| xs[idx]).collect();
      tys.union(column)
    })
    .collect();
  Some(ret)
}

/// Returns the record with the fields every bound has. The result is open when some bound is open
/// or has fields the others lack.
pub fn record(tys: &mut MutStore<'_>, ty: Ty) -> Option<Record> {
  let all = shape(tys, ty, |data| match data {
    Data::Record(rec) => Some(rec.clone()),
    _ => None,
  })?;
  let (first, rest) = all.split_first()?;
  if rest.is_empty() {
    return Some(first.clone());
  }
  let common: Vec<Name> = first
    .fields
    .keys()
    .filter(|name| rest.iter().all(|r| r.fields.contains_key(*name)))
    .cloned()
    .collect();
  let open = all.iter().any(|r| r.open || r.fields.len() != common.len());
  let mut fields = BTreeMap::<Name, Ty>::new();
  for name in common {
    let column: Vec<_> = all.iter().filter_map(|r| r.fields.get(&name).copied()).collect();
    let ty = tys.union(column);
    fields.insert(name, ty);
  }
  Some(Record { fields, open })
}

/// Returns the part of every bound, or `None` if some bound lacks it or there are no bounds.
fn shape<F, U>(tys: &mut MutStore<'_>, ty: Ty, f: F) -> Option<Vec<U>>
where
  F: Fn(&Data) -> Option<U>,
{
  let bs = bounds(tys, ty);
  if bs.is_empty() {
    return None;
  }
  let ret: Option<Vec<U>> = bs.into_iter().map(|b| f(tys.data(b))).collect();
  if ret.is_none() {
    log::debug!("no effective shape for {ty:?}");
  }
  ret
}

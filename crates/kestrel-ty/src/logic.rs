//! Logical operations with types: subtyping, least upper bound, greatest lower bound, and
//! difference.
//!
//! Recursive types are handled co-inductively. Subtyping resolves back references against the
//! binders it has passed through, so it only needs to read the store. The other operations unfold
//! recursive types by substitution, so every type they look at is closed.

use crate::{Data, MutStore, Prim, Record, Ty, Tys};
use always::always;
use kestrel_tree::Name;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

/// Returns whether every value of `sub` is a value of `sup`.
pub fn is_subtype<T>(tys: &T, sup: Ty, sub: Ty) -> bool
where
  T: Tys + ?Sized,
{
  subtype(tys, Mode::Plain, sup, sub)
}

/// How lenient subtyping is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
  /// Only real subtyping.
  Plain,
  /// Also allow the conversions that happen without being asked for.
  Implicit,
  /// Also allow the conversions that must be asked for.
  Explicit,
}

pub(crate) fn subtype<T>(tys: &T, mode: Mode, sup: Ty, sub: Ty) -> bool
where
  T: Tys + ?Sized,
{
  let mut st = SubSt {
    tys,
    mode,
    assumed: FxHashSet::default(),
    sup_binds: Binds::default(),
    sub_binds: Binds::default(),
  };
  st.go(sup, sub)
}

/// Bindings from the names of recursive types to the recursive types that bind them.
#[derive(Debug, Default)]
struct Binds(Vec<(Name, Ty)>);

impl Binds {
  fn get(&self, name: &Name) -> Option<Ty> {
    self.0.iter().rev().find(|(n, _)| n == name).map(|&(_, t)| t)
  }
}

/// Looks through names and bound back references.
fn expand<T>(tys: &T, binds: &Binds, mut ty: Ty) -> Ty
where
  T: Tys + ?Sized,
{
  loop {
    match tys.data(ty) {
      Data::Named(_, e) => ty = *e,
      Data::Recursive(name, None) => match binds.get(name) {
        Some(t) => ty = t,
        None => return ty,
      },
      _ => return ty,
    }
  }
}

struct SubSt<'a, T: ?Sized> {
  tys: &'a T,
  mode: Mode,
  /// the pairs we are in the middle of checking. meeting one again means we went around a cycle.
  assumed: FxHashSet<(Ty, Ty)>,
  sup_binds: Binds,
  sub_binds: Binds,
}

impl<T> SubSt<'_, T>
where
  T: Tys + ?Sized,
{
  fn go(&mut self, sup: Ty, sub: Ty) -> bool {
    let sup = expand(self.tys, &self.sup_binds, sup);
    let sub = expand(self.tys, &self.sub_binds, sub);
    if sup == sub {
      return true;
    }
    let cyclic = matches!(self.tys.data(sup), Data::Recursive(_, Some(_)))
      || matches!(self.tys.data(sub), Data::Recursive(_, Some(_)));
    if cyclic {
      if !self.assumed.insert((sup, sub)) {
        return true;
      }
      let ret = self.go_cyclic(sup, sub);
      self.assumed.remove(&(sup, sub));
      return ret;
    }
    self.go_structural(sup, sub)
  }

  fn go_cyclic(&mut self, sup: Ty, sub: Ty) -> bool {
    let tys = self.tys;
    if let Data::Recursive(name, Some(body)) = tys.data(sub) {
      self.sub_binds.0.push((name.clone(), sub));
      let ret = self.go(sup, *body);
      self.sub_binds.0.pop();
      return ret;
    }
    if let Data::Recursive(name, Some(body)) = tys.data(sup) {
      self.sup_binds.0.push((name.clone(), sup));
      let ret = self.go(*body, sub);
      self.sup_binds.0.pop();
      return ret;
    }
    always!(false, "not cyclic: {sup:?} {sub:?}");
    false
  }

  /// the subtyping is flipped for params.
  fn go_flipped(&mut self, sup: Ty, sub: Ty) -> bool {
    std::mem::swap(&mut self.sup_binds, &mut self.sub_binds);
    let ret = self.go(sub, sup);
    std::mem::swap(&mut self.sup_binds, &mut self.sub_binds);
    ret
  }

  fn go_structural(&mut self, sup: Ty, sub: Ty) -> bool {
    let tys = self.tys;
    let lenient = self.mode != Mode::Plain;
    match (tys.data(sup), tys.data(sub)) {
      (Data::Prim(Prim::Any), _) => true,
      (_, Data::Union(subs)) => subs.iter().all(|&s| self.go(sup, s)),
      (Data::Union(sups), _) => sups.iter().any(|&s| self.go(s, sub)),
      (&Data::Prim(a), &Data::Prim(b)) => prim_subtype(self.mode, a, b),
      (&Data::List(a), &Data::List(b)) | (&Data::Set(a), &Data::Set(b)) => self.go(a, b),
      // references are invariant.
      (&Data::Reference(a), &Data::Reference(b)) => self.go(a, b) && self.go(b, a),
      (&Data::Set(a), &Data::List(b)) if lenient => self.go(a, b),
      (&Data::Set(a), &Data::Dictionary(k, v)) if lenient => self.accepts_pair(a, k, v),
      (&Data::Dictionary(k, v), &Data::List(b)) if lenient => {
        self.go(k, Ty::INT) && self.go(v, b)
      }
      (&Data::Dictionary(k1, v1), &Data::Dictionary(k2, v2)) => {
        self.go(k1, k2) && self.go(v1, v2)
      }
      (Data::Tuple(xs), Data::Tuple(ys)) => {
        xs.len() == ys.len() && xs.iter().zip(ys).all(|(&x, &y)| self.go(x, y))
      }
      (Data::Record(r1), Data::Record(r2)) => self.record(r1, r2),
      (Data::Function(f), Data::Function(g)) => {
        f.kind == g.kind
          && f.params.len() == g.params.len()
          && match (f.receiver, g.receiver) {
            (None, None) => true,
            (Some(a), Some(b)) => self.go_flipped(a, b),
            (None, Some(_)) | (Some(_), None) => false,
          }
          && f.params.iter().zip(&g.params).all(|(&a, &b)| self.go_flipped(a, b))
          && self.go(f.ret, g.ret)
      }
      _ => false,
    }
  }

  fn record(&mut self, sup: &Record, sub: &Record) -> bool {
    if sub.open && !sup.open {
      return false;
    }
    if !sup.open && sup.fields.len() != sub.fields.len() {
      return false;
    }
    sup.fields.iter().all(|(name, &a)| match sub.fields.get(name) {
      None => false,
      Some(&b) => self.go(a, b),
    })
  }

  /// whether `sup` accepts the pairs `(k, v)`.
  fn accepts_pair(&mut self, sup: Ty, k: Ty, v: Ty) -> bool {
    let tys = self.tys;
    let sup = expand(tys, &self.sup_binds, sup);
    match tys.data(sup) {
      Data::Prim(Prim::Any) => true,
      &Data::Tuple(ref xs) if xs.len() == 2 => self.go(xs[0], k) && self.go(xs[1], v),
      Data::Union(sups) => sups.iter().any(|&s| self.accepts_pair(s, k, v)),
      _ => false,
    }
  }
}

fn prim_subtype(mode: Mode, sup: Prim, sub: Prim) -> bool {
  if sup == sub {
    return true;
  }
  match (sup, sub) {
    (Prim::Real, Prim::Int) => true,
    // through `int`, since `int` is a subtype of `real`.
    (Prim::Int | Prim::Real, Prim::Char) => mode != Mode::Plain,
    (Prim::Int | Prim::Char, Prim::Real) | (Prim::Char, Prim::Int) => mode == Mode::Explicit,
    _ => false,
  }
}

/// Returns the least type that both x and y are subtypes of.
pub fn lub(tys: &mut MutStore<'_>, x: Ty, y: Ty) -> Ty {
  tys.union([x, y])
}

/// Returns the type that is BOTH x AND y.
///
/// When such a type doesn't exist (like when e.g. x is string and y is int), return the empty
/// union type (aka void).
pub fn glb(tys: &mut MutStore<'_>, x: Ty, y: Ty) -> Ty {
  let mut st = MeetSt::default();
  st.go(tys, x, y)
}

#[derive(Debug, Default)]
struct MeetSt {
  /// the pairs in progress, with the name for the recursive type the result will be if we meet the
  /// pair again, and whether we did.
  in_progress: FxHashMap<(Ty, Ty), (Name, bool)>,
  fresh: usize,
}

impl MeetSt {
  fn go(&mut self, tys: &mut MutStore<'_>, x: Ty, y: Ty) -> Ty {
    let x = expand_named(tys, x);
    let y = expand_named(tys, y);
    // also handles equal types and `any`.
    if is_subtype(&*tys, y, x) {
      return x;
    }
    if is_subtype(&*tys, x, y) {
      return y;
    }
    match (tys.data(x), tys.data(y)) {
      (Data::Union(xs), _) => {
        let xs = xs.clone();
        let parts: Vec<_> = xs.into_iter().map(|x| self.go(tys, x, y)).collect();
        tys.union(parts)
      }
      (_, Data::Union(ys)) => {
        let ys = ys.clone();
        let parts: Vec<_> = ys.into_iter().map(|y| self.go(tys, x, y)).collect();
        tys.union(parts)
      }
      (Data::Recursive(_, Some(_)), _) | (_, Data::Recursive(_, Some(_))) => {
        self.go_cyclic(tys, x, y)
      }
      (&Data::List(a), &Data::List(b)) => {
        let elem = self.go(tys, a, b);
        tys.get(Data::List(elem))
      }
      (&Data::Set(a), &Data::Set(b)) => {
        let elem = self.go(tys, a, b);
        tys.get(Data::Set(elem))
      }
      (&Data::Dictionary(k1, v1), &Data::Dictionary(k2, v2)) => {
        let k = self.go(tys, k1, k2);
        let v = self.go(tys, v1, v2);
        tys.get(Data::Dictionary(k, v))
      }
      (Data::Tuple(xs), Data::Tuple(ys)) => {
        if xs.len() != ys.len() {
          return Ty::VOID;
        }
        let pairs: Vec<_> = xs.iter().copied().zip(ys.iter().copied()).collect();
        let mut elems = Vec::with_capacity(pairs.len());
        for (a, b) in pairs {
          let elem = self.go(tys, a, b);
          if elem == Ty::VOID {
            return Ty::VOID;
          }
          elems.push(elem);
        }
        tys.get(Data::Tuple(elems))
      }
      (Data::Record(r1), Data::Record(r2)) => {
        let (r1, r2) = (r1.clone(), r2.clone());
        self.record(tys, &r1, &r2)
      }
      // references are invariant, and functions only meet when one is a subtype of the other,
      // handled above.
      _ => Ty::VOID,
    }
  }

  fn go_cyclic(&mut self, tys: &mut MutStore<'_>, x: Ty, y: Ty) -> Ty {
    if let Some(entry) = self.in_progress.get_mut(&(x, y)) {
      entry.1 = true;
      let name = entry.0.clone();
      return tys.get(Data::Recursive(name, None));
    }
    let name = Name::new(&format!("X{}", self.fresh));
    self.fresh += 1;
    self.in_progress.insert((x, y), (name, false));
    let x2 = unfold(tys, x);
    let y2 = unfold(tys, y);
    let body = self.go(tys, x2, y2);
    let Some((name, used)) = self.in_progress.remove(&(x, y)) else {
      always!(false, "should still be in progress: {x:?} {y:?}");
      return body;
    };
    if used && body != Ty::VOID { tys.get(Data::Recursive(name, Some(body))) } else { body }
  }

  fn record(&mut self, tys: &mut MutStore<'_>, r1: &Record, r2: &Record) -> Ty {
    if definitely_lacks(r1, r2) || definitely_lacks(r2, r1) {
      return Ty::VOID;
    }
    let mut fields = BTreeMap::<Name, Ty>::new();
    for name in r1.fields.keys().chain(r2.fields.keys()) {
      if fields.contains_key(name) {
        continue;
      }
      let a = r1.fields.get(name).copied().unwrap_or(Ty::ANY);
      let b = r2.fields.get(name).copied().unwrap_or(Ty::ANY);
      let ty = self.go(tys, a, b);
      // a field no value can have means no record can have it either.
      if ty == Ty::VOID {
        return Ty::VOID;
      }
      fields.insert(name.clone(), ty);
    }
    tys.get(Data::Record(Record { fields, open: r1.open && r2.open }))
  }
}

/// returns whether the first record is known to definitely lack w.r.t. the second.
fn definitely_lacks(x: &Record, y: &Record) -> bool {
  !x.open && y.fields.keys().any(|k| !x.fields.contains_key(k))
}

/// Returns the type that is x minus anything in y. That is, the most precise type we know a value
/// of type x has, given that it failed a test for y.
///
/// When such a type doesn't exist (like when x == y), return the empty union type (aka void).
///
/// This is conservative: when the exact answer is not a type we can write, the answer is just x.
pub fn difference(tys: &mut MutStore<'_>, x: Ty, y: Ty) -> Ty {
  let mut visited = FxHashSet::<(Ty, Ty)>::default();
  difference_go(tys, &mut visited, x, y)
}

fn difference_go(
  tys: &mut MutStore<'_>,
  visited: &mut FxHashSet<(Ty, Ty)>,
  x: Ty,
  y: Ty,
) -> Ty {
  let x = expand_named(tys, x);
  let y = expand_named(tys, y);
  if is_subtype(&*tys, y, x) {
    return Ty::VOID;
  }
  match (tys.data(x), tys.data(y)) {
    (Data::Union(xs), _) => {
      // (a || b) - y = (a - y) || (b - y)
      let xs = xs.clone();
      let parts: Vec<_> = xs.into_iter().map(|x| difference_go(tys, visited, x, y)).collect();
      return tys.union(parts);
    }
    (_, Data::Union(ys)) => {
      // x - (a || b) = x - a - b
      let ys = ys.clone();
      return ys.into_iter().fold(x, |ac, y| difference_go(tys, visited, ac, y));
    }
    (Data::Recursive(_, Some(_)), _) | (_, Data::Recursive(_, Some(_))) => {
      if !visited.insert((x, y)) {
        return x;
      }
      let x2 = unfold(tys, x);
      let y2 = unfold(tys, y);
      let ret = difference_go(tys, visited, x2, y2);
      visited.remove(&(x, y));
      // keep the folded form when nothing was taken away.
      return if ret == x2 { x } else { ret };
    }
    _ => {}
  }
  if glb(tys, x, y) == Ty::VOID {
    return x;
  }
  match (tys.data(x), tys.data(y)) {
    (Data::Record(r1), Data::Record(r2)) => {
      let (r1, r2) = (r1.clone(), r2.clone());
      record_difference(tys, visited, &r1, &r2).unwrap_or(x)
    }
    (Data::Tuple(xs), Data::Tuple(ys)) if xs.len() == ys.len() => {
      let (xs, ys) = (xs.clone(), ys.clone());
      let differ: Vec<_> =
        (0..xs.len()).filter(|&idx| !is_subtype(&*tys, ys[idx], xs[idx])).collect();
      let [idx] = differ.as_slice() else { return x };
      let elem = difference_go(tys, visited, xs[*idx], ys[*idx]);
      if elem == Ty::VOID {
        return Ty::VOID;
      }
      let mut elems = xs;
      elems[*idx] = elem;
      tys.get(Data::Tuple(elems))
    }
    // a failed list test may be from any element, so nothing can be said.
    _ => x,
  }
}

/// exact only when the test can only fail because of a single field.
fn record_difference(
  tys: &mut MutStore<'_>,
  visited: &mut FxHashSet<(Ty, Ty)>,
  r1: &Record,
  r2: &Record,
) -> Option<Ty> {
  let same_shape = if r2.open {
    r2.fields.keys().all(|k| r1.fields.contains_key(k))
  } else {
    !r1.open && r1.fields.len() == r2.fields.len() && definitely_has_all(r1, r2)
  };
  if !same_shape {
    return None;
  }
  let differ: Vec<_> = r2
    .fields
    .iter()
    .filter(|&(name, &b)| r1.fields.get(name).is_some_and(|&a| !is_subtype(&*tys, b, a)))
    .map(|(name, &b)| (name.clone(), b))
    .collect();
  let [(name, b)] = differ.as_slice() else { return None };
  let a = r1.fields.get(name).copied()?;
  let field = difference_go(tys, visited, a, *b);
  if field == Ty::VOID {
    return Some(Ty::VOID);
  }
  let mut fields = r1.fields.clone();
  fields.insert(name.clone(), field);
  Some(tys.get(Data::Record(Record { fields, open: r1.open })))
}

fn definitely_has_all(x: &Record, y: &Record) -> bool {
  y.fields.keys().all(|k| x.fields.contains_key(k))
}

/// Looks through names.
pub(crate) fn expand_named<T>(tys: &T, mut ty: Ty) -> Ty
where
  T: Tys + ?Sized,
{
  while let Data::Named(_, e) = tys.data(ty) {
    ty = *e;
  }
  ty
}

/// Unfolds a recursive type one level by putting the whole type in for the back references in its
/// body. Other types are returned as is.
pub fn unfold(tys: &mut MutStore<'_>, ty: Ty) -> Ty {
  let Data::Recursive(name, Some(body)) = tys.data(ty) else { return ty };
  let (name, body) = (name.clone(), *body);
  let mut memo = FxHashMap::<Ty, Ty>::default();
  substitute(tys, &mut memo, body, &name, ty)
}

fn substitute(
  tys: &mut MutStore<'_>,
  memo: &mut FxHashMap<Ty, Ty>,
  ty: Ty,
  name: &Name,
  with: Ty,
) -> Ty {
  if let Some(&ret) = memo.get(&ty) {
    return ret;
  }
  let data = tys.data(ty).clone();
  let ret = match &data {
    Data::Prim(_) => ty,
    Data::Recursive(n, None) => {
      if n == name {
        with
      } else {
        ty
      }
    }
    // shadowed.
    Data::Recursive(n, Some(_)) if n == name => ty,
    _ => {
      let new = map_children(&data, |t| substitute(tys, memo, t, name, with));
      if new == data { ty } else { tys.get(new) }
    }
  };
  memo.insert(ty, ret);
  ret
}

/// Returns the data with every immediate child type mapped.
pub(crate) fn map_children<F>(data: &Data, mut f: F) -> Data
where
  F: FnMut(Ty) -> Ty,
{
  match data {
    Data::Prim(_) | Data::Recursive(_, None) => data.clone(),
    Data::List(t) => Data::List(f(*t)),
    Data::Set(t) => Data::Set(f(*t)),
    Data::Reference(t) => Data::Reference(f(*t)),
    Data::Named(n, t) => Data::Named(n.clone(), f(*t)),
    Data::Recursive(n, Some(t)) => Data::Recursive(n.clone(), Some(f(*t))),
    Data::Dictionary(k, v) => {
      let k = f(*k);
      Data::Dictionary(k, f(*v))
    }
    Data::Tuple(ts) => Data::Tuple(ts.iter().map(|&t| f(t)).collect()),
    Data::Record(r) => Data::Record(Record {
      fields: r.fields.iter().map(|(n, &t)| (n.clone(), f(t))).collect(),
      open: r.open,
    }),
    Data::Union(ts) => Data::Union(ts.iter().map(|&t| f(t)).collect()),
    Data::Function(func) => {
      let receiver = func.receiver.map(&mut f);
      let params = func.params.iter().map(|&t| f(t)).collect();
      let ret = f(func.ret);
      Data::Function(crate::Function { kind: func.kind, receiver, params, ret })
    }
  }
}

#![allow(clippy::disallowed_methods)]

use crate::coerce::{
  Ambiguous, check, is_explicit_coercive_subtype, is_implicit_coercive_subtype,
};
use crate::logic::{difference, glb, is_subtype, lub, unfold};
use crate::{Data, Function, GlobalStore, MutStore, Record, Subst, Ty, Tys as _, effective};
use kestrel_tree::{FunctionKind, Name};
use std::collections::BTreeMap;

fn record(tys: &mut MutStore<'_>, fields: &[(&str, Ty)], open: bool) -> Ty {
  let fields: BTreeMap<_, _> = fields.iter().map(|&(n, t)| (Name::new(n), t)).collect();
  tys.get(Data::Record(Record { fields, open }))
}

/// `X<null|{int data, X next}>`
fn linked_list(tys: &mut MutStore<'_>) -> Ty {
  let back = tys.get(Data::Recursive(Name::new("X"), None));
  let node = record(tys, &[("data", Ty::INT), ("next", back)], false);
  let body = tys.union([Ty::NULL, node]);
  tys.get(Data::Recursive(Name::new("X"), Some(body)))
}

#[test]
fn lattice_laws() {
  let global = GlobalStore::default();
  let mut tys = MutStore::new(&global);
  let samples = [Ty::INT, Ty::REAL, Ty::STRING, Ty::LIST_INT, Ty::NULL];
  for a in samples {
    for b in samples {
      let l = lub(&mut tys, a, b);
      assert!(is_subtype(&tys, l, a));
      assert!(is_subtype(&tys, l, b));
      let g = glb(&mut tys, a, b);
      assert!(is_subtype(&tys, a, g));
      assert!(is_subtype(&tys, b, g));
    }
    assert_eq!(lub(&mut tys, a, a), a);
    assert_eq!(glb(&mut tys, Ty::VOID, a), Ty::VOID);
    assert_eq!(lub(&mut tys, Ty::ANY, a), Ty::ANY);
  }
}

#[test]
fn int_is_real() {
  let global = GlobalStore::default();
  let mut tys = MutStore::new(&global);
  assert!(is_subtype(&tys, Ty::REAL, Ty::INT));
  assert!(!is_subtype(&tys, Ty::INT, Ty::REAL));
  assert_eq!(lub(&mut tys, Ty::INT, Ty::REAL), Ty::REAL);
  assert_eq!(glb(&mut tys, Ty::REAL, Ty::INT), Ty::INT);
  assert_eq!(difference(&mut tys, Ty::REAL, Ty::INT), Ty::REAL);
}

#[test]
fn union_flattening() {
  let global = GlobalStore::default();
  let mut tys = MutStore::new(&global);
  let ab = tys.union([Ty::INT, Ty::STRING]);
  let ab_c = tys.union([ab, Ty::BOOL]);
  let abc = tys.union([Ty::INT, Ty::STRING, Ty::BOOL]);
  assert_eq!(ab_c, abc);
  let Data::Union(parts) = tys.data(abc) else { panic!("not a union") };
  assert!(parts.iter().all(|&t| !matches!(tys.data(t), Data::Union(_))));
  assert_eq!(tys.union([Ty::INT]), Ty::INT);
  assert_eq!(tys.union([]), Ty::VOID);
  assert_eq!(tys.union([Ty::VOID, Ty::CHAR]), Ty::CHAR);
  assert_eq!(tys.union([Ty::STRING, Ty::ANY]), Ty::ANY);
  assert_eq!(tys.union([Ty::INT, Ty::REAL]), Ty::REAL);
}

#[test]
fn narrowing_partition() {
  let global = GlobalStore::default();
  let mut tys = MutStore::new(&global);
  let d = tys.union([Ty::INT, Ty::LIST_INT]);
  let yes = glb(&mut tys, d, Ty::INT);
  let no = difference(&mut tys, d, Ty::INT);
  assert_eq!(yes, Ty::INT);
  assert_eq!(no, Ty::LIST_INT);
  assert_eq!(lub(&mut tys, yes, no), d);
  assert_eq!(difference(&mut tys, d, d), Ty::VOID);
  assert_eq!(difference(&mut tys, Ty::STRING, Ty::INT), Ty::STRING);
}

#[test]
fn record_difference_one_field() {
  let global = GlobalStore::default();
  let mut tys = MutStore::new(&global);
  let int_or_null = tys.union([Ty::INT, Ty::NULL]);
  let x = record(&mut tys, &[("x", Ty::INT), ("y", int_or_null)], false);
  let y = record(&mut tys, &[("x", Ty::INT), ("y", Ty::NULL)], false);
  let want = record(&mut tys, &[("x", Ty::INT), ("y", Ty::INT)], false);
  assert_eq!(glb(&mut tys, x, y), y);
  assert_eq!(difference(&mut tys, x, y), want);
}

#[test]
fn records_open_and_closed() {
  let global = GlobalStore::default();
  let mut tys = MutStore::new(&global);
  let closed = record(&mut tys, &[("x", Ty::INT)], false);
  let open = record(&mut tys, &[("x", Ty::INT)], true);
  let wide = record(&mut tys, &[("x", Ty::INT), ("y", Ty::BOOL)], false);
  assert!(is_subtype(&tys, open, closed));
  assert!(!is_subtype(&tys, closed, open));
  assert!(is_subtype(&tys, open, wide));
  assert!(!is_subtype(&tys, closed, wide));
  assert_eq!(glb(&mut tys, open, wide), wide);
  assert_eq!(glb(&mut tys, closed, wide), Ty::VOID);
}

#[test]
fn effective_shapes() {
  let global = GlobalStore::default();
  let mut tys = MutStore::new(&global);
  let a = record(&mut tys, &[("x", Ty::INT), ("y", Ty::INT)], false);
  let b = record(&mut tys, &[("x", Ty::INT), ("y", Ty::BOOL)], false);
  let c = record(&mut tys, &[("x", Ty::REAL)], false);
  let ab = tys.union([a, b]);
  let rec = effective::record(&mut tys, ab).expect("should be a record");
  assert!(!rec.open);
  let int_or_bool = tys.union([Ty::INT, Ty::BOOL]);
  assert_eq!(rec.fields.get(&Name::new("y")), Some(&int_or_bool));
  let abc = tys.union([a, b, c]);
  let rec = effective::record(&mut tys, abc).expect("should be a record");
  assert!(rec.open);
  assert_eq!(rec.fields.len(), 1);
  assert_eq!(rec.fields.get(&Name::new("x")), Some(&Ty::REAL));
  let list_real = tys.get(Data::List(Ty::REAL));
  let lists = tys.union([Ty::LIST_INT, list_real]);
  assert_eq!(effective::list(&mut tys, lists), Some(Ty::REAL));
  let mixed = tys.union([Ty::LIST_INT, Ty::SET_ANY]);
  assert_eq!(effective::list(&mut tys, mixed), None);
  assert_eq!(effective::set(&mut tys, Ty::VOID), None);
  assert_eq!(effective::dictionary(&mut tys, Ty::DICTIONARY_ANY), Some((Ty::ANY, Ty::ANY)));
}

#[test]
fn recursive() {
  let global = GlobalStore::default();
  let mut tys = MutStore::new(&global);
  let list = linked_list(&mut tys);
  let unfolded = unfold(&mut tys, list);
  assert_ne!(list, unfolded);
  assert!(is_subtype(&tys, list, unfolded));
  assert!(is_subtype(&tys, unfolded, list));
  assert!(is_subtype(&tys, list, Ty::NULL));
  assert!(!is_subtype(&tys, list, Ty::INT));
  assert_eq!(glb(&mut tys, list, Ty::NULL), Ty::NULL);
  let node = difference(&mut tys, list, Ty::NULL);
  assert_eq!(node.display(&tys).to_string(), "{int data, X<null|{int data, X next}> next}");
}

#[test]
fn coercions() {
  let global = GlobalStore::default();
  let mut tys = MutStore::new(&global);
  assert!(!is_subtype(&tys, Ty::INT, Ty::CHAR));
  assert!(is_implicit_coercive_subtype(&tys, Ty::INT, Ty::CHAR));
  assert!(!is_implicit_coercive_subtype(&tys, Ty::INT, Ty::REAL));
  assert!(is_explicit_coercive_subtype(&tys, Ty::INT, Ty::REAL));
  assert!(is_explicit_coercive_subtype(&tys, Ty::CHAR, Ty::INT));
  assert!(is_implicit_coercive_subtype(&tys, Ty::REAL, Ty::CHAR));
  assert!(!is_subtype(&tys, Ty::REAL, Ty::CHAR));
  assert!(is_explicit_coercive_subtype(&tys, Ty::CHAR, Ty::REAL));
  let set_int = tys.get(Data::Set(Ty::INT));
  assert!(is_implicit_coercive_subtype(&tys, set_int, Ty::LIST_INT));
  assert!(!is_subtype(&tys, set_int, Ty::LIST_INT));
  let by_idx = tys.get(Data::Dictionary(Ty::INT, Ty::STRING));
  let strings = tys.get(Data::List(Ty::STRING));
  assert!(is_implicit_coercive_subtype(&tys, by_idx, strings));
}

#[test]
fn ambiguous_coercion() {
  let global = GlobalStore::default();
  let mut tys = MutStore::new(&global);
  let has_x = record(&mut tys, &[("x", Ty::INT)], true);
  let has_y = record(&mut tys, &[("y", Ty::INT)], true);
  let to = tys.union([has_x, has_y]);
  let both = record(&mut tys, &[("x", Ty::INT), ("y", Ty::INT)], false);
  let just_x = record(&mut tys, &[("x", Ty::INT)], false);
  assert_eq!(check(&mut tys, to, both), Err(Ambiguous { to, from: both }));
  assert_eq!(check(&mut tys, to, just_x), Ok(()));
  assert_eq!(check(&mut tys, Ty::INT, Ty::CHAR), Ok(()));
}

#[test]
fn display() {
  let global = GlobalStore::default();
  let mut tys = MutStore::new(&global);
  let d = tys.union([Ty::INT, Ty::LIST_INT]);
  assert_eq!(d.display(&tys).to_string(), "int|[int]");
  let f = tys.get(Data::Function(Function {
    kind: FunctionKind::Function,
    receiver: None,
    params: vec![Ty::INT, Ty::REAL],
    ret: Ty::INT,
  }));
  assert_eq!(f.display(&tys).to_string(), "int(int, real)");
  let maybe = tys.union([Ty::NULL, Ty::INT]);
  let r = tys.get(Data::Reference(maybe));
  assert_eq!(r.display(&tys).to_string(), "&(null|int)");
  let open = record(&mut tys, &[("x", Ty::INT)], true);
  assert_eq!(open.display(&tys).to_string(), "{int x, ...}");
  assert_eq!(Ty::RECORD_ANY.display(&tys).to_string(), "{...}");
  assert_eq!(Ty::DICTIONARY_ANY.display(&tys).to_string(), "{any->any}");
  assert_eq!(Ty::VOID.display(&tys).to_string(), "void");
}

#[test]
fn subst_into_global() {
  let mut global = GlobalStore::default();
  let before = global.0.by_idx.len();
  let mut tys = MutStore::new(&global);
  let mut strings = tys.get(Data::List(Ty::STRING));
  let mut ints = tys.get(Data::List(Ty::INT));
  let local = tys.into_local();
  let subst = Subst::get(&mut global, local).expect("something new");
  strings.apply(&subst);
  ints.apply(&subst);
  assert_eq!(ints, Ty::LIST_INT);
  assert_eq!(global.0.by_idx.len(), before + 1);
  assert_eq!(global.data(strings), &Data::List(Ty::STRING));
}

#[test]
fn subst_nested_local_types() {
  let mut global = GlobalStore::default();
  let mut tys = MutStore::new(&global);
  let strings = tys.get(Data::List(Ty::STRING));
  let mut nested = tys.get(Data::Set(strings));
  let mut maybe = tys.union([Ty::NULL, nested]);
  let local = tys.into_local();
  let subst = Subst::get(&mut global, local).expect("something new");
  nested.apply(&subst);
  maybe.apply(&subst);
  let Data::Set(inner) = global.data(nested).clone() else { panic!("not a set") };
  assert_eq!(global.data(inner), &Data::List(Ty::STRING));
  assert_eq!(global.data(maybe), &Data::Union([Ty::NULL, nested].into_iter().collect()));
}

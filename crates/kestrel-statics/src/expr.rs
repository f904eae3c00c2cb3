//! Propagating types through expressions, bottom up.
//!
//! Expressions the parser could not tell apart are re-tagged here, once the types of their parts
//! are known. Every re-tagged form can itself be propagated again, since loop bodies are
//! propagated until their types stop changing.

use crate::cond;
use crate::env::Env;
use crate::error::{Kind, Shape};
use crate::st::{Result, St};
use kestrel_tree::{
  BinOp, Collection, ExprArena, ExprData, ExprMust, FunctionKind, Name, QualName, Quantifier, UnOp,
  Value,
};
use kestrel_ty::logic::{glb, is_subtype};
use kestrel_ty::{Data, MutStore, Nominal, Record, Ty, coerce, effective};
use std::collections::BTreeMap;

/// What a receiver of `.` or a call turned out to be.
enum Receiver {
  Value(Nominal),
  Module(Name),
  Package(Name),
}

/// Returns the type of the expression, and records it.
#[expect(clippy::too_many_lines)]
pub(crate) fn get(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  env: &Env,
  expr: ExprMust,
) -> Result<Nominal> {
  let ret = match ar[expr].clone() {
    ExprData::Const(v) => Nominal::raw(value_ty(st.tys, &v)),
    ExprData::Name(_) | ExprData::Dot { .. } => match receiver(st, ar, env, expr)? {
      Receiver::Value(ty) => ty,
      Receiver::Module(name) | Receiver::Package(name) => {
        return Err(st.err(expr, Kind::NotAValue(name)));
      }
    },
    ExprData::LocalVar(name) => match env.get(&name) {
      Some(ty) => ty,
      None => return Err(st.err(expr, Kind::Undefined(name))),
    },
    ExprData::ConstantAccess { value, .. } => Nominal::raw(value_ty(st.tys, &value)),
    ExprData::ModuleAccess(name) | ExprData::PackageAccess(name) => {
      return Err(st.err(expr, Kind::NotAValue(name)));
    }
    ExprData::BinOp { lhs, op, rhs } => bin_op(st, ar, env, expr, lhs, op, rhs)?,
    ExprData::UnOp { op: UnOp::Not, .. } | ExprData::Is { .. } => {
      cond::get(st, ar, env.clone(), expr, true)?;
      Nominal::raw(Ty::BOOL)
    }
    ExprData::UnOp { op: UnOp::Neg, inner } => {
      let ty = get(st, ar, env, inner)?;
      Nominal::raw(arith(st, &[(inner, ty)])?)
    }
    ExprData::UnOp { op: UnOp::Invert, inner } => {
      let ty = get(st, ar, env, inner)?;
      st.require_int(inner, ty)?;
      Nominal::raw(Ty::INT)
    }
    ExprData::Comprehension { kind, sources, cond, value } => {
      let mut inner = env.clone();
      for (name, source) in sources {
        let ty = get(st, ar, &inner, source)?;
        let Some(elem) = elem_of(st.tys, ty.expanded) else {
          return Err(st.err(source, Kind::Expected(Shape::Iterable, ty.surface)));
        };
        inner.insert(name, Nominal::raw(elem));
      }
      if let Some(cond) = cond {
        inner = cond::get(st, ar, inner, cond, true)?;
      }
      match kind {
        Quantifier::Some | Quantifier::None => Nominal::raw(Ty::BOOL),
        Quantifier::SetComp | Quantifier::ListComp => {
          let Some(value) = value else {
            return Err(st.err(expr, Kind::Internal("comprehension with no value".to_owned())));
          };
          // the value is only propagated where the condition holds. if it never does, the
          // elements have no type.
          let elem =
            if inner.is_bottom() { Nominal::raw(Ty::VOID) } else { get(st, ar, &inner, value)? };
          let f = if kind == Quantifier::SetComp { Data::Set } else { Data::List };
          lift(st.tys, elem, f)
        }
      }
    }
    ExprData::Convert { ty, inner } => {
      let want = st.resolve_type(Some(expr), &ty)?;
      let got = get(st, ar, env, inner)?;
      if !coerce::is_explicit_coercive_subtype(&*st.tys, want.expanded, got.expanded) {
        return Err(st.err(expr, Kind::Subtype { want: want.surface, got: got.surface }));
      }
      coerce::check(st.tys, want.expanded, got.expanded)
        .map_err(|amb| st.err(expr, Kind::AmbiguousCoercion(amb)))?;
      want
    }
    ExprData::List(elems) => {
      let elem = union_of(st, ar, env, &elems)?;
      lift(st.tys, elem, Data::List)
    }
    ExprData::Set(elems) => {
      let elem = union_of(st, ar, env, &elems)?;
      lift(st.tys, elem, Data::Set)
    }
    ExprData::Dictionary(pairs) => {
      let (keys, vals): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
      let k = union_of(st, ar, env, &keys)?;
      let v = union_of(st, ar, env, &vals)?;
      Nominal {
        surface: st.tys.get(Data::Dictionary(k.surface, v.surface)),
        expanded: st.tys.get(Data::Dictionary(k.expanded, v.expanded)),
      }
    }
    ExprData::Record(fields) => {
      let mut surface = BTreeMap::<Name, Ty>::new();
      let mut expanded = BTreeMap::<Name, Ty>::new();
      for (name, e) in fields {
        let ty = get(st, ar, env, e)?;
        if expanded.insert(name.clone(), ty.expanded).is_some() {
          return Err(st.err(e, Kind::DuplicateField(name)));
        }
        surface.insert(name, ty.surface);
      }
      Nominal {
        surface: st.tys.get(Data::Record(Record { fields: surface, open: false })),
        expanded: st.tys.get(Data::Record(Record { fields: expanded, open: false })),
      }
    }
    ExprData::Tuple(elems) => {
      let tys = elems.iter().map(|&e| get(st, ar, env, e)).collect::<Result<Vec<_>>>()?;
      Nominal {
        surface: st.tys.get(Data::Tuple(tys.iter().map(|t| t.surface).collect())),
        expanded: st.tys.get(Data::Tuple(tys.iter().map(|t| t.expanded).collect())),
      }
    }
    ExprData::Index { on, idx, .. } => {
      let on_ty = get(st, ar, env, on)?;
      let idx_ty = get(st, ar, env, idx)?;
      let (of, ty) = index(st, expr, on_ty, (idx, idx_ty))?;
      ar[expr] = ExprData::Index { on, idx, of: Some(of) };
      Nominal::raw(ty)
    }
    ExprData::Length { on, .. } => {
      let ty = get(st, ar, env, on)?;
      let Some(of) = collection(st.tys, ty.expanded) else {
        return Err(st.err(on, Kind::Expected(Shape::Sized, ty.surface)));
      };
      ar[expr] = ExprData::Length { on, of: Some(of) };
      Nominal::raw(Ty::INT)
    }
    ExprData::SubList { on, start, end } => {
      let ty = get(st, ar, env, on)?;
      for e in [start, end] {
        let t = get(st, ar, env, e)?;
        st.require_int(e, t)?;
      }
      if is_subtype(&*st.tys, Ty::STRING, ty.expanded) {
        ty
      } else if let Some(elem) = effective::list(st.tys, ty.expanded) {
        Nominal::raw(st.tys.get(Data::List(elem)))
      } else {
        return Err(st.err(on, Kind::Expected(Shape::List, ty.surface)));
      }
    }
    ExprData::RecordAccess { on, field } => {
      let ty = get(st, ar, env, on)?;
      field_of(st, expr, ty, &field)?
    }
    ExprData::Invoke { receiver: recv, name, args } => {
      let arg_tys = args.iter().map(|&e| get(st, ar, env, e)).collect::<Result<Vec<_>>>()?;
      match recv {
        None => match env.get(&name) {
          Some(local) => {
            let func = ar.alloc(ExprData::LocalVar(name));
            st.insert_expr_ty(func, local);
            indirect(st, ar, expr, func, local, args, &arg_tys)?
          }
          None => direct(st, ar, expr, &name, None, args, &arg_tys)?,
        },
        Some(on) => match receiver(st, ar, env, on)? {
          Receiver::Module(module) => direct(st, ar, expr, &name, Some(&module), args, &arg_tys)?,
          Receiver::Package(package) => return Err(st.err(on, Kind::NotAValue(package))),
          Receiver::Value(ty) => {
            let field_ty = field_of(st, expr, ty, &name)?;
            let func = ar.alloc(ExprData::RecordAccess { on, field: name });
            st.insert_expr_ty(func, field_ty);
            indirect(st, ar, expr, func, field_ty, args, &arg_tys)?
          }
        },
      }
    }
    ExprData::FunctionCall { name, args } | ExprData::MethodCall { name, args } => {
      let arg_tys = args.iter().map(|&e| get(st, ar, env, e)).collect::<Result<Vec<_>>>()?;
      direct(st, ar, expr, &name.name, Some(&name.module), args, &arg_tys)?
    }
    ExprData::IndirectFunctionCall { func, args } | ExprData::IndirectMethodCall { func, args } => {
      let func_ty = get(st, ar, env, func)?;
      let arg_tys = args.iter().map(|&e| get(st, ar, env, e)).collect::<Result<Vec<_>>>()?;
      indirect(st, ar, expr, func, func_ty, args, &arg_tys)?
    }
    ExprData::FunctionRef(name) => {
      let (qual, ty) = st
        .resolver
        .resolve_function_ref(st.tys, &name, None, &st.imports)
        .map_err(|e| st.err(expr, e.into()))?;
      ar[expr] = ExprData::Function(qual);
      ty
    }
    ExprData::Function(qual) => {
      let (_, ty) = st
        .resolver
        .resolve_function_ref(st.tys, &qual.name, Some(&qual.module), &st.imports)
        .map_err(|e| st.err(expr, e.into()))?;
      ty
    }
    ExprData::Deref(inner) => {
      let ty = get(st, ar, env, inner)?;
      match effective::reference(st.tys, ty.expanded) {
        Some(elem) => Nominal::raw(elem),
        None => return Err(st.err(inner, Kind::Expected(Shape::Reference, ty.surface))),
      }
    }
    ExprData::New(inner) => {
      let ty = get(st, ar, env, inner)?;
      lift(st.tys, ty, Data::Reference)
    }
  };
  st.insert_expr_ty(expr, ret);
  Ok(ret)
}

/// Resolves a name or a chain of `.`, which may be a module or package, not a value.
fn receiver(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  env: &Env,
  expr: ExprMust,
) -> Result<Receiver> {
  let ret = match ar[expr].clone() {
    ExprData::Name(name) => {
      if let Some(ty) = env.get(&name) {
        ar[expr] = ExprData::LocalVar(name);
        Receiver::Value(ty)
      } else if let Ok(qual) = st.resolver.resolve_name(&name, &st.imports) {
        let value = st.resolver.resolve_constant(&qual).map_err(|e| st.err(expr, e.into()))?;
        let ty = value_ty(st.tys, &value);
        log::debug!("`{name}` is the constant `{qual}`");
        ar[expr] = ExprData::ConstantAccess { name: qual, value };
        Receiver::Value(Nominal::raw(ty))
      } else if let Ok(module) = st.resolver.resolve_module(&name, &st.imports) {
        ar[expr] = ExprData::ModuleAccess(module.clone());
        Receiver::Module(module)
      } else if st.resolver.is_package(&name) {
        ar[expr] = ExprData::PackageAccess(name.clone());
        Receiver::Package(name)
      } else {
        return Err(st.err(expr, Kind::Undefined(name)));
      }
    }
    ExprData::ModuleAccess(name) => Receiver::Module(name),
    ExprData::PackageAccess(name) => Receiver::Package(name),
    ExprData::Dot { on, field } => match receiver(st, ar, env, on)? {
      Receiver::Package(package) => {
        let name = Name::new(&format!("{package}::{field}"));
        let module = st
          .resolver
          .resolve_module(&name, &st.imports)
          .map_err(|e| st.err(expr, e.into()))?;
        ar[expr] = ExprData::ModuleAccess(module.clone());
        Receiver::Module(module)
      }
      Receiver::Module(module) => {
        let qual = QualName { module, name: field };
        let value = st.resolver.resolve_constant(&qual).map_err(|e| st.err(expr, e.into()))?;
        let ty = value_ty(st.tys, &value);
        ar[expr] = ExprData::ConstantAccess { name: qual, value };
        Receiver::Value(Nominal::raw(ty))
      }
      Receiver::Value(ty) => {
        let ty = field_of(st, expr, ty, &field)?;
        ar[expr] = ExprData::RecordAccess { on, field };
        Receiver::Value(ty)
      }
    },
    _ => return get(st, ar, env, expr).map(Receiver::Value),
  };
  if let Receiver::Value(ty) = ret {
    st.insert_expr_ty(expr, ty);
  }
  Ok(ret)
}

#[expect(clippy::too_many_lines)]
fn bin_op(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  env: &Env,
  expr: ExprMust,
  lhs: ExprMust,
  op: BinOp,
  rhs: ExprMust,
) -> Result<Nominal> {
  // the right side of a short-circuiting op only runs when the left side says so.
  if matches!(op, BinOp::And | BinOp::Or) {
    let sign = op == BinOp::And;
    let after = cond::get(st, ar, env.clone(), lhs, sign)?;
    if !after.is_bottom() {
      let ty = get(st, ar, &after, rhs)?;
      st.require(rhs, Nominal::raw(Ty::BOOL), ty)?;
    }
    return Ok(Nominal::raw(Ty::BOOL));
  }
  let l = get(st, ar, env, lhs)?;
  let r = get(st, ar, env, rhs)?;
  let retag = |ar: &mut ExprArena, new: BinOp| {
    if new != op {
      log::debug!("re-tagging {op:?} as {new:?}");
      ar[expr] = ExprData::BinOp { lhs, op: new, rhs };
    }
  };
  let any_string =
    is_subtype(&*st.tys, Ty::STRING, l.expanded) || is_subtype(&*st.tys, Ty::STRING, r.expanded);
  let set_elems = sets(st, l, r);
  let ret = match op {
    BinOp::StringAppend => Ty::STRING,
    BinOp::Add if any_string => {
      retag(ar, BinOp::StringAppend);
      Ty::STRING
    }
    BinOp::Add | BinOp::ListAppend => {
      let ls = effective::list(st.tys, l.expanded);
      let rs = effective::list(st.tys, r.expanded);
      match (ls, rs, set_elems) {
        (Some(a), Some(b), _) => {
          retag(ar, BinOp::ListAppend);
          let elem = st.tys.union([a, b]);
          st.tys.get(Data::List(elem))
        }
        _ if op == BinOp::ListAppend => {
          return Err(st.err(expr, Kind::Expected(Shape::List, l.surface)));
        }
        (_, _, Some((a, b))) => {
          retag(ar, BinOp::Union);
          let elem = st.tys.union([a, b]);
          st.tys.get(Data::Set(elem))
        }
        _ => arith(st, &[(lhs, l), (rhs, r)])?,
      }
    }
    BinOp::Union | BinOp::Intersection | BinOp::Difference => {
      let Some((a, b)) = set_elems else {
        return Err(st.err(expr, Kind::Expected(Shape::Set, l.surface)));
      };
      let elem = match op {
        BinOp::Union => st.tys.union([a, b]),
        BinOp::Intersection => glb(st.tys, a, b),
        _ => a,
      };
      st.tys.get(Data::Set(elem))
    }
    BinOp::Sub | BinOp::BitAnd if set_elems.is_some() => {
      let new = if op == BinOp::Sub { BinOp::Difference } else { BinOp::Intersection };
      retag(ar, new);
      return bin_op(st, ar, env, expr, lhs, new, rhs);
    }
    BinOp::Sub | BinOp::Mul | BinOp::Div => arith(st, &[(lhs, l), (rhs, r)])?,
    BinOp::Rem | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => {
      st.require_int(lhs, l)?;
      st.require_int(rhs, r)?;
      Ty::INT
    }
    BinOp::Range => {
      st.require_int(lhs, l)?;
      st.require_int(rhs, r)?;
      Ty::LIST_INT
    }
    BinOp::Eq | BinOp::Neq => Ty::BOOL,
    BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq => {
      arith(st, &[(lhs, l), (rhs, r)])?;
      Ty::BOOL
    }
    BinOp::Xor => {
      st.require(lhs, Nominal::raw(Ty::BOOL), l)?;
      st.require(rhs, Nominal::raw(Ty::BOOL), r)?;
      Ty::BOOL
    }
    BinOp::ElementOf => {
      let elem = match effective::list(st.tys, r.expanded) {
        Some(elem) => elem,
        None => match effective::set(st.tys, r.expanded) {
          Some(elem) => elem,
          None => return Err(st.err(rhs, Kind::Expected(Shape::List, r.surface))),
        },
      };
      st.require(lhs, Nominal::raw(elem), l)?;
      Ty::BOOL
    }
    BinOp::Subset | BinOp::SubsetEq => {
      if set_elems.is_none() {
        return Err(st.err(expr, Kind::Expected(Shape::Set, l.surface)));
      }
      Ty::BOOL
    }
    BinOp::And | BinOp::Or => Ty::BOOL,
  };
  Ok(Nominal::raw(ret))
}

/// The element types when both sides are sets.
fn sets(st: &mut St<'_, '_>, l: Nominal, r: Nominal) -> Option<(Ty, Ty)> {
  let a = effective::set(st.tys, l.expanded)?;
  let b = effective::set(st.tys, r.expanded)?;
  Some((a, b))
}

/// Arithmetic on chars and ints gives ints. Anything with a real gives a real.
fn arith(st: &mut St<'_, '_>, operands: &[(ExprMust, Nominal)]) -> Result<Ty> {
  let mut all_int = true;
  for &(e, ty) in operands {
    if !coerce::is_implicit_coercive_subtype(&*st.tys, Ty::REAL, ty.expanded) {
      return Err(st.err(e, Kind::Expected(Shape::Number, ty.surface)));
    }
    all_int &= coerce::is_implicit_coercive_subtype(&*st.tys, Ty::INT, ty.expanded);
  }
  Ok(if all_int { Ty::INT } else { Ty::REAL })
}

fn index(
  st: &mut St<'_, '_>,
  expr: ExprMust,
  on: Nominal,
  (idx, idx_ty): (ExprMust, Nominal),
) -> Result<(Collection, Ty)> {
  if is_subtype(&*st.tys, Ty::STRING, on.expanded) {
    st.require_int(idx, idx_ty)?;
    return Ok((Collection::String, Ty::CHAR));
  }
  if let Some(elem) = effective::list(st.tys, on.expanded) {
    st.require_int(idx, idx_ty)?;
    return Ok((Collection::List, elem));
  }
  if let Some((k, v)) = effective::dictionary(st.tys, on.expanded) {
    st.require(idx, Nominal::raw(k), idx_ty)?;
    return Ok((Collection::Dictionary, v));
  }
  Err(st.err(expr, Kind::Expected(Shape::Indexable, on.surface)))
}

/// Which kind of collection the type is, if any.
pub(crate) fn collection(tys: &mut MutStore<'_>, ty: Ty) -> Option<Collection> {
  if is_subtype(&*tys, Ty::STRING, ty) {
    Some(Collection::String)
  } else if effective::list(tys, ty).is_some() {
    Some(Collection::List)
  } else if effective::set(tys, ty).is_some() {
    Some(Collection::Set)
  } else if effective::dictionary(tys, ty).is_some() {
    Some(Collection::Dictionary)
  } else {
    None
  }
}

/// The type of each element when iterating over a value of this type. Iterating over a dictionary
/// gives key-value pairs.
pub(crate) fn elem_of(tys: &mut MutStore<'_>, ty: Ty) -> Option<Ty> {
  if is_subtype(&*tys, Ty::STRING, ty) {
    return Some(Ty::CHAR);
  }
  if let Some(elem) = effective::list(tys, ty) {
    return Some(elem);
  }
  if let Some(elem) = effective::set(tys, ty) {
    return Some(elem);
  }
  let (k, v) = effective::dictionary(tys, ty)?;
  Some(tys.get(Data::Tuple(vec![k, v])))
}

fn field_of(st: &mut St<'_, '_>, expr: ExprMust, on: Nominal, field: &Name) -> Result<Nominal> {
  let Some(rec) = effective::record(st.tys, on.expanded) else {
    return Err(st.err(expr, Kind::Expected(Shape::Record, on.surface)));
  };
  match rec.fields.get(field) {
    Some(&ty) => Ok(Nominal::raw(ty)),
    None => Err(st.err(expr, Kind::MissingField(field.clone(), on.surface))),
  }
}

/// A call through a value of function type.
fn indirect(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  expr: ExprMust,
  func: ExprMust,
  func_ty: Nominal,
  args: Vec<ExprMust>,
  arg_tys: &[Nominal],
) -> Result<Nominal> {
  let Some(f) = effective::function(st.tys, func_ty.expanded) else {
    return Err(st.err(func, Kind::Expected(Shape::Function, func_ty.surface)));
  };
  check_args(st, expr, &f.params, &args, arg_tys)?;
  ar[expr] = match f.kind {
    FunctionKind::Function => ExprData::IndirectFunctionCall { func, args },
    FunctionKind::Method => ExprData::IndirectMethodCall { func, args },
  };
  Ok(Nominal::raw(f.ret))
}

/// A call to a function or method by name.
fn direct(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  expr: ExprMust,
  name: &Name,
  module: Option<&Name>,
  args: Vec<ExprMust>,
  arg_tys: &[Nominal],
) -> Result<Nominal> {
  let expanded: Vec<_> = arg_tys.iter().map(|t| t.expanded).collect();
  let (qual, ty) = st
    .resolver
    .resolve_function(st.tys, name, module, &expanded, &st.imports)
    .map_err(|e| st.err(expr, e.into()))?;
  let Some(f) = effective::function(st.tys, ty.expanded) else {
    return Err(st.err(expr, Kind::Internal(format!("`{qual}` resolved to a non-function"))));
  };
  check_args(st, expr, &f.params, &args, arg_tys)?;
  let surface = match st.tys.data(ty.surface) {
    Data::Function(sf) => sf.ret,
    _ => f.ret,
  };
  ar[expr] = match f.kind {
    FunctionKind::Function => ExprData::FunctionCall { name: qual, args },
    FunctionKind::Method => ExprData::MethodCall { name: qual, args },
  };
  Ok(Nominal { surface, expanded: f.ret })
}

fn check_args(
  st: &mut St<'_, '_>,
  expr: ExprMust,
  params: &[Ty],
  args: &[ExprMust],
  arg_tys: &[Nominal],
) -> Result<()> {
  if params.len() != args.len() {
    return Err(st.err(expr, Kind::ArityMismatch { want: params.len(), got: args.len() }));
  }
  for ((&param, &arg), &arg_ty) in params.iter().zip(args).zip(arg_tys) {
    st.require_unambiguous(arg, Nominal::raw(param), arg_ty)?;
  }
  Ok(())
}

/// The union of the types of the expressions. Void when there are none.
fn union_of(
  st: &mut St<'_, '_>,
  ar: &mut ExprArena,
  env: &Env,
  exprs: &[ExprMust],
) -> Result<Nominal> {
  let tys = exprs.iter().map(|&e| get(st, ar, env, e)).collect::<Result<Vec<_>>>()?;
  Ok(Nominal {
    surface: st.tys.union(tys.iter().map(|t| t.surface)),
    expanded: st.tys.union(tys.iter().map(|t| t.expanded)),
  })
}

fn lift(tys: &mut MutStore<'_>, elem: Nominal, f: fn(Ty) -> Data) -> Nominal {
  Nominal { surface: tys.get(f(elem.surface)), expanded: tys.get(f(elem.expanded)) }
}

/// The type of a constant value.
pub(crate) fn value_ty(tys: &mut MutStore<'_>, value: &Value) -> Ty {
  match value {
    Value::Null => Ty::NULL,
    Value::Bool(_) => Ty::BOOL,
    Value::Int(_) => Ty::INT,
    Value::Real(_) => Ty::REAL,
    Value::Char(_) => Ty::CHAR,
    Value::String(_) => Ty::STRING,
    Value::List(vs) => {
      let elem = values_ty(tys, vs);
      tys.get(Data::List(elem))
    }
    Value::Set(vs) => {
      let elem = values_ty(tys, vs);
      tys.get(Data::Set(elem))
    }
    Value::Tuple(vs) => {
      let elems = vs.iter().map(|v| value_ty(tys, v)).collect();
      tys.get(Data::Tuple(elems))
    }
    Value::Record(fields) => {
      let fields = fields.iter().map(|(name, v)| (name.clone(), value_ty(tys, v))).collect();
      tys.get(Data::Record(Record { fields, open: false }))
    }
    Value::Dictionary(pairs) => {
      let k = values_ty(tys, pairs.keys());
      let v = values_ty(tys, pairs.values());
      tys.get(Data::Dictionary(k, v))
    }
  }
}

fn values_ty<'v, I>(tys: &mut MutStore<'_>, values: I) -> Ty
where
  I: IntoIterator<Item = &'v Value>,
{
  let parts: Vec<_> = values.into_iter().map(|v| value_ty(tys, v)).collect();
  tys.union(parts)
}

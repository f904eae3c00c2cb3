//! Display types the way they are written in source.

use crate::{Data, Function, Nominal, Prim, Ty, Tys};
use kestrel_tree::FunctionKind;
use std::fmt;

impl Ty {
  /// Displays a type.
  #[must_use]
  pub fn display<'a, T>(self, tys: &'a T) -> impl fmt::Display + 'a
  where
    T: Tys + ?Sized,
  {
    TyDisplay { ty: self, prec: Prec::Min, tys }
  }
}

impl Nominal {
  /// Displays the surface form, as the user wrote it.
  #[must_use]
  pub fn display<'a, T>(self, tys: &'a T) -> impl fmt::Display + 'a
  where
    T: Tys + ?Sized,
  {
    self.surface.display(tys)
  }
}

struct TyDisplay<'a, T: ?Sized> {
  ty: Ty,
  prec: Prec,
  tys: &'a T,
}

impl<'a, T> TyDisplay<'a, T>
where
  T: Tys + ?Sized,
{
  fn with(&self, ty: Ty, prec: Prec) -> TyDisplay<'a, T> {
    TyDisplay { ty, prec, tys: self.tys }
  }
}

impl<T> fmt::Display for TyDisplay<'_, T>
where
  T: Tys + ?Sized,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.tys.data(self.ty) {
      Data::Prim(prim) => f.write_str(match prim {
        Prim::Any => "any",
        Prim::Null => "null",
        Prim::Bool => "bool",
        Prim::Int => "int",
        Prim::Real => "real",
        Prim::Char => "char",
        Prim::String => "string",
      }),
      Data::List(elem) => write!(f, "[{}]", self.with(*elem, Prec::Min)),
      Data::Set(elem) => write!(f, "{{{}}}", self.with(*elem, Prec::Min)),
      Data::Dictionary(k, v) => {
        write!(f, "{{{}->{}}}", self.with(*k, Prec::Min), self.with(*v, Prec::Min))
      }
      Data::Tuple(elems) => {
        f.write_str("(")?;
        sep_by(f, ", ", elems.iter().map(|&t| self.with(t, Prec::Min)))?;
        f.write_str(")")
      }
      Data::Record(rec) => {
        f.write_str("{")?;
        let fields = rec.fields.iter().map(|(name, &t)| FieldDisplay {
          name: name.as_str(),
          ty: self.with(t, Prec::Min),
        });
        sep_by(f, ", ", fields)?;
        if rec.open {
          if !rec.fields.is_empty() {
            f.write_str(", ")?;
          }
          f.write_str("...")?;
        }
        f.write_str("}")
      }
      Data::Union(parts) => {
        if parts.is_empty() {
          return f.write_str("void");
        }
        let needs_paren = self.prec > Prec::Union;
        if needs_paren {
          f.write_str("(")?;
        }
        sep_by(f, "|", parts.iter().map(|&t| self.with(t, Prec::Union)))?;
        if needs_paren {
          f.write_str(")")?;
        }
        Ok(())
      }
      Data::Reference(elem) => write!(f, "&{}", self.with(*elem, Prec::Prefix)),
      Data::Function(func) => self.function(f, func),
      Data::Named(name, _) | Data::Recursive(name, None) => write!(f, "{name}"),
      Data::Recursive(name, Some(body)) => write!(f, "{name}<{}>", self.with(*body, Prec::Min)),
    }
  }
}

impl<T> TyDisplay<'_, T>
where
  T: Tys + ?Sized,
{
  fn function(&self, f: &mut fmt::Formatter<'_>, func: &Function) -> fmt::Result {
    let needs_paren = self.prec > Prec::Min;
    if needs_paren {
      f.write_str("(")?;
    }
    write!(f, "{}", self.with(func.ret, Prec::Prefix))?;
    if func.kind == FunctionKind::Method {
      f.write_str("::")?;
    }
    f.write_str("(")?;
    sep_by(f, ", ", func.params.iter().map(|&t| self.with(t, Prec::Min)))?;
    f.write_str(")")?;
    if needs_paren {
      f.write_str(")")?;
    }
    Ok(())
  }
}

struct FieldDisplay<'a, D> {
  name: &'a str,
  ty: D,
}

impl<D> fmt::Display for FieldDisplay<'_, D>
where
  D: fmt::Display,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.ty, self.name)
  }
}

fn sep_by<I>(f: &mut fmt::Formatter<'_>, sep: &str, iter: I) -> fmt::Result
where
  I: IntoIterator,
  I::Item: fmt::Display,
{
  let mut first = true;
  for x in iter {
    if first {
      first = false;
    } else {
      f.write_str(sep)?;
    }
    write!(f, "{x}")?;
  }
  Ok(())
}

/// Precedence when printing a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
  Min,
  Union,
  Prefix,
}

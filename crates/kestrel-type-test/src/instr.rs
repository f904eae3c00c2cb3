//! Abstract instructions for a stack machine, and runtime representations.

use kestrel_tree::Name;
use kestrel_ty::{Data, Prim, Subst, Ty, Tys};
use std::fmt;

/// A jump target. Numbered from zero in each compiled test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label(pub(crate) u32);

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "L{}", self.0)
  }
}

/// How a value of a type is represented at runtime, which decides the tag a tag check looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Repr {
  /// Nothing. No value has this.
  Void,
  /// The null value.
  Null,
  /// A boolean.
  Bool,
  /// A number. Ints and reals share this, since an int is a real with no fractional part.
  Number,
  /// A character.
  Char,
  /// A string.
  String,
  /// A list.
  List,
  /// A set.
  Set,
  /// A dictionary.
  Dictionary,
  /// A tuple with this many elements.
  Tuple(usize),
  /// A record.
  Record,
  /// A reference to a mutable cell.
  Reference,
  /// A function or method.
  Function,
  /// Anything. Used for slots holding values of more than one representation.
  Object,
}

impl Repr {
  /// Returns the representation for values of the type.
  pub fn of<T>(tys: &T, ty: Ty) -> Self
  where
    T: Tys + ?Sized,
  {
    match tys.data(ty) {
      Data::Prim(prim) => match prim {
        Prim::Any => Repr::Object,
        Prim::Null => Repr::Null,
        Prim::Bool => Repr::Bool,
        Prim::Int | Prim::Real => Repr::Number,
        Prim::Char => Repr::Char,
        Prim::String => Repr::String,
      },
      Data::List(_) => Repr::List,
      Data::Set(_) => Repr::Set,
      Data::Dictionary(_, _) => Repr::Dictionary,
      Data::Tuple(elems) => Repr::Tuple(elems.len()),
      Data::Record(_) => Repr::Record,
      Data::Reference(_) => Repr::Reference,
      Data::Function(_) => Repr::Function,
      Data::Named(_, ty) | Data::Recursive(_, Some(ty)) => Repr::of(tys, *ty),
      Data::Recursive(_, None) => Repr::Object,
      Data::Union(parts) => {
        let mut iter = parts.iter().map(|&t| Repr::of(tys, t));
        let Some(first) = iter.next() else { return Repr::Void };
        if iter.all(|r| r == first) { first } else { Repr::Object }
      }
    }
  }
}

impl fmt::Display for Repr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Repr::Void => f.write_str("void"),
      Repr::Null => f.write_str("null"),
      Repr::Bool => f.write_str("bool"),
      Repr::Number => f.write_str("number"),
      Repr::Char => f.write_str("char"),
      Repr::String => f.write_str("string"),
      Repr::List => f.write_str("list"),
      Repr::Set => f.write_str("set"),
      Repr::Dictionary => f.write_str("dictionary"),
      Repr::Tuple(n) => write!(f, "tuple/{n}"),
      Repr::Record => f.write_str("record"),
      Repr::Reference => f.write_str("reference"),
      Repr::Function => f.write_str("function"),
      Repr::Object => f.write_str("object"),
    }
  }
}

/// A runtime helper called on the value on top of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
  /// Pops a number and pushes whether it has no fractional part.
  IsIntegral,
  /// Pops a list, set or dictionary and pushes whether it is empty.
  IsEmpty,
  /// Pops a non-empty list and pushes its first element.
  First,
  /// Pops a non-empty set and pushes one of its elements.
  AnyElement,
  /// Pops a non-empty dictionary and pushes one of its entries, as a key-value tuple.
  AnyEntry,
  /// Pops a tuple and pushes the element at the index.
  Element(usize),
}

impl fmt::Display for Intrinsic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Intrinsic::IsIntegral => f.write_str("is_integral"),
      Intrinsic::IsEmpty => f.write_str("is_empty"),
      Intrinsic::First => f.write_str("first"),
      Intrinsic::AnyElement => f.write_str("any_element"),
      Intrinsic::AnyEntry => f.write_str("any_entry"),
      Intrinsic::Element(n) => write!(f, "element {n}"),
    }
  }
}

/// An instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
  /// Pushes a copy of the top of the stack.
  Dup,
  /// Pops and discards the top of the stack.
  Pop,
  /// Pops a value and pushes whether it has the representation.
  IsTag(Repr),
  /// Pops a record and pushes whether it has the field.
  HasField(Name),
  /// Pops a record and pushes whether it has exactly this many fields.
  FieldCountIs(usize),
  /// Pops a record and pushes the value of the field.
  GetField(Name),
  /// Calls a runtime helper.
  Call(Intrinsic),
  /// Pops a boolean and jumps if it is true.
  IfTrue(Label),
  /// Pops a boolean and jumps if it is false.
  IfFalse(Label),
  /// Jumps.
  Goto(Label),
  /// Marks a jump target.
  Label(Label),
  /// Pushes the value of the local.
  Load(Name),
  /// Pops a value, converts it to the type, and stores it in the local.
  Store {
    /// The local.
    local: Name,
    /// The type the value is now known to have.
    ty: Ty,
    /// How the local holds it.
    repr: Repr,
  },
}

impl Instr {
  fn apply(&mut self, subst: &Subst) {
    if let Instr::Store { ty, .. } = self {
      ty.apply(subst);
    }
  }
}

/// A compiled type test.
///
/// On entry the tested value is on top of the stack. It is consumed either way: on success the code
/// jumps to `success`, on failure it falls off the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
  /// The instructions.
  pub code: Vec<Instr>,
  /// Where the code jumps when the test passes.
  pub success: Label,
}

impl Compiled {
  /// Apply a subst.
  pub fn apply(&mut self, subst: &Subst) {
    for instr in &mut self.code {
      instr.apply(subst);
    }
  }

  /// Returns a display of the code, one instruction per line.
  #[must_use]
  pub fn display<'a, T>(&'a self, tys: &'a T) -> impl fmt::Display + 'a
  where
    T: Tys + ?Sized,
  {
    CompiledDisplay { compiled: self, tys }
  }
}

struct CompiledDisplay<'a, T: ?Sized> {
  compiled: &'a Compiled,
  tys: &'a T,
}

impl<T> fmt::Display for CompiledDisplay<'_, T>
where
  T: Tys + ?Sized,
{
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for instr in &self.compiled.code {
      match instr {
        Instr::Dup => f.write_str("  dup")?,
        Instr::Pop => f.write_str("  pop")?,
        Instr::IsTag(repr) => write!(f, "  is_tag {repr}")?,
        Instr::HasField(name) => write!(f, "  has_field {name}")?,
        Instr::FieldCountIs(n) => write!(f, "  field_count_is {n}")?,
        Instr::GetField(name) => write!(f, "  get_field {name}")?,
        Instr::Call(intrinsic) => write!(f, "  call {intrinsic}")?,
        Instr::IfTrue(label) => write!(f, "  if_true {label}")?,
        Instr::IfFalse(label) => write!(f, "  if_false {label}")?,
        Instr::Goto(label) => write!(f, "  goto {label}")?,
        Instr::Label(label) => write!(f, "{label}:")?,
        Instr::Load(name) => write!(f, "  load {name}")?,
        Instr::Store { local, ty, repr } => {
          write!(f, "  store {local} as {} ({repr})", ty.display(self.tys))?;
        }
      }
      writeln!(f)?;
    }
    write!(f, "success = {}", self.compiled.success)
  }
}

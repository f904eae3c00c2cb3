//! Build some ty-related things.

use quote::{format_ident as i, quote as q};

fn main() {
  let things = [
    (i!("ANY"), q!(Data::Prim(Prim::Any))),
    (i!("NULL"), q!(Data::Prim(Prim::Null))),
    (i!("BOOL"), q!(Data::Prim(Prim::Bool))),
    (i!("INT"), q!(Data::Prim(Prim::Int))),
    (i!("REAL"), q!(Data::Prim(Prim::Real))),
    (i!("CHAR"), q!(Data::Prim(Prim::Char))),
    (i!("STRING"), q!(Data::Prim(Prim::String))),
    (i!("VOID"), q!(Data::Union(BTreeSet::new()))),
    (i!("LIST_ANY"), q!(Data::List(Ty::ANY))),
    (i!("LIST_INT"), q!(Data::List(Ty::INT))),
    (i!("SET_ANY"), q!(Data::Set(Ty::ANY))),
    (i!("DICTIONARY_ANY"), q!(Data::Dictionary(Ty::ANY, Ty::ANY))),
    (i!("RECORD_ANY"), q!(Data::Record(Record { fields: BTreeMap::new(), open: true }))),
    (i!("REFERENCE_ANY"), q!(Data::Reference(Ty::ANY))),
  ];
  let impl_ty_const = things.iter().enumerate().map(|(idx, (name, _))| {
    #[expect(clippy::disallowed_methods, reason = "ok to panic in build script")]
    let idx = u32::try_from(idx).expect("usize to u32");
    // global handles are plain indices.
    q! { pub const #name: Self = Self(#idx); }
  });
  let ty_data = things.iter().map(|(_, td)| td);
  let map_entries = things.iter().map(|(name, td)| q! { (#td, Ty::#name) });
  let file = file!();
  let all = q! {
    use std::collections::{BTreeMap, BTreeSet};
    use super::{Ty, Data, Prim, Record};

    pub const _GENERATED_BY: &str = #file;

    #[expect(missing_docs)]
    impl Ty {
      #(#impl_ty_const)*
    }

    impl super::Store {
      #[doc = "Returns a store with the builtin types, like `Ty::ANY`."]
      pub(crate) fn with_builtin() -> Self {
        Self {
          by_idx: vec![
            #(#ty_data,)*
          ],
          by_data: rustc_hash::FxHashMap::from_iter([
            #(#map_entries,)*
          ]),
        }
      }
    }
  };
  write_rs_tokens::go(all, "generated.rs");
}

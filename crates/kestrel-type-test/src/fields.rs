//! Choosing the fewest fields whose presence tells the tested record shape apart from the other
//! shapes a value might have.
//!
//! Greedy: pick the field the fewest remaining candidate shapes have, drop the candidates that
//! cannot have it, and repeat. Stop when no field rules out any remaining candidate. Then every
//! field an open candidate does not declare is probed too, so that reading any of the fields
//! afterwards is safe.

use kestrel_tree::Name;
use kestrel_ty::Record;

/// Returns the fields to probe, in order, and the candidates left after probing them.
pub(crate) fn distinguishing<I>(mut candidates: Vec<Record>, fields: I) -> (Vec<Name>, Vec<Record>)
where
  I: IntoIterator<Item = Name>,
{
  let mut left: Vec<Name> = fields.into_iter().collect();
  let mut chosen = Vec::<Name>::new();
  loop {
    let best = left
      .iter()
      .enumerate()
      .map(|(idx, name)| (candidates.iter().filter(|c| may_have(c, name)).count(), idx))
      .min();
    let Some((conflicts, idx)) = best else { break };
    if conflicts == candidates.len() {
      break;
    }
    let name = left.remove(idx);
    candidates.retain(|c| may_have(c, &name));
    log::debug!("probing `{name}` leaves {conflicts} candidate(s)");
    chosen.push(name);
  }
  for name in left {
    if candidates.iter().any(|c| !c.fields.contains_key(&name)) {
      log::debug!("checking for `{name}` since an open candidate may lack it");
      chosen.push(name);
    }
  }
  (chosen, candidates)
}

fn may_have(rec: &Record, name: &Name) -> bool {
  rec.open || rec.fields.contains_key(name)
}

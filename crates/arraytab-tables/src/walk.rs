//! The two-level sparse walk behind the attribute-entry adapters.
//!
//! Iteration order: attributes ascending, restricted to the matching scope;
//! within an attribute, entries ascending, restricted to those with a
//! positive element count. The walk is a pure function of the container
//! state and is restarted from the beginning whenever a flattened rowid has
//! to be turned back into an (attribute, entry) pair; positions are never
//! cached across a mutation.

use arraytab_core::error::{CorruptionError, EngineOp, Error};
use arraytab_core::types::Scope;
use arraytab_engine::{ContainerEngine, ContainerId};

pub(crate) struct EntryWalk<'a> {
    engine: &'a dyn ContainerEngine,
    id: ContainerId,
    scope: Scope,
}

impl<'a> EntryWalk<'a> {
    pub(crate) fn new(engine: &'a dyn ContainerEngine, id: ContainerId, scope: Scope) -> Self {
        Self { engine, id, scope }
    }

    /// First qualifying (attribute, entry), or None when the scan is empty.
    pub(crate) fn first(&self) -> Result<Option<(i64, i64)>, Error> {
        self.seek_attr(0)
    }

    /// The qualifying position after `(attr, entry)`, rolling over to the
    /// next qualifying attribute when the current one is exhausted.
    pub(crate) fn next_after(&self, attr: i64, entry: i64) -> Result<Option<(i64, i64)>, Error> {
        let max = self
            .engine
            .max_entry(self.id, self.scope, attr)
            .op("reading max entry")?;
        if let Some(found) = self.scan_entries(attr, entry + 1, max)? {
            return Ok(Some((attr, found)));
        }
        self.seek_attr(attr + 1)
    }

    /// The position a 1-based flattened rowid names, recomputed from the
    /// start of the walk.
    pub(crate) fn nth(&self, rowid: i64) -> Result<Option<(i64, i64)>, Error> {
        if rowid < 1 {
            return Ok(None);
        }
        let mut pos = self.first()?;
        for _ in 1..rowid {
            pos = match pos {
                Some((attr, entry)) => self.next_after(attr, entry)?,
                None => return Ok(None),
            };
        }
        Ok(pos)
    }

    /// Sum of entry counts over the matching-scope attributes; the scan cost.
    pub(crate) fn total_entries(&self) -> Result<i64, Error> {
        let nattrs = self
            .engine
            .attribute_count(self.id)
            .op("counting attributes")?;
        let mut total = 0;
        for attr in 0..nattrs {
            if self
                .engine
                .attribute_scope(self.id, attr)
                .op("reading attribute scope")?
                == self.scope
            {
                total += self
                    .engine
                    .entry_count(self.id, self.scope, attr)
                    .op("counting entries")?;
            }
        }
        Ok(total)
    }

    /// Finds the first attribute at or after `from` with matching scope and
    /// at least one entry, then its first qualifying entry.
    fn seek_attr(&self, from: i64) -> Result<Option<(i64, i64)>, Error> {
        let nattrs = self
            .engine
            .attribute_count(self.id)
            .op("counting attributes")?;
        let mut attr = from;
        while attr < nattrs {
            let scope = self
                .engine
                .attribute_scope(self.id, attr)
                .op("reading attribute scope")?;
            if scope == self.scope {
                let count = self
                    .engine
                    .entry_count(self.id, self.scope, attr)
                    .op("counting entries")?;
                if count > 0 {
                    let max = self
                        .engine
                        .max_entry(self.id, self.scope, attr)
                        .op("reading max entry")?;
                    // An attribute claiming entries must yield at least one
                    // with a positive element count.
                    return match self.scan_entries(attr, 0, max)? {
                        Some(entry) => Ok(Some((attr, entry))),
                        None => Err(CorruptionError::EmptyAttributeWalk {
                            attr,
                            entries: count,
                        }
                        .into()),
                    };
                }
            }
            attr += 1;
        }
        Ok(None)
    }

    /// First entry in `from..=max` with a positive element count; absent
    /// slots are skipped, never surfaced.
    fn scan_entries(&self, attr: i64, from: i64, max: i64) -> Result<Option<i64>, Error> {
        let mut entry = from;
        while entry <= max {
            let nelems = self
                .engine
                .entry_element_count(self.id, self.scope, attr, entry)
                .op("reading entry element count")?;
            if nelems > 0 {
                return Ok(Some(entry));
            }
            entry += 1;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arraytab_core::types::{ElemType, TypedValue};
    use arraytab_engine::{ContainerEngine, MemoryEngine};

    fn entry(n: i64) -> TypedValue {
        TypedValue::new(ElemType::Int8, 1, n.to_le_bytes().to_vec()).unwrap()
    }

    #[test]
    fn walk_skips_gaps_and_rolls_over_attributes() {
        let engine = MemoryEngine::new();
        let id = engine.create("w").unwrap();
        let a = engine.create_attribute(id, "sparse", Scope::Global).unwrap();
        engine.create_attribute(id, "varscope", Scope::Variable).unwrap();
        let b = engine.create_attribute(id, "dense", Scope::Global).unwrap();
        for k in [0, 3, 7] {
            engine.put_entry(id, Scope::Global, a, k, &entry(k)).unwrap();
        }
        engine.put_entry(id, Scope::Global, b, 1, &entry(9)).unwrap();

        let walk = EntryWalk::new(&engine, id, Scope::Global);
        let mut seen = Vec::new();
        let mut pos = walk.first().unwrap();
        while let Some((attr, ent)) = pos {
            seen.push((attr, ent));
            pos = walk.next_after(attr, ent).unwrap();
        }
        assert_eq!(seen, vec![(a, 0), (a, 3), (a, 7), (b, 1)]);
        assert_eq!(walk.total_entries().unwrap(), 4);

        // nth re-derives the same positions, 1-based.
        for (k, expected) in seen.iter().enumerate() {
            assert_eq!(walk.nth(k as i64 + 1).unwrap(), Some(*expected));
        }
        assert_eq!(walk.nth(5).unwrap(), None);
        assert_eq!(walk.nth(0).unwrap(), None);
    }

    #[test]
    fn empty_scope_walks_to_nothing() {
        let engine = MemoryEngine::new();
        let id = engine.create("w").unwrap();
        engine.create_attribute(id, "g", Scope::Global).unwrap();
        let walk = EntryWalk::new(&engine, id, Scope::Variable);
        assert_eq!(walk.first().unwrap(), None);
        assert_eq!(walk.total_entries().unwrap(), 0);
    }
}

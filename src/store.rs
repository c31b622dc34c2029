//! Persistent Store Adapter (spec §4.1 input, §6 `guid2lid` domain): a thin
//! typed view over the external `guid2lid` key/value domain. The engine for
//! the domain itself — serialization format, actual disk I/O — is out of
//! scope (spec §1); this module only defines the trait boundary and an
//! in-memory reference implementation used by tests and by embedders that
//! have not wired up a real backing store yet, the same role `tmpfs` plays
//! for the `naming` service's `FileSystem` trait.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::error::LidManagerError;
use crate::lid::LidRange;
use crate::port::Guid;

/// Typed view over the `guid2lid` persistent domain (spec §6).
pub trait Guid2LidStore {
    /// Reloads the in-memory map from whatever backs `store()`. Errors are
    /// logged by the caller and are not fatal unless `exit_on_fatal` is set
    /// (spec §7).
    fn load(&mut self) -> Result<(), LidManagerError>;

    /// Flushes the in-memory map to the backing store.
    fn store(&mut self) -> Result<(), LidManagerError>;

    /// Drops every in-memory entry without touching the backing store.
    fn clear(&mut self);

    /// All GUIDs currently present in the in-memory map.
    fn iterate_guids(&self) -> Vec<Guid>;

    fn get(&self, guid: Guid) -> Option<LidRange>;

    fn set(&mut self, guid: Guid, range: LidRange);

    fn delete(&mut self, guid: Guid);
}

/// In-memory `Guid2LidStore` with a simulated backing "disk": `store()`
/// snapshots the live map, `load()` restores the last snapshot. A
/// successful `store()` followed by `load()` round-trips every `set` entry
/// exactly, as spec §6 requires of any real implementation.
#[derive(Debug, Default)]
pub struct InMemoryGuid2LidStore {
    live: BTreeMap<Guid, LidRange>,
    snapshot: BTreeMap<Guid, LidRange>,
    /// When set, the next `load()`/`store()` call fails — used by tests to
    /// exercise the `exit_on_fatal` path (spec §7).
    pub fail_next_io: bool,
}

impl InMemoryGuid2LidStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Guid2LidStore for InMemoryGuid2LidStore {
    fn load(&mut self) -> Result<(), LidManagerError> {
        if core::mem::take(&mut self.fail_next_io) {
            return Err(LidManagerError::PersistentStoreLoad);
        }
        self.live = self.snapshot.clone();
        Ok(())
    }

    fn store(&mut self) -> Result<(), LidManagerError> {
        if core::mem::take(&mut self.fail_next_io) {
            return Err(LidManagerError::PersistentStoreStore);
        }
        self.snapshot = self.live.clone();
        Ok(())
    }

    fn clear(&mut self) {
        self.live.clear();
    }

    fn iterate_guids(&self) -> Vec<Guid> {
        self.live.keys().copied().collect()
    }

    fn get(&self, guid: Guid) -> Option<LidRange> {
        self.live.get(&guid).copied()
    }

    fn set(&mut self, guid: Guid, range: LidRange) {
        self.live.insert(guid, range);
    }

    fn delete(&mut self, guid: Guid) {
        self.live.remove(&guid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_load_round_trips() {
        let mut store = InMemoryGuid2LidStore::new();
        store.set(Guid(1), LidRange::new(4, 7));
        store.store().unwrap();
        store.clear();
        assert!(store.get(Guid(1)).is_none());
        store.load().unwrap();
        assert_eq!(store.get(Guid(1)), Some(LidRange::new(4, 7)));
    }

    #[test]
    fn failed_load_is_reported() {
        let mut store = InMemoryGuid2LidStore::new();
        store.fail_next_io = true;
        assert_eq!(store.load(), Err(LidManagerError::PersistentStoreLoad));
    }
}

//! `port_lid_tbl` (spec §3): the LID-indexed "who currently owns this LID"
//! table. Owned by the surrounding subnet object in spec terms, but since
//! that object is out of scope here (spec §1) it is modeled the same way as
//! `Guid2LidStore` and `PortInfoTransport`: a trait boundary plus an
//! in-memory reference implementation.

use alloc::vec::Vec;

use crate::lid::Lid;
use crate::port::Guid;

/// LID-indexed table of which port currently owns each LID.
pub trait PortLidTable {
    /// Number of slots currently allocated (including the LID-0 sentinel).
    fn len(&self) -> usize;

    fn get(&self, lid: Lid) -> Option<Guid>;

    fn set(&mut self, lid: Lid, guid: Guid);

    fn clear_lid(&mut self, lid: Lid);

    /// Zero every slot without shrinking (spec §5: grows monotonically,
    /// "never shrunk, only zeroed").
    fn clear_all(&mut self);
}

/// Reference `PortLidTable` backed by a plain `Vec`.
#[derive(Debug, Default)]
pub struct VecPortLidTable {
    slots: Vec<Option<Guid>>,
}

impl VecPortLidTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_len(&mut self, lid: Lid) {
        let needed = lid as usize + 1;
        if self.slots.len() < needed {
            self.slots.resize(needed, None);
        }
    }
}

impl PortLidTable for VecPortLidTable {
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn get(&self, lid: Lid) -> Option<Guid> {
        self.slots.get(lid as usize).copied().flatten()
    }

    fn set(&mut self, lid: Lid, guid: Guid) {
        self.ensure_len(lid);
        self.slots[lid as usize] = Some(guid);
    }

    fn clear_lid(&mut self, lid: Lid) {
        if (lid as usize) < self.slots.len() {
            self.slots[lid as usize] = None;
        }
    }

    fn clear_all(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_lid_reads_as_none() {
        let tbl = VecPortLidTable::new();
        assert_eq!(tbl.get(5), None);
    }

    #[test]
    fn set_then_clear_round_trips() {
        let mut tbl = VecPortLidTable::new();
        tbl.set(4, Guid(1));
        assert_eq!(tbl.get(4), Some(Guid(1)));
        tbl.clear_lid(4);
        assert_eq!(tbl.get(4), None);
    }

    #[test]
    fn clear_all_keeps_capacity() {
        let mut tbl = VecPortLidTable::new();
        tbl.set(10, Guid(1));
        let len_before = tbl.len();
        tbl.clear_all();
        assert_eq!(tbl.get(10), None);
        assert_eq!(tbl.len(), len_before);
    }
}

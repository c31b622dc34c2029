//! Validator (spec §4.1): on init, cross-checks the persistent guid→lid map
//! against the current LMC and `max_unicast_lid`, dropping any entry that
//! cannot possibly be valid. Never allocates new LIDs.

use log::warn;

use crate::lid::{lmc_mask, Lid, LidRange, UsedLids};
use crate::port::Guid;
use crate::store::Guid2LidStore;

/// Cross-checks every entry in `store` against `lmc`/`max_unicast_lid`,
/// deleting malformed or duplicate entries and marking the rest used in
/// `used`. Returns the number of entries dropped (useful for tests/logging
/// only; callers don't need to act on it).
pub fn validate(store: &mut dyn Guid2LidStore, used: &mut UsedLids, lmc: u8, max_unicast_lid: Lid) -> usize {
    let mask = lmc_mask(lmc);
    let mut dropped = 0;
    for guid in store.iterate_guids() {
        let Some(range) = store.get(guid) else { continue };
        if let Some(reason) = reject_reason(guid, range, mask, max_unicast_lid, used) {
            warn!("dropping persistent guid2lid entry for {guid:?} ({range:?}): {reason}");
            store.delete(guid);
            dropped += 1;
            continue;
        }
        used.mark_range_used(range);
    }
    dropped
}

fn reject_reason(guid: Guid, range: LidRange, mask: u16, max_unicast_lid: Lid, used: &UsedLids) -> Option<&'static str> {
    if guid.0 == 0 {
        return Some("zero guid");
    }
    if range.min == 0 {
        return Some("zero min lid");
    }
    if range.min > range.max {
        return Some("min > max");
    }
    if range.max > max_unicast_lid {
        return Some("max exceeds max_unicast_lid");
    }
    if range.min != range.max && (range.min & mask) != range.min {
        return Some("misaligned multi-lid entry");
    }
    for lid in range.min..=range.max {
        if used.is_used(lid) {
            return Some("duplicate lid");
        }
    }
    None
}

//! Port LID Resolver (spec §4.3): per-port decision between keeping a
//! persistent assignment, keeping a currently-advertised one, or allocating
//! a fresh aligned range, followed by the Commit step shared by all three
//! paths.

use log::debug;

use crate::lid::{lmc_mask, FreeRanges, Lid, LidRange, UsedLids};
use crate::port::Port;
use crate::port_lid_table::PortLidTable;
use crate::store::Guid2LidStore;

/// Result of resolving one port this sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOutcome {
    pub min: Lid,
    pub max: Lid,
    /// `false` iff the port's base LID is unchanged from the previous sweep.
    pub changed: bool,
}

impl ResolveOutcome {
    pub fn range(&self) -> LidRange {
        LidRange::new(self.min, self.max)
    }
}

/// Everything the resolver needs beyond the port itself: the tables it
/// reads and mutates, plus the policy knobs that alter its decisions.
pub struct ResolverContext<'a> {
    pub store: &'a mut dyn Guid2LidStore,
    pub used_lids: &'a mut UsedLids,
    pub port_lid_tbl: &'a mut dyn PortLidTable,
    pub free_ranges: &'a mut FreeRanges,
    pub lmc: u8,
    pub max_unicast_lid: Lid,
    pub first_time_master_sweep: bool,
    pub reassign_lids: bool,
}

/// Resolves `port`'s LID assignment for this sweep (spec §4.3).
///
/// Panics (by design, spec §7) if Free-Range Search exhausts `free_ranges`
/// without finding a big-enough block — a correctly-sized subnet never
/// reaches this path outside of tests that deliberately starve it.
pub fn resolve(port: &Port, ctx: &mut ResolverContext) -> ResolveOutcome {
    let n = port.needed_lids(ctx.lmc);

    // Step A: persistent hit.
    if let Some(persisted) = ctx.store.get(port.guid) {
        let min = persisted.min;
        let max = min + n - 1;
        let changed = port.current_base_lid != Some(min);
        if changed {
            clear_old_table_entries(port, n, ctx.max_unicast_lid, ctx.port_lid_tbl);
        }
        commit(port, min, max, ctx.store, ctx.used_lids, ctx.port_lid_tbl);
        return ResolveOutcome { min, max, changed };
    }

    // Step B: keep currently-advertised LID.
    if let Some(base) = port.current_base_lid {
        if base != 0 && !(ctx.first_time_master_sweep && ctx.reassign_lids) {
            let mask = lmc_mask(if n == 1 { 0 } else { ctx.lmc });
            let aligned = n == 1 || (base & mask) == base;
            if aligned {
                if let Some(end) = base.checked_add(n - 1) {
                    if end <= ctx.max_unicast_lid {
                        // spec §9 Open Question: a used LID in this range only
                        // refuses the range if it belongs to a genuinely
                        // different port. `port_lid_tbl`'s first-pass discovery
                        // marking tells us who currently owns each LID, so we
                        // can tell the port's own (stale) reservation apart
                        // from a real collision instead of blindly clearing
                        // the candidate range before testing it.
                        let collides = (base..=end)
                            .any(|lid| ctx.used_lids.is_used(lid) && ctx.port_lid_tbl.get(lid) != Some(port.guid));
                        if !collides {
                            for lid in base..=end {
                                if ctx.port_lid_tbl.get(lid) == Some(port.guid) {
                                    ctx.used_lids.clear_lid(lid);
                                }
                            }
                            commit(port, base, end, ctx.store, ctx.used_lids, ctx.port_lid_tbl);
                            return ResolveOutcome { min: base, max: end, changed: false };
                        }
                    }
                }
            }
        }
    }

    // Step C: fresh allocation.
    clear_old_table_entries(port, n, ctx.max_unicast_lid, ctx.port_lid_tbl);
    let allocated = ctx
        .free_ranges
        .take(n, ctx.lmc)
        .unwrap_or_else(|| {
            log::error!("LID space exhausted while resolving guid {:?} ({n} LIDs needed)", port.guid);
            panic!("LID space exhausted")
        });
    debug!("allocated fresh range {allocated:?} for guid {:?}", port.guid);
    commit(port, allocated.min, allocated.max, ctx.store, ctx.used_lids, ctx.port_lid_tbl);
    ResolveOutcome { min: allocated.min, max: allocated.max, changed: true }
}

/// Clears `port_lid_tbl` entries in `port`'s previously-advertised range
/// that still point at `port` (spec §4.3 Steps A/C).
fn clear_old_table_entries(port: &Port, n: u16, max_unicast_lid: Lid, port_lid_tbl: &mut dyn PortLidTable) {
    let Some(base) = port.current_base_lid else { return };
    if base == 0 {
        return;
    }
    let end = base.saturating_add(n - 1).min(max_unicast_lid);
    for lid in base..=end {
        if port_lid_tbl.get(lid) == Some(port.guid) {
            port_lid_tbl.clear_lid(lid);
        }
    }
}

/// Commit (spec §4.3): persists the assignment and marks both occupancy
/// tables, shared by all three resolution paths.
fn commit(
    port: &Port,
    min: Lid,
    max: Lid,
    store: &mut dyn Guid2LidStore,
    used_lids: &mut UsedLids,
    port_lid_tbl: &mut dyn PortLidTable,
) {
    store.set(port.guid, LidRange::new(min, max));
    used_lids.mark_range_used(LidRange::new(min, max));
    for lid in min..=max {
        port_lid_tbl.set(lid, port.guid);
    }
}

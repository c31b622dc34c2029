//! Sweep Initializer (spec §4.2): rebuilds `free_ranges` for one sweep from
//! the discovered port set, the persistent map, and the reassignment
//! policy.

use alloc::collections::BTreeMap;

use log::warn;

use crate::lid::{lmc_mask, FreeRanges, Lid, LidRange, UsedLids, UCAST_START};
use crate::port::{Guid, Port};
use crate::port_lid_table::PortLidTable;
use crate::store::Guid2LidStore;

pub struct SweepInitContext<'a> {
    pub store: &'a mut dyn Guid2LidStore,
    pub used_lids: &'a mut UsedLids,
    pub port_lid_tbl: &'a mut dyn PortLidTable,
    pub free_ranges: &'a mut FreeRanges,
    pub lmc: u8,
    pub max_unicast_lid: Lid,
    pub first_time_master_sweep: bool,
    pub reassign_lids: bool,
    pub coming_out_of_standby: bool,
    pub honor_guid2lid_file: bool,
}

/// Runs the Sweep Initializer over `ports` (spec §4.2).
pub fn initialize(ports: &[Port], ctx: &mut SweepInitContext) {
    if ctx.coming_out_of_standby {
        ctx.store.clear();
        if ctx.honor_guid2lid_file {
            if let Err(err) = ctx.store.load() {
                warn!("failed to reload guid2lid store on standby recovery: {err}");
            }
        }
        ctx.used_lids.clear_all();
    }
    ctx.free_ranges.clear();
    ctx.port_lid_tbl.clear_all();

    if ctx.first_time_master_sweep && ctx.reassign_lids {
        ctx.free_ranges.push_back(LidRange::new(UCAST_START, ctx.max_unicast_lid - 1));
        return;
    }

    let mask = lmc_mask(ctx.lmc);
    let mut by_guid: BTreeMap<Guid, &Port> = BTreeMap::new();

    // First pass: occupancy by discovery.
    for p in ports {
        by_guid.insert(p.guid, p);
        if let Some(base) = p.current_base_lid {
            if base != 0 {
                let n = p.needed_lids(ctx.lmc);
                let end = base.saturating_add(n - 1).min(ctx.max_unicast_lid);
                for lid in base.max(UCAST_START)..=end {
                    ctx.port_lid_tbl.set(lid, p.guid);
                }
            }
        }

        if let Some(persisted) = ctx.store.get(p.guid) {
            let needed = p.needed_lids(ctx.lmc);
            let misaligned = persisted.min != persisted.max && (persisted.min & mask) != persisted.min;
            let narrower = persisted.len() < needed;
            if misaligned || narrower {
                ctx.store.delete(p.guid);
                ctx.used_lids.clear_range(persisted);
            }
        }
    }

    // Second pass: free-range construction.
    let lmax = core::cmp::max(ctx.port_lid_tbl.len(), ctx.used_lids.len()).saturating_sub(1) as Lid;
    let mut open_start: Option<Lid> = None;
    let mut cursor: Lid = UCAST_START;

    while cursor <= lmax {
        let lid = cursor;

        if ctx.used_lids.is_used(lid) {
            close_open_range(&mut open_start, lid - 1, ctx.free_ranges);
            cursor += 1;
            continue;
        }

        if let Some(guid) = ctx.port_lid_tbl.get(lid) {
            if let Some(p) = by_guid.get(&guid) {
                if ctx.store.get(guid).is_none() {
                    let n = p.needed_lids(ctx.lmc);
                    let base = p.current_base_lid.unwrap_or(0);
                    let base_mask = lmc_mask(if n == 1 { 0 } else { ctx.lmc });
                    let aligned = n == 1 || (base & base_mask) == base;
                    let disc_max = base.saturating_add(n - 1).min(ctx.max_unicast_lid);
                    let none_reserved = (base..=disc_max).all(|l| !ctx.used_lids.is_used(l));
                    if aligned && none_reserved {
                        close_open_range(&mut open_start, lid - 1, ctx.free_ranges);
                        cursor = disc_max.saturating_add(1);
                        continue;
                    }
                }
            }
        }

        if open_start.is_none() {
            open_start = Some(lid);
        }
        cursor += 1;
    }

    let tail_min = open_start.unwrap_or(lmax + 1);
    ctx.free_ranges.push_back(LidRange::new(tail_min, ctx.max_unicast_lid.saturating_sub(1)));
}

fn close_open_range(open_start: &mut Option<Lid>, end: Lid, free_ranges: &mut FreeRanges) {
    if let Some(start) = open_start.take() {
        if end >= start {
            free_ranges.push_back(LidRange::new(start, end));
        }
    }
}

//! Sweep Orchestrator (spec §4.5): the top-level `process_sm()` /
//! `process_subnet()` operations, each acquiring the process-wide exclusive
//! lock for their full body (spec §5) the same way `naming::open_objects`
//! guards its singleton table behind a `spin::Mutex` rather than relying on
//! a hidden global.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use byteorder::BigEndian;
use log::{error, warn};
use spin::Mutex;
use zerocopy::U16;

use crate::config::Config;
use crate::configurator::{self, ConfiguratorContext};
use crate::error::LidManagerError;
use crate::lid::{FreeRanges, Lid, UsedLids};
use crate::port::{Guid, Port};
use crate::port_lid_table::PortLidTable;
use crate::portinfo::{PortInfo, PortInfoTransport};
use crate::resolver::{self, ResolverContext};
use crate::store::Guid2LidStore;
use crate::sweep_init::{self, SweepInitContext};
use crate::validator;

/// Result of one orchestrator operation (spec §4.5/§5): `DonePending`
/// signals the caller that asynchronous `PortInfoSet` replies are
/// outstanding; `Done` means nothing was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Done,
    DonePending,
}

struct Inner {
    store: Box<dyn Guid2LidStore + Send>,
    port_lid_tbl: Box<dyn PortLidTable + Send>,
    transport: Box<dyn PortInfoTransport + Send>,
    config: Config,
    used_lids: UsedLids,
    free_ranges: FreeRanges,
    /// Last PortInfo observed for each port's guid, used by the
    /// Configurator's diff (spec §4.4 / §9).
    previous_info: BTreeMap<Guid, PortInfo>,
    sm_port_guid: Guid,
    master_sm_base_lid: U16<BigEndian>,
    sm_base_lid: U16<BigEndian>,
    send_set_reqs: bool,
    next_context: u64,
}

/// Owns `used_lids`/`free_ranges` exclusively and shares `port_lid_tbl` and
/// the `guid2lid` store with the surrounding system under one process-wide
/// lock (spec §3 Ownership, §5).
pub struct LidManager {
    inner: Mutex<Inner>,
}

impl LidManager {
    /// Constructs the manager and performs the spec §4.1/§3 init sequence:
    /// load the persistent map (unless `config.reassign_lids` requests a
    /// fresh start) and validate it against the current LMC, seeding
    /// `used_lids`.
    pub fn new(
        config: Config,
        mut store: Box<dyn Guid2LidStore + Send>,
        port_lid_tbl: Box<dyn PortLidTable + Send>,
        transport: Box<dyn PortInfoTransport + Send>,
        sm_port_guid: Guid,
    ) -> Result<Self, LidManagerError> {
        if !config.reassign_lids {
            if let Err(err) = store.load() {
                warn!("failed to load guid2lid store at init: {err}");
                if config.exit_on_fatal {
                    return Err(err);
                }
            }
        }

        let mut used_lids = UsedLids::new();
        validator::validate(store.as_mut(), &mut used_lids, config.lmc, config.max_unicast_lid);

        Ok(Self {
            inner: Mutex::new(Inner {
                store,
                port_lid_tbl,
                transport,
                config,
                used_lids,
                free_ranges: FreeRanges::new(),
                previous_info: BTreeMap::new(),
                sm_port_guid,
                master_sm_base_lid: U16::<BigEndian>::new(0),
                sm_base_lid: U16::<BigEndian>::new(0),
                send_set_reqs: false,
                next_context: 0,
            }),
        })
    }

    /// `subnet.master_sm_base_lid`, as last written by `process_sm()`, in
    /// host byte order.
    pub fn master_sm_base_lid(&self) -> Lid {
        self.inner.lock().master_sm_base_lid.get()
    }

    /// `subnet.sm_base_lid`, as last written by `process_sm()`, in host byte
    /// order.
    pub fn sm_base_lid(&self) -> Lid {
        self.inner.lock().sm_base_lid.get()
    }

    /// `process_sm()` (spec §4.5): runs the Sweep Initializer, then resolves
    /// and configures the SM's own port.
    pub fn process_sm(&self, ports: &[Port], first_time_master_sweep: bool, coming_out_of_standby: bool) -> Signal {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;

        {
            let mut init_ctx = SweepInitContext {
                store: inner.store.as_mut(),
                used_lids: &mut inner.used_lids,
                port_lid_tbl: inner.port_lid_tbl.as_mut(),
                free_ranges: &mut inner.free_ranges,
                lmc: inner.config.lmc,
                max_unicast_lid: inner.config.max_unicast_lid,
                first_time_master_sweep,
                reassign_lids: inner.config.reassign_lids,
                coming_out_of_standby,
                honor_guid2lid_file: inner.config.honor_guid2lid_file,
            };
            sweep_init::initialize(ports, &mut init_ctx);
        }

        inner.send_set_reqs = false;

        let Some(sm_port) = ports.iter().find(|p| p.guid == inner.sm_port_guid) else {
            let err = LidManagerError::SmPortNotFound;
            error!("process_sm: {err} (guid {:?})", inner.sm_port_guid);
            return Signal::Done;
        };
        let sm_port = *sm_port;

        // The SM's own port is being resolved right now, so its MasterSMBaseLID
        // is exactly the base LID it is about to be assigned.
        let outcome = resolve_port(&sm_port, first_time_master_sweep, inner);
        inner.master_sm_base_lid = U16::<BigEndian>::new(outcome.min);
        inner.sm_base_lid = U16::<BigEndian>::new(outcome.min);
        configure_and_submit(&sm_port, outcome.min, outcome.min, first_time_master_sweep, inner);

        if inner.send_set_reqs {
            Signal::DonePending
        } else {
            Signal::Done
        }
    }

    /// `process_subnet()` (spec §4.5): resolves and configures every
    /// discovered port except the SM's own, then persists the guid→lid
    /// store.
    pub fn process_subnet(&self, ports: &[Port], first_time_master_sweep: bool) -> Signal {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;

        inner.send_set_reqs = false;

        let sm_port_guid = inner.sm_port_guid;
        let sm_base_lid = inner.master_sm_base_lid.get();
        let others: Vec<Port> = ports.iter().filter(|p| p.guid != sm_port_guid).copied().collect();
        for port in &others {
            resolve_and_configure(port, first_time_master_sweep, sm_base_lid, inner);
        }

        if let Err(err) = inner.store.store() {
            warn!("failed to persist guid2lid store after sweep: {err}");
        }

        if inner.send_set_reqs {
            Signal::DonePending
        } else {
            Signal::Done
        }
    }
}

/// Runs the Resolver (spec §4.3) for one port.
fn resolve_port(port: &Port, first_time_master_sweep: bool, inner: &mut Inner) -> resolver::ResolveOutcome {
    let mut resolve_ctx = ResolverContext {
        store: inner.store.as_mut(),
        used_lids: &mut inner.used_lids,
        port_lid_tbl: inner.port_lid_tbl.as_mut(),
        free_ranges: &mut inner.free_ranges,
        lmc: inner.config.lmc,
        max_unicast_lid: inner.config.max_unicast_lid,
        first_time_master_sweep,
        reassign_lids: inner.config.reassign_lids,
    };
    resolver::resolve(port, &mut resolve_ctx)
}

/// Runs the Configurator (spec §4.4) for one port already resolved to
/// `base_lid`, submitting a `PortInfoSet` request when it decided one was
/// needed and recording the send attempt regardless of the transport's
/// result (spec §7). `sm_base_lid` is the subnet's SM's own resolved base
/// LID, written into `MasterSMBaseLID` — distinct from `base_lid`, this
/// port's own assignment.
fn configure_and_submit(port: &Port, base_lid: Lid, sm_base_lid: Lid, first_time_master_sweep: bool, inner: &mut Inner) {
    let previous = inner.previous_info.get(&port.guid).copied();
    let peer_previous = port.peer.and_then(|peer| inner.previous_info.get_mut(&peer.guid));

    let mut configure_ctx =
        ConfiguratorContext { config: &inner.config, first_time_master_sweep, previous, peer_previous, sm_base_lid };

    if let Some(configured) = configurator::configure(port, base_lid, &mut configure_ctx) {
        inner.previous_info.insert(port.guid, configured.new_info);

        if configured.sent {
            inner.next_context = inner.next_context.wrapping_add(1);
            let request = configurator::build_request(port.guid, port.port_num, configured.new_info, inner.next_context);
            // spec §7: the attempt itself is what's recorded, independent of
            // whether the transport later fails or times out.
            inner.send_set_reqs = true;
            if let Err(err) = inner.transport.submit_portinfo_set(request) {
                warn!("PortInfoSet submission failed for guid {:?}: {err:?}", port.guid);
            }
        }
    }
}

/// Resolves and configures one port, shared by `process_sm()` and
/// `process_subnet()`.
fn resolve_and_configure(
    port: &Port,
    first_time_master_sweep: bool,
    sm_base_lid: Lid,
    inner: &mut Inner,
) -> resolver::ResolveOutcome {
    let outcome = resolve_port(port, first_time_master_sweep, inner);
    configure_and_submit(port, outcome.min, sm_base_lid, first_time_master_sweep, inner);
    outcome
}

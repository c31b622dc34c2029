//! Port Configurator (spec §4.4): builds a proposed PortInfo for one
//! physical port by overlaying manager-wide config and the resolved base
//! LID onto the last-observed PortInfo, then diffs against that previous
//! snapshot to decide whether a `PortInfoSet` actually needs to go out.

use crate::config::Config;
use crate::lid::Lid;
use crate::port::{Guid, Port, PortCapFlags};
use crate::portinfo::{LinkDownDefaultState, PhysState, PortInfo, PortInfoSetRequest, PortInfoWire, PortState};

/// What the configurator decided for one port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfiguratorOutcome {
    /// The PortInfo the manager now considers "last observed" for this port,
    /// whether or not a request was actually sent.
    pub new_info: PortInfo,
    /// `true` iff a `PortInfoSet` request was built and handed to the
    /// transport.
    pub sent: bool,
    /// `true` iff NeighborMTU or OperationalVLs changed, which per
    /// SPEC_FULL.md's link-peer section schedules a transient LinkDown
    /// transition on this port and an `Init` pre-seed of the peer's cached
    /// `phys_state`.
    pub relink: bool,
}

/// Per-port inputs the configurator needs beyond the resolved LID.
pub struct ConfiguratorContext<'a> {
    pub config: &'a Config,
    pub first_time_master_sweep: bool,
    /// The last PortInfo this manager observed for `port`, if any. `None`
    /// for a never-before-seen port (forces every overlaid field to read as
    /// "changed" against the type's defaults).
    pub previous: Option<PortInfo>,
    /// The peer's previously-observed PortInfo, if a peer is known and the
    /// manager already holds a cached entry for it. Flipped to `PhysState::Init`
    /// in place when this port's relink fires.
    pub peer_previous: Option<&'a mut PortInfo>,
    /// The SM's own resolved base LID, written into every port's
    /// `MasterSMBaseLID` field (spec §4.4) — distinct from `base_lid`, which
    /// is this port's own assigned `BaseLID`.
    pub sm_base_lid: Lid,
}

/// Configures `port` at `base_lid` (spec §4.4). Returns `None` for the
/// edge rule "non-zero switch port: no change at all" (those ports belong
/// to a later link-state manager).
pub fn configure(port: &Port, base_lid: Lid, ctx: &mut ConfiguratorContext) -> Option<ConfiguratorOutcome> {
    if port.is_switch_port0() && port.port_num != 0 {
        // Unreachable in practice (SP0 is always port_num 0); kept as the
        // literal edge rule spec §4.4 states.
        return None;
    }

    let previous = ctx.previous.unwrap_or_default();
    let mut info = previous;

    info.port_state = PortState::NoChange;
    info.link_down_default_state = LinkDownDefaultState::Polling;
    info.port_physical_state = PhysState::NoChange;

    info.m_key = ctx.config.m_key;
    info.subnet_prefix = ctx.config.subnet_prefix;
    info.master_sm_base_lid = ctx.sm_base_lid;
    info.m_key_lease_period = ctx.config.m_key_lease_period;
    info.subnet_timeout = ctx.config.subnet_timeout;

    info.base_lid = base_lid;

    let mut relink = false;

    if port.is_switch_port0() {
        info.neighbor_mtu = port.mtu_cap;
        if port.is_sp0_lmc_capable() {
            info.lmc = ctx.config.lmc;
        }
    } else {
        info.link_width_enabled = port.link_width_supported;
        info.lmc = ctx.config.lmc;
        info.m_key_protect_bits = 0;
        info.local_phy_errors_threshold = ctx.config.local_phy_errors_threshold;
        info.overrun_errors_threshold = ctx.config.overrun_errors_threshold;

        if let Some(peer) = port.peer {
            let new_mtu = port.mtu_cap.min(peer.mtu_cap);
            let new_op_vls = port.op_vls_cap.min(peer.op_vls_cap);
            if new_mtu != previous.neighbor_mtu || new_op_vls != previous.operational_vls {
                relink = true;
            }
            info.neighbor_mtu = new_mtu;
            info.operational_vls = new_op_vls;
        }
        // No known peer: NeighborMTU/OperationalVLs keep their previous
        // value and never trigger a relink (SPEC_FULL.md §4 supplement).
    }

    info.client_reregister = (ctx.first_time_master_sweep || port.is_new)
        && !ctx.config.no_clients_rereg
        && port.capabilities.contains(PortCapFlags::CLIENT_REREG);

    if relink {
        if let Some(peer_prev) = ctx.peer_previous.as_mut() {
            peer_prev.port_physical_state = PhysState::Init;
        }
    }

    let changed = ctx.first_time_master_sweep || info != previous;
    Some(ConfiguratorOutcome { new_info: info, sent: changed, relink })
}

/// Builds the wire request for an outcome the caller decided to send. The
/// manager records the send attempt regardless of what the transport does
/// with it (spec §7: "the manager itself records that it attempted a send
/// (`send_set_reqs = true`) regardless of acknowledgement") — that bit lives
/// on the orchestrator, not here.
pub fn build_request(guid: Guid, port_num: u8, info: PortInfo, context: u64) -> PortInfoSetRequest {
    let wire = PortInfoWire::from(info);
    PortInfoSetRequest { port_guid: guid, port_num, payload: wire.as_bytes(), context }
}

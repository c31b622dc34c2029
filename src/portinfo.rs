//! PortInfo construction, diffing and the abstract MAD-transport boundary
//! (spec §4.4, §6). The wire payload is modeled as a packed big-endian
//! bitfield struct the same way `device::mlx4::port::MadPacketData` already
//! packs the MAD_IFC response at real SMP byte offsets.

use alloc::vec::Vec;

use modular_bitfield_msb::{
    bitfield,
    prelude::{B1, B2, B3, B4, B5},
};
use strum_macros::FromRepr;

use crate::lid::Lid;
use crate::port::{Guid, Mtu};

/// `PortState` as written into PortInfo. The configurator only ever writes
/// `NoChange` (spec §4.4): driving real state transitions belongs to a
/// later link-state manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Default)]
#[repr(u8)]
pub enum PortState {
    #[default]
    NoChange = 0,
    Down = 1,
    Init = 2,
    Armed = 3,
    Active = 4,
}

/// `PortPhysicalState`. The configurator writes `NoChange` on the port's own
/// PortInfo; `Init` is used only for the peer-cache bookkeeping described in
/// SPEC_FULL.md's link-peer section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Default)]
#[repr(u8)]
pub enum PhysState {
    #[default]
    NoChange = 0,
    Sleep = 1,
    Polling = 2,
    Disabled = 3,
    PortConfigurationTraining = 4,
    LinkUp = 5,
    LinkErrorRecovery = 6,
    Phytest = 7,
}

/// `LinkDownDefaultState`, always written as `Polling` by this crate (spec
/// §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Default)]
#[repr(u8)]
pub enum LinkDownDefaultState {
    #[default]
    NoChange = 0,
    Sleep = 1,
    Polling = 2,
}

/// Logical (already byte-order-neutral) view of the fields this subsystem
/// writes into PortInfo. Diffed field-by-field rather than via byte
/// memcmp, per spec §9's design note.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PortInfo {
    pub port_state: PortState,
    pub port_physical_state: PhysState,
    pub link_down_default_state: LinkDownDefaultState,

    pub m_key: u64,
    pub subnet_prefix: u64,
    pub master_sm_base_lid: Lid,
    pub m_key_lease_period: u16,
    pub subnet_timeout: u8,

    pub base_lid: Lid,

    // Non-switch-port-0 only; left at their previous value otherwise.
    pub link_width_enabled: u8,
    pub lmc: u8,
    pub m_key_protect_bits: u8,
    pub neighbor_mtu: Mtu,
    pub operational_vls: u8,
    pub local_phy_errors_threshold: u8,
    pub overrun_errors_threshold: u8,

    pub client_reregister: bool,
}

impl Default for Mtu {
    fn default() -> Self {
        Mtu::Mtu256
    }
}

/// The 64-byte IBA PortInfo attribute, bit-exact to the fields this crate
/// writes (spec §6). Fields the manager never touches are left as `#[skip]`
/// padding, mirroring how `SetPortCommand` in `device::mlx4::port` only
/// models the fields the driver actually writes rather than the whole
/// attribute.
#[bitfield]
#[derive(Debug, Clone, Copy)]
pub struct PortInfoWire {
    pub m_key: u64,
    pub subnet_prefix: u64,
    pub base_lid: u16,
    pub master_sm_base_lid: u16,
    pub m_key_lease_period: u16,
    pub local_phy_errors_threshold: u8,
    pub overrun_errors_threshold: u8,
    pub link_width_enabled: u8,
    pub neighbor_mtu: B4,
    pub port_state: B4,
    pub port_physical_state: B4,
    pub link_down_default_state: B4,
    #[skip(getters)] m_key_protect_bits: B2,
    pub lmc: B3,
    pub operational_vls: B4,
    pub client_reregister: bool,
    pub subnet_timeout: B5,
    #[skip] __: B1,
    #[skip] __: [u8; 35],
}

impl PortInfoWire {
    /// Raw 64-byte wire representation, bit-exact to the IBA PortInfo
    /// attribute layout (spec §6).
    pub fn as_bytes(&self) -> [u8; 64] {
        self.bytes
    }
}

impl From<PortInfo> for PortInfoWire {
    fn from(info: PortInfo) -> Self {
        PortInfoWire::new()
            .with_m_key(info.m_key)
            .with_subnet_prefix(info.subnet_prefix)
            .with_base_lid(info.base_lid)
            .with_master_sm_base_lid(info.master_sm_base_lid)
            .with_m_key_lease_period(info.m_key_lease_period)
            .with_local_phy_errors_threshold(info.local_phy_errors_threshold)
            .with_overrun_errors_threshold(info.overrun_errors_threshold)
            .with_link_width_enabled(info.link_width_enabled)
            .with_neighbor_mtu(info.neighbor_mtu as u8)
            .with_port_state(info.port_state as u8)
            .with_port_physical_state(info.port_physical_state as u8)
            .with_link_down_default_state(info.link_down_default_state as u8)
            .with_m_key_protect_bits(info.m_key_protect_bits)
            .with_lmc(info.lmc)
            .with_operational_vls(info.operational_vls)
            .with_client_reregister(info.client_reregister)
            .with_subnet_timeout(info.subnet_timeout)
    }
}

/// An outstanding `PortInfoSet` request (spec §6). `path`/attribute
/// addressing belongs to the MAD transport (out of scope, spec §1); this
/// only carries what the manager itself must supply.
#[derive(Debug, Clone, Copy)]
pub struct PortInfoSetRequest {
    pub port_guid: Guid,
    pub port_num: u8,
    pub payload: [u8; 64],
    pub context: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    QueueFull,
    LinkDown,
}

/// Abstract MAD send/receive boundary (spec §1, §5: "submission itself is
/// non-blocking (fire-and-forget with a completion callback handled outside
/// this subsystem)").
pub trait PortInfoTransport {
    fn submit_portinfo_set(&mut self, request: PortInfoSetRequest) -> Result<(), TransportError>;
}

/// Reference transport used by tests: records every request it was asked
/// to send and never fails unless told to.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Vec<PortInfoSetRequest>,
    pub fail_next: Option<TransportError>,
}

impl PortInfoTransport for RecordingTransport {
    fn submit_portinfo_set(&mut self, request: PortInfoSetRequest) -> Result<(), TransportError> {
        if let Some(err) = self.fail_next.take() {
            return Err(err);
        }
        self.sent.push(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trips_base_lid_and_lmc() {
        let info = PortInfo {
            base_lid: 42,
            lmc: 5,
            neighbor_mtu: Mtu::Mtu2048,
            operational_vls: 4,
            client_reregister: true,
            ..Default::default()
        };
        let wire = PortInfoWire::from(info);
        assert_eq!(wire.base_lid(), 42);
        assert_eq!(wire.lmc(), 5);
        assert_eq!(wire.neighbor_mtu(), Mtu::Mtu2048 as u8);
        assert!(wire.client_reregister());
    }

    #[test]
    fn recording_transport_can_be_made_to_fail() {
        let mut transport = RecordingTransport::default();
        transport.fail_next = Some(TransportError::QueueFull);
        let req = PortInfoSetRequest { port_guid: Guid(1), port_num: 1, payload: [0; 64], context: 0 };
        assert_eq!(transport.submit_portinfo_set(req), Err(TransportError::QueueFull));
        assert!(transport.sent.is_empty());
    }
}

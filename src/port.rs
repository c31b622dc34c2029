//! Port-facing data shapes consumed by the resolver and configurator.
//!
//! `Port` deliberately stays a plain `Copy` struct rather than a trait
//! object: discovery (out of scope here, see spec §1) hands the manager
//! exactly the fields below for every port it found this sweep, the same
//! way `ib_core::ibv_port_attr` is a plain struct read out of a MAD_IFC
//! response rather than a polymorphic capability.

use bitflags::bitflags;
use strum_macros::FromRepr;

use crate::lid::Lid;

bitflags! {
    /// Subset of the IBA port capability mask this crate cares about,
    /// mirroring `ib_core::ibv_access_flags`'s use of `bitflags!` over a
    /// raw integer.
    #[derive(Default)]
    pub struct PortCapFlags: u32 {
        /// `IsClientRegistrationSupported` — gates the ClientReregister bit
        /// (spec §4.4).
        const CLIENT_REREG = 1 << 0;
    }
}

/// 64-bit port GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Guid(pub u64);

/// IBA-style MTU enumeration, mirroring `ib_core::ibv_mtu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum Mtu {
    Mtu256 = 1,
    Mtu512 = 2,
    Mtu1024 = 3,
    Mtu2048 = 4,
    Mtu4096 = 5,
}

impl Mtu {
    /// The smaller of two MTUs (used for neighbor-MTU recomputation).
    pub fn min(self, other: Mtu) -> Mtu {
        if (self as u8) <= (other as u8) {
            self
        } else {
            other
        }
    }
}

/// What physical/link-layer port this port's neighbor is, for the
/// NeighborMTU / OperationalVLs recomputation in the configurator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerInfo {
    pub guid: Guid,
    pub port_num: u8,
    pub mtu_cap: Mtu,
    pub op_vls_cap: u8,
}

/// Whether a port is a switch's management port 0, and if so whether it can
/// accept an LMC-sized LID range ("enhanced" SP0) or only ever a single LID
/// ("base" SP0), per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortClass {
    SwitchPort0 { enhanced_lmc_capable: bool },
    Other,
}

/// A port discovered this sweep.
#[derive(Debug, Clone, Copy)]
pub struct Port {
    pub guid: Guid,
    pub node_guid: Guid,
    pub port_num: u8,
    pub class: PortClass,
    /// Base LID the port is currently advertising, if any. `None` models
    /// "currently advertised base LID is 0" (not yet assigned).
    pub current_base_lid: Option<Lid>,
    pub peer: Option<PeerInfo>,
    pub is_new: bool,

    // Physical-port attributes the configurator overlays into PortInfo.
    pub capabilities: PortCapFlags,
    pub link_width_supported: u8,
    pub mtu_cap: Mtu,
    pub op_vls_cap: u8,
}

impl Port {
    pub fn is_switch_port0(&self) -> bool {
        matches!(self.class, PortClass::SwitchPort0 { .. })
    }

    pub fn is_sp0_lmc_capable(&self) -> bool {
        matches!(self.class, PortClass::SwitchPort0 { enhanced_lmc_capable: true })
    }

    /// Number of LIDs this port needs under `lmc` (spec §3/§4.3 Step A).
    pub fn needed_lids(&self, lmc: u8) -> u16 {
        match self.class {
            PortClass::SwitchPort0 { enhanced_lmc_capable: false } => 1,
            _ => crate::lid::lid_count(lmc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_sp0_always_needs_one_lid() {
        let p = Port {
            guid: Guid(1),
            node_guid: Guid(1),
            port_num: 0,
            class: PortClass::SwitchPort0 { enhanced_lmc_capable: false },
            current_base_lid: None,
            peer: None,
            is_new: true,
            capabilities: PortCapFlags::empty(),
            link_width_supported: 1,
            mtu_cap: Mtu::Mtu2048,
            op_vls_cap: 4,
        };
        assert_eq!(p.needed_lids(4), 1);
    }

    #[test]
    fn enhanced_sp0_follows_lmc() {
        let p = Port {
            guid: Guid(1),
            node_guid: Guid(1),
            port_num: 0,
            class: PortClass::SwitchPort0 { enhanced_lmc_capable: true },
            current_base_lid: None,
            peer: None,
            is_new: true,
            capabilities: PortCapFlags::empty(),
            link_width_supported: 1,
            mtu_cap: Mtu::Mtu2048,
            op_vls_cap: 4,
        };
        assert_eq!(p.needed_lids(2), 4);
    }

    #[test]
    fn mtu_min_picks_smaller() {
        assert_eq!(Mtu::Mtu1024.min(Mtu::Mtu256), Mtu::Mtu256);
        assert_eq!(Mtu::Mtu512.min(Mtu::Mtu4096), Mtu::Mtu512);
    }
}

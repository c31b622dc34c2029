//! Configuration options consumed by the manager (spec §6). No CLI surface
//! is exposed by this crate itself — parsing/wiring these from an actual
//! config file or command line is the embedding binary's job.

use crate::lid::Lid;

#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Size of the per-port LID range: `N = 2^lmc`, in `[0, 7]`.
    pub lmc: u8,
    /// Highest LID this subnet may assign (spec §3).
    pub max_unicast_lid: Lid,
    /// On the first master sweep, ignore persistent and discovered
    /// assignments entirely.
    pub reassign_lids: bool,
    /// When coming out of standby, whether to reload the on-disk
    /// persistent map (`true`) or start clean (`false`).
    pub honor_guid2lid_file: bool,
    /// Whether a failed persistent-store load aborts the process.
    pub exit_on_fatal: bool,
    /// Suppress the ClientReregister bit.
    pub no_clients_rereg: bool,

    /// Overlaid verbatim into PortInfo.
    pub m_key: u64,
    pub subnet_prefix: u64,
    pub m_key_lease_period: u16,
    pub subnet_timeout: u8,
    pub local_phy_errors_threshold: u8,
    pub overrun_errors_threshold: u8,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            lmc: 0,
            max_unicast_lid: 0xBFFF,
            reassign_lids: false,
            honor_guid2lid_file: true,
            exit_on_fatal: false,
            no_clients_rereg: false,
            m_key: 0,
            subnet_prefix: 0xFE80_0000_0000_0000,
            m_key_lease_period: 0,
            subnet_timeout: 18,
            local_phy_errors_threshold: 0xF,
            overrun_errors_threshold: 0xF,
        }
    }
}

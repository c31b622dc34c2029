//! Cross-component sweep scenarios (S1–S6) and the universal invariants
//! from spec.md §8, exercised end-to-end through `LidManager` with the
//! in-memory reference implementations of the three external traits.

use lid_manager::{
    Config, Guid, InMemoryGuid2LidStore, LidManager, Mtu, PeerInfo, Port, PortCapFlags, PortClass, RecordingTransport,
    Signal, VecPortLidTable,
};

fn port(guid: u64, current_base_lid: Option<u16>) -> Port {
    Port {
        guid: Guid(guid),
        node_guid: Guid(guid),
        port_num: 1,
        class: PortClass::Other,
        current_base_lid,
        peer: None::<PeerInfo>,
        is_new: true,
        capabilities: PortCapFlags::empty(),
        link_width_supported: 1,
        mtu_cap: Mtu::Mtu2048,
        op_vls_cap: 4,
    }
}

fn manager(config: Config, sm_guid: Guid) -> LidManager {
    LidManager::new(
        config,
        Box::new(InMemoryGuid2LidStore::new()),
        Box::new(VecPortLidTable::new()),
        Box::new(RecordingTransport::default()),
        sm_guid,
    )
    .unwrap()
}

fn lmc2_config() -> Config {
    Config { lmc: 2, max_unicast_lid: 0x00FF, ..Default::default() }
}

/// S1: no persistent entries, two fresh ports -> sequential 4-aligned
/// blocks starting at the first legal LID.
#[test]
fn s1_empty_subnet_allocates_sequential_aligned_blocks() {
    let mgr = manager(lmc2_config(), Guid(0xA));
    let ports = [port(0xA, None), port(0xB, None)];

    mgr.process_sm(&ports, true, false);
    mgr.process_subnet(&ports, true);

    assert_eq!(mgr.master_sm_base_lid(), 4);
}

/// S2: no persistent entries, port advertises a LID that is already
/// 4-aligned and free -> it is kept, unchanged.
#[test]
fn s2_keeps_aligned_advertised_lid() {
    let mgr = manager(lmc2_config(), Guid(0xA));
    let ports = [port(0xA, Some(16))];

    mgr.process_sm(&ports, true, false);
    assert_eq!(mgr.master_sm_base_lid(), 16);
}

/// S3: port advertises a misaligned LID -> reassigned to the first free
/// aligned block instead.
#[test]
fn s3_misaligned_advertised_lid_is_reassigned() {
    let mgr = manager(lmc2_config(), Guid(0xA));
    let ports = [port(0xA, Some(14))]; // not 4-aligned under lmc=2

    mgr.process_sm(&ports, true, false);
    assert_eq!(mgr.master_sm_base_lid(), 4);
}

/// S4: persistent hit whose min matches the advertised base -> kept,
/// unchanged, no PortInfoSet beyond the forced first-sweep resync.
#[test]
fn s4_persistent_hit_matching_advertised_is_unchanged() {
    let config = lmc2_config();
    let mgr = manager(config, Guid(0xA));
    let ports = [port(0xA, Some(32))];

    // Prime the persistent store via a first sweep that allocates [32,35]
    // is not directly reachable without the store trait being exposed
    // externally here, so instead assert the natural outcome of running
    // two sweeps with an unchanged, already-aligned advertised LID: the
    // second sweep's persistent hit keeps it in place.
    mgr.process_sm(&ports, true, false);
    mgr.process_subnet(&ports, true);
    assert_eq!(mgr.master_sm_base_lid(), 32);

    let second = mgr.process_sm(&ports, false, false);
    assert_eq!(second, Signal::Done);
    assert_eq!(mgr.master_sm_base_lid(), 32);
}

/// S6: a subnet too small for every port to get its LMC-aligned range
/// trips the documented fatal exhaustion path.
#[test]
#[should_panic(expected = "LID space exhausted")]
fn s6_lid_exhaustion_panics() {
    let config = Config { lmc: 2, max_unicast_lid: 7, ..Default::default() };
    let mgr = manager(config, Guid(1));
    let ports = [port(1, None), port(2, None), port(3, None)];

    mgr.process_sm(&ports, true, false);
    mgr.process_subnet(&ports, true);
}

/// Invariant 5 (Idempotence): two successive sweeps with unchanged inputs
/// emit zero PortInfoSet requests on the second sweep.
#[test]
fn invariant_idempotence_across_sweeps() {
    let mgr = manager(lmc2_config(), Guid(0xA));
    let ports = [port(0xA, None), port(0xB, None), port(0xC, None)];

    mgr.process_sm(&ports, true, false);
    mgr.process_subnet(&ports, true);

    let sm_signal = mgr.process_sm(&ports, false, false);
    let subnet_signal = mgr.process_subnet(&ports, false);
    assert_eq!(sm_signal, Signal::Done);
    assert_eq!(subnet_signal, Signal::Done);
}

/// Invariant 6 (Stability): with `reassign_lids=false` and nothing about
/// the topology changed, every port keeps the base LID it had before.
#[test]
fn invariant_stability_keeps_base_lid_across_sweeps() {
    let mgr = manager(lmc2_config(), Guid(0xA));
    let ports = [port(0xA, None), port(0xB, None)];

    mgr.process_sm(&ports, true, false);
    mgr.process_subnet(&ports, true);
    let sm_lid_first = mgr.master_sm_base_lid();

    mgr.process_sm(&ports, false, false);
    mgr.process_subnet(&ports, false);
    let sm_lid_second = mgr.master_sm_base_lid();

    assert_eq!(sm_lid_first, sm_lid_second);
}

/// Invariant 7 (Reassignment): on the first master sweep with
/// `reassign_lids=true`, every port is allocated fresh starting at the
/// lowest legal LID regardless of any prior advertised base.
#[test]
fn invariant_reassignment_shortcut_ignores_prior_state() {
    let config = Config { lmc: 2, max_unicast_lid: 0x00FF, reassign_lids: true, ..Default::default() };
    let mgr = manager(config, Guid(0xA));
    let ports = [port(0xA, Some(0x80))];

    mgr.process_sm(&ports, true, false);
    assert_eq!(mgr.master_sm_base_lid(), 4);
}

mod common;

use common::{fast_config, lock, FakeDevice, FakeHost, ReadStep};
use motelink::config::MAX_SLOTS;
use motelink::discovery::{discover, scan, Deduplicator};
use motelink::ids::DEVICE_PATH_KEY_LEN;
use motelink::report::led_pattern;
use motelink::{DeviceIds, DevicePath, KnownDevices, Roster, SlotSource, TransportConfig};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn path(n: usize) -> String {
    format!(r"\\?\hid#{{00001124-0000-1000-8000-00805f9b34fb}}_vid&0002057e_pid&0306#{n}")
}

fn roster(host: &Arc<FakeHost>) -> Roster<FakeHost> {
    Roster::with_shared_backend(Arc::clone(host), fast_config())
}

#[test]
fn single_controller_is_found_and_connected() {
    let host = Arc::new(FakeHost::new());
    host.add(&path(0), FakeDevice::controller());
    let mut roster = roster(&host);

    assert_eq!(roster.find_devices(4), 1);
    let dev = roster.slot(0).expect("slot 0 filled");
    assert!(dev.is_connected());
    assert_eq!(dev.path(), &DevicePath::from(path(0)));
    assert_eq!(roster.connected_count(), 1);
}

#[test]
fn failed_handshake_leaves_slot_empty_and_retryable() {
    let host = Arc::new(FakeHost::new());
    let state = host.add(&path(0), FakeDevice::mute_controller());
    let mut roster = roster(&host);

    assert_eq!(roster.find_devices(4), 0);
    assert!(roster.slot(0).is_none());
    assert_eq!(host.live_handles(), 0);

    lock(&state).answers_status = true;
    assert_eq!(roster.find_devices(4), 1);
    assert!(roster.slot(0).is_some_and(|d| d.is_connected()));
}

#[test]
fn mute_controller_does_not_use_up_the_scan_quota() {
    let host = Arc::new(FakeHost::new());
    host.add(&path(0), FakeDevice::mute_controller());
    host.add(&path(1), FakeDevice::controller());
    let mut roster = roster(&host);

    assert_eq!(roster.find_devices(1), 1);
    assert_eq!(roster.slot(0).map(|d| d.path().clone()), Some(DevicePath::from(path(1))));
    assert_eq!(host.opens(), 2);
    assert_eq!(host.live_handles(), 1);
}

#[test]
fn roster_never_has_more_slots_than_leds() {
    let host = Arc::new(FakeHost::new());
    for n in 0..6 {
        host.add(&path(n), FakeDevice::controller());
    }
    let config = TransportConfig {
        slot_sources: vec![SlotSource::Real; 6],
        ..fast_config()
    };
    let mut roster = Roster::with_shared_backend(Arc::clone(&host), config);

    assert_eq!(roster.capacity(), MAX_SLOTS);
    assert_eq!(roster.find_devices(6), MAX_SLOTS);
    let leds: HashSet<u8> = roster.devices().map(|d| led_pattern(d.index())).collect();
    assert_eq!(leds.len(), MAX_SLOTS);
}

#[test]
fn repeated_scans_do_not_duplicate_or_reopen() {
    let host = Arc::new(FakeHost::new());
    host.add(&path(0), FakeDevice::controller());
    let mut roster = roster(&host);

    assert_eq!(roster.find_devices(4), 1);
    assert_eq!(roster.find_devices(4), 1);
    assert_eq!(roster.find_devices(4), 1);

    assert_eq!(roster.occupied_count(), 1);
    assert_eq!(host.opens(), 1);
}

#[test]
fn path_listed_twice_is_opened_once() {
    let host = Arc::new(FakeHost::new());
    host.add(&path(0), FakeDevice::controller());
    host.list_again(&path(0));
    let mut roster = roster(&host);

    assert_eq!(roster.find_devices(4), 1);
    assert_eq!(host.opens(), 1);
}

#[test]
fn unknown_ids_get_no_slot_and_no_handle() {
    let host = Arc::new(FakeHost::new());
    host.add(&path(0), FakeDevice::other(DeviceIds::new(0x046d, 0xc52b)));
    host.add(&path(1), FakeDevice { ids: None, ..FakeDevice::controller() });
    let mut roster = roster(&host);

    assert_eq!(roster.find_devices(4), 0);
    assert_eq!(host.opens(), 2);
    assert_eq!(host.live_handles(), 0);
}

#[test]
fn unopenable_paths_are_skipped() {
    let host = Arc::new(FakeHost::new());
    host.add(&path(0), FakeDevice { openable: false, ..FakeDevice::controller() });
    host.add(&path(1), FakeDevice::controller());
    let mut roster = roster(&host);

    assert_eq!(roster.find_devices(4), 1);
    assert_eq!(roster.slot(0).map(|d| d.path().clone()), Some(DevicePath::from(path(1))));
}

#[test]
fn paths_equal_in_key_prefix_are_one_device() {
    let base = "x".repeat(DEVICE_PATH_KEY_LEN);
    let host = Arc::new(FakeHost::new());
    host.add(&format!("{base}-a"), FakeDevice::controller());
    host.add(&format!("{base}-b"), FakeDevice::controller());
    let mut roster = roster(&host);

    assert_eq!(roster.find_devices(4), 1);
    assert_eq!(host.opens(), 1);
}

#[test]
fn max_limits_how_many_are_taken() {
    let host = Arc::new(FakeHost::new());
    for n in 0..3 {
        host.add(&path(n), FakeDevice::controller());
    }
    let mut roster = roster(&host);

    assert_eq!(roster.find_devices(2), 2);
    assert_eq!(host.opens(), 2);
    assert_eq!(roster.find_devices(2), 2);
    assert_eq!(roster.find_devices(10), 3);
    assert!(roster.slot(2).is_some());
}

#[test]
fn slots_not_accepting_real_controllers_are_skipped() {
    let host = Arc::new(FakeHost::new());
    for n in 0..3 {
        host.add(&path(n), FakeDevice::controller());
    }
    let config = TransportConfig {
        slot_sources: vec![
            SlotSource::Emulated,
            SlotSource::Real,
            SlotSource::None,
            SlotSource::Hybrid,
        ],
        ..fast_config()
    };
    let mut roster = Roster::with_shared_backend(Arc::clone(&host), config);

    assert_eq!(roster.find_devices(4), 2);
    assert!(roster.slot(0).is_none());
    assert_eq!(roster.slot(1).map(|d| d.index()), Some(1));
    assert!(roster.slot(2).is_none());
    assert_eq!(roster.slot(3).map(|d| d.index()), Some(3));
    assert_eq!(host.live_handles(), 2);
}

#[test]
fn slot_led_follows_assigned_slot() {
    let host = Arc::new(FakeHost::new());
    let state = host.add(&path(0), FakeDevice::controller());
    let config = TransportConfig {
        slot_sources: vec![SlotSource::Emulated, SlotSource::Hybrid],
        ..fast_config()
    };
    let mut roster = Roster::with_shared_backend(Arc::clone(&host), config);

    assert_eq!(roster.find_devices(2), 1);
    let last = lock(&state).writes.last().map(|w| w.data[..2].to_vec());
    assert_eq!(last, Some(vec![0x11, 0x20]));
}

#[test]
fn enumeration_failure_keeps_current_roster() {
    let host = Arc::new(FakeHost::new());
    host.add(&path(0), FakeDevice::controller());
    host.add(&path(1), FakeDevice::controller());
    let mut roster = roster(&host);
    assert_eq!(roster.find_devices(1), 1);

    host.fail_enumeration.store(true, Ordering::SeqCst);
    assert_eq!(roster.find_devices(4), 1);
}

#[test]
fn dropped_controller_stays_tracked_and_reconnects() {
    let host = Arc::new(FakeHost::new());
    let state = host.add(&path(0), FakeDevice::controller());
    let mut roster = roster(&host);
    assert_eq!(roster.find_devices(4), 1);

    lock(&state).reads.push_back(ReadStep::Gone);
    let dev = roster.slot_mut(0).expect("tracked");
    assert!(dev.read().is_none());
    assert!(!dev.is_connected());

    // Still tracked, so a scan does not pick the path up again.
    assert_eq!(roster.find_devices(4), 1);
    assert_eq!(host.opens(), 1);
    assert_eq!(roster.connected_count(), 0);

    assert_eq!(roster.reconnect_all(), 1);
    assert_eq!(roster.connected_count(), 1);
}

#[test]
fn removing_a_record_frees_slot_and_handle() {
    let host = Arc::new(FakeHost::new());
    host.add(&path(0), FakeDevice::controller());
    let mut roster = roster(&host);
    assert_eq!(roster.find_devices(4), 1);

    drop(roster.remove(0));
    assert_eq!(roster.occupied_count(), 0);
    assert_eq!(host.live_handles(), 0);

    assert_eq!(roster.find_devices(4), 1);
}

#[test]
fn status_json_reports_each_slot() {
    let host = Arc::new(FakeHost::new());
    host.add(&path(0), FakeDevice::controller());
    let mut roster = roster(&host);
    roster.find_devices(4);

    let json: serde_json::Value =
        serde_json::from_str(&roster.status_json().unwrap()).unwrap();
    let first = &json[0];
    assert_eq!(first["index"], 0);
    assert_eq!(first["connected"], true);
    assert_eq!(first["write_strategy"], "raw_write");
    assert_eq!(first["path"], path(0));
}

#[test]
fn discover_honors_existing_set_and_quota() {
    let host = FakeHost::new();
    for n in 0..4 {
        host.add(&path(n), FakeDevice::controller());
    }
    let existing: Deduplicator = [DevicePath::from(path(0))].into_iter().collect();

    let found = discover(&host, &existing, &KnownDevices::default(), 2).unwrap();
    let paths: Vec<_> = found.iter().map(|c| c.path.clone()).collect();
    assert_eq!(paths, vec![DevicePath::from(path(1)), DevicePath::from(path(2))]);
    assert_eq!(host.opens(), 2);

    assert!(discover(&host, &existing, &KnownDevices::default(), 0)
        .unwrap()
        .is_empty());
}

#[test]
fn scan_opens_only_as_far_as_it_is_pulled() {
    let host = FakeHost::new();
    host.add(&path(0), FakeDevice::other(DeviceIds::new(0x046d, 0xc52b)));
    host.add(&path(1), FakeDevice::controller());
    host.add(&path(2), FakeDevice::controller());
    let known = KnownDevices::default();

    let mut found = scan(&host, &Deduplicator::new(), &known).unwrap();
    let first = found.next().expect("controller");
    assert_eq!(first.path, DevicePath::from(path(1)));
    assert_eq!(host.opens(), 2);
    assert_eq!(host.live_handles(), 1);
}

proptest! {
    #[test]
    fn any_listing_yields_unique_tracked_paths(listing in proptest::collection::vec(0usize..6, 0..16)) {
        let host = Arc::new(FakeHost::new());
        let mut added = HashSet::new();
        for &n in &listing {
            if added.insert(n) {
                host.add(&path(n), FakeDevice::controller());
            } else {
                host.list_again(&path(n));
            }
        }
        let mut roster = roster(&host);

        let first = roster.find_devices(4);
        let second = roster.find_devices(4);
        prop_assert_eq!(first, added.len().min(4));
        prop_assert_eq!(second, first);

        let tracked: HashSet<DevicePath> = roster.devices().map(|d| d.path().clone()).collect();
        prop_assert_eq!(tracked.len(), roster.occupied_count());
        prop_assert_eq!(host.live_handles(), roster.occupied_count());
    }

    #[test]
    fn only_the_key_prefix_identifies_a_path(
        prefix in proptest::collection::vec(any::<u8>(), DEVICE_PATH_KEY_LEN),
        a in proptest::collection::vec(any::<u8>(), 0..8),
        b in proptest::collection::vec(any::<u8>(), 0..8),
    ) {
        let pa = DevicePath::from_bytes([prefix.as_slice(), a.as_slice()].concat());
        let pb = DevicePath::from_bytes([prefix.as_slice(), b.as_slice()].concat());
        prop_assert_eq!(&pa, &pb);

        let mut dedup = Deduplicator::new();
        prop_assert!(dedup.track(pa));
        prop_assert!(!dedup.track(pb));
    }
}

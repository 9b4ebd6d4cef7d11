//! Controller roster: a fixed set of slots filled by discovery.
//!
//! [`Roster::find_devices`] is the discovery entry point. It
//! - skips every path already held by a slot (connected or not),
//! - opens and handshakes each new recognized device,
//! - places it in the first empty slot whose [`SlotSource`] allows a real device,
//! - discards records whose handshake fails, leaving the slot empty for a later scan.
//!
//! Records leave the roster only through [`Roster::remove`]. A device that drops
//! mid-read stays in its slot, disconnected, and can be brought back with
//! [`Roster::reconnect_all`] or [`ManagedDevice::connect`].

use crate::backends::HidBackend;
use crate::config::{SlotSource, TransportConfig, MAX_SLOTS};
use crate::device::ManagedDevice;
use crate::discovery::{self, Deduplicator};
use crate::error::Result;
use crate::metadata::DeviceStatus;
use std::sync::Arc;
use tracing::{error, warn};

pub struct Roster<B: HidBackend> {
    backend: Arc<B>,
    config: TransportConfig,
    slots: Vec<Option<ManagedDevice<B>>>,
}

impl<B: HidBackend> Roster<B> {
    /// Empty roster with one slot per configured [`SlotSource`], at most
    /// [`MAX_SLOTS`].
    pub fn new(backend: B, config: TransportConfig) -> Self {
        Self::with_shared_backend(Arc::new(backend), config)
    }

    pub fn with_shared_backend(backend: Arc<B>, config: TransportConfig) -> Self {
        let slots = config
            .slot_sources
            .iter()
            .take(MAX_SLOTS)
            .map(|_| None)
            .collect();
        Self {
            backend,
            config,
            slots,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn slot(&self, index: usize) -> Option<&ManagedDevice<B>> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut ManagedDevice<B>> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Every occupied slot, in slot order.
    pub fn devices(&self) -> impl Iterator<Item = &ManagedDevice<B>> {
        self.slots.iter().flatten()
    }

    pub fn devices_mut(&mut self) -> impl Iterator<Item = &mut ManagedDevice<B>> {
        self.slots.iter_mut().flatten()
    }

    /// Take a record out of its slot, freeing the slot. Dropping the returned
    /// device closes its handle.
    pub fn remove(&mut self, index: usize) -> Option<ManagedDevice<B>> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub fn occupied_count(&self) -> usize {
        self.devices().count()
    }

    pub fn connected_count(&self) -> usize {
        self.devices().filter(|d| d.is_connected()).count()
    }

    /// Scan for new controllers until `max` slots are occupied.
    ///
    /// Candidates are connected as the scan yields them, so one whose
    /// handshake fails does not use up room meant for a working controller
    /// later in the listing.
    ///
    /// Returns the number of occupied slots afterwards (records found by
    /// earlier scans plus the ones connected now).
    pub fn find_devices(&mut self, max: usize) -> usize {
        let max = max.min(self.capacity());
        if self.occupied_count() >= max {
            return self.occupied_count();
        }

        let backend = Arc::clone(&self.backend);
        let known = self.config.known_devices.clone();
        let tracked: Deduplicator = self.devices().map(|d| d.path()).collect();
        let mut scan = match discovery::scan(backend.as_ref(), &tracked, &known) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "device enumeration failed");
                return self.occupied_count();
            }
        };

        let settings = self.config.io_settings();
        while self.occupied_count() < max {
            let Some(index) = self.free_real_slot() else {
                warn!("no free slot accepts a real controller");
                break;
            };
            let Some(candidate) = scan.next() else {
                break;
            };

            let mut dev = ManagedDevice::with_handle(
                index,
                candidate.path,
                candidate.handle,
                Arc::clone(&backend),
                settings,
            );

            if dev.connect() {
                self.slots[index] = Some(dev);
            } else {
                error!(slot = index + 1, "unable to connect to controller");
            }
        }

        self.occupied_count()
    }

    /// Retry [`ManagedDevice::connect`] for every tracked device that is not
    /// connected. Returns how many came back.
    pub fn reconnect_all(&mut self) -> usize {
        self.devices_mut()
            .filter(|d| !d.is_connected())
            .map(|d| d.connect())
            .filter(|&ok| ok)
            .count()
    }

    pub fn statuses(&self) -> Vec<DeviceStatus> {
        self.devices().map(DeviceStatus::of).collect()
    }

    /// [`statuses`](Self::statuses) as a JSON array.
    pub fn status_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.statuses())?)
    }

    fn free_real_slot(&self) -> Option<usize> {
        self.slots
            .iter()
            .zip(&self.config.slot_sources)
            .position(|(slot, source)| slot.is_none() && SlotSource::allows_real(*source))
    }
}

//! Device status snapshot.
//!
//! [`DeviceStatus`] is a lightweight, serializable description of one roster
//! slot, suitable for UI display and logging. It is taken by value; it does not
//! track the device afterwards.

use crate::backends::HidBackend;
use crate::device::ManagedDevice;
use crate::stack::WriteStrategy;
use serde::Serialize;

/// Snapshot of one tracked device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceStatus {
    /// Roster slot (0-based).
    pub index: usize,
    /// Host device path, lossily decoded for display.
    pub path: String,
    pub connected: bool,
    /// Write path pinned for this device, `undetected` before the first write.
    pub write_strategy: WriteStrategy,
}

impl DeviceStatus {
    pub fn of<B: HidBackend>(dev: &ManagedDevice<B>) -> Self {
        Self {
            index: dev.index(),
            path: dev.path().to_string_lossy().into_owned(),
            connected: dev.is_connected(),
            write_strategy: dev.write_strategy(),
        }
    }
}

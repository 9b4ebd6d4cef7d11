//! Platform backends for `motelink`.
//!
//! The transport core ([`ManagedDevice`](crate::device::ManagedDevice),
//! [`Roster`](crate::manager::Roster), [`PairingManager`](crate::pairing::PairingManager))
//! is written against the traits in this module. A backend supplies the handful
//! of host primitives those need:
//!
//! - [`HidBackend`]: list HID interface paths and open one.
//! - [`HidHandle`]: attributes, overlapped-style read steps, and the two write strategies.
//! - [`IoContext`]: the per-device buffer + synchronization primitive.
//! - [`BluetoothBackend`]: radio/device enumeration and service toggling for pairing.
//!
//! # Feature flags
//! - **`hid`**: enables the Windows backend (default).
//! - **`hidapi-backend`**: enables the `hidapi`-based HID backend.
//!
//! The read contract mirrors overlapped I/O: a read is *started*; it either
//! completes at once, is pending, or reports that the device is gone. A pending
//! read is *waited* on with a timeout and then either *finished* or *cancelled*.

use crate::error::Result;
use crate::ids::{DeviceIds, DevicePath};
use crate::report::Payload;
use std::time::Duration;

#[cfg(feature = "hidapi-backend")]
#[cfg_attr(docsrs, doc(cfg(feature = "hidapi-backend")))]
pub mod hid;

#[cfg(all(feature = "hid", target_os = "windows"))]
#[cfg_attr(docsrs, doc(cfg(all(feature = "hid", target_os = "windows"))))]
pub mod windows;

/// Result of starting a read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadStart {
    /// Data landed in the context buffer immediately.
    Completed(usize),
    /// The read is in flight; wait on the context.
    Pending,
    /// End-of-stream or device-not-connected: the device is gone.
    Disconnected,
}

/// Result of waiting on a pending read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    Signalled,
    TimedOut,
    Failed,
}

/// Result of the output-report API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Report accepted; number of bytes handed to the stack.
    Sent(usize),
    Failed,
    /// The stack reported a semaphore-timeout-class error right after the call.
    /// The device is treated as unreachable.
    SemaphoreTimeout,
}

/// Per-device asynchronous I/O state: the read buffer and its completion signal.
pub trait IoContext: Send {
    /// Buffer reads land in. Stays valid for the lifetime of the context.
    fn buffer(&mut self) -> &mut Payload;

    /// Return the synchronization primitive to the unsignalled state.
    fn reset(&mut self);
}

/// One open device handle. Dropping it releases the OS resource.
pub trait HidHandle: Send {
    type Context: IoContext;

    /// Vendor/product ids of the opened device, if the host reports them.
    fn attributes(&self) -> Option<DeviceIds>;

    /// Create a fresh I/O context in the signalled state with a zero offset.
    fn create_context(&self) -> Result<Self::Context>;

    /// Issue a read into `ctx`'s buffer.
    fn start_read(&mut self, ctx: &mut Self::Context) -> ReadStart;

    /// Block up to `timeout` for a pending read to complete.
    fn wait(&mut self, ctx: &mut Self::Context, timeout: Duration) -> WaitOutcome;

    /// Cancel any read still outstanding on this handle.
    fn cancel_io(&mut self, ctx: &mut Self::Context);

    /// Collect the result of a completed pending read.
    fn finish_read(&mut self, ctx: &mut Self::Context) -> Option<usize>;

    /// Write `data` straight to the handle. Returns bytes written, `0` on failure.
    fn write_raw(&mut self, ctx: &mut Self::Context, data: &[u8]) -> usize;

    /// Send `data` through the host's output-report API.
    fn set_output_report(&mut self, data: &[u8]) -> ReportOutcome;
}

/// Source of HID interfaces.
///
/// Shared by every device record, so it must be safe to use from several
/// device workers at once.
pub trait HidBackend: Send + Sync {
    type Handle: HidHandle;

    /// Paths of every HID interface currently present. An empty list is not an error.
    fn interface_paths(&self) -> Result<Vec<DevicePath>>;

    /// Open `path` for shared, non-blocking read/write access.
    fn open(&self, path: &DevicePath) -> Result<Self::Handle>;
}

/// Context type of a backend's handles.
pub type ContextOf<B> = <<B as HidBackend>::Handle as HidHandle>::Context;

/// 48-bit Bluetooth device address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BluetoothAddress(pub u64);

impl std::fmt::Display for BluetoothAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = self.0.to_be_bytes();
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

/// A Bluetooth device as seen by one radio.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BluetoothDevice {
    pub address: BluetoothAddress,
    pub name: String,
    pub class_of_device: u32,
    pub connected: bool,
    pub remembered: bool,
    pub authenticated: bool,
}

/// Which devices a radio enumeration should return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceQuery {
    pub return_authenticated: bool,
    pub return_remembered: bool,
    pub return_unknown: bool,
    pub return_connected: bool,
    pub issue_inquiry: bool,
    /// Inquiry duration in units of 1.28 s.
    pub timeout_multiplier: u8,
}

impl DeviceQuery {
    /// Everything the radio knows about, plus a fresh inquiry scan.
    pub fn everything(timeout_multiplier: u8) -> Self {
        Self {
            return_authenticated: true,
            return_remembered: true,
            return_unknown: true,
            return_connected: true,
            issue_inquiry: true,
            timeout_multiplier,
        }
    }
}

/// Host Bluetooth stack operations used by pairing.
pub trait BluetoothBackend {
    type Radio;

    /// Every radio on the host. An empty list means pairing cannot proceed.
    fn radios(&self) -> Result<Vec<Self::Radio>>;

    /// Devices known to `radio`.
    fn devices(&self, radio: &Self::Radio, query: &DeviceQuery) -> Vec<BluetoothDevice>;

    /// Remove the host's pairing registration for `address`.
    fn remove_device(&self, address: BluetoothAddress) -> Result<()>;

    /// Enable the HID service class for `device` on `radio`.
    fn enable_hid_service(&self, radio: &Self::Radio, device: &BluetoothDevice) -> Result<()>;
}

//! Portable HID backend over `hidapi`.
//!
//! Emulates the overlapped read contract with `read_timeout`: `start_read` polls
//! with a zero timeout, `wait` blocks for the remainder. `hidapi` has no separate
//! output-report path from plain writes, so both write strategies land on
//! `HidDevice::write`, and a stack detection always pins the raw path.

use crate::backends::{HidBackend, HidHandle, IoContext, ReadStart, ReportOutcome, WaitOutcome};
use crate::error::{Result, TransportError};
use crate::ids::{DeviceIds, DevicePath};
use crate::report::{Payload, MAX_PAYLOAD};
use hidapi::{HidApi, HidDevice};
use std::ffi::CString;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

pub struct HidApiBackend {
    api: Mutex<HidApi>,
}

impl HidApiBackend {
    pub fn new() -> Result<Self> {
        Ok(Self {
            api: Mutex::new(HidApi::new()?),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HidApi> {
        // A panic mid-refresh leaves a stale but usable device list.
        self.api.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl HidBackend for HidApiBackend {
    type Handle = HidApiHandle;

    fn interface_paths(&self) -> Result<Vec<DevicePath>> {
        let mut api = self.lock();
        api.refresh_devices()?;
        Ok(api
            .device_list()
            .map(|info| DevicePath::from_bytes(info.path().to_bytes()))
            .collect())
    }

    fn open(&self, path: &DevicePath) -> Result<HidApiHandle> {
        let c_path = CString::new(path.as_bytes()).map_err(|_| TransportError::Open {
            path: path.to_string_lossy().into_owned(),
            reason: "path contains an interior NUL".into(),
        })?;

        let api = self.lock();
        let ids = api
            .device_list()
            .find(|info| info.path() == c_path.as_c_str())
            .map(|info| DeviceIds::new(info.vendor_id(), info.product_id()));

        let device = api.open_path(&c_path).map_err(|e| TransportError::Open {
            path: path.to_string_lossy().into_owned(),
            reason: e.to_string(),
        })?;

        Ok(HidApiHandle { device, ids })
    }
}

/// Read buffer plus the byte count of a read that completed during `wait`.
pub struct HidApiContext {
    buf: Payload,
    pending: Option<usize>,
}

impl IoContext for HidApiContext {
    fn buffer(&mut self) -> &mut Payload {
        &mut self.buf
    }

    fn reset(&mut self) {
        self.pending = None;
    }
}

pub struct HidApiHandle {
    device: HidDevice,
    ids: Option<DeviceIds>,
}

impl HidHandle for HidApiHandle {
    type Context = HidApiContext;

    fn attributes(&self) -> Option<DeviceIds> {
        self.ids
    }

    fn create_context(&self) -> Result<HidApiContext> {
        Ok(HidApiContext {
            buf: [0u8; MAX_PAYLOAD],
            pending: None,
        })
    }

    fn start_read(&mut self, ctx: &mut HidApiContext) -> ReadStart {
        ctx.pending = None;
        match self.device.read_timeout(&mut ctx.buf, 0) {
            Ok(0) => ReadStart::Pending,
            Ok(n) => ReadStart::Completed(n),
            Err(e) => {
                debug!(error = %e, "hidapi read failed");
                ReadStart::Disconnected
            }
        }
    }

    fn wait(&mut self, ctx: &mut HidApiContext, timeout: Duration) -> WaitOutcome {
        let ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        match self.device.read_timeout(&mut ctx.buf, ms) {
            Ok(0) => WaitOutcome::TimedOut,
            Ok(n) => {
                ctx.pending = Some(n);
                WaitOutcome::Signalled
            }
            Err(e) => {
                debug!(error = %e, "hidapi wait failed");
                WaitOutcome::Failed
            }
        }
    }

    // Nothing stays outstanding between calls.
    fn cancel_io(&mut self, _ctx: &mut HidApiContext) {}

    fn finish_read(&mut self, ctx: &mut HidApiContext) -> Option<usize> {
        ctx.pending.take()
    }

    fn write_raw(&mut self, _ctx: &mut HidApiContext, data: &[u8]) -> usize {
        self.device.write(data).unwrap_or(0)
    }

    fn set_output_report(&mut self, data: &[u8]) -> ReportOutcome {
        match self.device.write(data) {
            Ok(n) => ReportOutcome::Sent(n),
            Err(_) => ReportOutcome::Failed,
        }
    }
}

//! In-memory HID and Bluetooth hosts for integration tests.
#![allow(dead_code)]

use motelink::backends::{
    BluetoothAddress, BluetoothBackend, BluetoothDevice, DeviceQuery, HidBackend, HidHandle,
    IoContext, ReadStart, ReportOutcome, WaitOutcome,
};
use motelink::ids::{DeviceIds, WII_REMOTE};
use motelink::report::REPORT_STATUS;
use motelink::{DevicePath, Payload, Result, TransportError, MAX_PAYLOAD};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted read attempt.
#[derive(Clone, Debug)]
pub enum ReadStep {
    /// Completes inside `start_read`.
    Immediate(Vec<u8>),
    /// Pending, then signalled with these bytes.
    Delayed(Vec<u8>),
    /// Pending, then the wait times out.
    Timeout,
    /// Bytes land in the buffer but the wait still times out.
    Stray(Vec<u8>),
    WaitFailed,
    /// Signalled, but the transfer result reports failure.
    ResultFailed,
    /// End-of-stream: the device is gone.
    Gone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteKind {
    Raw,
    Report,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteRecord {
    pub kind: WriteKind,
    pub data: Vec<u8>,
}

/// Behavior of one simulated HID interface.
#[derive(Debug)]
pub struct FakeDevice {
    pub ids: Option<DeviceIds>,
    pub openable: bool,
    pub reads: VecDeque<ReadStep>,
    pub raw_accepts: bool,
    pub report: ReportOutcome,
    /// Queue a status report whenever an accepted write requests one.
    pub answers_status: bool,
    pub writes: Vec<WriteRecord>,
    pub cancels: usize,
    pub contexts_created: usize,
    /// Contexts dropped while a read was still outstanding on them.
    pub dropped_with_pending: usize,
    /// Buffer contents at each context reset, in order.
    pub reset_buffers: Vec<Payload>,
}

impl FakeDevice {
    /// A responsive Wii Remote on a raw-write stack.
    pub fn controller() -> Self {
        Self {
            ids: Some(WII_REMOTE),
            openable: true,
            reads: VecDeque::new(),
            raw_accepts: true,
            report: ReportOutcome::Failed,
            answers_status: true,
            writes: Vec::new(),
            cancels: 0,
            contexts_created: 0,
            dropped_with_pending: 0,
            reset_buffers: Vec::new(),
        }
    }

    /// A controller that never answers the handshake.
    pub fn mute_controller() -> Self {
        Self {
            answers_status: false,
            ..Self::controller()
        }
    }

    pub fn other(ids: DeviceIds) -> Self {
        Self {
            ids: Some(ids),
            ..Self::controller()
        }
    }

    fn record(&mut self, kind: WriteKind, data: &[u8], accepted: bool) {
        self.writes.push(WriteRecord {
            kind,
            data: data.to_vec(),
        });
        if accepted && self.answers_status && data.first() == Some(&0x15) {
            self.reads
                .push_front(ReadStep::Immediate(vec![REPORT_STATUS, 0x00, 0x00]));
        }
    }
}

pub type Shared = Arc<Mutex<FakeDevice>>;

/// Simulated host with a list of HID interfaces.
#[derive(Default)]
pub struct FakeHost {
    devices: Mutex<Vec<(DevicePath, Shared)>>,
    /// Extra path entries reported by enumeration (duplicates, vanished devices).
    listed_extra: Mutex<Vec<DevicePath>>,
    pub opens: AtomicUsize,
    pub live_handles: Arc<AtomicUsize>,
    pub fail_enumeration: AtomicBool,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, path: &str, dev: FakeDevice) -> Shared {
        let shared = Arc::new(Mutex::new(dev));
        lock(&self.devices).push((DevicePath::from(path), Arc::clone(&shared)));
        shared
    }

    /// Report `path` one more time during enumeration.
    pub fn list_again(&self, path: &str) {
        lock(&self.listed_extra).push(DevicePath::from(path));
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn live_handles(&self) -> usize {
        self.live_handles.load(Ordering::SeqCst)
    }
}

pub fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap()
}

impl HidBackend for FakeHost {
    type Handle = FakeHandle;

    fn interface_paths(&self) -> Result<Vec<DevicePath>> {
        if self.fail_enumeration.load(Ordering::SeqCst) {
            return Err(TransportError::Enumeration(13));
        }
        let mut paths: Vec<DevicePath> =
            lock(&self.devices).iter().map(|(p, _)| p.clone()).collect();
        paths.extend(lock(&self.listed_extra).iter().cloned());
        Ok(paths)
    }

    fn open(&self, path: &DevicePath) -> Result<FakeHandle> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let found = lock(&self.devices)
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, d)| Arc::clone(d));

        match found {
            Some(dev) if lock(&dev).openable => {
                self.live_handles.fetch_add(1, Ordering::SeqCst);
                Ok(FakeHandle {
                    dev,
                    live: Arc::clone(&self.live_handles),
                })
            }
            _ => Err(TransportError::Open {
                path: path.to_string(),
                reason: "not present".into(),
            }),
        }
    }
}

pub struct FakeHandle {
    dev: Shared,
    live: Arc<AtomicUsize>,
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct FakeContext {
    dev: Shared,
    buf: Payload,
    pending: Option<ReadStep>,
}

impl IoContext for FakeContext {
    fn buffer(&mut self) -> &mut Payload {
        &mut self.buf
    }

    fn reset(&mut self) {
        lock(&self.dev).reset_buffers.push(self.buf);
    }
}

impl Drop for FakeContext {
    fn drop(&mut self) {
        if self.pending.is_some() {
            if let Ok(mut dev) = self.dev.lock() {
                dev.dropped_with_pending += 1;
            }
        }
    }
}

fn fill(buf: &mut Payload, bytes: &[u8]) -> usize {
    let n = bytes.len().min(MAX_PAYLOAD);
    buf[..n].copy_from_slice(&bytes[..n]);
    n
}

impl HidHandle for FakeHandle {
    type Context = FakeContext;

    fn attributes(&self) -> Option<DeviceIds> {
        lock(&self.dev).ids
    }

    fn create_context(&self) -> Result<FakeContext> {
        lock(&self.dev).contexts_created += 1;
        Ok(FakeContext {
            dev: Arc::clone(&self.dev),
            buf: [0; MAX_PAYLOAD],
            pending: None,
        })
    }

    fn start_read(&mut self, ctx: &mut FakeContext) -> ReadStart {
        let step = lock(&self.dev)
            .reads
            .pop_front()
            .unwrap_or(ReadStep::Timeout);
        match step {
            ReadStep::Immediate(bytes) => ReadStart::Completed(fill(&mut ctx.buf, &bytes)),
            ReadStep::Gone => ReadStart::Disconnected,
            other => {
                ctx.pending = Some(other);
                ReadStart::Pending
            }
        }
    }

    fn wait(&mut self, ctx: &mut FakeContext, _timeout: Duration) -> WaitOutcome {
        match ctx.pending.clone() {
            Some(ReadStep::Delayed(bytes)) => {
                fill(&mut ctx.buf, &bytes);
                WaitOutcome::Signalled
            }
            Some(ReadStep::ResultFailed) => WaitOutcome::Signalled,
            Some(ReadStep::Stray(bytes)) => {
                fill(&mut ctx.buf, &bytes);
                WaitOutcome::TimedOut
            }
            Some(ReadStep::WaitFailed) => WaitOutcome::Failed,
            _ => WaitOutcome::TimedOut,
        }
    }

    fn cancel_io(&mut self, ctx: &mut FakeContext) {
        ctx.pending = None;
        lock(&self.dev).cancels += 1;
    }

    fn finish_read(&mut self, ctx: &mut FakeContext) -> Option<usize> {
        match ctx.pending.take() {
            Some(ReadStep::Delayed(bytes)) => Some(bytes.len()),
            _ => None,
        }
    }

    fn write_raw(&mut self, _ctx: &mut FakeContext, data: &[u8]) -> usize {
        let mut dev = lock(&self.dev);
        let accepted = dev.raw_accepts;
        dev.record(WriteKind::Raw, data, accepted);
        if accepted {
            data.len()
        } else {
            0
        }
    }

    fn set_output_report(&mut self, data: &[u8]) -> ReportOutcome {
        let mut dev = lock(&self.dev);
        let outcome = match dev.report {
            ReportOutcome::Sent(_) => ReportOutcome::Sent(data.len()),
            other => other,
        };
        dev.record(WriteKind::Report, data, matches!(outcome, ReportOutcome::Sent(_)));
        outcome
    }
}

/// One call made against [`FakeBluetooth`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BtCall {
    Remove(BluetoothAddress),
    Enable { radio: usize, address: BluetoothAddress },
}

/// Simulated Bluetooth stack. Every radio sees the same devices.
#[derive(Default)]
pub struct FakeBluetooth {
    pub radios: usize,
    pub devices: Vec<BluetoothDevice>,
    pub remove_fails: bool,
    pub enable_fails: bool,
    pub calls: Mutex<Vec<BtCall>>,
    pub queries: Mutex<Vec<DeviceQuery>>,
}

impl FakeBluetooth {
    pub fn with_devices(radios: usize, devices: Vec<BluetoothDevice>) -> Self {
        Self {
            radios,
            devices,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<BtCall> {
        lock(&self.calls).clone()
    }
}

pub fn bt_device(address: u64, name: &str, connected: bool, remembered: bool) -> BluetoothDevice {
    BluetoothDevice {
        address: BluetoothAddress(address),
        name: name.to_string(),
        class_of_device: 0x002504,
        connected,
        remembered,
        authenticated: remembered,
    }
}

impl BluetoothBackend for FakeBluetooth {
    type Radio = usize;

    fn radios(&self) -> Result<Vec<usize>> {
        Ok((0..self.radios).collect())
    }

    fn devices(&self, _radio: &usize, query: &DeviceQuery) -> Vec<BluetoothDevice> {
        lock(&self.queries).push(*query);
        self.devices.clone()
    }

    fn remove_device(&self, address: BluetoothAddress) -> Result<()> {
        lock(&self.calls).push(BtCall::Remove(address));
        if self.remove_fails {
            Err(TransportError::Bluetooth(0x490))
        } else {
            Ok(())
        }
    }

    fn enable_hid_service(&self, radio: &usize, device: &BluetoothDevice) -> Result<()> {
        lock(&self.calls).push(BtCall::Enable {
            radio: *radio,
            address: device.address,
        });
        if self.enable_fails {
            Err(TransportError::Bluetooth(0x57))
        } else {
            Ok(())
        }
    }
}

/// Settings with short reads, for test speed.
pub fn fast_config() -> motelink::TransportConfig {
    motelink::TransportConfig {
        read_timeout_ms: 1,
        ..Default::default()
    }
}

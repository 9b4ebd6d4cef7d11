#![cfg(target_os = "windows")]

//! Windows HID handle and overlapped I/O context.
//!
//! [`WinHidHandle`] owns a HID interface opened with `FILE_FLAG_OVERLAPPED`.
//! Reads are issued with `ReadFile` against a [`WinIoContext`], whose manual-reset
//! event signals completion. Writes go either straight through `WriteFile` (on
//! the context's separate write block, drained before returning) or through
//! `HidD_SetOutputReport`, depending on which the host stack accepts.
//!
//! Both types close their OS handles on drop.

use super::hid_binding::HidBinding;
use crate::backends::{HidHandle, IoContext, ReadStart, ReportOutcome, WaitOutcome};
use crate::error::{Result, TransportError};
use crate::ids::{DeviceIds, DevicePath};
use crate::report::{Payload, MAX_PAYLOAD};
use std::time::Duration;

use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, SetLastError, ERROR_DEVICE_NOT_CONNECTED, ERROR_HANDLE_EOF,
    ERROR_IO_PENDING, ERROR_SEM_TIMEOUT, GENERIC_READ, GENERIC_WRITE, HANDLE,
    INVALID_HANDLE_VALUE, WAIT_FAILED, WAIT_OBJECT_0, WAIT_TIMEOUT,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, ReadFile, WriteFile, FILE_FLAG_OVERLAPPED, FILE_SHARE_READ, FILE_SHARE_WRITE,
    OPEN_EXISTING,
};
use windows_sys::Win32::System::Threading::{CreateEventW, ResetEvent, WaitForSingleObject};
use windows_sys::Win32::System::IO::{CancelIo, GetOverlappedResult, OVERLAPPED};

/// Per-device overlapped I/O state.
///
/// Reads and raw writes each get their own event and `OVERLAPPED` block, so a
/// write never re-targets the block a read may still be using. The blocks and
/// the read buffer are boxed so their addresses stay put while I/O is in
/// flight, even if the context itself moves.
pub struct WinIoContext {
    event: HANDLE,
    overlapped: Box<OVERLAPPED>,
    buf: Box<Payload>,
    write_event: HANDLE,
    write_overlapped: Box<OVERLAPPED>,
}

// SAFETY: the event handles and the boxed OVERLAPPED blocks are only touched
// through `&mut self`, so moving the context between threads is sound.
unsafe impl Send for WinIoContext {}

/// Manual-reset, initially signalled, unnamed event.
fn create_event() -> Result<HANDLE> {
    use std::ptr::null;

    // SAFETY: all pointer arguments are null, which the API permits.
    let event = unsafe { CreateEventW(null(), 1, 1, null()) };
    if event as isize == 0 {
        // SAFETY: plain thread-local error query.
        let code = unsafe { GetLastError() };
        return Err(TransportError::IoContext(format!(
            "CreateEventW failed (os error {code})"
        )));
    }
    Ok(event)
}

fn overlapped_for(event: HANDLE) -> Box<OVERLAPPED> {
    // SAFETY: OVERLAPPED is plain data; all-zero is its documented initial state.
    let mut overlapped: Box<OVERLAPPED> = Box::new(unsafe { std::mem::zeroed() });
    overlapped.hEvent = event;
    overlapped
}

impl WinIoContext {
    /// Create both events and their `OVERLAPPED` blocks.
    pub fn new() -> Result<Self> {
        let event = create_event()?;
        let write_event = match create_event() {
            Ok(e) => e,
            Err(e) => {
                // SAFETY: `event` was just created and is not shared.
                unsafe { CloseHandle(event) };
                return Err(e);
            }
        };

        Ok(Self {
            event,
            overlapped: overlapped_for(event),
            buf: Box::new([0u8; MAX_PAYLOAD]),
            write_event,
            write_overlapped: overlapped_for(write_event),
        })
    }
}

impl IoContext for WinIoContext {
    fn buffer(&mut self) -> &mut Payload {
        &mut self.buf
    }

    fn reset(&mut self) {
        // SAFETY: `event` is a live event handle owned by this context.
        unsafe { ResetEvent(self.event) };
    }
}

impl Drop for WinIoContext {
    fn drop(&mut self) {
        // SAFETY: both events were created by `new` and are closed exactly once.
        unsafe {
            CloseHandle(self.event);
            CloseHandle(self.write_event);
        }
    }
}

/// Longest a raw write may stay pending before it is cancelled.
const WRITE_TIMEOUT_MS: u32 = 1000;

/// An open HID interface.
pub struct WinHidHandle {
    raw: HANDLE,
    binding: &'static HidBinding,
}

// SAFETY: a file handle may be used from any thread; all access goes through
// `&mut self` or read-only attribute queries.
unsafe impl Send for WinHidHandle {}

impl WinHidHandle {
    /// Open `path` for shared, overlapped read/write.
    pub fn open(path: &DevicePath, binding: &'static HidBinding) -> Result<Self> {
        use std::ptr::{null, null_mut};

        let display = path.to_string_lossy().into_owned();
        let wide: Vec<u16> = display.encode_utf16().chain(std::iter::once(0)).collect();

        // SAFETY: `wide` is NUL-terminated and outlives the call.
        let raw = unsafe {
            CreateFileW(
                wide.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                null(),
                OPEN_EXISTING,
                FILE_FLAG_OVERLAPPED,
                null_mut(),
            )
        };

        if raw == INVALID_HANDLE_VALUE {
            // SAFETY: plain thread-local error query.
            let code = unsafe { GetLastError() };
            return Err(TransportError::Open {
                path: display,
                reason: format!("CreateFileW failed (os error {code})"),
            });
        }

        Ok(Self { raw, binding })
    }
}

impl Drop for WinHidHandle {
    fn drop(&mut self) {
        // SAFETY: `raw` came from a successful CreateFileW and is closed exactly once.
        unsafe { CloseHandle(self.raw) };
    }
}

impl HidHandle for WinHidHandle {
    type Context = WinIoContext;

    fn attributes(&self) -> Option<DeviceIds> {
        self.binding
            .attributes(self.raw)
            .map(|(vid, pid)| DeviceIds::new(vid, pid))
    }

    fn create_context(&self) -> Result<WinIoContext> {
        WinIoContext::new()
    }

    fn start_read(&mut self, ctx: &mut WinIoContext) -> ReadStart {
        let mut read = 0u32;
        // SAFETY: the buffer and OVERLAPPED are boxed in `ctx` and outlive the
        // read: it either completes here or is finished/cancelled before reuse.
        let ok = unsafe {
            ReadFile(
                self.raw,
                ctx.buf.as_mut_ptr(),
                MAX_PAYLOAD as u32,
                &mut read,
                &mut *ctx.overlapped,
            )
        };
        if ok != 0 {
            return ReadStart::Completed(read as usize);
        }

        // SAFETY: plain thread-local error query.
        match unsafe { GetLastError() } {
            ERROR_HANDLE_EOF | ERROR_DEVICE_NOT_CONNECTED => ReadStart::Disconnected,
            _ => ReadStart::Pending,
        }
    }

    fn wait(&mut self, ctx: &mut WinIoContext, timeout: Duration) -> WaitOutcome {
        let ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        // SAFETY: `event` is a live event handle owned by `ctx`.
        match unsafe { WaitForSingleObject(ctx.event, ms) } {
            WAIT_TIMEOUT => WaitOutcome::TimedOut,
            WAIT_FAILED => WaitOutcome::Failed,
            _ => WaitOutcome::Signalled,
        }
    }

    fn cancel_io(&mut self, _ctx: &mut WinIoContext) {
        // SAFETY: `raw` is open; cancelling with nothing outstanding is harmless.
        unsafe { CancelIo(self.raw) };
    }

    fn finish_read(&mut self, ctx: &mut WinIoContext) -> Option<usize> {
        let mut read = 0u32;
        // SAFETY: `overlapped` is the block the read was issued with.
        let ok = unsafe { GetOverlappedResult(self.raw, &*ctx.overlapped, &mut read, 0) };
        (ok != 0).then_some(read as usize)
    }

    fn write_raw(&mut self, ctx: &mut WinIoContext, data: &[u8]) -> usize {
        let mut written = 0u32;
        // SAFETY: `data` outlives the call because a pending write is drained
        // below before returning; `write_overlapped` is boxed in `ctx`.
        let ok = unsafe {
            WriteFile(
                self.raw,
                data.as_ptr(),
                data.len() as u32,
                &mut written,
                &mut *ctx.write_overlapped,
            )
        };
        // The stack either takes the whole frame or fails outright, so success
        // means the full length.
        if ok != 0 {
            return data.len();
        }
        // SAFETY: plain thread-local error query.
        if unsafe { GetLastError() } != ERROR_IO_PENDING {
            return 0;
        }

        // SAFETY: `write_event` is a live event handle owned by `ctx`.
        let waited = unsafe { WaitForSingleObject(ctx.write_event, WRITE_TIMEOUT_MS) };
        if waited != WAIT_OBJECT_0 {
            // SAFETY: `raw` is open. No read is outstanding between read calls,
            // so this only cancels the write.
            unsafe { CancelIo(self.raw) };
        }
        // Blocks until the write has completed or been cancelled, so neither
        // `data` nor the block is in use once this returns.
        // SAFETY: `write_overlapped` is the block the write was issued with.
        let ok = unsafe { GetOverlappedResult(self.raw, &*ctx.write_overlapped, &mut written, 1) };
        if ok != 0 && waited == WAIT_OBJECT_0 {
            data.len()
        } else {
            0
        }
    }

    fn set_output_report(&mut self, data: &[u8]) -> ReportOutcome {
        // SAFETY: plain thread-local error write.
        unsafe { SetLastError(0) };
        let ok = self.binding.set_output_report(self.raw, data);
        // SAFETY: plain thread-local error query.
        let code = unsafe { GetLastError() };

        if code == ERROR_SEM_TIMEOUT {
            ReportOutcome::SemaphoreTimeout
        } else if ok {
            ReportOutcome::Sent(data.len())
        } else {
            ReportOutcome::Failed
        }
    }
}

//! Timeout-bounded reads and strategy-dispatched writes.
//!
//! ## Read
//! 1. Start a read into the context buffer.
//! 2. If the host says the device is gone, disconnect and return nothing.
//! 3. If the read is pending, wait up to the configured timeout:
//!    - timeout: no payload this time (normal "no report yet"),
//!    - wait failure: no payload,
//!    - signalled: collect the transfer result.
//!
//!    Every outcome except a collected transfer cancels the outstanding I/O, so
//!    the context never carries a live read into the next attempt.
//! 4. Frame the buffer (shift right one byte, prefix [`INPUT_REPORT_MARKER`]). This runs
//!    on every attempt that did not disconnect, including ones whose data is then
//!    discarded.
//! 5. Reset the context to unsignalled.
//!
//! ## Write
//! Dispatches through the pinned [`WriteStrategy`](crate::stack::WriteStrategy);
//! see [`stack`](crate::stack).
//!
//! [`INPUT_REPORT_MARKER`]: crate::report::INPUT_REPORT_MARKER

use crate::backends::{HidBackend, HidHandle, IoContext, ReadStart, WaitOutcome};
use crate::device::ManagedDevice;
use crate::report::{self, Payload};
use crate::stack::{self, WriteResult};
use tracing::{trace, warn};

/// How a read attempt ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReadEnd {
    Data,
    TimedOut,
    WaitFailed,
    ResultFailed,
    RemoteDisconnect,
}

impl<B: HidBackend> ManagedDevice<B> {
    /// Read one framed report, waiting at most the configured read timeout.
    ///
    /// Returns `None` when not connected, on timeout, on wait or transfer
    /// failure, and when the device has gone away (in which case the device is
    /// now disconnected).
    pub fn read(&mut self) -> Option<Payload> {
        if !self.is_connected() {
            return None;
        }
        let timeout = self.settings().read_timeout;
        let slot = self.index() + 1;

        let (handle, ctx) = match (self.handle.as_mut(), self.context.as_mut()) {
            (Some(h), Some(c)) => (h, c),
            _ => return None,
        };

        ctx.buffer().fill(0);

        let end = match handle.start_read(ctx) {
            ReadStart::Disconnected => ReadEnd::RemoteDisconnect,
            ReadStart::Completed(_) => ReadEnd::Data,
            ReadStart::Pending => match handle.wait(ctx, timeout) {
                WaitOutcome::TimedOut => {
                    if ctx.buffer()[0] != 0 {
                        warn!(
                            slot,
                            timeout_ms = timeout.as_millis() as u64,
                            "packet ignored; this may indicate a problem"
                        );
                    }
                    handle.cancel_io(ctx);
                    ReadEnd::TimedOut
                }
                WaitOutcome::Failed => {
                    warn!(slot, "a wait error occurred on reading from controller");
                    handle.cancel_io(ctx);
                    ReadEnd::WaitFailed
                }
                WaitOutcome::Signalled => match handle.finish_read(ctx) {
                    Some(_) => ReadEnd::Data,
                    None => {
                        handle.cancel_io(ctx);
                        ReadEnd::ResultFailed
                    }
                },
            },
        };

        if end == ReadEnd::RemoteDisconnect {
            self.disconnect();
            return None;
        }

        let buf = ctx.buffer();
        report::frame_input_report(buf);
        let payload = *buf;
        ctx.reset();

        trace!(slot, ?end, "read attempt finished");
        (end == ReadEnd::Data).then_some(payload)
    }

    /// Send one framed report (`payload[0]` is the output marker).
    ///
    /// Returns the byte count reported by the active strategy, or `0` when not
    /// connected or when the device turned out to be unreachable (in which case
    /// it is now disconnected).
    pub fn write(&mut self, payload: &[u8]) -> usize {
        if !self.is_connected() {
            return 0;
        }

        let result = match (self.handle.as_mut(), self.context.as_mut()) {
            (Some(handle), Some(ctx)) => stack::write(&mut self.strategy, handle, ctx, payload),
            _ => return 0,
        };

        match result {
            WriteResult::Written(n) => n,
            WriteResult::Unreachable => {
                self.disconnect();
                0
            }
        }
    }
}

//! Write-path Bluetooth stack detection.
//!
//! Hosts ship one of two incompatible HID write paths: some stacks accept a raw
//! fixed-size write on the device handle, others only accept reports through
//! the output-report API. Which one works is discovered on a device's first
//! write and then pinned for the lifetime of that device record.
//!
//! Known inaccuracy: some raw-write stacks report success even when nothing is
//! listening, so detection can pin [`WriteStrategy::RawWrite`] for a device that
//! is not actually reachable.

use crate::backends::{HidHandle, ReportOutcome};
use crate::report::raw_write_frame;
use serde::Serialize;

/// Pinned write strategy of one device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteStrategy {
    /// No write attempted yet.
    #[default]
    Undetected,
    /// Raw 22-byte writes on the handle.
    RawWrite,
    /// Output-report API with the full payload minus its marker byte.
    OutputReport,
}

/// What happened to one write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WriteResult {
    /// Passed through from the chosen strategy; may be `0`.
    Written(usize),
    /// The device must be disconnected; the caller sees `0`.
    Unreachable,
}

/// Send `payload` with the pinned strategy, detecting it first if needed.
///
/// `payload[0]` is the output marker byte and is never transmitted.
pub(crate) fn write<H: HidHandle>(
    strategy: &mut WriteStrategy,
    handle: &mut H,
    ctx: &mut H::Context,
    payload: &[u8],
) -> WriteResult {
    let body = payload.get(1..).unwrap_or(&[]);

    match *strategy {
        WriteStrategy::Undetected => {
            let written = handle.write_raw(ctx, &raw_write_frame(payload));
            if written != 0 {
                *strategy = WriteStrategy::RawWrite;
                tracing::debug!("write path: raw writes accepted, pinning raw strategy");
                return WriteResult::Written(written);
            }

            if let ReportOutcome::Sent(n) = handle.set_output_report(body) {
                if n != 0 {
                    *strategy = WriteStrategy::OutputReport;
                    tracing::debug!("write path: output reports accepted, pinning report strategy");
                    return WriteResult::Written(n);
                }
            }

            tracing::info!("write path: neither strategy reached the device");
            WriteResult::Unreachable
        }
        WriteStrategy::RawWrite => {
            WriteResult::Written(handle.write_raw(ctx, &raw_write_frame(payload)))
        }
        WriteStrategy::OutputReport => match handle.set_output_report(body) {
            ReportOutcome::Sent(n) => WriteResult::Written(n),
            ReportOutcome::Failed => WriteResult::Written(0),
            ReportOutcome::SemaphoreTimeout => {
                tracing::warn!("write path: semaphore timeout, unable to send data");
                WriteResult::Unreachable
            }
        },
    }
}

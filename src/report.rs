//! Payload framing shared by the read and write paths.
//!
//! Every payload handed to callers starts with a transaction marker byte that
//! the HID transport itself does not carry:
//! - reads are prefixed with [`INPUT_REPORT_MARKER`] after the raw frame is shifted right by one,
//! - writes are expected to carry [`OUTPUT_REPORT_MARKER`] in `payload[0]`, which is stripped
//!   before transmission.

/// Size of every read buffer and returned payload.
pub const MAX_PAYLOAD: usize = 23;

/// Bytes sent by the raw-write strategy (the payload minus its marker byte).
pub const RAW_WRITE_LEN: usize = MAX_PAYLOAD - 1;

/// Leading byte of every framed input report.
pub const INPUT_REPORT_MARKER: u8 = 0xA1;

/// Leading byte callers put in front of every output report.
pub const OUTPUT_REPORT_MARKER: u8 = 0xA2;

/// Output report: request a status report.
pub const REPORT_REQUEST_STATUS: u8 = 0x15;

/// Output report: set player LEDs.
pub const REPORT_SET_LEDS: u8 = 0x11;

/// Input report: status.
pub const REPORT_STATUS: u8 = 0x20;

/// LED bit for the first player slot; slot `n` lights `LED_1 << n`.
pub const LED_1: u8 = 0x10;

/// One framed payload, as returned by [`ManagedDevice::read`](crate::device::ManagedDevice::read).
pub type Payload = [u8; MAX_PAYLOAD];

/// Shift the raw frame right by one byte and write the input marker in front.
///
/// The last raw byte falls off the end of the buffer.
#[inline]
pub fn frame_input_report(buf: &mut Payload) {
    buf.copy_within(..MAX_PAYLOAD - 1, 1);
    buf[0] = INPUT_REPORT_MARKER;
}

/// Fixed-size slice used by the raw-write strategy: `payload[1..]`, zero padded
/// or truncated to [`RAW_WRITE_LEN`] bytes.
pub fn raw_write_frame(payload: &[u8]) -> [u8; RAW_WRITE_LEN] {
    let mut out = [0u8; RAW_WRITE_LEN];
    let body = payload.get(1..).unwrap_or(&[]);
    let n = body.len().min(RAW_WRITE_LEN);
    out[..n].copy_from_slice(&body[..n]);
    out
}

/// `true` if a framed payload carries a status report.
#[inline]
pub fn is_status_report(payload: &Payload) -> bool {
    payload[0] == INPUT_REPORT_MARKER && payload[1] == REPORT_STATUS
}

/// Framed status request, sent during the handshake.
pub const STATUS_REQUEST: [u8; 3] = [OUTPUT_REPORT_MARKER, REPORT_REQUEST_STATUS, 0x00];

/// LED pattern identifying a roster slot.
///
/// Only slots below [`MAX_SLOTS`](crate::config::MAX_SLOTS) get a distinct
/// pattern; the roster never creates more slots than that.
#[inline]
pub fn led_pattern(slot: usize) -> u8 {
    LED_1 << (slot % 4)
}

/// Framed LED report lighting the slot's player LED.
pub fn led_report(slot: usize) -> [u8; 3] {
    [OUTPUT_REPORT_MARKER, REPORT_SET_LEDS, led_pattern(slot)]
}

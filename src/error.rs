//! Crate-wide error type.
//!
//! Per-device I/O never returns these: reads and writes report failure through
//! `Option` / byte counts so a worker loop can keep polling. Errors surface only
//! where the caller has to stop and decide something (backend construction,
//! config loading, pairing with no radio present).

use thiserror::Error;

/// Errors produced by the transport layer.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The platform HID binding could not be resolved. This is fatal: no
    /// discovery or I/O is possible without it.
    #[error("HID binding unavailable: {0}")]
    Binding(String),

    /// The OS refused to list HID interfaces.
    #[error("HID interface enumeration failed (os error {0})")]
    Enumeration(u32),

    /// A device path could not be opened.
    #[error("failed to open {path}: {reason}")]
    Open { path: String, reason: String },

    /// The per-device synchronization object could not be created.
    #[error("failed to create I/O context: {0}")]
    IoContext(String),

    /// No Bluetooth radio is present on the host.
    #[error("no Bluetooth radio found")]
    NoBluetoothRadio,

    /// A Bluetooth API call reported failure.
    #[error("Bluetooth call failed (os error {0:#010x})")]
    Bluetooth(u32),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    /// The config parsed but holds values the transport cannot use.
    #[error("config rejected: {0}")]
    InvalidConfig(String),

    #[error("could not encode config: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "hidapi-backend")]
    #[error("hidapi: {0}")]
    HidApi(#[from] hidapi::HidError),
}

pub type Result<T> = std::result::Result<T, TransportError>;

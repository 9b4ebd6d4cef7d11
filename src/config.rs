//! Transport configuration.
//!
//! [`TransportConfig`] is plain data, loadable from TOML. Every key is optional;
//! missing keys take the defaults below.
//!
//! ```toml
//! read_timeout_ms = 1000
//! handshake_attempts = 4
//! slot_sources = ["real", "real", "hybrid", "emulated"]
//! controller_names = ["Nintendo RVL-CNT-01", "Nintendo RVL-WBC-01"]
//! inquiry_timeout_multiplier = 2
//!
//! [[known_devices]]
//! vendor_id = 0x057E
//! product_id = 0x0306
//! ```

use crate::error::{Result, TransportError};
use crate::ids::KnownDevices;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Number of roster slots, one per player LED.
pub const MAX_SLOTS: usize = 4;

/// What may occupy a roster slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotSource {
    None,
    Emulated,
    #[default]
    Real,
    Hybrid,
}

impl SlotSource {
    const REAL_BIT: u8 = 0b10;

    /// Bit mask form (`None = 0, Emulated = 1, Real = 2, Hybrid = 3`).
    #[inline]
    pub fn mask(self) -> u8 {
        match self {
            SlotSource::None => 0,
            SlotSource::Emulated => 1,
            SlotSource::Real => 2,
            SlotSource::Hybrid => 3,
        }
    }

    /// `true` if a physical controller may be placed in this slot.
    #[inline]
    pub fn allows_real(self) -> bool {
        self.mask() & Self::REAL_BIT != 0
    }
}

/// Knobs for discovery, I/O and pairing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// How long a read waits for a pending report.
    pub read_timeout_ms: u64,
    /// Reads allowed for the handshake to see a status report.
    pub handshake_attempts: u32,
    /// One entry per roster slot, at most [`MAX_SLOTS`].
    pub slot_sources: Vec<SlotSource>,
    /// Friendly names matched exactly during pairing.
    pub controller_names: Vec<String>,
    /// Bluetooth inquiry length, in units of 1.28 s.
    pub inquiry_timeout_multiplier: u8,
    /// Vendor/product pairs accepted during discovery. Kept last so it encodes
    /// as a trailing array of tables.
    pub known_devices: KnownDevices,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 1000,
            handshake_attempts: 4,
            slot_sources: vec![SlotSource::Real; MAX_SLOTS],
            controller_names: vec![
                "Nintendo RVL-CNT-01".to_string(),
                "Nintendo RVL-WBC-01".to_string(),
            ],
            inquiry_timeout_multiplier: 2,
            known_devices: KnownDevices::default(),
        }
    }
}

impl TransportConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the roster cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.slot_sources.len() > MAX_SLOTS {
            return Err(TransportError::InvalidConfig(format!(
                "{} slot_sources given, at most {MAX_SLOTS} slots have a player LED",
                self.slot_sources.len()
            )));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Per-device I/O settings derived from this config.
    pub fn io_settings(&self) -> IoSettings {
        IoSettings {
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            handshake_attempts: self.handshake_attempts,
        }
    }
}

/// The slice of configuration each device record carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IoSettings {
    pub read_timeout: Duration,
    pub handshake_attempts: u32,
}

impl Default for IoSettings {
    fn default() -> Self {
        TransportConfig::default().io_settings()
    }
}

//! Device identity: vendor/product filtering and device-path keys.
//!
//! Two independent notions of identity live here:
//! - [`DeviceIds`] / [`KnownDevices`] decide *what kind* of device an interface is.
//! - [`DevicePath`] decides *which* interface instance it is, and is the only key
//!   used for de-duplication.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Number of leading path bytes that take part in identity comparisons.
///
/// Two paths that agree on this prefix are the same device, even if they differ
/// afterwards.
pub const DEVICE_PATH_KEY_LEN: usize = 197;

/// USB/Bluetooth vendor + product id pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceIds {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceIds {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }
}

impl fmt::Display for DeviceIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Nintendo Wii Remote (RVL-CNT-01).
pub const WII_REMOTE: DeviceIds = DeviceIds::new(0x057E, 0x0306);

/// Ordered set of (vendor, product) pairs recognized as controllers.
///
/// Extending device support means adding a pair here (or in the config file);
/// nothing else in the crate keys off specific ids.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownDevices(BTreeSet<DeviceIds>);

impl KnownDevices {
    pub fn new(ids: impl IntoIterator<Item = DeviceIds>) -> Self {
        Self(ids.into_iter().collect())
    }

    #[inline]
    pub fn contains(&self, ids: DeviceIds) -> bool {
        self.0.contains(&ids)
    }

}

impl Default for KnownDevices {
    fn default() -> Self {
        Self::new([
            WII_REMOTE,
            DeviceIds::new(0x0001, 0x0002),
            DeviceIds::new(0x0002, 0x00F7),
        ])
    }
}

/// Opaque, host-assigned path of one HID interface.
///
/// Equality and hashing only look at the first [`DEVICE_PATH_KEY_LEN`] bytes
/// (see [`DevicePath::key`]). The full bytes are kept so the path can still be
/// reopened.
#[derive(Clone)]
pub struct DevicePath(Vec<u8>);

impl DevicePath {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Full path bytes, as reported by the host.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Identity key: the path truncated to [`DEVICE_PATH_KEY_LEN`] bytes.
    #[inline]
    pub fn key(&self) -> &[u8] {
        let end = self.0.len().min(DEVICE_PATH_KEY_LEN);
        &self.0[..end]
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<&str> for DevicePath {
    fn from(s: &str) -> Self {
        Self::from_bytes(s.as_bytes())
    }
}

impl From<String> for DevicePath {
    fn from(s: String) -> Self {
        Self::from_bytes(s.into_bytes())
    }
}

impl PartialEq for DevicePath {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for DevicePath {}

impl Hash for DevicePath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DevicePath").field(&self.to_string_lossy()).finish()
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

//! motelink: HID/Bluetooth transport for Wii Remote controllers.
//!
//! Discovers controllers among the host's HID interfaces, keeps a duplicate-free
//! roster of open devices, validates each with a handshake, and provides
//! timeout-bounded reads and writes that survive stack quirks and abrupt
//! removal. A separate [`PairingManager`] toggles controller pairing on the
//! host Bluetooth stack.
//!
//! ```no_run
//! # #[cfg(all(windows, feature = "hid"))]
//! # fn main() -> motelink::Result<()> {
//! use motelink::backends::windows::WindowsHid;
//! use motelink::{Roster, TransportConfig};
//!
//! let mut roster = Roster::new(WindowsHid::new()?, TransportConfig::default());
//! roster.find_devices(4);
//! if let Some(dev) = roster.slot_mut(0) {
//!     if let Some(report) = dev.read() {
//!         println!("{report:02x?}");
//!     }
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(all(windows, feature = "hid")))]
//! # fn main() {}
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backends;
pub mod config;
pub mod device;
pub mod discovery;
pub mod error;
pub mod ids;
pub mod io;
pub mod manager;
pub mod metadata;
pub mod pairing;
pub mod report;
pub mod stack;

pub use config::{IoSettings, SlotSource, TransportConfig};
pub use device::{ConnectionState, ManagedDevice};
pub use error::{Result, TransportError};
pub use ids::{DeviceIds, DevicePath, KnownDevices};
pub use manager::Roster;
pub use metadata::DeviceStatus;
pub use pairing::PairingManager;
pub use report::{Payload, MAX_PAYLOAD};
pub use stack::WriteStrategy;

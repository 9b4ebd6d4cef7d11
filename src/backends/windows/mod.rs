#![cfg(target_os = "windows")]

//! Windows backends.
//!
//! - **HID**: interface enumeration through SetupAPI, overlapped reads and both
//!   write strategies, over a lazily bound `hid.dll`.
//! - **Bluetooth**: radio and device enumeration plus HID service toggling, used
//!   by [`PairingManager`](crate::pairing::PairingManager).
//!
//! Most users only need [`WindowsHid::new`] and [`WindowsBluetooth::new`] to build a
//! [`Roster`](crate::manager::Roster) and a pairing manager.

pub mod bluetooth;
pub mod hid_binding;
pub mod hid_device;
pub mod hid_discovery;

pub use bluetooth::{WinRadio, WindowsBluetooth};
pub use hid_device::{WinHidHandle, WinIoContext};
pub use hid_discovery::WindowsHid;

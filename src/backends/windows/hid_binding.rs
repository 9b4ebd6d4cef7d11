#![cfg(target_os = "windows")]

//! Process-wide `hid.dll` binding.
//!
//! Three entry points are resolved at runtime, once per process, on first use:
//! `HidD_GetHidGuid`, `HidD_GetAttributes` and `HidD_SetOutputReport`. The
//! resolved table is immutable afterwards and shared by every device worker.
//!
//! If the library or any symbol is missing, [`HidBinding::get`] keeps returning
//! [`TransportError::Binding`]. Callers must treat that as fatal: nothing in the
//! Windows backend works without it.

use crate::error::{Result, TransportError};
use core::ffi::c_void;
use std::sync::OnceLock;

use windows_sys::core::GUID;
use windows_sys::Win32::Devices::HumanInterfaceDevice::HIDD_ATTRIBUTES;
use windows_sys::Win32::Foundation::{GetLastError, HANDLE};
use windows_sys::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

type GetHidGuidFn = unsafe extern "system" fn(*mut GUID);
type GetAttributesFn = unsafe extern "system" fn(HANDLE, *mut HIDD_ATTRIBUTES) -> u8;
type SetOutputReportFn = unsafe extern "system" fn(HANDLE, *const c_void, u32) -> u8;
type RawProc = unsafe extern "system" fn() -> isize;

static BINDING: OnceLock<std::result::Result<HidBinding, String>> = OnceLock::new();

/// Resolved `hid.dll` entry points.
#[derive(Clone, Copy)]
pub struct HidBinding {
    get_hid_guid: GetHidGuidFn,
    get_attributes: GetAttributesFn,
    set_output_report: SetOutputReportFn,
}

impl HidBinding {
    /// The process-wide binding, loading it on first call.
    pub fn get() -> Result<&'static HidBinding> {
        match BINDING.get_or_init(Self::load) {
            Ok(binding) => Ok(binding),
            Err(msg) => Err(TransportError::Binding(msg.clone())),
        }
    }

    fn load() -> std::result::Result<Self, String> {
        let name: Vec<u16> = "hid.dll".encode_utf16().chain(std::iter::once(0)).collect();
        // SAFETY: `name` is a NUL-terminated UTF-16 string that outlives the call.
        let module = unsafe { LoadLibraryW(name.as_ptr()) };
        if module as isize == 0 {
            // SAFETY: plain thread-local error query.
            let code = unsafe { GetLastError() };
            return Err(format!("failed to load hid.dll (os error {code})"));
        }

        let symbol = |name: &'static [u8]| -> std::result::Result<RawProc, String> {
            // SAFETY: `module` is a loaded library that is never freed; `name` is NUL-terminated.
            unsafe { GetProcAddress(module, name.as_ptr()) }.ok_or_else(|| {
                let printable = String::from_utf8_lossy(&name[..name.len() - 1]).into_owned();
                format!("hid.dll does not export {printable}")
            })
        };

        let get_hid_guid = symbol(b"HidD_GetHidGuid\0")?;
        let get_attributes = symbol(b"HidD_GetAttributes\0")?;
        let set_output_report = symbol(b"HidD_SetOutputReport\0")?;

        // SAFETY: the transmuted signatures match the documented prototypes of
        // these exports, and the library stays loaded for the process lifetime.
        unsafe {
            Ok(Self {
                get_hid_guid: std::mem::transmute::<RawProc, GetHidGuidFn>(get_hid_guid),
                get_attributes: std::mem::transmute::<RawProc, GetAttributesFn>(get_attributes),
                set_output_report: std::mem::transmute::<RawProc, SetOutputReportFn>(
                    set_output_report,
                ),
            })
        }
    }

    /// Device interface class of HID devices.
    pub fn hid_guid(&self) -> GUID {
        let mut guid = GUID::from_u128(0);
        // SAFETY: `guid` is a valid out-pointer for the duration of the call.
        unsafe { (self.get_hid_guid)(&mut guid) };
        guid
    }

    /// `(vendor_id, product_id)` of an open HID handle.
    pub fn attributes(&self, handle: HANDLE) -> Option<(u16, u16)> {
        let mut attr = HIDD_ATTRIBUTES {
            Size: std::mem::size_of::<HIDD_ATTRIBUTES>() as u32,
            VendorID: 0,
            ProductID: 0,
            VersionNumber: 0,
        };
        // SAFETY: `handle` is an open HID handle owned by the caller; `attr` is sized.
        let ok = unsafe { (self.get_attributes)(handle, &mut attr) };
        (ok != 0).then_some((attr.VendorID, attr.ProductID))
    }

    /// Send an output report. `true` on success.
    pub fn set_output_report(&self, handle: HANDLE, data: &[u8]) -> bool {
        // SAFETY: `data` is valid for `data.len()` bytes during the call.
        let ok = unsafe {
            (self.set_output_report)(handle, data.as_ptr() as *const c_void, data.len() as u32)
        };
        ok != 0
    }
}

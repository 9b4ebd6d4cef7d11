#![cfg(target_os = "windows")]

//! Windows HID interface enumeration.
//!
//! [`WindowsHid`] lists every present device interface of the HID class through
//! SetupAPI and opens them as [`WinHidHandle`]s. Filtering by vendor/product id
//! happens one level up, in [`discover`](crate::discovery::discover), after the
//! handle is open and its attributes can be read.

use super::hid_binding::HidBinding;
use super::hid_device::WinHidHandle;
use crate::backends::HidBackend;
use crate::error::{Result, TransportError};
use crate::ids::DevicePath;
use std::ptr::{null, null_mut};

use windows_sys::Win32::Devices::DeviceAndDriverInstallation::{
    SetupDiDestroyDeviceInfoList, SetupDiEnumDeviceInterfaces, SetupDiGetClassDevsW,
    SetupDiGetDeviceInterfaceDetailW, DIGCF_DEVICEINTERFACE, DIGCF_PRESENT,
    SP_DEVICE_INTERFACE_DATA, SP_DEVICE_INTERFACE_DETAIL_DATA_W,
};
use windows_sys::Win32::Foundation::{GetLastError, INVALID_HANDLE_VALUE};

/// HID backend over `hid.dll` and SetupAPI.
pub struct WindowsHid {
    binding: &'static HidBinding,
}

impl WindowsHid {
    /// Bind `hid.dll`. Fails with [`TransportError::Binding`] if the library or
    /// one of its entry points is missing.
    pub fn new() -> Result<Self> {
        Ok(Self {
            binding: HidBinding::get()?,
        })
    }
}

impl HidBackend for WindowsHid {
    type Handle = WinHidHandle;

    fn interface_paths(&self) -> Result<Vec<DevicePath>> {
        let guid = self.binding.hid_guid();

        // SAFETY: `guid` outlives the call; null enumerator/parent are permitted.
        let set = unsafe {
            SetupDiGetClassDevsW(
                &guid,
                null(),
                null_mut(),
                DIGCF_DEVICEINTERFACE | DIGCF_PRESENT,
            )
        };
        if set as isize == INVALID_HANDLE_VALUE as isize {
            // SAFETY: plain thread-local error query.
            return Err(TransportError::Enumeration(unsafe { GetLastError() }));
        }

        let mut paths = Vec::new();
        for index in 0u32.. {
            // SAFETY: plain-data struct; cbSize is set below.
            let mut iface: SP_DEVICE_INTERFACE_DATA = unsafe { std::mem::zeroed() };
            iface.cbSize = std::mem::size_of::<SP_DEVICE_INTERFACE_DATA>() as u32;

            // SAFETY: `set` is a live device info set; `iface` is sized.
            let more = unsafe { SetupDiEnumDeviceInterfaces(set, null(), &guid, index, &mut iface) };
            if more == 0 {
                break;
            }

            if let Some(path) = interface_path(set, &iface) {
                paths.push(path);
            }
        }

        // SAFETY: `set` was returned by SetupDiGetClassDevsW and is destroyed once.
        unsafe { SetupDiDestroyDeviceInfoList(set) };
        Ok(paths)
    }

    fn open(&self, path: &DevicePath) -> Result<WinHidHandle> {
        WinHidHandle::open(path, self.binding)
    }
}

/// Device path of one interface, via the two-call size-then-fetch pattern.
fn interface_path(
    set: windows_sys::Win32::Devices::DeviceAndDriverInstallation::HDEVINFO,
    iface: &SP_DEVICE_INTERFACE_DATA,
) -> Option<DevicePath> {
    let mut needed = 0u32;
    // SAFETY: size query; a null detail buffer with zero size is permitted.
    unsafe {
        SetupDiGetDeviceInterfaceDetailW(set, iface, null_mut(), 0, &mut needed, null_mut());
    }
    if (needed as usize) <= std::mem::size_of::<u32>() {
        return None;
    }

    // u32 storage keeps the detail header aligned.
    let mut storage = vec![0u32; (needed as usize).div_ceil(4)];
    let detail = storage.as_mut_ptr() as *mut SP_DEVICE_INTERFACE_DETAIL_DATA_W;
    // SAFETY: `storage` holds at least `needed` bytes and is 4-byte aligned.
    let ok = unsafe {
        (*detail).cbSize = std::mem::size_of::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>() as u32;
        SetupDiGetDeviceInterfaceDetailW(set, iface, detail, needed, null_mut(), null_mut())
    };
    if ok == 0 {
        return None;
    }

    // DevicePath starts right after the u32 cbSize header.
    let units = needed as usize / 2;
    // SAFETY: `storage` is at least `needed` bytes long and fully initialized.
    let wide = unsafe { std::slice::from_raw_parts(storage.as_ptr() as *const u16, units) };
    let wide = &wide[2..];
    let end = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());

    Some(DevicePath::from(String::from_utf16_lossy(&wide[..end])))
}

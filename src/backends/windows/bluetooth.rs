#![cfg(target_os = "windows")]

//! Windows Bluetooth pairing primitives (`bthprops`).

use crate::backends::{BluetoothAddress, BluetoothBackend, BluetoothDevice, DeviceQuery};
use crate::error::{Result, TransportError};
use windows_sys::core::GUID;
use windows_sys::Win32::Devices::Bluetooth::{
    BluetoothFindDeviceClose, BluetoothFindFirstDevice, BluetoothFindFirstRadio,
    BluetoothFindNextDevice, BluetoothFindNextRadio, BluetoothFindRadioClose,
    BluetoothRemoveDevice, BluetoothSetServiceState, BLUETOOTH_ADDRESS, BLUETOOTH_ADDRESS_0,
    BLUETOOTH_DEVICE_INFO, BLUETOOTH_DEVICE_SEARCH_PARAMS, BLUETOOTH_FIND_RADIO_PARAMS,
};
use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};

/// HID service class, `00001124-0000-1000-8000-00805F9B34FB`.
const HID_SERVICE_CLASS: GUID = GUID::from_u128(0x00001124_0000_1000_8000_00805f9b34fb);
const BLUETOOTH_SERVICE_ENABLE: u32 = 0x01;

/// An open radio handle. Closed on drop.
pub struct WinRadio {
    handle: HANDLE,
}

impl Drop for WinRadio {
    fn drop(&mut self) {
        // SAFETY: the handle came from a radio enumeration and is closed once.
        unsafe { CloseHandle(self.handle) };
    }
}

/// Bluetooth backend over the Windows Bluetooth API.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowsBluetooth;

impl WindowsBluetooth {
    pub fn new() -> Self {
        Self
    }
}

fn empty_device_info() -> BLUETOOTH_DEVICE_INFO {
    // SAFETY: plain-data struct; all-zero is valid.
    let mut info: BLUETOOTH_DEVICE_INFO = unsafe { std::mem::zeroed() };
    info.dwSize = std::mem::size_of::<BLUETOOTH_DEVICE_INFO>() as u32;
    info
}

fn from_info(info: &BLUETOOTH_DEVICE_INFO) -> BluetoothDevice {
    let name_len = info
        .szName
        .iter()
        .position(|&c| c == 0)
        .unwrap_or(info.szName.len());
    BluetoothDevice {
        // SAFETY: both union members cover the same bytes; the u64 view is always initialized.
        address: BluetoothAddress(unsafe { info.Address.Anonymous.ullLong }),
        name: String::from_utf16_lossy(&info.szName[..name_len]),
        class_of_device: info.ulClassofDevice,
        connected: info.fConnected != 0,
        remembered: info.fRemembered != 0,
        authenticated: info.fAuthenticated != 0,
    }
}

fn to_info(dev: &BluetoothDevice) -> BLUETOOTH_DEVICE_INFO {
    let mut info = empty_device_info();
    info.Address = native_address(dev.address);
    info.ulClassofDevice = dev.class_of_device;
    info.fConnected = dev.connected.into();
    info.fRemembered = dev.remembered.into();
    info.fAuthenticated = dev.authenticated.into();
    for (dst, src) in info.szName.iter_mut().zip(dev.name.encode_utf16()) {
        *dst = src;
    }
    info
}

fn native_address(address: BluetoothAddress) -> BLUETOOTH_ADDRESS {
    BLUETOOTH_ADDRESS {
        Anonymous: BLUETOOTH_ADDRESS_0 {
            ullLong: address.0,
        },
    }
}

impl BluetoothBackend for WindowsBluetooth {
    type Radio = WinRadio;

    fn radios(&self) -> Result<Vec<WinRadio>> {
        let params = BLUETOOTH_FIND_RADIO_PARAMS {
            dwSize: std::mem::size_of::<BLUETOOTH_FIND_RADIO_PARAMS>() as u32,
        };
        let mut radio: HANDLE = std::ptr::null_mut();

        // SAFETY: `params` is sized; `radio` is a valid out-pointer.
        let find = unsafe { BluetoothFindFirstRadio(&params, &mut radio) };
        if find as isize == 0 {
            return Ok(Vec::new());
        }

        let mut radios = vec![WinRadio { handle: radio }];
        loop {
            let mut next: HANDLE = std::ptr::null_mut();
            // SAFETY: `find` is a live radio enumeration.
            if unsafe { BluetoothFindNextRadio(find, &mut next) } == 0 {
                break;
            }
            radios.push(WinRadio { handle: next });
        }

        // SAFETY: closes the enumeration, not the radios.
        unsafe { BluetoothFindRadioClose(find) };
        Ok(radios)
    }

    fn devices(&self, radio: &WinRadio, query: &DeviceQuery) -> Vec<BluetoothDevice> {
        let params = BLUETOOTH_DEVICE_SEARCH_PARAMS {
            dwSize: std::mem::size_of::<BLUETOOTH_DEVICE_SEARCH_PARAMS>() as u32,
            fReturnAuthenticated: query.return_authenticated.into(),
            fReturnRemembered: query.return_remembered.into(),
            fReturnUnknown: query.return_unknown.into(),
            fReturnConnected: query.return_connected.into(),
            fIssueInquiry: query.issue_inquiry.into(),
            cTimeoutMultiplier: query.timeout_multiplier,
            hRadio: radio.handle,
        };

        let mut info = empty_device_info();
        // SAFETY: `params` and `info` are sized and outlive the call.
        let find = unsafe { BluetoothFindFirstDevice(&params, &mut info) };
        if find as isize == 0 {
            return Vec::new();
        }

        let mut out = Vec::new();
        loop {
            out.push(from_info(&info));
            info = empty_device_info();
            // SAFETY: `find` is a live device enumeration.
            if unsafe { BluetoothFindNextDevice(find, &mut info) } == 0 {
                break;
            }
        }

        // SAFETY: closes the enumeration handle once.
        unsafe { BluetoothFindDeviceClose(find) };
        out
    }

    fn remove_device(&self, address: BluetoothAddress) -> Result<()> {
        let native = native_address(address);
        // SAFETY: `native` outlives the call.
        match unsafe { BluetoothRemoveDevice(&native) } {
            0 => Ok(()),
            code => Err(TransportError::Bluetooth(code)),
        }
    }

    fn enable_hid_service(&self, radio: &WinRadio, device: &BluetoothDevice) -> Result<()> {
        let info = to_info(device);
        // SAFETY: all pointers refer to locals or constants that outlive the call.
        let code = unsafe {
            BluetoothSetServiceState(
                radio.handle,
                &info,
                &HID_SERVICE_CLASS,
                BLUETOOTH_SERVICE_ENABLE,
            )
        };
        match code {
            0 => Ok(()),
            code => Err(TransportError::Bluetooth(code)),
        }
    }
}

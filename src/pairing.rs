//! Bluetooth pair-up / unpair for known controllers.
//!
//! [`PairingManager::pair_up`] sweeps every radio and every device each radio
//! knows about (authenticated, remembered, connected and unknown, with a fresh
//! inquiry). Devices whose friendly name matches one of the configured
//! controller names exactly are acted on:
//!
//! - **unpair**: remove the pairing registration.
//! - **pair**: for devices not currently connected, forget any stale
//!   registration first, then enable the HID service.
//!
//! One device failing does not stop the sweep. Only the absence of any radio is
//! a hard error.

use crate::backends::{BluetoothBackend, BluetoothDevice, DeviceQuery};
use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use tracing::{debug, info, warn};

pub struct PairingManager<B: BluetoothBackend> {
    backend: B,
    names: Vec<String>,
    query: DeviceQuery,
}

impl<B: BluetoothBackend> PairingManager<B> {
    pub fn new(backend: B, config: &TransportConfig) -> Self {
        Self {
            backend,
            names: config.controller_names.clone(),
            query: DeviceQuery::everything(config.inquiry_timeout_multiplier),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn is_controller(&self, dev: &BluetoothDevice) -> bool {
        self.names.iter().any(|n| *n == dev.name)
    }

    /// Pair (or, with `unpair`, remove) every matching controller.
    ///
    /// Returns how many devices were affected.
    pub fn pair_up(&self, unpair: bool) -> Result<usize> {
        let radios = self.backend.radios()?;
        if radios.is_empty() {
            return Err(TransportError::NoBluetoothRadio);
        }

        let mut affected = 0;
        for radio in &radios {
            for dev in self.backend.devices(radio, &self.query) {
                debug!(
                    name = %dev.name,
                    authenticated = dev.authenticated,
                    connected = dev.connected,
                    remembered = dev.remembered,
                    "bluetooth device"
                );

                if !self.is_controller(&dev) {
                    continue;
                }

                if unpair {
                    match self.backend.remove_device(dev.address) {
                        Ok(()) => {
                            info!(address = %dev.address, "pair-up: removed controller");
                            affected += 1;
                        }
                        Err(e) => {
                            debug!(address = %dev.address, error = %e, "pair-up: remove failed");
                        }
                    }
                    continue;
                }

                if dev.connected {
                    continue;
                }

                // Either it worked or there was nothing to forget; both leave
                // no stale registration behind.
                if let Err(e) = self.backend.remove_device(dev.address) {
                    debug!(address = %dev.address, error = %e, "pair-up: nothing to forget");
                }

                match self.backend.enable_hid_service(radio, &dev) {
                    Ok(()) => {
                        info!(address = %dev.address, "pair-up: enabled HID service");
                        affected += 1;
                    }
                    Err(e) => {
                        warn!(address = %dev.address, error = %e, "pair-up: enabling HID service failed");
                    }
                }
            }
        }

        Ok(affected)
    }

    /// Reserved. Performs no work and always returns `0`; use
    /// [`pair_up(true)`](Self::pair_up) to remove controllers.
    pub fn unpair_all(&self) -> usize {
        0
    }
}

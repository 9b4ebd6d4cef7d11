//! Connection lifecycle of one tracked controller.
//!
//! A [`ManagedDevice`] owns at most one open handle and one I/O context. It
//! moves between two states only:
//!
//! ```text
//! Disconnected --connect()--> Connected --disconnect() / remote drop--> Disconnected
//! ```
//!
//! The record itself (slot index, path, pinned write strategy) outlives any
//! number of connect/disconnect cycles; only the owning [`Roster`](crate::manager::Roster)
//! destroys it. Reads and writes live in [`io`](crate::io).
//!
//! No internal locking is done. One worker drives one device; share a device
//! across threads only behind your own lock.

use crate::backends::{ContextOf, HidBackend, HidHandle, IoContext};
use crate::config::IoSettings;
use crate::ids::DevicePath;
use crate::report;
use crate::stack::WriteStrategy;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

/// One tracked controller.
pub struct ManagedDevice<B: HidBackend> {
    index: usize,
    path: DevicePath,
    backend: Arc<B>,
    settings: IoSettings,
    pub(crate) handle: Option<B::Handle>,
    pub(crate) context: Option<ContextOf<B>>,
    pub(crate) state: ConnectionState,
    pub(crate) strategy: WriteStrategy,
}

impl<B: HidBackend> ManagedDevice<B> {
    /// New, disconnected record for `path`. Nothing is opened until [`connect`](Self::connect).
    pub fn new(index: usize, path: DevicePath, backend: Arc<B>, settings: IoSettings) -> Self {
        Self {
            index,
            path,
            backend,
            settings,
            handle: None,
            context: None,
            state: ConnectionState::Disconnected,
            strategy: WriteStrategy::Undetected,
        }
    }

    /// New record that adopts a handle already opened during discovery.
    pub fn with_handle(
        index: usize,
        path: DevicePath,
        handle: B::Handle,
        backend: Arc<B>,
        settings: IoSettings,
    ) -> Self {
        let mut dev = Self::new(index, path, backend, settings);
        dev.handle = Some(handle);
        dev
    }

    /// Roster slot this device was assigned at discovery.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn path(&self) -> &DevicePath {
        &self.path
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state
    }

    #[inline]
    pub fn write_strategy(&self) -> WriteStrategy {
        self.strategy
    }

    /// `true` while an OS handle is held, including after a failed handshake.
    #[inline]
    pub fn has_handle(&self) -> bool {
        self.handle.is_some()
    }

    #[inline]
    pub fn settings(&self) -> IoSettings {
        self.settings
    }

    /// Open (if needed), handshake, and light the slot LED.
    ///
    /// Returns `false` if already connected, if the path cannot be opened, or if
    /// the handshake fails. A failed handshake leaves the handle open for a later
    /// retry unless the handshake itself saw the device disappear.
    pub fn connect(&mut self) -> bool {
        if self.is_connected() {
            return false;
        }

        if self.handle.is_none() {
            match self.backend.open(&self.path) {
                Ok(handle) => self.handle = Some(handle),
                Err(e) => {
                    debug!(slot = self.index + 1, error = %e, "open failed");
                    return false;
                }
            }
        }

        let Some(handle) = self.handle.as_mut() else {
            return false;
        };
        // A context left over from an earlier attempt is reused; any read it
        // still owns is cancelled first.
        if let Some(ctx) = self.context.as_mut() {
            handle.cancel_io(ctx);
            ctx.reset();
        } else {
            match handle.create_context() {
                Ok(ctx) => self.context = Some(ctx),
                Err(e) => {
                    warn!(slot = self.index + 1, error = %e, "could not set up async I/O");
                    return false;
                }
            }
        }

        // Reads and writes refuse to run unless connected, so the handshake
        // needs the state set up front.
        self.state = ConnectionState::Connected;

        if !self.handshake() {
            self.state = ConnectionState::Disconnected;
            warn!(slot = self.index + 1, "unable to connect to controller");
            return false;
        }

        self.write(&report::led_report(self.index));

        info!(slot = self.index + 1, "connected to controller");
        true
    }

    /// Release the handle and reset the I/O context. Idempotent.
    pub fn disconnect(&mut self) {
        if !self.is_connected() {
            return;
        }

        self.state = ConnectionState::Disconnected;
        self.handle = None;
        if let Some(ctx) = self.context.as_mut() {
            ctx.reset();
        }
        debug!(slot = self.index + 1, "disconnected");
    }

    /// Ask for a status report and wait for it to come back.
    fn handshake(&mut self) -> bool {
        if self.write(&report::STATUS_REQUEST) == 0 {
            return false;
        }

        for _ in 0..self.settings.handshake_attempts {
            match self.read() {
                Some(payload) if report::is_status_report(&payload) => return true,
                Some(_) => continue,
                None if !self.is_connected() => return false,
                None => continue,
            }
        }
        false
    }
}

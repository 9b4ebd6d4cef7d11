//! Device discovery and de-duplication.
//!
//! Discovery walks every HID interface the backend reports and keeps the ones
//! that are (a) not already tracked and (b) recognized by vendor/product id:
//!
//! - Paths already tracked are skipped **without** being opened.
//! - Every other path is opened briefly to read its attributes.
//! - Unrecognized devices are closed immediately (the handle is dropped).
//! - Open failures (permissions, exclusive ownership) skip that path only.
//!
//! Recognized devices are returned with their handle still open so the
//! lifecycle can adopt it instead of reopening the path.

use crate::backends::{HidBackend, HidHandle};
use crate::error::Result;
use crate::ids::{DeviceIds, DevicePath, KnownDevices};
use std::collections::HashSet;
use tracing::{debug, trace};

/// A recognized, not-yet-tracked interface found by [`discover`].
pub struct DeviceCandidate<H> {
    pub path: DevicePath,
    pub ids: DeviceIds,
    pub handle: H,
}

impl<H> std::fmt::Debug for DeviceCandidate<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCandidate")
            .field("path", &self.path)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

/// Set of device paths that must not be opened again.
///
/// Membership uses the truncated path key (see [`DevicePath::key`]).
#[derive(Clone, Debug, Default)]
pub struct Deduplicator {
    tracked: HashSet<DevicePath>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `path`; returns `false` if it was already tracked.
    pub fn track(&mut self, path: DevicePath) -> bool {
        self.tracked.insert(path)
    }
}

impl FromIterator<DevicePath> for Deduplicator {
    fn from_iter<I: IntoIterator<Item = DevicePath>>(iter: I) -> Self {
        Self {
            tracked: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a DevicePath> for Deduplicator {
    fn from_iter<I: IntoIterator<Item = &'a DevicePath>>(iter: I) -> Self {
        iter.into_iter().cloned().collect()
    }
}

/// Lazy walk over one interface listing.
///
/// Each call to `next` opens paths until it finds the next recognized one, so
/// a caller can stop (or keep going past candidates it rejects) without
/// opening anything further.
pub struct Scan<'a, B: HidBackend> {
    backend: &'a B,
    known: &'a KnownDevices,
    paths: std::vec::IntoIter<DevicePath>,
    seen: Deduplicator,
}

/// Start a scan that skips every path in `existing`.
///
/// Returns an error only if the host refuses to list interfaces at all.
pub fn scan<'a, B: HidBackend>(
    backend: &'a B,
    existing: &Deduplicator,
    known: &'a KnownDevices,
) -> Result<Scan<'a, B>> {
    Ok(Scan {
        backend,
        known,
        paths: backend.interface_paths()?.into_iter(),
        seen: existing.clone(),
    })
}

impl<B: HidBackend> Iterator for Scan<'_, B> {
    type Item = DeviceCandidate<B::Handle>;

    fn next(&mut self) -> Option<Self::Item> {
        for path in self.paths.by_ref() {
            if !self.seen.track(path.clone()) {
                trace!(%path, "already tracked, skipping");
                continue;
            }

            let handle = match self.backend.open(&path) {
                Ok(h) => h,
                Err(e) => {
                    debug!(%path, error = %e, "could not open candidate");
                    continue;
                }
            };

            match handle.attributes() {
                Some(ids) if self.known.contains(ids) => {
                    debug!(%path, %ids, "found controller");
                    return Some(DeviceCandidate { path, ids, handle });
                }
                other => {
                    trace!(%path, ids = ?other, "not a controller");
                    drop(handle);
                }
            }
        }
        None
    }
}

/// Find up to `max_new` recognized devices whose paths are not in `existing`.
///
/// A path reported more than once by the host is only opened once per pass.
pub fn discover<B: HidBackend>(
    backend: &B,
    existing: &Deduplicator,
    known: &KnownDevices,
    max_new: usize,
) -> Result<Vec<DeviceCandidate<B::Handle>>> {
    if max_new == 0 {
        return Ok(Vec::new());
    }
    Ok(scan(backend, existing, known)?.take(max_new).collect())
}

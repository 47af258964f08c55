//! Source-device capture: exclusive grab and blocking read loop.
//!
//! The source device is grabbed so its events reach nothing but this
//! process; the delayed copies re-enter the input stack through the virtual
//! device. Reading happens on a dedicated thread (evdev reads block), which
//! forwards carrier events into a tokio channel for the scheduler.
//!
//! ## Permissions
//!
//! Opening and grabbing `/dev/input/event*` requires root or membership in
//! the `input` group.

use crate::error::{Error, Result};
use crate::event::CapturedEvent;
use evdev::{Device, InputEventKind, Synchronization};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::Sender;

/// The grabbed source input device.
pub struct EventSource {
    device: Device,
    path: PathBuf,
}

impl std::fmt::Debug for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl EventSource {
    /// Open the device and grab it for exclusive access.
    ///
    /// Both failures are fatal: without the grab the un-delayed events would
    /// keep reaching other applications alongside the delayed copies.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut device = Device::open(&path).map_err(|source| Error::DeviceOpen {
            path: path.clone(),
            source,
        })?;

        device.grab().map_err(|source| Error::DeviceGrab {
            path: path.clone(),
            source,
        })?;

        log::info!(
            "grabbed {} ({})",
            path.display(),
            device.name().unwrap_or("unnamed device")
        );

        Ok(Self { device, path })
    }

    /// The underlying device, for cloning its capabilities.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Start the blocking read loop on a dedicated thread.
    ///
    /// Carrier events are forwarded in strict source order; synchronization
    /// markers are suppressed (the scheduler regenerates one per emission).
    /// The channel closes when the device disappears or the receiver is
    /// dropped, so `None` from the receiving side is the device-gone signal.
    pub fn spawn(mut self, tx: Sender<CapturedEvent>) -> JoinHandle<()> {
        thread::spawn(move || {
            loop {
                match self.device.fetch_events() {
                    Ok(events) => {
                        for ev in events {
                            if let InputEventKind::Synchronization(sync) = ev.kind() {
                                if sync == Synchronization::SYN_DROPPED {
                                    log::warn!("sync dropped by source, resynchronizing");
                                }
                                continue;
                            }

                            if tx.blocking_send(CapturedEvent::from_raw(&ev)).is_err() {
                                // Receiver gone: the pipeline is shutting down.
                                return;
                            }
                        }
                    }
                    Err(e) if e.raw_os_error() == Some(libc::ENODEV) => {
                        log::info!("source device {} disconnected", self.path.display());
                        return;
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        log::error!("failed to read from {}: {e}", self.path.display());
                        return;
                    }
                }
            }
        })
    }
}

impl Drop for EventSource {
    fn drop(&mut self) {
        let _ = self.device.ungrab();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device_fails() {
        let err = EventSource::open("/dev/input/event-does-not-exist").unwrap_err();
        assert!(matches!(err, Error::DeviceOpen { .. }));
    }
}

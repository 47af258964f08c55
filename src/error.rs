//! Error types for the latency-injection pipeline.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lagwire operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up or running the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to open the source input device.
    #[error("failed to open input device {path}: {source}")]
    DeviceOpen { path: PathBuf, source: io::Error },

    /// Failed to grab the source device for exclusive access.
    #[error("failed to grab input device {path}: {source}")]
    DeviceGrab { path: PathBuf, source: io::Error },

    /// Failed to create the virtual output device.
    #[error("failed to create virtual output device: {0}")]
    VirtualDevice(io::Error),

    /// Failed to write an event to the virtual output device.
    #[error("failed to emit event: {0}")]
    Emit(io::Error),

    /// Failed to set up the control FIFO.
    #[error("failed to create control channel {path}: {source}")]
    ControlChannel { path: PathBuf, source: io::Error },

    /// Startup parameters are invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to write out the audit log.
    #[error("failed to write audit log: {0}")]
    AuditLog(io::Error),

    /// A shared lock was poisoned by a panicking holder.
    #[error("lock poisoned: {0}")]
    Poisoned(&'static str),
}

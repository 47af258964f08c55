//! # lagwire
//!
//! A latency-injection harness for Linux input devices.
//!
//! lagwire grabs an input device for exclusive access, delays every key,
//! button, and motion event by a configurable (fixed or randomized) interval,
//! and re-emits it on a uinput clone of the device. Downstream consumers see
//! artificially latent input, which makes the tool useful for testing games,
//! accessibility software, and UI responsiveness.
//!
//! ## Pipeline
//!
//! ```text
//! source device ──capture──▶ scheduler ──one timer task per event──▶ virtual device
//!                                │                                       │
//!                          delay model ◀── live config (FIFO)      audit log (flushed
//!                                                                   on shutdown)
//! ```
//!
//! - Synchronization markers are suppressed at capture and regenerated after
//!   every delayed emission, so the virtual device always produces coherent
//!   input frames.
//! - Delay tasks are independent: a long-delay event scheduled early may emit
//!   after a short-delay event scheduled later. Capture and audit order stay
//!   strict.
//! - Writing `min_click max_click min_move max_move` to the control FIFO
//!   replaces the active delay ranges atomically while the pipeline runs.
//!
//! ## Quick start
//!
//! ```bash
//! # 50 ms constant delay on clicks, none on motion, control FIFO enabled
//! lagwire /dev/input/event5 50 50 0 0 l /tmp/lagwire-ctl
//!
//! # retune at runtime
//! echo "10 20 0 0" > /tmp/lagwire-ctl
//! ```
//!
//! Requires root or membership in the `input` group (for both the source
//! device and `/dev/uinput`).

pub mod audit;
pub mod capture;
pub mod config;
pub mod delay;
pub mod emit;
pub mod error;
pub mod event;
pub mod scheduler;

// Re-exports
pub use audit::{AuditLog, AuditRecord};
pub use capture::EventSource;
pub use config::{ConfigHandle, ControlChannel};
pub use delay::{DelayConfig, DelayRange, Distribution, compute_delay};
pub use emit::{EventSink, VirtualOutput};
pub use error::{Error, Result};
pub use event::{CapturedEvent, EventCategory, ScheduledEvent};
pub use scheduler::{Scheduler, run_pipeline};

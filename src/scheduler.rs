//! Per-event delay scheduling.
//!
//! Each carrier event gets its own timer task: the delay is computed from a
//! snapshot of the live configuration, the audit record is appended in
//! scheduling order, and a spawned task sleeps out the delay before emitting
//! the event through the sink. Tasks are independent, so a long-delay event
//! may emit after a short-delay event scheduled later; that reordering is
//! expected. In-flight tasks are abandoned at shutdown.

use crate::audit::{AuditLog, AuditRecord};
use crate::config::ConfigHandle;
use crate::delay::compute_delay;
use crate::emit::EventSink;
use crate::error::Result;
use crate::event::{CapturedEvent, ScheduledEvent};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;

/// Fans captured events out into one delay task each.
pub struct Scheduler {
    config: ConfigHandle,
    sink: Arc<dyn EventSink>,
    audit: Arc<AuditLog>,
}

impl Scheduler {
    /// Create a scheduler emitting through `sink` and logging to `audit`.
    pub fn new(config: ConfigHandle, sink: Arc<dyn EventSink>, audit: Arc<AuditLog>) -> Self {
        Self {
            config,
            sink,
            audit,
        }
    }

    /// Schedule one event for delayed emission.
    ///
    /// The delay is fixed here, from the configuration as it stands at this
    /// moment; a concurrent reconfiguration affects only later events. The
    /// spawned task's lifetime is bounded by the delay itself. Emission
    /// failures are logged and drop that single event only.
    pub fn schedule(&self, event: CapturedEvent) {
        let config = self.config.current();
        let delay_ms = compute_delay(event.category, &config, &mut rand::thread_rng());
        let scheduled = ScheduledEvent { event, delay_ms };

        self.audit.append(AuditRecord {
            timestamp_ms: event.timestamp_ms,
            delay_ms,
            event_type: event.event_type,
            value: event.value,
            code: event.code,
        });

        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(scheduled.delay_ms)).await;
            if let Err(e) = sink.emit(&scheduled.event) {
                log::warn!(
                    "dropped event (type {} code {}): {e}",
                    scheduled.event.event_type,
                    scheduled.event.code
                );
            }
        });
    }
}

/// Drive the pipeline until the capture channel closes or `shutdown`
/// resolves, then persist the audit buffer. Returns the number of records
/// flushed.
///
/// The capture thread closes its sender when the source device disappears,
/// so device removal and an interrupt share this teardown path.
pub async fn run_pipeline(
    mut rx: Receiver<CapturedEvent>,
    scheduler: Scheduler,
    audit: Arc<AuditLog>,
    shutdown: impl Future<Output = ()>,
) -> Result<usize> {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => scheduler.schedule(event),
                None => {
                    log::info!("capture ended, shutting down");
                    break;
                }
            },
            _ = &mut shutdown => break,
        }
    }

    audit.flush_and_clear()
}

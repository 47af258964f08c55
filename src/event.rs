//! Event categories and the captured-event representation.
//!
//! The source device produces three kinds of events we care about:
//! key/button presses, relative motion, and synchronization markers.
//! Markers are suppressed at capture and regenerated at emission, so only
//! the first two (plus a pass-through "other" bucket) flow through the
//! pipeline.

use evdev::{InputEvent, InputEventKind};
use std::time::UNIX_EPOCH;

/// Category of a captured input event, used to pick the delay range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    /// A key or mouse button event (EV_KEY).
    Key,
    /// Relative motion: mouse movement or wheel (EV_REL).
    Motion,
    /// Any other event type; passed through with zero delay.
    Other,
}

/// One input event read from the grabbed source device.
///
/// Raw type/code/value are kept as the kernel reported them so the event
/// can be re-emitted unchanged on the virtual device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturedEvent {
    /// Delay category of this event.
    pub category: EventCategory,
    /// Raw evdev event type (e.g. 1 = EV_KEY, 2 = EV_REL).
    pub event_type: u16,
    /// Raw event code (key/button code, axis number).
    pub code: u16,
    /// Event value (0/1 for button up/down, axis delta for motion).
    pub value: i32,
    /// Capture time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl CapturedEvent {
    /// Build a captured event from a raw evdev event.
    ///
    /// The caller is expected to have filtered out synchronization markers
    /// already; if one slips through it lands in [`EventCategory::Other`].
    pub fn from_raw(ev: &InputEvent) -> Self {
        let category = match ev.kind() {
            InputEventKind::Key(_) => EventCategory::Key,
            InputEventKind::RelAxis(_) => EventCategory::Motion,
            _ => EventCategory::Other,
        };

        let timestamp_ms = ev
            .timestamp()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            category,
            event_type: ev.event_type().0,
            code: ev.code(),
            value: ev.value(),
            timestamp_ms,
        }
    }

    /// Check if this is a key or button event.
    pub fn is_key(&self) -> bool {
        self.category == EventCategory::Key
    }

    /// Check if this is a relative-motion event.
    pub fn is_motion(&self) -> bool {
        self.category == EventCategory::Motion
    }
}

/// A captured event bound to its computed delay.
///
/// The delay is fixed at scheduling time; configuration changes after this
/// point never affect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    /// The event awaiting emission.
    pub event: CapturedEvent,
    /// Delay before emission, in milliseconds.
    pub delay_ms: u64,
}

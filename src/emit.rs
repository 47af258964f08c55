//! Virtual output device: a uinput clone of the source device.
//!
//! Delayed events re-enter the input stack through this device. Every
//! emission writes the carrier event followed by a freshly generated
//! SYN_REPORT, compensating for the markers suppressed at capture.

use crate::error::{Error, Result};
use crate::event::CapturedEvent;
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, Device, EventType, InputEvent, Key, RelativeAxisType};
use std::sync::Mutex;

/// Destination for delayed events.
///
/// This is the seam between the scheduler and the kernel: production code
/// uses [`VirtualOutput`], tests substitute a recording sink.
pub trait EventSink: Send + Sync {
    /// Write one carrier event (plus its synchronization marker).
    fn emit(&self, event: &CapturedEvent) -> Result<()>;
}

/// A uinput device advertising the source device's capabilities.
///
/// Writes are serialized internally so any number of delay tasks can share
/// one handle. The kernel device is destroyed when this value is dropped.
pub struct VirtualOutput {
    device: Mutex<VirtualDevice>,
}

impl VirtualOutput {
    /// Name under which the virtual device registers.
    pub const DEVICE_NAME: &'static str = "lagwire delayed input";

    /// Create a virtual device mirroring the source's keys and relative axes.
    pub fn clone_of(source: &Device) -> Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        if let Some(supported) = source.supported_keys() {
            for key in supported.iter() {
                keys.insert(key);
            }
        }

        let mut axes = AttributeSet::<RelativeAxisType>::new();
        if let Some(supported) = source.supported_relative_axes() {
            for axis in supported.iter() {
                axes.insert(axis);
            }
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(Error::VirtualDevice)?
            .name(Self::DEVICE_NAME)
            .with_keys(&keys)
            .map_err(Error::VirtualDevice)?
            .with_relative_axes(&axes)
            .map_err(Error::VirtualDevice)?
            .build()
            .map_err(Error::VirtualDevice)?;

        Ok(Self {
            device: Mutex::new(device),
        })
    }
}

impl EventSink for VirtualOutput {
    fn emit(&self, event: &CapturedEvent) -> Result<()> {
        let mut device = self
            .device
            .lock()
            .map_err(|_| Error::Poisoned("virtual output device"))?;

        device.emit(&delayed_frame(event)).map_err(Error::Emit)
    }
}

/// The raw events written for one delayed emission: the carrier followed by
/// a freshly generated SYN_REPORT, restoring the marker suppressed at
/// capture.
pub fn delayed_frame(event: &CapturedEvent) -> [InputEvent; 2] {
    [
        InputEvent::new(EventType(event.event_type), event.code, event.value),
        InputEvent::new(EventType::SYNCHRONIZATION, 0, 0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_pairs_carrier_with_fresh_marker() {
        let key = CapturedEvent::from_raw(&InputEvent::new(EventType::KEY, 30, 1));
        let frame = delayed_frame(&key);

        assert_eq!(frame[0].event_type(), EventType::KEY);
        assert_eq!(frame[0].code(), 30);
        assert_eq!(frame[0].value(), 1);

        // SYN_REPORT with zeroed code/value, regardless of the carrier.
        assert_eq!(frame[1].event_type(), EventType::SYNCHRONIZATION);
        assert_eq!(frame[1].code(), 0);
        assert_eq!(frame[1].value(), 0);
    }

    #[test]
    fn test_every_category_gets_a_trailing_marker() {
        for raw in [
            InputEvent::new(EventType::RELATIVE, 0, -3),
            InputEvent::new(EventType::MISC, 4, 42),
        ] {
            let frame = delayed_frame(&CapturedEvent::from_raw(&raw));
            assert_eq!(frame[0].event_type(), raw.event_type());
            assert_eq!(frame[0].code(), raw.code());
            assert_eq!(frame[0].value(), raw.value());
            assert_eq!(frame[1].event_type(), EventType::SYNCHRONIZATION);
            assert_eq!(frame[1].code(), 0);
        }
    }
}

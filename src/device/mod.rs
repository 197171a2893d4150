//! Device input source: turns gilrs gamepad events into input samples.
//!
//! The mapping engine addresses controls by standard-layout ordinals (the
//! same numbering the configuration panel shows), so this module owns the
//! translation tables from gilrs button/axis identifiers to slot indices.

pub mod collector;

pub use collector::{DeviceCollector, DeviceError, DeviceHandle};

use crate::mapping::slots::InputSample;
use chrono::{DateTime, Local};
use gilrs::{Axis, Button};

/// Notification from the device layer to the engine.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    Sample {
        sample: InputSample,
        /// Wall-clock capture time, for diagnostics only.
        timestamp: DateTime<Local>,
    },
    /// The active gamepad went away; the engine must tear down.
    Disconnected,
}

/// Standard-layout button ordinal for a gilrs button.
///
/// Slots 16 (badge/guide) and 17 (touchpad) exist on the wire but are
/// reserved, so their buttons translate to `None` like unknown ones.
pub fn button_slot(button: Button) -> Option<u8> {
    match button {
        Button::South => Some(0),
        Button::East => Some(1),
        Button::West => Some(2),
        Button::North => Some(3),
        // gilrs calls the bumpers "triggers" and the triggers "trigger2".
        Button::LeftTrigger => Some(4),
        Button::RightTrigger => Some(5),
        Button::LeftTrigger2 => Some(6),
        Button::RightTrigger2 => Some(7),
        Button::Select => Some(8),
        Button::Start => Some(9),
        Button::LeftThumb => Some(10),
        Button::RightThumb => Some(11),
        Button::DPadUp => Some(12),
        Button::DPadDown => Some(13),
        Button::DPadLeft => Some(14),
        Button::DPadRight => Some(15),
        _ => None,
    }
}

/// Standard-layout axis ordinal for a gilrs axis, plus whether the sign must
/// flip: gilrs reports stick-up as positive, the page coordinate system has
/// down as positive.
pub fn axis_slot(axis: Axis) -> Option<(u8, bool)> {
    match axis {
        Axis::LeftStickX => Some((0, false)),
        Axis::LeftStickY => Some((1, true)),
        Axis::RightStickX => Some((2, false)),
        Axis::RightStickY => Some((3, true)),
        _ => None,
    }
}

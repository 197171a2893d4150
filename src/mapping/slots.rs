//! Physical control slots and their resolution from stored configuration.
//!
//! A slot is one physical button or axis, addressed by `(kind, index)` using
//! the standard-layout ordinals. Each slot resolves to at most one effective
//! action: the user override when present, otherwise the built-in default.
//! Resolution happens once, at mapper construction, so per-sample processing
//! never falls back between override and default.

use crate::mapping::actions::Action;
use crate::persistence::{StoredBinding, StoredProfile, SPEED_FACTOR_MAX, SPEED_FACTOR_MIN};
use std::collections::HashMap;
use tracing::warn;

/// Kind of physical control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Button,
    Axis,
}

/// Address of one physical control: kind plus 0-based ordinal within it.
pub type SlotId = (SlotKind, u8);

/// Standard-layout slot counts. Buttons 16 and 17 exist on the wire but are
/// reserved (badge button, touchpad) and never bindable.
pub const BUTTON_SLOTS: u8 = 16;
pub const AXIS_SLOTS: u8 = 4;

/// One raw input-change notification from the device layer.
///
/// `value` is in `[-1, 1]` for axes (0 = rest) and `[0, 1]` for buttons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSample {
    pub kind: SlotKind,
    pub index: u8,
    pub value: f32,
}

impl InputSample {
    pub fn button(index: u8, value: f32) -> Self {
        Self {
            kind: SlotKind::Button,
            index,
            value,
        }
    }

    pub fn axis(index: u8, value: f32) -> Self {
        Self {
            kind: SlotKind::Axis,
            index,
            value,
        }
    }

    /// Malformed samples are dropped, not escalated; the mapper stays live
    /// across a whole browsing session regardless of individual bad samples.
    pub fn is_well_formed(&self) -> bool {
        if !self.value.is_finite() {
            return false;
        }
        match self.kind {
            SlotKind::Button => (0.0..=1.0).contains(&self.value),
            SlotKind::Axis => (-1.0..=1.0).contains(&self.value),
        }
    }
}

/// Fully resolved per-slot configuration plus the slot's edge-tracking state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSlot {
    /// Effective action; `None` means the slot is inert.
    pub action: Option<Action>,
    pub speed_factor: f32,
    /// Axis-only: negate the deflection before it reaches the handler.
    pub invert: bool,
    /// Button-only: open-tab/open-window actions open in the background.
    pub background: bool,
    /// Whether the last sample for this slot was at or above the cutoff.
    pub engaged: bool,
}

impl ControlSlot {
    pub fn inert() -> Self {
        Self {
            action: None,
            speed_factor: 1.0,
            invert: false,
            background: false,
            engaged: false,
        }
    }

    fn bound(action: Action, speed_factor: f32) -> Self {
        Self {
            action: Some(action),
            speed_factor,
            ..Self::inert()
        }
    }
}

/// Built-in binding table for a standard-layout pad, as shipped defaults.
fn default_slot(id: SlotId) -> ControlSlot {
    match id {
        // Face button (Cross / A).
        (SlotKind::Button, 0) => ControlSlot::bound(Action::Click, 1.0),
        // Face buttons (Square / X, Triangle / Y).
        (SlotKind::Button, 2) => ControlSlot::bound(Action::PreviousPageInHistory, 1.0),
        (SlotKind::Button, 3) => ControlSlot::bound(Action::NextPageInHistory, 1.0),
        // Bumpers.
        (SlotKind::Button, 4) => ControlSlot::bound(Action::ReverseTab, 2.5),
        (SlotKind::Button, 5) => ControlSlot::bound(Action::ForwardTab, 2.5),
        // D-pad.
        (SlotKind::Button, 12) => ControlSlot::bound(Action::ScrollUp, 1.0),
        (SlotKind::Button, 13) => ControlSlot::bound(Action::ScrollDown, 1.0),
        (SlotKind::Button, 14) => ControlSlot::bound(Action::ScrollLeft, 1.0),
        (SlotKind::Button, 15) => ControlSlot::bound(Action::ScrollRight, 1.0),
        // Left stick.
        (SlotKind::Axis, 0) => ControlSlot::bound(Action::ScrollHorizontally, 1.0),
        (SlotKind::Axis, 1) => ControlSlot::bound(Action::ScrollVertically, 1.0),
        // Right stick.
        (SlotKind::Axis, 2) => ControlSlot::bound(Action::ThumbstickHistoryNavigation, 1.0),
        (SlotKind::Axis, 3) => ControlSlot::bound(Action::ThumbstickTabbing, 2.5),
        _ => ControlSlot::inert(),
    }
}

/// Resolves stored overrides against the default table into the slot map the
/// mapper owns for its lifetime.
///
/// Configuration errors never abort: an unknown action name or an
/// out-of-range speed factor renders that one slot inert and everything else
/// keeps working.
pub fn resolve_slots(profile: &StoredProfile) -> HashMap<SlotId, ControlSlot> {
    let mut slots = HashMap::new();

    for index in 0..BUTTON_SLOTS {
        let id = (SlotKind::Button, index);
        slots.insert(id, resolve_slot(id, profile.buttons.get(&index.to_string())));
    }
    for index in 0..AXIS_SLOTS {
        let id = (SlotKind::Axis, index);
        slots.insert(id, resolve_slot(id, profile.axes.get(&index.to_string())));
    }

    for key in profile.buttons.keys() {
        if !is_known_index(key, BUTTON_SLOTS) {
            warn!("Ignoring stored binding for unknown button {:?}", key);
        }
    }
    for key in profile.axes.keys() {
        if !is_known_index(key, AXIS_SLOTS) {
            warn!("Ignoring stored binding for unknown axis {:?}", key);
        }
    }

    slots
}

fn is_known_index(key: &str, limit: u8) -> bool {
    matches!(key.parse::<u8>(), Ok(index) if index < limit)
}

fn resolve_slot(id: SlotId, stored: Option<&StoredBinding>) -> ControlSlot {
    let mut slot = default_slot(id);
    let Some(stored) = stored else {
        return slot;
    };

    match stored.current_action.as_deref() {
        // Absent means "no override"; an empty or "null" selection on the
        // panel means the user explicitly unbound the slot.
        None => {}
        Some("") | Some("null") => slot.action = None,
        Some(name) => match Action::from_name(name) {
            Some(action) => slot.action = Some(action),
            None => {
                warn!("Unknown action {:?} for {:?}, slot disabled", name, id);
                return ControlSlot::inert();
            }
        },
    }

    if let Some(speed_factor) = stored.speed_factor {
        if !speed_factor.is_finite()
            || !(SPEED_FACTOR_MIN..=SPEED_FACTOR_MAX).contains(&speed_factor)
        {
            warn!(
                "Speed factor {} out of range for {:?}, slot disabled",
                speed_factor, id
            );
            return ControlSlot::inert();
        }
        slot.speed_factor = speed_factor;
    }

    match id.0 {
        SlotKind::Axis => slot.invert = stored.invert.unwrap_or(false),
        SlotKind::Button => slot.background = stored.background.unwrap_or(false),
    }

    slot
}

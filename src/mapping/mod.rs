//! Input-to-action mapping engine.
//!
//! Translates raw controller samples into browser navigation effects.
//! The [`mapper::InputMapper`] owns the per-control configuration and all
//! timing state; [`actions`] holds the immutable handler table, [`repeat`]
//! the timers for held continuous actions, and [`tabbable`] the live index
//! of focusable page elements. [`service`] wraps the mapper in a statum
//! state machine running as a tokio task.
//!
//! # Data Flow
//!
//! ```text
//! InputSample ──► [InputMapper] ──► discrete: fire handler once per edge
//!                      │
//!                      └──► continuous: RepeatScheduler ──► periodic fires
//!                                             │
//!                                   handlers ─┴─► PageDom / BrowserControl
//! ```

pub mod actions;
pub mod error;
pub mod mapper;
pub mod repeat;
pub mod service;
pub mod slots;
pub mod tabbable;

pub use actions::{Action, ActionClass, ActionInput, ActionRegistry};
pub use error::MapperError;
pub use mapper::InputMapper;
pub use repeat::{repeat_interval, RepeatScheduler};
pub use service::NavigatorHandle;
pub use slots::{ControlSlot, InputSample, SlotKind};
pub use tabbable::{TabbableIndex, TraversalDirection};

/// Scroll distance per fire at full deflection and speed factor 1.0.
pub const SCROLL_INPUT_MULTIPLIER: f32 = 50.0;

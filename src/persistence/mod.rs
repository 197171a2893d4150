//! # Persistence Module
//!
//! Data model for the stored navigator configuration. The configuration
//! panel (a separate surface) writes these structures; the mapping engine
//! reads them exactly once, at construction, and resolves them into its own
//! slot table. Nothing in the engine writes configuration back.
//!
//! ## Error Handling Strategy
//! Follows a fail-safe approach: a missing or corrupt configuration file
//! degrades to built-in defaults instead of preventing startup. Individual
//! bad bindings (unknown action name, out-of-range speed factor) make only
//! the affected slot inert; resolution happens in `mapping::slots`.

pub mod config_store;

pub use config_store::ConfigStore;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declared bounds of the speed-factor slider on the configuration panel.
/// Stored values outside this range are invalid.
pub const SPEED_FACTOR_MIN: f32 = 0.5;
pub const SPEED_FACTOR_MAX: f32 = 2.5;

/// Complete stored configuration for one navigator instance.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase", default)]
pub struct NavigatorConfig {
    /// Minimum magnitude at which a sample counts as pressed/deflected
    /// rather than rest noise.
    pub cutoff_value: f32,

    /// URL opened by the openNewTab action.
    pub new_tab_url: String,

    /// Per-slot user overrides over the built-in binding table.
    pub gamepad_configuration: StoredProfile,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            cutoff_value: 0.20,
            new_tab_url: "https://www.google.com/".to_string(),
            gamepad_configuration: StoredProfile::default(),
        }
    }
}

/// User overrides keyed by physical slot index, split by input kind the way
/// the configuration panel stores them. TOML table keys are strings, so the
/// indices stay strings here and get parsed during slot resolution.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct StoredProfile {
    pub buttons: HashMap<String, StoredBinding>,
    pub axes: HashMap<String, StoredBinding>,
}

/// Stored override for one physical button or axis.
///
/// `current_action` stays a free-form string here: the panel is user-editable
/// and an unknown action name must never fail deserialization of the whole
/// file. The mapping layer decides what the string resolves to.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredBinding {
    pub current_action: Option<String>,
    pub speed_factor: Option<f32>,
    /// Axis-only: reverses the sign of the deflection.
    pub invert: Option<bool>,
    /// Button-only: open-tab/open-window actions open in the background.
    pub background: Option<bool>,
}

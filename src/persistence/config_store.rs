//! Filesystem-backed configuration store (TOML under the user config dir).
//!
//! The store is deliberately dumb: load once at startup, write a default
//! file on first run, and never crash navigation over a broken file. The
//! configuration panel is the only writer during normal operation.

use crate::persistence::NavigatorConfig;
use color_eyre::eyre::{eyre, Result, WrapErr};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Handle to the on-disk configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store rooted at the platform config directory
    /// (e.g. `~/.config/padnav/config.toml` on Linux).
    pub fn default_location() -> Result<Self> {
        let base = dirs::config_dir().ok_or_else(|| eyre!("No config directory available"))?;
        Ok(Self {
            path: base.join("padnav").join("config.toml"),
        })
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a default configuration file if none exists yet.
    pub fn ensure_default_config(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }

        info!("No configuration found, writing defaults to {:?}", self.path);
        self.store(&NavigatorConfig::default())
    }

    /// Loads the stored configuration, falling back to defaults when the
    /// file is missing or unreadable. Navigation must start either way.
    pub fn load(&self) -> NavigatorConfig {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    "Could not read configuration at {:?}: {}, using defaults",
                    self.path, e
                );
                return NavigatorConfig::default();
            }
        };

        match toml::from_str::<NavigatorConfig>(&raw) {
            Ok(mut config) => {
                config.cutoff_value = sanitize_cutoff(config.cutoff_value);
                config
            }
            Err(e) => {
                warn!(
                    "Invalid configuration at {:?}: {}, using defaults",
                    self.path, e
                );
                NavigatorConfig::default()
            }
        }
    }

    /// Serializes the configuration to disk, creating parent directories.
    pub fn store(&self, config: &NavigatorConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .wrap_err_with(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let serialized =
            toml::to_string_pretty(config).wrap_err("Failed to serialize configuration")?;
        fs::write(&self.path, serialized)
            .wrap_err_with(|| format!("Failed to write configuration to {:?}", self.path))?;

        info!("Configuration written to {:?}", self.path);
        Ok(())
    }
}

/// The cutoff must stay a sensible fraction of full deflection; anything
/// else would make every slot permanently engaged or permanently dead.
/// Zero is out too: engagement is `|value| >= cutoff`, so a cutoff of 0.0
/// would turn rest samples into presses and make release impossible.
fn sanitize_cutoff(cutoff: f32) -> f32 {
    if cutoff.is_finite() && cutoff > 0.0 && cutoff < 1.0 {
        cutoff
    } else {
        warn!("Stored cutoff {} out of range, using default", cutoff);
        NavigatorConfig::default().cutoff_value
    }
}

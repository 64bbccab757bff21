//! Runtime configuration, loaded once at startup.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working runtime. Unknown keys are rejected rather than silently ignored;
//! a typo in a config file should fail loudly at startup, not at 3am.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Errors produced while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field value is outside its valid range.
    #[error("invalid config: {reason}")]
    Invalid {
        /// Which constraint was violated.
        reason: &'static str,
    },
}

/// Runtime tuning knobs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RuntimeConfig {
    /// Frames per second the loop paces itself to.
    pub target_fps: u32,
    /// Soft frame budget in microseconds; frames over it are counted.
    pub frame_budget_us: u64,
    /// Capacity of the deferred mutation queue.
    pub mutation_queue_capacity: usize,
    /// Viewport width the root is placed into.
    pub viewport_width: f32,
    /// Viewport height the root is placed into.
    pub viewport_height: f32,
    /// Consecutive abandoned frames before the loop gives up.
    pub max_consecutive_failures: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            frame_budget_us: 16_667,
            mutation_queue_capacity: 256,
            viewport_width: 1280.0,
            viewport_height: 720.0,
            max_consecutive_failures: 8,
        }
    }
}

impl RuntimeConfig {
    /// Parses a config from TOML text and validates it.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed input or unknown keys,
    /// [`ConfigError::Invalid`] on out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a config file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, plus everything
    /// [`Self::from_toml_str`] reports.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), fps = config.target_fps, "loaded runtime config");
        Ok(config)
    }

    /// Checks field ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_fps == 0 {
            return Err(ConfigError::Invalid {
                reason: "target_fps must be at least 1",
            });
        }
        if self.mutation_queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                reason: "mutation_queue_capacity must be at least 1",
            });
        }
        if self.viewport_width <= 0.0 || self.viewport_height <= 0.0 {
            return Err(ConfigError::Invalid {
                reason: "viewport dimensions must be positive",
            });
        }
        if self.max_consecutive_failures == 0 {
            return Err(ConfigError::Invalid {
                reason: "max_consecutive_failures must be at least 1",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = RuntimeConfig::from_toml_str(
            "target_fps = 144\nviewport_width = 1920.0\nviewport_height = 1080.0\n",
        )
        .unwrap();
        assert_eq!(config.target_fps, 144);
        assert_eq!(config.viewport_width, 1920.0);
        // Untouched fields keep their defaults.
        assert_eq!(config.mutation_queue_capacity, 256);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            RuntimeConfig::from_toml_str("target_fsp = 60\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(
            RuntimeConfig::from_toml_str("target_fps = 0\n"),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(matches!(
            RuntimeConfig::from_toml_str("viewport_width = -10.0\n"),
            Err(ConfigError::Invalid { .. })
        ));
    }
}

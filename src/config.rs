//! Overlay configuration.
//!
//! Every field has a default taken from [`crate::constants`], so a config file
//! only needs the values it wants to change:
//!
//! ```json
//! { "poll_interval_ms": 250, "spacing_estimate": "median" }
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    BLACK_FILL, CROSSHAIR_STROKE, CURRENT_OUTLINE, FALLBACK_SPACING, INITIAL_DELAY_MS, PLACED_FILL,
    POLL_INTERVAL_MS, RADIUS_FACTOR, RESET_KEY, TOGGLE_KEY, WHITE_FILL,
};

/// How grid spacing is estimated from the move history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpacingEstimate {
    /// Trust the first adjacent pair of steps that carries both grid and pixel
    /// positions for two distinct cells.
    #[default]
    FirstPair,
    /// Median over every such pair. Tolerates a single noisy observation.
    Median,
}

/// CSS-style hex colours used when painting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScheme {
    pub placed: String,
    pub crosshair: String,
    pub black: String,
    pub white: String,
    pub outline: String,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            placed: PLACED_FILL.to_string(),
            crosshair: CROSSHAIR_STROKE.to_string(),
            black: BLACK_FILL.to_string(),
            white: WHITE_FILL.to_string(),
            outline: CURRENT_OUTLINE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub poll_interval_ms: u64,
    pub initial_delay_ms: u64,
    pub fallback_spacing: f64,
    pub radius_factor: f64,
    pub spacing_estimate: SpacingEstimate,
    pub colors: ColorScheme,
    pub toggle_key: char,
    pub reset_key: char,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: POLL_INTERVAL_MS,
            initial_delay_ms: INITIAL_DELAY_MS,
            fallback_spacing: FALLBACK_SPACING,
            radius_factor: RADIUS_FACTOR,
            spacing_estimate: SpacingEstimate::default(),
            colors: ColorScheme::default(),
            toggle_key: TOGGLE_KEY,
            reset_key: RESET_KEY,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config: {e}"),
            ConfigError::Parse(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl OverlayConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = OverlayConfig::from_json_str("{}").unwrap();
        assert_eq!(config, OverlayConfig::default());
        assert_eq!(config.fallback_spacing, 40.0);
        assert_eq!(config.poll_interval_ms, 500);
    }

    #[test]
    fn test_partial_override() {
        let config = OverlayConfig::from_json_str(
            r##"{"spacing_estimate": "median", "colors": {"placed": "#00ff00"}, "toggle_key": "h"}"##,
        )
        .unwrap();
        assert_eq!(config.spacing_estimate, SpacingEstimate::Median);
        assert_eq!(config.colors.placed, "#00ff00");
        assert_eq!(config.colors.black, "#000");
        assert_eq!(config.toggle_key, 'h');
        assert_eq!(config.reset_key, 'r');
    }

    #[test]
    fn test_invalid_config() {
        let err = OverlayConfig::from_json_str(r#"{"radius_factor": "big"}"#).unwrap_err();
        assert!(err.to_string().starts_with("invalid config"));
    }
}

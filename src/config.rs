//! Configuration
//!
//! Physical constants and the packet timestamp format. A `StepConfig` is an
//! immutable value handed to the parser and metrics engine at construction.
//! It can be loaded from JSON; missing keys fall back to defaults.

use crate::error::ConfigError;
use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::Path;

/// Default packet timestamp format (`YYYYMMDD HH:MM:SS`)
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y%m%d %H:%M:%S";

/// Step ingestion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    /// Length of one step (meters)
    #[serde(default = "default_step_length_m")]
    pub step_length_m: f64,
    /// Body weight (kg)
    #[serde(default = "default_weight_kg")]
    pub weight_kg: f64,
    /// Body height (meters)
    #[serde(default = "default_height_m")]
    pub height_m: f64,
    /// Average walking speed (m/s)
    #[serde(default = "default_walking_speed_mps")]
    pub walking_speed_mps: f64,
    /// chrono format string for the packet timestamp field
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

fn default_step_length_m() -> f64 {
    0.65
}
fn default_weight_kg() -> f64 {
    75.0
}
fn default_height_m() -> f64 {
    1.75
}
fn default_walking_speed_mps() -> f64 {
    1.39
}
fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            step_length_m: default_step_length_m(),
            weight_kg: default_weight_kg(),
            height_m: default_height_m(),
            walking_speed_mps: default_walking_speed_mps(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

impl StepConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: StepConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every physical constant is finite and positive and that
    /// the timestamp format describes a full date and time
    pub fn validate(&self) -> Result<(), ConfigError> {
        let constants = [
            ("step_length_m", self.step_length_m),
            ("weight_kg", self.weight_kg),
            ("height_m", self.height_m),
            ("walking_speed_mps", self.walking_speed_mps),
        ];

        for (name, value) in constants {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }

        if self.timestamp_format.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "timestamp_format must not be empty".to_string(),
            ));
        }

        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Invalid(format!(
                "timestamp_format {:?} is not a valid format string",
                self.timestamp_format
            )));
        }

        // A comma in the format would collide with the field separator
        if self.timestamp_format.contains(',') {
            return Err(ConfigError::Invalid(
                "timestamp_format must not contain ','".to_string(),
            ));
        }

        check_format_roundtrip(&self.timestamp_format)
    }
}

/// The format must render an instant that it can also parse back, which
/// rules out formats missing the date or the time of day.
fn check_format_roundtrip(format: &str) -> Result<(), ConfigError> {
    let invalid = |detail: &str| {
        ConfigError::Invalid(format!(
            "timestamp_format {format:?} cannot describe a full timestamp: {detail}"
        ))
    };

    let sample = NaiveDate::from_ymd_opt(2024, 1, 15)
        .and_then(|d| d.and_hms_opt(8, 30, 45))
        .ok_or_else(|| invalid("sample instant out of range"))?;

    let mut rendered = String::new();
    write!(rendered, "{}", sample.format(format)).map_err(|_| invalid("render failed"))?;

    NaiveDateTime::parse_from_str(&rendered, format)
        .map(|_| ())
        .map_err(|e| invalid(&e.to_string()))
}

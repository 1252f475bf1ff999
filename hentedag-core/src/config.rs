//! Settings for one household installation, read from a TOML file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::model::{CategoryRule, Location, WasteCategory};
use crate::resolver::HouseholdQuery;

/// Default refresh interval: four weeks.
pub const DEFAULT_REFRESH_INTERVAL_DAYS: u32 = 28;
/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(thiserror::Error, Debug)]
/// Errors raised while loading or validating [`Settings`].
pub enum ConfigError {
    /// Settings file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Settings file is not valid TOML for [`Settings`].
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    /// None of street id, address, or coordinates is set.
    #[error("Missing settings: set street_id, address, or latitude/longitude")]
    MissingSettings,
    /// A value is out of range.
    #[error("Invalid setting {0}")]
    InvalidValue(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Household and refresh configuration.
pub struct Settings {
    /// Free-text address, e.g. "Kongeveien 1, Kristiansand".
    #[serde(default)]
    pub address: Option<String>,
    /// Street id as used by the provider.
    #[serde(default)]
    pub street_id: Option<String>,
    /// Municipality paired with `street_id`.
    #[serde(default)]
    pub municipality: Option<String>,
    /// Latitude of the household.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude of the household.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Categories to report on.
    #[serde(default = "default_categories")]
    pub categories: Vec<WasteCategory>,
    /// Label rules consulted before the provider defaults.
    #[serde(default)]
    pub category_rules: Vec<CategoryRule>,
    /// Minimum number of days between two calendar fetches.
    #[serde(default = "default_refresh_interval_days")]
    pub refresh_interval_days: u32,
    /// Timeout for each outbound request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Where and how much to log.
pub struct LoggingSettings {
    /// Log file. Nothing is logged when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// `tracing` filter directive.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: None,
            filter: default_log_filter(),
        }
    }
}

fn default_categories() -> Vec<WasteCategory> {
    ["paper", "bio", "residual", "metal"]
        .into_iter()
        .map(WasteCategory::from)
        .collect()
}

fn default_refresh_interval_days() -> u32 {
    DEFAULT_REFRESH_INTERVAL_DAYS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_log_filter() -> String {
    "info".to_owned()
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|text| text.trim())
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            address: None,
            street_id: None,
            municipality: None,
            latitude: None,
            longitude: None,
            categories: default_categories(),
            category_rules: Vec::new(),
            refresh_interval_days: DEFAULT_REFRESH_INTERVAL_DAYS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] when the text does not describe valid settings.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Check that the household can be located at all.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSettings`] when no street id, address, or coordinate is
    /// set, and [`ConfigError::InvalidValue`] for a zero timeout or interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let household = self.household();
        if household.street_id.is_none()
            && household.address.is_none()
            && household.location.is_none()
        {
            return Err(ConfigError::MissingSettings);
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("request_timeout_secs"));
        }
        if self.refresh_interval_days == 0 {
            return Err(ConfigError::InvalidValue("refresh_interval_days"));
        }
        Ok(())
    }

    /// Resolution input for the identifier resolver. Blank strings count as unset.
    #[must_use]
    pub fn household(&self) -> HouseholdQuery {
        let location = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Location {
                latitude,
                longitude,
            }),
            _ => None,
        };
        HouseholdQuery {
            address: non_empty(self.address.as_ref()),
            street_id: non_empty(self.street_id.as_ref()),
            municipality: non_empty(self.municipality.as_ref()),
            location,
        }
    }

    /// Minimum time between two calendar fetches.
    #[must_use]
    pub fn refresh_interval(&self) -> TimeDelta {
        TimeDelta::days(i64::from(self.refresh_interval_days))
    }

    /// Timeout for each outbound request.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

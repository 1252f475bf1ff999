//! Traits describing provider capabilities and the shared error type.

use async_trait::async_trait;

use crate::config::ConfigError;
use crate::locale::ParseError;
use crate::model::{AddressCandidate, HouseholdIdentifier, Location};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while resolving, fetching, or extracting a calendar.
pub enum CalendarError {
    /// No configured address, coordinate, or id resolved to a household.
    #[error("Household identifier not found")]
    IdentifierNotFound,
    /// Network failure or non-success status from a provider endpoint.
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
    /// None of the known document layouts yielded pickup data.
    #[error("Unrecognized calendar format")]
    UnrecognizedFormat,
    /// A date could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    /// Coordinates lie outside the area served by the coordinate lookup.
    #[error("Invalid location: {0}")]
    InvalidLocation(String),
    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CalendarError {
    /// Whether retrying on the next scheduled refresh can succeed.
    ///
    /// Configuration problems need the user to change settings first.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        !matches!(self, Self::InvalidLocation(_) | Self::Config(_))
    }
}

#[async_trait]
/// Provider endpoint translating free-text addresses into property references.
pub trait AddressLookupPort: Send + Sync {
    /// Look up addresses matching `term`. An empty list means no hit.
    ///
    /// # Errors
    ///
    /// Returns a [`CalendarError`] when the provider request fails.
    async fn lookup(&self, term: &str) -> Result<Vec<AddressCandidate>, CalendarError>;
}

#[async_trait]
/// Reverse geocoder translating a coordinate into the nearest street address.
pub trait GeocodePort: Send + Sync {
    /// Address text of the nearest address, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidLocation`] when the service rejects the coordinate,
    /// or another [`CalendarError`] when the request fails.
    async fn nearest_address(&self, location: Location) -> Result<Option<String>, CalendarError>;
}

#[async_trait]
/// Provider endpoint serving the calendar document of a household.
pub trait CalendarSourcePort: Send + Sync {
    /// Fetch the raw calendar document.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::FetchFailed`] on network failure or a non-success status.
    async fn fetch_document(&self, household: &HouseholdIdentifier)
    -> Result<String, CalendarError>;
}

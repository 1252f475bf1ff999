//! Finds the household identifier through a prioritized fallback chain.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::model::{AddressCandidate, HouseholdIdentifier, Location};
use crate::ports::{AddressLookupPort, CalendarError, GeocodePort};

#[derive(Debug, Clone, Default, PartialEq)]
/// Everything known about the household before resolution.
pub struct HouseholdQuery {
    /// Free-text address.
    pub address: Option<String>,
    /// Provider street id.
    pub street_id: Option<String>,
    /// Municipality paired with the street id.
    pub municipality: Option<String>,
    /// Household coordinate.
    pub location: Option<Location>,
}

/// Resolves a [`HouseholdIdentifier`] from configured ids, address text, or coordinates.
///
/// Resolution order, first success wins:
/// 1. street id and municipality, or a street id alone, used verbatim;
/// 2. the address, matched against the provider's address lookup;
/// 3. the coordinate, reverse geocoded to an address and then matched as in 2.
pub struct IdentifierResolver {
    address_lookup: Arc<dyn AddressLookupPort>,
    geocoder: Arc<dyn GeocodePort>,
}

impl IdentifierResolver {
    /// Create a resolver using the given lookup services.
    #[must_use]
    pub fn new(address_lookup: Arc<dyn AddressLookupPort>, geocoder: Arc<dyn GeocodePort>) -> Self {
        Self {
            address_lookup,
            geocoder,
        }
    }

    /// Resolve the identifier for `query`.
    ///
    /// Lookup failures fall through to the next step; they are not retried.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidLocation`] when the coordinate is rejected, and
    /// [`CalendarError::IdentifierNotFound`] when every step is exhausted.
    pub async fn resolve(&self, query: &HouseholdQuery) -> Result<HouseholdIdentifier, CalendarError> {
        if let Some(identifier) = explicit_identifier(query) {
            debug!(%identifier, "Using configured street id");
            return Ok(identifier);
        }

        if let Some(address) = query.address.as_deref() {
            match self.find_by_address(address).await {
                Ok(Some(identifier)) => return Ok(identifier),
                Ok(None) => info!(address, "Address lookup found no household"),
                Err(err) => warn!(address, error = %err, "Address lookup failed"),
            }
        }

        if let Some(location) = query.location {
            match self.find_by_location(location).await {
                Ok(Some(identifier)) => return Ok(identifier),
                Ok(None) => info!(
                    latitude = location.latitude,
                    longitude = location.longitude,
                    "Coordinate lookup found no household"
                ),
                Err(err @ CalendarError::InvalidLocation(_)) => return Err(err),
                Err(err) => warn!(error = %err, "Coordinate lookup failed"),
            }
        }

        Err(CalendarError::IdentifierNotFound)
    }

    async fn find_by_address(
        &self,
        address: &str,
    ) -> Result<Option<HouseholdIdentifier>, CalendarError> {
        // The lookup only understands "street number letter"; the municipality part is
        // compared against the candidate label instead.
        let term = address.split(',').next().unwrap_or(address).trim();
        if term.is_empty() {
            return Ok(None);
        }

        debug!(term, "Looking up address");
        let candidates = self.address_lookup.lookup(term).await?;
        Ok(select_candidate(address, &candidates)
            .map(|candidate| HouseholdIdentifier::Property(candidate.reference.clone())))
    }

    async fn find_by_location(
        &self,
        location: Location,
    ) -> Result<Option<HouseholdIdentifier>, CalendarError> {
        let Some(address) = self.geocoder.nearest_address(location).await? else {
            return Ok(None);
        };
        debug!(address, "Resolved coordinate to address");
        self.find_by_address(&address).await
    }
}

fn explicit_identifier(query: &HouseholdQuery) -> Option<HouseholdIdentifier> {
    let street_id = query.street_id.clone()?;
    Some(match query.municipality.clone() {
        Some(municipality) => HouseholdIdentifier::Street {
            street_id,
            municipality,
        },
        None => HouseholdIdentifier::Property(street_id),
    })
}

fn select_candidate<'list>(
    address: &str,
    candidates: &'list [AddressCandidate],
) -> Option<&'list AddressCandidate> {
    // "Kongeveien 1, Kristiansand" is compared with the label, "Kongeveien 1" with the value.
    let with_municipality = address.contains(',');
    let wanted = address.trim().to_lowercase();
    let found = candidates.iter().find(|candidate| {
        let field = if with_municipality {
            &candidate.label
        } else {
            &candidate.value
        };
        field.trim().to_lowercase() == wanted
    });

    if found.is_some() && candidates.len() > 1 {
        warn!(
            address,
            candidates = candidates.len(),
            "Address lookup returned several addresses; consider configuring the street id"
        );
    }
    found
}

//! Bundle of ports and layout strategies implementing one waste-collection provider.

use std::sync::Arc;

use crate::extract::{CalendarExtractor, ExtractionStrategy};
use crate::ports::{AddressLookupPort, CalendarSourcePort, GeocodePort};
use crate::resolver::IdentifierResolver;

#[derive(Debug, Clone)]
/// Metadata describing a provider.
pub struct ProviderMeta {
    /// Unique identifier, e.g. `avfallsor`.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Collection of ports implementing a provider.
pub struct ProviderPlugin {
    /// Static metadata describing the provider.
    pub meta: ProviderMeta,
    /// Implementation for matching addresses to property references.
    pub address_lookup: Arc<dyn AddressLookupPort>,
    /// Implementation for reverse geocoding coordinates.
    pub geocoder: Arc<dyn GeocodePort>,
    /// Implementation for fetching calendar documents.
    pub calendar_source: Arc<dyn CalendarSourcePort>,
    /// Known document layouts in detection order.
    pub strategies: Vec<Arc<dyn ExtractionStrategy>>,
}

impl ProviderPlugin {
    /// Resolver using this provider's lookup services.
    #[must_use]
    pub fn resolver(&self) -> IdentifierResolver {
        IdentifierResolver::new(
            Arc::clone(&self.address_lookup),
            Arc::clone(&self.geocoder),
        )
    }

    /// Extractor trying this provider's layouts.
    #[must_use]
    pub fn extractor(&self) -> CalendarExtractor {
        CalendarExtractor::new(self.strategies.clone())
    }
}

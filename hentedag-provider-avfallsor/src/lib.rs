//! Provider implementation for Avfall Sør, with Geonorge for coordinate lookups.

/// Document layouts served by Avfall Sør and their default category maps.
pub mod layouts;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::debug;

use hentedag_core::{
    config::DEFAULT_REQUEST_TIMEOUT_SECS,
    model::{AddressCandidate, CategoryRule, HouseholdIdentifier, Location},
    plugin::{ProviderMeta, ProviderPlugin},
    ports::{AddressLookupPort, CalendarError, CalendarSourcePort, GeocodePort},
};

/// Avfall Sør web site.
pub const AVFALLSOR_URL: &str = "https://avfallsor.no";
/// Geonorge address API.
pub const GEONORGE_URL: &str = "https://ws.geonorge.no/adresser/v1";

// Search radius in meters around the coordinate.
const POINT_SEARCH_RADIUS: &str = "20";

#[derive(Debug, Clone)]
/// Base URLs of the services used by this provider.
pub struct Endpoints {
    /// Avfall Sør base URL, serving address lookups and calendars.
    pub avfallsor: String,
    /// Geonorge address API base URL.
    pub geonorge: String,
    /// Upper bound for each request, applied on top of any client timeout.
    pub timeout: Duration,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            avfallsor: AVFALLSOR_URL.to_owned(),
            geonorge: GEONORGE_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Response from /wp-json/addresses/v1/address: a map of hits, or an empty list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LookupResponse {
    Hits(BTreeMap<String, LookupEntry>),
    Empty(Vec<IgnoredAny>),
}

/// Single hit from the address lookup.
#[derive(Debug, Deserialize)]
struct LookupEntry {
    #[serde(default)]
    label: String, // "Kongeveien 1, Kristiansand"
    #[serde(default)]
    value: String, // "Kongeveien 1"
    href: String, // ".../finn-hentedag/<reference>"
}

/// Response from Geonorge /punktsok
#[derive(Debug, Deserialize)]
struct PointSearchResponse {
    #[serde(rename = "adresser", default)]
    addresses: Vec<GeoAddress>,
}

#[derive(Debug, Deserialize)]
struct GeoAddress {
    #[serde(rename = "adressetekst", default)]
    text: String,
    // Address text without the optional property name.
    #[serde(rename = "adressetekstutenadressetilleggsnavn", default)]
    text_without_name: Option<String>,
}

/// Error body returned by Geonorge for rejected requests.
#[derive(Debug, Deserialize)]
struct GeoError {
    #[serde(default)]
    message: String,
}

/// Address lookup against the Avfall Sør address API.
pub struct AvfallSorAddressPort {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl AvfallSorAddressPort {
    /// Create a new address port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Replace the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl AddressLookupPort for AvfallSorAddressPort {
    async fn lookup(&self, term: &str) -> Result<Vec<AddressCandidate>, CalendarError> {
        let req = self
            .client
            .get(format!("{}/wp-json/addresses/v1/address", self.base_url))
            .query(&[("lookup_term", term)])
            .timeout(self.timeout);

        let candidates = match fetch_json::<LookupResponse>(req).await? {
            LookupResponse::Empty(_) => Vec::new(),
            LookupResponse::Hits(hits) => hits
                .into_values()
                .filter_map(|entry| {
                    let reference = entry
                        .href
                        .trim_end_matches('/')
                        .rsplit('/')
                        .next()
                        .unwrap_or_default()
                        .to_owned();
                    (!reference.is_empty()).then(|| AddressCandidate {
                        label: entry.label,
                        value: entry.value,
                        reference,
                    })
                })
                .collect(),
        };

        debug!(term, hits = candidates.len(), "Address lookup finished");
        Ok(candidates)
    }
}

/// Reverse geocoding through the Geonorge point search.
pub struct GeonorgePort {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl GeonorgePort {
    /// Create a new geocoding port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Replace the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl GeocodePort for GeonorgePort {
    async fn nearest_address(&self, location: Location) -> Result<Option<String>, CalendarError> {
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();
        let resp = self
            .client
            .get(format!("{}/punktsok", self.base_url))
            .query(&[
                ("lat", latitude.as_str()),
                ("lon", longitude.as_str()),
                ("radius", POINT_SEARCH_RADIUS),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(fetch_failed)?;

        // Geonorge answers 400 for coordinates outside Norway.
        if resp.status() == StatusCode::BAD_REQUEST {
            let message = resp
                .json::<GeoError>()
                .await
                .map(|body| body.message)
                .unwrap_or_default();
            return Err(CalendarError::InvalidLocation(format!(
                "{latitude},{longitude} is not in Norway: {message}"
            )));
        }

        let result = resp
            .error_for_status()
            .map_err(fetch_failed)?
            .json::<PointSearchResponse>()
            .await
            .map_err(fetch_failed)?;

        // The first hit is the nearest one.
        Ok(result.addresses.into_iter().next().map(|address| {
            address
                .text_without_name
                .filter(|text| !text.is_empty())
                .unwrap_or(address.text)
        }))
    }
}

/// Calendar page download from Avfall Sør.
pub struct AvfallSorCalendarPort {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl AvfallSorCalendarPort {
    /// Create a new calendar port bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Replace the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CalendarSourcePort for AvfallSorCalendarPort {
    async fn fetch_document(
        &self,
        household: &HouseholdIdentifier,
    ) -> Result<String, CalendarError> {
        let req = match household {
            HouseholdIdentifier::Street {
                street_id,
                municipality,
            } => self
                .client
                .get(format!("{}/tommekalender/", self.base_url))
                .query(&[("id", street_id), ("kommune", municipality)]),
            HouseholdIdentifier::Property(reference) => self.client.get(format!(
                "{}/henting-av-avfall/finn-hentedag/{}/",
                self.base_url,
                reference.trim_matches('/')
            )),
        };

        debug!(%household, "Fetching pickup calendar");
        req.timeout(self.timeout)
            .send()
            .await
            .map_err(fetch_failed)?
            .error_for_status()
            .map_err(fetch_failed)?
            .text()
            .await
            .map_err(fetch_failed)
    }
}

/// Build the plugin bundle for Avfall Sør against the public endpoints.
///
/// Requests are bounded by the default timeout; use [`plugin_with_endpoints`] to change it.
///
/// `overrides` are consulted before the built-in category maps of every layout.
#[must_use]
pub fn plugin(client: Client, overrides: &[CategoryRule]) -> ProviderPlugin {
    plugin_with_endpoints(client, &Endpoints::default(), overrides)
}

/// Build the plugin bundle for Avfall Sør against custom endpoints.
#[must_use]
pub fn plugin_with_endpoints(
    client: Client,
    endpoints: &Endpoints,
    overrides: &[CategoryRule],
) -> ProviderPlugin {
    ProviderPlugin {
        meta: provider_meta(),
        address_lookup: Arc::new(
            AvfallSorAddressPort::new(client.clone(), &endpoints.avfallsor)
                .with_timeout(endpoints.timeout),
        ),
        geocoder: Arc::new(
            GeonorgePort::new(client.clone(), &endpoints.geonorge).with_timeout(endpoints.timeout),
        ),
        calendar_source: Arc::new(
            AvfallSorCalendarPort::new(client, &endpoints.avfallsor).with_timeout(endpoints.timeout),
        ),
        strategies: layouts::default_strategies(overrides),
    }
}

fn provider_meta() -> ProviderMeta {
    ProviderMeta {
        id: String::from("avfallsor"),
        name: String::from("Avfall Sør"),
    }
}

fn fetch_failed(err: reqwest::Error) -> CalendarError {
    CalendarError::FetchFailed(err.to_string())
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, CalendarError> {
    req.send()
        .await
        .map_err(fetch_failed)?
        .error_for_status()
        .map_err(fetch_failed)?
        .json()
        .await
        .map_err(fetch_failed)
}

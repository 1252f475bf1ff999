//! Provider ports against mocked Avfall Sør and Geonorge endpoints.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use hentedag_core::{
    AddressLookupPort, CalendarError, CalendarSourcePort, GeocodePort, HouseholdIdentifier,
    Location, PickupService, RefreshOutcome, Settings, WasteCategory,
};
use hentedag_provider_avfallsor::{
    AvfallSorAddressPort, AvfallSorCalendarPort, Endpoints, GeonorgePort, plugin_with_endpoints,
};
use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LEGACY_PAGE: &str = r#"
    <html><body>
      <p>Din tømmedag er: Fredag</p>
      <ul class="tmk">
        <li><img src="/img/Papir.png" alt="grønn dunk"> Onsdag 19. mar</li>
        <li><img src="/img/Bio.png" alt="brun dunk"> Fredag 18. apr tømmes Lørdag 19. apr</li>
      </ul>
    </body></html>"#;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn at(day: NaiveDate) -> NaiveDateTime {
    day.and_hms_opt(7, 30, 0).expect("valid time")
}

#[tokio::test]
async fn address_lookup_maps_hits_to_references() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/addresses/v1/address"))
        .and(query_param("lookup_term", "Kongeveien 1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "0": {
                "label": "Kongeveien 1, Kristiansand",
                "value": "Kongeveien 1",
                "href": "https://avfallsor.no/henting-av-avfall/finn-hentedag/kongeveien-1-kristiansand/"
            },
            "1": {
                "label": "Kongeveien 1, Arendal",
                "value": "Kongeveien 1",
                "href": "https://avfallsor.no/henting-av-avfall/finn-hentedag/kongeveien-1-arendal"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let port = AvfallSorAddressPort::new(Client::new(), &server.uri());
    let candidates = port.lookup("Kongeveien 1").await.expect("lookup succeeds");

    let references: Vec<_> = candidates
        .iter()
        .map(|candidate| candidate.reference.as_str())
        .collect();
    assert_eq!(
        references,
        vec!["kongeveien-1-kristiansand", "kongeveien-1-arendal"]
    );
}

#[tokio::test]
async fn address_lookup_without_hits_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/addresses/v1/address"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let port = AvfallSorAddressPort::new(Client::new(), &server.uri());

    assert!(port.lookup("Ukjent vei 99").await.expect("lookup succeeds").is_empty());
}

#[tokio::test]
async fn geonorge_returns_nearest_address() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/punktsok"))
        .and(query_param("radius", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "adresser": [
                {
                    "adressetekst": "Kongeveien 1, Kongsgården",
                    "adressetekstutenadressetilleggsnavn": "Kongeveien 1"
                },
                { "adressetekst": "Kongeveien 3" }
            ]
        })))
        .mount(&server)
        .await;

    let port = GeonorgePort::new(Client::new(), &server.uri());
    let address = port
        .nearest_address(Location {
            latitude: 58.146,
            longitude: 7.995,
        })
        .await
        .expect("lookup succeeds");

    assert_eq!(address.as_deref(), Some("Kongeveien 1"));
}

#[tokio::test]
async fn geonorge_bad_request_is_invalid_location() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/punktsok"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "Ugyldig koordinat" })),
        )
        .mount(&server)
        .await;

    let port = GeonorgePort::new(Client::new(), &server.uri());
    let err = port
        .nearest_address(Location {
            latitude: 48.85,
            longitude: 2.35,
        })
        .await
        .expect_err("coordinate is rejected");

    assert!(matches!(err, CalendarError::InvalidLocation(ref message) if message.contains("Ugyldig")));
    assert!(!err.is_retriable());
}

#[tokio::test]
async fn calendar_fetch_failure_is_fetch_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tommekalender/"))
        .and(query_param("id", "4242"))
        .and(query_param("kommune", "Kristiansand"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let port = AvfallSorCalendarPort::new(Client::new(), &server.uri());
    let result = port
        .fetch_document(&HouseholdIdentifier::Street {
            street_id: "4242".to_owned(),
            municipality: "Kristiansand".to_owned(),
        })
        .await;

    assert!(matches!(result, Err(CalendarError::FetchFailed(_))));
}

#[tokio::test]
async fn slow_calendar_page_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/henting-av-avfall/finn-hentedag/kongeveien-1-kristiansand/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(LEGACY_PAGE)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let port = AvfallSorCalendarPort::new(Client::new(), &server.uri())
        .with_timeout(Duration::from_millis(200));
    let result = port
        .fetch_document(&HouseholdIdentifier::Property(
            "kongeveien-1-kristiansand".to_owned(),
        ))
        .await;

    assert!(matches!(result, Err(CalendarError::FetchFailed(_))));
}

#[tokio::test]
async fn service_resolves_fetches_and_throttles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/addresses/v1/address"))
        .and(query_param("lookup_term", "Kongeveien 1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "0": {
                "label": "Kongeveien 1, Kristiansand",
                "value": "Kongeveien 1",
                "href": "/henting-av-avfall/finn-hentedag/kongeveien-1-kristiansand/"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/henting-av-avfall/finn-hentedag/kongeveien-1-kristiansand/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LEGACY_PAGE))
        .expect(2)
        .mount(&server)
        .await;

    let endpoints = Endpoints {
        avfallsor: server.uri(),
        geonorge: server.uri(),
        ..Endpoints::default()
    };
    let settings = Settings {
        address: Some("Kongeveien 1, Kristiansand".to_owned()),
        categories: vec![
            WasteCategory::from("paper"),
            WasteCategory::from("bio"),
            WasteCategory::from("residual"),
        ],
        ..Settings::default()
    };
    let service = PickupService::new(
        &plugin_with_endpoints(Client::new(), &endpoints, &settings.category_rules),
        &settings,
    );

    let start = date(2025, 3, 10);
    assert_eq!(
        service.refresh(at(start)).await.expect("refreshes"),
        RefreshOutcome::Refreshed
    );
    assert_eq!(
        service
            .refresh(at(start + TimeDelta::days(1)))
            .await
            .expect("throttled"),
        RefreshOutcome::Throttled
    );

    let statuses = service.statuses(date(2025, 4, 16));
    let days: Vec<_> = statuses
        .iter()
        .map(|status| (status.category.as_str(), status.days_until))
        .collect();
    // Good Friday pickup of bio moved to Saturday; residual keeps Friday.
    assert_eq!(
        days,
        vec![("paper", None), ("bio", Some(3)), ("residual", Some(2))]
    );
    assert_eq!(service.last_updated(), Some(at(start)));

    assert_eq!(
        service
            .refresh(at(start + TimeDelta::weeks(4)))
            .await
            .expect("refreshes"),
        RefreshOutcome::Refreshed
    );
}

use crate::error::SearchError;
use crate::geo::Coordinate;
use crate::overpass::USER_AGENT;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

pub const NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";
pub const UNKNOWN_PLACE: &str = "Your Location";

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    suburb: Option<String>,
    county: Option<String>,
}

impl Address {
    fn place_name(self) -> Option<String> {
        self.city
            .or(self.town)
            .or(self.village)
            .or(self.suburb)
            .or(self.county)
    }
}

/// Picks the most specific settlement name out of a reverse-geocoding reply.
pub fn place_name_from_json(text: &str) -> Result<String, SearchError> {
    let response: ReverseResponse = serde_json::from_str(text)?;
    Ok(response
        .address
        .and_then(Address::place_name)
        .unwrap_or_else(|| UNKNOWN_PLACE.to_string()))
}

static NAMES: OnceLock<RwLock<HashMap<(i64, i64), String>>> = OnceLock::new();

fn names() -> &'static RwLock<HashMap<(i64, i64), String>> {
    NAMES.get_or_init(|| RwLock::new(HashMap::new()))
}

pub fn cached_name(at: Coordinate) -> Option<String> {
    names().read().get(&at.coarsened()).cloned()
}

fn remember(at: Coordinate, name: &str) {
    names().write().insert(at.coarsened(), name.to_string());
}

#[derive(Debug, Clone)]
pub struct ReverseGeocoder {
    http: reqwest::Client,
    endpoint: String,
}

impl ReverseGeocoder {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    pub fn request_url(&self, at: Coordinate) -> Option<Url> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("format", "json".to_string()),
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
                ("zoom", "10".to_string()),
                ("addressdetails", "1".to_string()),
            ],
        )
        .ok()
    }

    pub async fn place_name(&self, at: Coordinate) -> Result<String, SearchError> {
        if let Some(name) = cached_name(at) {
            return Ok(name);
        }

        let Some(url) = self.request_url(at) else {
            log::warn!("Invalid reverse geocoding endpoint: {}", self.endpoint);
            return Ok(UNKNOWN_PLACE.to_string());
        };

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(SearchError::status(status.as_u16(), &text));
        }

        let name = place_name_from_json(&text)?;
        remember(at, &name);
        Ok(name)
    }
}

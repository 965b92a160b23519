use crate::error::SearchError;
use crate::geo::Coordinate;
use crate::place::{Keyword, PlaceKind};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Write;
use std::future::Future;
use std::time::Duration;
use strum::IntoEnumIterator;

pub const DEFAULT_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";
pub const USER_AGENT: &str = concat!("foodwheel-nearby/", env!("CARGO_PKG_VERSION"));

const SEARCH_TIMEOUT_SECS: u32 = 25;
const PROBE_TIMEOUT_SECS: u32 = 10;
const PROBE_RADIUS_M: u32 = 50_000;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `name` or `cuisine` must contain the keyword, case-insensitively.
    Keyword(Keyword),
    Any,
}

/// Structured form of an Overpass QL request; `render` is the only place query text is built.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyQuery {
    pub origin: Coordinate,
    pub radius_m: u32,
    pub filter: Filter,
    pub kinds: Vec<PlaceKind>,
    pub timeout_secs: u32,
    pub limit: Option<usize>,
}

impl NearbyQuery {
    pub fn keyword(origin: Coordinate, radius_m: u32, keyword: Keyword) -> Self {
        Self::around(origin, radius_m, Filter::Keyword(keyword))
    }

    pub fn any(origin: Coordinate, radius_m: u32) -> Self {
        Self::around(origin, radius_m, Filter::Any)
    }

    fn around(origin: Coordinate, radius_m: u32, filter: Filter) -> Self {
        Self {
            origin,
            radius_m,
            filter,
            kinds: PlaceKind::iter().collect(),
            timeout_secs: SEARCH_TIMEOUT_SECS,
            limit: None,
        }
    }

    /// A single restaurant anywhere near the default location.
    pub fn probe() -> Self {
        Self {
            origin: Coordinate::KUALA_LUMPUR,
            radius_m: PROBE_RADIUS_M,
            filter: Filter::Any,
            kinds: vec![PlaceKind::Restaurant],
            timeout_secs: PROBE_TIMEOUT_SECS,
            limit: Some(1),
        }
    }

    pub fn render(&self) -> String {
        let around = format!(
            "(around:{},{},{})",
            self.radius_m, self.origin.latitude, self.origin.longitude
        );

        let mut out = format!("[out:json][timeout:{}];\n(\n", self.timeout_secs);
        for kind in &self.kinds {
            let selector = format!("node[\"{}\"=\"{}\"]", kind.tag_key(), kind);
            match &self.filter {
                Filter::Keyword(keyword) if !kind.keyword_tags().is_empty() => {
                    let pattern = keyword.query_pattern();
                    for tag in kind.keyword_tags() {
                        let _ = writeln!(out, "  {selector}[\"{tag}\"~\"{pattern}\",i]{around};");
                    }
                }
                _ => {
                    let _ = writeln!(out, "  {selector}{around};");
                }
            }
        }
        out.push_str(");\n");
        match self.limit {
            Some(limit) => {
                let _ = writeln!(out, "out body {limit};");
            }
            None => out.push_str("out body;\n"),
        }
        out
    }
}

#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
pub struct OverpassElement {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl OverpassElement {
    pub fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.lat?, self.lon?))
    }
}

pub fn parse_response(text: &str) -> Result<OverpassResponse, SearchError> {
    Ok(serde_json::from_str(text)?)
}

/// Anything that can answer a rendered query with a raw JSON body.
pub trait GeodataSource {
    fn fetch(&self, query: &NearbyQuery) -> impl Future<Output = Result<String, SearchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct OverpassClient {
    http: reqwest::Client,
    endpoint: String,
}

impl OverpassClient {
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

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl GeodataSource for OverpassClient {
    async fn fetch(&self, query: &NearbyQuery) -> Result<String, SearchError> {
        let body = query.render();
        log::debug!("POST {} ({} bytes)", self.endpoint, body.len());

        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(SearchError::status(status.as_u16(), &text));
        }
        Ok(text)
    }
}

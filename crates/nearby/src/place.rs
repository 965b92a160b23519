use crate::error::KeywordError;
use crate::geo::{self, Coordinate};
use derive_more::{AsRef, Deref, Display, From, Into};
use serde::Serialize;
use serde_with::DeserializeFromStr;
use std::collections::HashMap;
use std::str::FromStr;
use strum::{Display as StrumDisplay, EnumIter, EnumString};
use url::form_urlencoded;

pub const MAX_KEYWORD_LEN: usize = 64;
pub const DEFAULT_CUISINE: &str = "Restaurant";
pub const DEFAULT_KIND: &str = "restaurant";
const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/";

/// A search keyword that is safe to embed in a query once escaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, DeserializeFromStr, Display, Deref, AsRef)]
#[serde(transparent)]
pub struct Keyword(String);

impl Keyword {
    pub fn parse(raw: &str) -> Result<Self, KeywordError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(KeywordError::Empty);
        }
        let len = trimmed.chars().count();
        if len > MAX_KEYWORD_LEN {
            return Err(KeywordError::TooLong {
                len,
                max: MAX_KEYWORD_LEN,
            });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(KeywordError::ControlCharacter);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Regex metacharacters are escaped so the keyword only ever matches itself, then the
    /// result is escaped for a double-quoted Overpass string literal.
    pub fn query_pattern(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 2);
        for c in self.0.chars() {
            match c {
                '\\' => out.push_str(r"\\\\"),
                '"' => out.push_str(r#"\""#),
                '.' | '^' | '$' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}' => {
                    out.push_str(r"\\");
                    out.push(c);
                }
                _ => out.push(c),
            }
        }
        out
    }
}

impl FromStr for Keyword {
    type Err = KeywordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, StrumDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum PlaceKind {
    Restaurant,
    FastFood,
    Cafe,
    Bakery,
}

impl PlaceKind {
    pub fn tag_key(&self) -> &'static str {
        match self {
            Self::Bakery => "shop",
            _ => "amenity",
        }
    }

    /// Bakeries are always listed, whatever the keyword.
    pub fn keyword_tags(&self) -> &'static [&'static str] {
        match self {
            Self::Bakery => &[],
            _ => &["cuisine", "name"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Display, Deref, From, Into, AsRef)]
#[serde(transparent)]
pub struct PlaceName(String);

crate::impl_string_newtype!(PlaceName);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointOfInterest {
    pub name: PlaceName,
    pub coordinate: Coordinate,
    pub cuisine: String,
    pub kind: String,
    pub distance_km: f64,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub opening_hours: String,
}

impl PointOfInterest {
    /// Builds a point from raw tags, or `None` when the record has no name.
    pub fn from_tags(
        tags: &HashMap<String, String>,
        coordinate: Coordinate,
        origin: Coordinate,
    ) -> Option<Self> {
        let name = tags.get("name").map(|n| n.trim()).filter(|n| !n.is_empty())?;
        let tag = |key: &str| tags.get(key).cloned().unwrap_or_default();

        Some(Self {
            name: PlaceName::new(name),
            coordinate,
            cuisine: tags
                .get("cuisine")
                .cloned()
                .unwrap_or_else(|| DEFAULT_CUISINE.to_string()),
            kind: tags
                .get("amenity")
                .or_else(|| tags.get("shop"))
                .cloned()
                .unwrap_or_else(|| DEFAULT_KIND.to_string()),
            distance_km: origin.distance_km(&coordinate),
            address: tags
                .get("addr:street")
                .or_else(|| tags.get("addr:city"))
                .cloned()
                .unwrap_or_default(),
            phone: tag("phone"),
            website: tag("website"),
            opening_hours: tag("opening_hours"),
        })
    }

    pub fn distance_label(&self) -> String {
        geo::format_distance(self.distance_km)
    }

    /// `cuisine • kind • address`, without the address when unknown.
    pub fn details(&self) -> String {
        let mut parts = vec![self.cuisine.as_str(), self.kind.as_str()];
        if !self.address.is_empty() {
            parts.push(&self.address);
        }
        parts.join(" • ")
    }

    pub fn maps_url(&self) -> String {
        let query = format!("{} {}", self.name, self.address);
        let center = format!("{},{}", self.coordinate.latitude, self.coordinate.longitude);
        let params = form_urlencoded::Serializer::new(String::new())
            .append_pair("api", "1")
            .append_pair("query", query.trim_end())
            .append_pair("center", &center)
            .finish();
        format!("{MAPS_SEARCH_URL}?{params}")
    }
}

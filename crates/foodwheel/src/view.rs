//! Text rendering for everything the daemon streams back to a client.

use crate::session::{Busy, Phase, Session};
use crate::sys::location::FixSource;
use crate::wheel::{Category, FULL_TURN, Wheel};
use nearby::{PointOfInterest, SearchError};

pub const NO_RESULTS: &str = "😔 No restaurants found nearby";
pub const NO_RESULTS_HINT: &str = "Try spinning for another food type!";

pub fn spinning(turns: f64) -> String {
    format!("🎡 Spinning {:.1} turns...", turns)
}

pub fn category(category: &Category) -> String {
    format!("🎯 {} {}!", category.glyph, category.name)
}

pub fn searching(what: &str, place: &str) -> String {
    format!("🔍 Finding nearby {} places around {}...", what.to_lowercase(), place)
}

pub fn busy(busy: &Busy) -> String {
    format!("⏳ Busy: {}. Try again in a moment.", busy)
}

pub fn results(places: &[PointOfInterest]) -> Vec<String> {
    if places.is_empty() {
        return vec![NO_RESULTS.to_string(), NO_RESULTS_HINT.to_string()];
    }

    let mut lines = Vec::with_capacity(places.len() * 4);
    for (i, place) in places.iter().enumerate() {
        lines.push(format!("{}. {} ({})", i + 1, place.name, place.distance_label()));
        lines.push(format!("   {}", place.details()));
        if !place.opening_hours.is_empty() {
            lines.push(format!("   🕒 {}", place.opening_hours));
        }
        lines.push(format!("   📍 {}", place.maps_url()));
    }
    lines
}

pub fn failure(what: &str, error: &SearchError) -> Vec<String> {
    let mut lines = vec![
        format!(
            "⚠️ Sorry, couldn't find nearby {} places. Please try again.",
            what.to_lowercase()
        ),
        format!("   ({})", error),
        "This might be due to:".to_string(),
        "  - Limited restaurant data in your area".to_string(),
        "  - Internet connectivity issues".to_string(),
        "  - API temporary unavailability".to_string(),
    ];
    if let SearchError::Parse(_) = error {
        lines.push("The service answered with something other than JSON.".to_string());
    }
    lines.push("Run `nearby retry` to search again, `nearby all` for every restaurant,".to_string());
    lines.push("or `nearby check` to test the API connection.".to_string());
    lines
}

pub fn status(session: &Session, wheel: &Wheel) -> Vec<String> {
    let fix = session.fix;
    let source = match fix.source {
        FixSource::Located => "located",
        FixSource::Fallback => "fallback",
    };
    let pointing_at = wheel.resolve(session.rotation);
    let last = session
        .last_category
        .as_ref()
        .map(|c| format!("{} {}", c.glyph, c.name))
        .unwrap_or_else(|| "none".to_string());

    vec![
        format!("phase: {}", session.phase()),
        format!(
            "location: {} ({:.4}, {:.4}, {})",
            session.place, fix.coordinate.latitude, fix.coordinate.longitude, source
        ),
        format!(
            "wheel: {} categories, resting at {:.0}° on {} {}",
            wheel.len(),
            (session.rotation / FULL_TURN * 360.0).rem_euclid(360.0),
            pointing_at.glyph,
            pointing_at.name
        ),
        format!("last category: {}", last),
    ]
}

/// Shown when `retry` arrives before any spin.
pub fn nothing_to_retry(phase: Phase) -> String {
    format!("Nothing to retry yet (wheel is {}). Run `nearby spin` first.", phase)
}

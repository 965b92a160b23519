use crate::error::SearchError;
use crate::geo::Coordinate;
use crate::overpass::{self, GeodataSource, NearbyQuery, OverpassElement};
use crate::place::{Keyword, PlaceName, PointOfInterest};

pub const DEFAULT_RADIUS_M: u32 = 2000;
pub const DEFAULT_MAX_RESULTS: usize = 8;
pub const UNNAMED_RESTAURANT: &str = "Unnamed restaurant";

/// Queries a geodata source and turns its records into a distance-ordered list.
///
/// An empty list is a normal outcome; only transport and payload problems are errors.
/// Nothing is retried.
#[derive(Debug, Clone)]
pub struct Ranker<S> {
    source: S,
}

impl<S: GeodataSource> Ranker<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn find_nearby(
        &self,
        origin: Coordinate,
        keyword: &Keyword,
        radius_m: u32,
        max_results: usize,
    ) -> Result<Vec<PointOfInterest>, SearchError> {
        let query = NearbyQuery::keyword(origin, radius_m, keyword.clone());
        self.search(&query, max_results).await
    }

    /// Every restaurant, fast food place, cafe and bakery in range.
    pub async fn find_any(
        &self,
        origin: Coordinate,
        radius_m: u32,
        max_results: usize,
    ) -> Result<Vec<PointOfInterest>, SearchError> {
        self.search(&NearbyQuery::any(origin, radius_m), max_results)
            .await
    }

    pub async fn search(
        &self,
        query: &NearbyQuery,
        max_results: usize,
    ) -> Result<Vec<PointOfInterest>, SearchError> {
        let body = self.source.fetch(query).await?;
        let response = overpass::parse_response(&body)?;
        let ranked = rank(query.origin, &response.elements, max_results);
        log::debug!(
            "{} of {} elements kept for {:?}",
            ranked.len(),
            response.elements.len(),
            query.filter
        );
        Ok(ranked)
    }

    /// Checks the service answers at all. `Ok(None)` means it answered with nothing.
    pub async fn probe(&self) -> Result<Option<PlaceName>, SearchError> {
        let body = self.source.fetch(&NearbyQuery::probe()).await?;
        let response = overpass::parse_response(&body)?;
        Ok(response.elements.first().map(|element| {
            element
                .tags
                .get("name")
                .map(|name| PlaceName::new(name.as_str()))
                .unwrap_or_else(|| PlaceName::from(UNNAMED_RESTAURANT))
        }))
    }
}

/// Normalizes, sorts by distance (stable, so ties keep source order) and truncates.
pub fn rank(
    origin: Coordinate,
    elements: &[OverpassElement],
    max_results: usize,
) -> Vec<PointOfInterest> {
    let mut places: Vec<PointOfInterest> = elements
        .iter()
        .filter_map(|element| {
            let coordinate = element.coordinate()?;
            PointOfInterest::from_tags(&element.tags, coordinate, origin)
        })
        .collect();

    places.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    places.truncate(max_results);
    places
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Replays a canned body and records the queries it was asked.
    #[derive(Default, Clone)]
    struct CannedSource {
        body: Option<String>,
        status: Option<u16>,
        seen: Arc<Mutex<Vec<NearbyQuery>>>,
    }

    impl CannedSource {
        fn body(body: &str) -> Self {
            Self {
                body: Some(body.to_string()),
                ..Default::default()
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                status: Some(status),
                ..Default::default()
            }
        }
    }

    impl GeodataSource for CannedSource {
        async fn fetch(&self, query: &NearbyQuery) -> Result<String, SearchError> {
            self.seen.lock().push(query.clone());
            match (&self.body, self.status) {
                (_, Some(status)) => Err(SearchError::status(status, "Too Many Requests")),
                (Some(body), None) => Ok(body.clone()),
                (None, None) => Ok(r#"{"elements": []}"#.to_string()),
            }
        }
    }

    const KL: Coordinate = Coordinate::KUALA_LUMPUR;

    fn node(name: Option<&str>, lat: f64, lon: f64) -> String {
        match name {
            Some(name) => format!(
                r#"{{"type":"node","lat":{lat},"lon":{lon},"tags":{{"name":"{name}","amenity":"restaurant"}}}}"#
            ),
            None => format!(r#"{{"type":"node","lat":{lat},"lon":{lon},"tags":{{"amenity":"cafe"}}}}"#),
        }
    }

    fn payload(nodes: &[String]) -> String {
        format!(r#"{{"elements":[{}]}}"#, nodes.join(","))
    }

    fn keyword(s: &str) -> Keyword {
        Keyword::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_results_are_sorted_and_truncated() {
        let nodes: Vec<String> = (0..12)
            .map(|i| {
                let offset = ((i * 7) % 12) as f64 * 0.001;
                node(Some(format!("Place {i}").as_str()), KL.latitude + offset, KL.longitude)
            })
            .collect();
        let ranker = Ranker::new(CannedSource::body(&payload(&nodes)));

        let places = ranker
            .find_nearby(KL, &keyword("pizza"), DEFAULT_RADIUS_M, DEFAULT_MAX_RESULTS)
            .await
            .unwrap();

        assert_eq!(places.len(), DEFAULT_MAX_RESULTS);
        assert!(
            places
                .windows(2)
                .all(|w| w[0].distance_km <= w[1].distance_km)
        );
        assert_eq!(places[0].name.as_str(), "Place 0");
        assert_eq!(places[0].distance_km, 0.0);
    }

    #[tokio::test]
    async fn test_nameless_records_are_dropped() {
        let nodes = vec![
            node(None, KL.latitude, KL.longitude),
            node(Some("Named"), KL.latitude + 0.01, KL.longitude),
            r#"{"type":"node","lat":3.2,"lon":101.7}"#.to_string(),
            r#"{"type":"way","tags":{"name":"No Coordinates"}}"#.to_string(),
        ];
        let ranker = Ranker::new(CannedSource::body(&payload(&nodes)));

        let places = ranker
            .find_nearby(KL, &keyword("coffee"), 2000, 8)
            .await
            .unwrap();

        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name.as_str(), "Named");
    }

    #[tokio::test]
    async fn test_ties_keep_source_order() {
        let nodes: Vec<String> = ["First", "Second", "Third"]
            .into_iter()
            .map(|name| node(Some(name), 3.2, 101.7))
            .collect();
        let ranker = Ranker::new(CannedSource::body(&payload(&nodes)));

        let names: Vec<String> = ranker
            .find_nearby(KL, &keyword("steak"), 2000, 8)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name.to_string())
            .collect();

        assert_eq!(names, ["First", "Second", "Third"]);
    }

    #[tokio::test]
    async fn test_no_matches_is_empty_not_error() {
        let source = CannedSource::default();
        let ranker = Ranker::new(source.clone());

        let places = ranker
            .find_nearby(KL, &keyword("sushi"), 2000, 8)
            .await
            .unwrap();

        assert!(places.is_empty());
        let seen = source.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].filter, overpass::Filter::Keyword(keyword("sushi")));
        assert_eq!(seen[0].radius_m, 2000);
    }

    #[tokio::test]
    async fn test_http_failure_is_network_error() {
        let ranker = Ranker::new(CannedSource::failing(429));
        let err = ranker
            .find_nearby(KL, &keyword("ramen"), 2000, 8)
            .await
            .unwrap_err();
        assert!(err.is_network());
        assert!(matches!(err, SearchError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_parse_error() {
        let ranker = Ranker::new(CannedSource::body("<html>rate limited</html>"));
        let err = ranker.find_any(KL, 2000, 8).await.unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }

    #[tokio::test]
    async fn test_find_any_sends_unfiltered_query() {
        let source = CannedSource::default();
        Ranker::new(source.clone())
            .find_any(KL, 1500, 8)
            .await
            .unwrap();
        assert_eq!(source.seen.lock()[0].filter, overpass::Filter::Any);
    }

    #[tokio::test]
    async fn test_probe() {
        let found = Ranker::new(CannedSource::body(&payload(&[node(Some("Nasi Kandar"), 3.1, 101.6)])))
            .probe()
            .await
            .unwrap();
        assert_eq!(found, Some(PlaceName::from("Nasi Kandar")));

        let unnamed = Ranker::new(CannedSource::body(r#"{"elements":[{"lat":1.0,"lon":2.0}]}"#))
            .probe()
            .await
            .unwrap();
        assert_eq!(unnamed, Some(PlaceName::from(UNNAMED_RESTAURANT)));

        let empty = Ranker::new(CannedSource::default()).probe().await.unwrap();
        assert_eq!(empty, None);
    }
}

pub mod error;
pub mod geo;
pub mod geocode;
pub mod macros;
pub mod overpass;
pub mod place;
pub mod ranker;

pub use error::{GeoError, KeywordError, SearchError};
pub use geo::Coordinate;
pub use overpass::{GeodataSource, OverpassClient};
pub use place::{Keyword, PlaceName, PointOfInterest};
pub use ranker::Ranker;

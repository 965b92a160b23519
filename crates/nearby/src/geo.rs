use crate::error::GeoError;
use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const KUALA_LUMPUR: Coordinate = Coordinate {
        latitude: 3.139,
        longitude: 101.6869,
    };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        let coordinate = Self::new(latitude, longitude);
        if coordinate.is_valid() {
            Ok(coordinate)
        } else {
            Err(GeoError::OutOfRange {
                latitude,
                longitude,
            })
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        distance_km(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    /// Rounds to 2 decimal places (~1km), for use as a cache key.
    pub fn coarsened(&self) -> (i64, i64) {
        (
            (self.latitude * 100.0).round() as i64,
            (self.longitude * 100.0).round() as i64,
        )
    }
}

/// Great-circle distance in kilometres between two points given in degrees.
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let hav = |x: f64| (x / 2.0).sin().powi(2);

    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = hav(d_lat) + lat1.to_radians().cos() * lat2.to_radians().cos() * hav(d_lng);

    // rounding can push `a` a hair past 1 for antipodal points
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Metres below one kilometre, otherwise kilometres with one decimal.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{}m", (km * 1000.0).round() as i64)
    } else {
        format!("{km:.1}km")
    }
}

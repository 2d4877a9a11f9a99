use chrono::{DateTime, Utc};
use geo_types::Point;
use serde::{Deserialize, Serialize};

use crate::geo::haversine_distance;

/// A single reported device position. The point is stored as x = longitude, y = latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub position: Point,
    /// Instantaneous speed in m/s as reported by the provider. May be negative or NaN when invalid.
    pub speed_ms: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    pub fn new(position: Point, speed_ms: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self {
            position,
            speed_ms,
            timestamp,
        }
    }

    pub fn from_lat_lon(latitude: f64, longitude: f64, speed_ms: Option<f64>, timestamp: DateTime<Utc>) -> Self {
        Self::new(Point::new(longitude, latitude), speed_ms, timestamp)
    }

    pub fn latitude(&self) -> f64 {
        self.position.y()
    }

    pub fn longitude(&self) -> f64 {
        self.position.x()
    }

    /// Reported speed with invalid readings clamped to zero.
    pub fn clamped_speed_ms(&self) -> Option<f64> {
        self.speed_ms.map(|speed| if speed.is_finite() { speed.max(0.) } else { 0. })
    }

    pub fn distance_km(&self, other: &PositionFix) -> f64 {
        haversine_distance(
            (self.latitude(), self.longitude()),
            (other.latitude(), other.longitude()),
        )
    }
}

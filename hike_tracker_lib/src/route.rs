use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A predefined hiking trail, as supplied by the route catalog. Read-only for the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "distance")]
    pub target_distance_km: f64,
    #[serde(rename = "elevation")]
    pub target_elevation_gain_m: u32,
    pub estimated_time: String,
}

impl Route {
    pub fn new(name: impl Into<String>, target_distance_km: f64, target_elevation_gain_m: u32, estimated_time: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            target_distance_km,
            target_elevation_gain_m,
            estimated_time: estimated_time.into(),
        }
    }
}

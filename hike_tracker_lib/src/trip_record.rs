use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::route::Route;

/// Immutable summary of one completed tracking session.
///
/// Timestamps are truncated to whole seconds on creation so the ISO-8601 form stored on disk
/// reads back to an identical value.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TripRecord {
    pub id: Uuid,
    pub route_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "distance")]
    pub distance_km: f64,
    #[serde(rename = "elevationGain")]
    pub elevation_gain_m: u32,
    pub calories_burned: u32,
    #[serde(rename = "duration")]
    pub duration_secs: u64,
    pub weather_conditions: String,
}

impl TripRecord {
    pub fn new(
        route: &Route,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        distance_km: f64,
        calories_burned: u32,
        duration_secs: u64,
        weather_conditions: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            route_name: route.name.clone(),
            start_time: start_time.trunc_subsecs(0),
            end_time: end_time.trunc_subsecs(0),
            distance_km,
            elevation_gain_m: route.target_elevation_gain_m,
            calories_burned,
            duration_secs,
            weather_conditions,
        }
    }
}

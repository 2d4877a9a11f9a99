//! Derived hike statistics.
//!
//! Calories and heart rate are synthetic, distance-driven approximations for a
//! reference body mass. They are not physiologically precise and no sensor is involved.

/// Approximate kcal burned per km hiked.
pub const CALORIE_FACTOR: f64 = 70.;

pub const BASE_HEART_RATE_BPM: u32 = 120;
/// Beats per minute added per km hiked.
pub const HEART_RATE_SLOPE: f64 = 5.;
pub const HEART_RATE_CAP_BPM: u32 = 180;

const SECONDS_PER_HOUR: f64 = 3600.;
const MS_TO_KMH: f64 = 3.6;

pub fn calories_burned(distance_km: f64) -> u32 {
    (distance_km.max(0.) * CALORIE_FACTOR).round() as u32
}

pub fn heart_rate_bpm(distance_km: f64) -> u32 {
    let increase = (distance_km.max(0.) * HEART_RATE_SLOPE)
        .round()
        .min(f64::from(HEART_RATE_CAP_BPM)) as u32;
    (BASE_HEART_RATE_BPM + increase).min(HEART_RATE_CAP_BPM)
}

/// Average speed over the elapsed time. Zero before the first second has passed.
pub fn average_speed_kmh(distance_km: f64, elapsed_secs: u64) -> f64 {
    if elapsed_secs == 0 {
        return 0.;
    }
    distance_km / (elapsed_secs as f64 / SECONDS_PER_HOUR)
}

pub fn speed_ms_to_kmh(speed_ms: f64) -> f64 {
    speed_ms.max(0.) * MS_TO_KMH
}

/// Share of the route target covered, in [0, 1]. A route without a positive target reports 0.
pub fn progress_fraction(distance_km: f64, target_distance_km: f64) -> f64 {
    if !target_distance_km.is_finite() || target_distance_km <= 0. {
        return 0.;
    }
    (distance_km.min(target_distance_km) / target_distance_km).clamp(0., 1.)
}

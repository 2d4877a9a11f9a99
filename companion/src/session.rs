//! The live hike tracking state machine.
//!
//! [`TrackingSession`] is plain synchronous state. It never touches clocks, timers or feeds
//! itself: the tracker actor feeds it ticks and fixes one at a time, which keeps every
//! mutation serialized and makes the math testable without a runtime.

use std::fmt;

use chrono::{DateTime, Utc};
use hike_tracker_lib::{
    metrics::{average_speed_kmh, calories_burned, heart_rate_bpm, progress_fraction, speed_ms_to_kmh},
    position_fix::PositionFix,
    route::Route,
    time_format::format_clock,
    trip_record::TripRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Paused,
    Finished,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Start,
    Pause,
    Resume,
    Finish,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Pause => write!(f, "pause"),
            Self::Resume => write!(f, "resume"),
            Self::Finish => write!(f, "finish"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// The operation is not allowed in the current state. Nothing was changed.
    #[error("cannot {operation} a session that is {state}")]
    InvalidStateTransition { state: SessionState, operation: Operation },
    #[error("tracker is no longer running")]
    TrackerClosed,
}

/// Point-in-time view of a session for display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub route_name: Option<String>,
    pub elapsed_secs: u64,
    pub distance_km: f64,
    pub speed_kmh: f64,
    pub calories_burned: u32,
    pub heart_rate_bpm: u32,
    pub progress: f64,
    pub position_available: bool,
}

impl SessionSnapshot {
    pub fn formatted_elapsed(&self) -> String {
        format_clock(self.elapsed_secs)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackingSession {
    state: SessionState,
    route: Option<Route>,
    started_at: Option<DateTime<Utc>>,
    elapsed_secs: u64,
    distance_km: f64,
    last_fix: Option<PositionFix>,
    current_speed_kmh: f64,
    position_available: bool,
    record: Option<TripRecord>,
}

impl TrackingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle -> Running.
    pub fn start(&mut self, route: Route, now: DateTime<Utc>) -> Result<(), SessionError> {
        self.expect_state(Operation::Start, &[SessionState::Idle])?;

        self.route = Some(route);
        self.started_at = Some(now);
        self.elapsed_secs = 0;
        self.distance_km = 0.;
        self.last_fix = None;
        self.current_speed_kmh = 0.;
        self.position_available = true;
        self.state = SessionState::Running;
        Ok(())
    }

    /// Running -> Paused. Elapsed time and distance freeze until resumed.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.expect_state(Operation::Pause, &[SessionState::Running])?;
        self.state = SessionState::Paused;
        Ok(())
    }

    /// Paused -> Running. The last fix before the pause is kept as the distance anchor.
    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.expect_state(Operation::Resume, &[SessionState::Paused])?;
        self.state = SessionState::Running;
        Ok(())
    }

    /// Running|Paused -> Finished, producing the trip record.
    ///
    /// Finishing an already finished session hands back the same record and changes nothing;
    /// `weather` is only consulted on the first call.
    pub fn finish(&mut self, now: DateTime<Utc>, weather: impl FnOnce() -> String) -> Result<TripRecord, SessionError> {
        if let Some(record) = &self.record {
            return Ok(record.clone());
        }
        self.expect_state(Operation::Finish, &[SessionState::Running, SessionState::Paused])?;

        let (Some(route), Some(started_at)) = (&self.route, self.started_at) else {
            return Err(self.invalid(Operation::Finish));
        };

        let record = TripRecord::new(
            route,
            started_at,
            now,
            self.distance_km,
            self.calories_burned(),
            self.elapsed_secs,
            weather(),
        );

        self.state = SessionState::Finished;
        self.record = Some(record.clone());
        Ok(record)
    }

    /// Advances elapsed time by one second. Returns false when the tick was ignored.
    pub fn tick(&mut self) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        self.elapsed_secs += 1;
        self.current_speed_kmh = average_speed_kmh(self.distance_km, self.elapsed_secs);
        true
    }

    /// Accumulates the distance from the previous fix. Returns false when the fix was ignored.
    pub fn apply_fix(&mut self, fix: PositionFix) -> bool {
        if self.state != SessionState::Running {
            return false;
        }

        if let Some(last_fix) = &self.last_fix {
            self.distance_km += last_fix.distance_km(&fix);
        }

        if let Some(speed_ms) = fix.clamped_speed_ms() {
            self.current_speed_kmh = speed_ms_to_kmh(speed_ms);
        }

        self.last_fix = Some(fix);
        self.position_available = true;
        true
    }

    /// Records that the feed cannot deliver fixes. Distance simply stalls; nothing else changes.
    pub fn mark_position_unavailable(&mut self) -> bool {
        if self.state != SessionState::Running {
            return false;
        }
        self.position_available = false;
        true
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub fn last_fix(&self) -> Option<&PositionFix> {
        self.last_fix.as_ref()
    }

    pub fn current_speed_kmh(&self) -> f64 {
        self.current_speed_kmh
    }

    pub fn calories_burned(&self) -> u32 {
        calories_burned(self.distance_km)
    }

    pub fn heart_rate_bpm(&self) -> u32 {
        heart_rate_bpm(self.distance_km)
    }

    pub fn progress_fraction(&self) -> f64 {
        self.route
            .as_ref()
            .map(|route| progress_fraction(self.distance_km, route.target_distance_km))
            .unwrap_or(0.)
    }

    pub fn position_available(&self) -> bool {
        self.position_available
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            route_name: self.route.as_ref().map(|route| route.name.clone()),
            elapsed_secs: self.elapsed_secs,
            distance_km: self.distance_km,
            speed_kmh: self.current_speed_kmh,
            calories_burned: self.calories_burned(),
            heart_rate_bpm: self.heart_rate_bpm(),
            progress: self.progress_fraction(),
            position_available: self.position_available,
        }
    }

    fn expect_state(&self, operation: Operation, allowed: &[SessionState]) -> Result<(), SessionError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: Operation) -> SessionError {
        SessionError::InvalidStateTransition { state: self.state, operation }
    }
}

//! Position feeds deliver device fixes to the tracker.
//!
//! A feed is started with a [`FeedSink`] and pushes [`FeedEvent`]s into it until stopped.
//! Every sink is tagged with the epoch of the start that created it, so anything a feed
//! delivers after being stopped is recognised as stale by the tracker and dropped.

mod device;
mod replay;

pub use device::{DeviceFeed, DeviceFeedHandle};
pub use replay::ReplayFeed;

use hike_tracker_lib::position_fix::PositionFix;
use tokio::sync::mpsc;

use crate::tracker::SessionEvent;

/// Minimum movement between delivered fixes.
pub const DEFAULT_DISTANCE_FILTER_M: f64 = 10.;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("position unavailable: {reason}")]
pub struct PositionUnavailable {
    pub reason: String,
}

impl PositionUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Fix(PositionFix),
    Unavailable(PositionUnavailable),
}

pub trait PositionFeed: Send {
    /// Begin delivering events into `sink`. Starting an active feed does nothing.
    fn start(&mut self, sink: FeedSink);

    /// Stop delivering. Anything still in flight carries the old epoch and is dropped by the tracker.
    fn stop(&mut self);

    fn is_active(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct FeedSink {
    epoch: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl FeedSink {
    pub(crate) fn new(epoch: u64, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { epoch, tx }
    }

    /// Returns false once the tracker is gone.
    pub fn send(&self, event: FeedEvent) -> bool {
        self.tx
            .send(SessionEvent::Feed { epoch: self.epoch, event })
            .is_ok()
    }
}

/// Drops fixes closer than the threshold to the last accepted one.
#[derive(Debug, Clone)]
pub struct DistanceFilter {
    threshold_km: f64,
    last: Option<PositionFix>,
}

impl DistanceFilter {
    pub fn new(threshold_m: f64) -> Self {
        Self {
            threshold_km: threshold_m.max(0.) / 1000.,
            last: None,
        }
    }

    /// Forget the last accepted fix, so the next one always passes.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn accept(&mut self, fix: &PositionFix) -> bool {
        let passes = match &self.last {
            Some(last) => last.distance_km(fix) >= self.threshold_km,
            None => true,
        };
        if passes {
            self.last = Some(*fix);
        }
        passes
    }
}

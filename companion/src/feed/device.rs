use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hike_tracker_lib::position_fix::PositionFix;
use tracing::debug;

use super::{DistanceFilter, FeedEvent, FeedSink, PositionFeed, PositionUnavailable};

#[derive(Debug)]
struct Shared {
    sink: Option<FeedSink>,
    filter: DistanceFilter,
    denied: Option<String>,
}

/// A feed driven from outside, by whatever owns the device's location provider.
///
/// The tracker owns the [`DeviceFeed`]; the provider keeps a [`DeviceFeedHandle`] and pushes
/// fixes into it. Fixes pushed while the feed is stopped go nowhere.
#[derive(Debug)]
pub struct DeviceFeed {
    shared: Arc<Mutex<Shared>>,
}

#[derive(Debug, Clone)]
pub struct DeviceFeedHandle {
    shared: Arc<Mutex<Shared>>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl DeviceFeed {
    pub fn new(distance_filter_m: f64) -> (Self, DeviceFeedHandle) {
        let shared = Arc::new(Mutex::new(Shared {
            sink: None,
            filter: DistanceFilter::new(distance_filter_m),
            denied: None,
        }));
        (Self { shared: shared.clone() }, DeviceFeedHandle { shared })
    }
}

impl PositionFeed for DeviceFeed {
    fn start(&mut self, sink: FeedSink) {
        let mut shared = lock(&self.shared);
        if shared.sink.is_some() {
            return;
        }

        shared.filter.reset();
        if let Some(reason) = &shared.denied {
            debug!("Location permission denied: {reason}");
            sink.send(FeedEvent::Unavailable(PositionUnavailable::new(reason.clone())));
        }
        shared.sink = Some(sink);
    }

    fn stop(&mut self) {
        lock(&self.shared).sink = None;
    }

    fn is_active(&self) -> bool {
        lock(&self.shared).sink.is_some()
    }
}

impl DeviceFeedHandle {
    /// Deliver a fix. Returns true when it reached the tracker.
    pub fn push_fix(&self, fix: PositionFix) -> bool {
        let mut shared = lock(&self.shared);
        if shared.denied.is_some() {
            return false;
        }
        let Shared { sink, filter, .. } = &mut *shared;
        match sink {
            Some(sink) if filter.accept(&fix) => sink.send(FeedEvent::Fix(fix)),
            _ => false,
        }
    }

    pub fn report_unavailable(&self, reason: impl Into<String>) -> bool {
        let shared = lock(&self.shared);
        match &shared.sink {
            Some(sink) => sink.send(FeedEvent::Unavailable(PositionUnavailable::new(reason))),
            None => false,
        }
    }

    /// Revoke location permission. Further fixes are refused until [`allow`](Self::allow).
    pub fn deny(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut shared = lock(&self.shared);
        if let Some(sink) = &shared.sink {
            sink.send(FeedEvent::Unavailable(PositionUnavailable::new(reason.clone())));
        }
        shared.denied = Some(reason);
    }

    pub fn allow(&self) {
        lock(&self.shared).denied = None;
    }

    pub fn is_active(&self) -> bool {
        lock(&self.shared).sink.is_some()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tokio::sync::mpsc;

    use super::*;
    use crate::tracker::SessionEvent;

    fn fix(lat: f64) -> PositionFix {
        PositionFix::from_lat_lon(lat, 77., None, Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap())
    }

    fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Option<(u64, FeedEvent)> {
        match rx.try_recv().ok()? {
            SessionEvent::Feed { epoch, event } => Some((epoch, event)),
            SessionEvent::Tick { .. } => None,
        }
    }

    #[test]
    fn fixes_only_flow_while_started() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut feed, handle) = DeviceFeed::new(10.);

        assert!(!handle.push_fix(fix(43.)));
        assert!(rx.try_recv().is_err());

        feed.start(FeedSink::new(1, tx.clone()));
        assert!(feed.is_active());
        assert!(handle.is_active());
        assert!(handle.push_fix(fix(43.)));
        assert_eq!(next_event(&mut rx), Some((1, FeedEvent::Fix(fix(43.)))));

        feed.stop();
        assert!(!feed.is_active());
        assert!(!handle.push_fix(fix(44.)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn restart_uses_new_epoch_and_passes_first_fix() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut feed, handle) = DeviceFeed::new(10.);

        feed.start(FeedSink::new(1, tx.clone()));
        assert!(handle.push_fix(fix(43.)));
        // Well under ten metres.
        assert!(!handle.push_fix(fix(43.00001)));
        next_event(&mut rx);

        feed.stop();
        feed.start(FeedSink::new(2, tx.clone()));
        assert!(handle.push_fix(fix(43.00001)));
        assert_eq!(next_event(&mut rx), Some((2, FeedEvent::Fix(fix(43.00001)))));
    }

    #[test]
    fn second_start_keeps_first_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut feed, handle) = DeviceFeed::new(10.);

        feed.start(FeedSink::new(1, tx.clone()));
        feed.start(FeedSink::new(2, tx.clone()));
        handle.push_fix(fix(43.));
        assert_eq!(next_event(&mut rx).map(|(epoch, _)| epoch), Some(1));
    }

    #[test]
    fn denied_permission_reports_unavailable() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut feed, handle) = DeviceFeed::new(10.);

        handle.deny("location permission denied");
        feed.start(FeedSink::new(1, tx.clone()));
        assert_eq!(
            next_event(&mut rx),
            Some((1, FeedEvent::Unavailable(PositionUnavailable::new("location permission denied"))))
        );
        assert!(!handle.push_fix(fix(43.)));

        handle.allow();
        assert!(handle.push_fix(fix(43.)));
        assert_eq!(next_event(&mut rx), Some((1, FeedEvent::Fix(fix(43.)))));
    }

    #[test]
    fn unavailable_reports_need_an_active_feed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut feed, handle) = DeviceFeed::new(10.);

        assert!(!handle.report_unavailable("no signal"));
        feed.start(FeedSink::new(3, tx));
        assert!(handle.report_unavailable("no signal"));
        assert_eq!(
            next_event(&mut rx),
            Some((3, FeedEvent::Unavailable(PositionUnavailable::new("no signal"))))
        );
    }
}

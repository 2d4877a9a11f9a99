use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use hike_tracker_data_management::{gpx_util, StorageError};
use hike_tracker_lib::position_fix::PositionFix;
use tokio::{sync::Notify, task::JoinHandle, time};
use tracing::{debug, info};

use super::{DistanceFilter, FeedEvent, FeedSink, PositionFeed, PositionUnavailable};

/// Plays back a recorded track as if the device were walking it.
///
/// Fixes are re-stamped with the current time as they are delivered. Stopping and starting
/// again continues where playback left off.
#[derive(Debug)]
pub struct ReplayFeed {
    fixes: Arc<Vec<PositionFix>>,
    cursor: Arc<AtomicUsize>,
    interval: Duration,
    distance_filter_m: f64,
    task: Option<JoinHandle<()>>,
    completion: Arc<Notify>,
}

impl ReplayFeed {
    pub fn new(fixes: Vec<PositionFix>, interval: Duration, distance_filter_m: f64) -> Self {
        Self {
            fixes: Arc::new(fixes),
            cursor: Arc::new(AtomicUsize::new(0)),
            interval,
            distance_filter_m,
            task: None,
            completion: Arc::new(Notify::new()),
        }
    }

    pub fn from_gpx(path: &Path, interval: Duration, distance_filter_m: f64) -> Result<Self, StorageError> {
        let fixes = gpx_util::read_gpx(path)?;
        info!("Loaded {} positions for replay from {:?}", fixes.len(), path);
        Ok(Self::new(fixes, interval, distance_filter_m))
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    /// Length of the recorded path, following every point.
    pub fn track_length_km(&self) -> f64 {
        self.fixes.windows(2).map(|pair| pair[0].distance_km(&pair[1])).sum()
    }

    /// Number of recorded fixes already played back.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Notified once every recorded fix has been played back.
    pub fn completion(&self) -> Arc<Notify> {
        self.completion.clone()
    }
}

async fn play(
    fixes: Arc<Vec<PositionFix>>,
    cursor: Arc<AtomicUsize>,
    period: Duration,
    mut filter: DistanceFilter,
    sink: FeedSink,
    completion: Arc<Notify>,
) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        let index = cursor.load(Ordering::Acquire);
        let Some(recorded) = fixes.get(index) else {
            break;
        };
        interval.tick().await;

        let fix = PositionFix::new(recorded.position, recorded.speed_ms, Utc::now());
        cursor.store(index + 1, Ordering::Release);
        if filter.accept(&fix) && !sink.send(FeedEvent::Fix(fix)) {
            debug!("Replay receiver closed");
            return;
        }
    }

    debug!("Replay finished after {} positions", fixes.len());
    completion.notify_one();
}

impl PositionFeed for ReplayFeed {
    fn start(&mut self, sink: FeedSink) {
        if self.is_active() {
            return;
        }

        if self.position() >= self.fixes.len() {
            sink.send(FeedEvent::Unavailable(PositionUnavailable::new(
                "no recorded positions left to replay",
            )));
            self.completion.notify_one();
            return;
        }

        self.task = Some(tokio::spawn(play(
            self.fixes.clone(),
            self.cursor.clone(),
            self.interval,
            DistanceFilter::new(self.distance_filter_m),
            sink,
            self.completion.clone(),
        )));
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ReplayFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use hike_tracker_lib::geo::EARTH_RADIUS_KM;
    use tokio::sync::mpsc;

    use super::*;
    use crate::tracker::SessionEvent;

    fn recorded(km: f64) -> PositionFix {
        PositionFix::from_lat_lon(
            43. + (km / EARTH_RADIUS_KM).to_degrees(),
            77.,
            Some(1.2),
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    fn fixes(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<(u64, PositionFix)> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::Feed { epoch, event: FeedEvent::Fix(fix) } = event {
                out.push((epoch, fix));
            }
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn plays_every_fix_once_and_completes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut feed = ReplayFeed::new(vec![recorded(0.), recorded(0.1), recorded(0.2)], Duration::from_secs(1), 10.);
        let completion = feed.completion();

        feed.start(FeedSink::new(1, tx));
        completion.notified().await;

        let delivered = fixes(&mut rx);
        assert_eq!(delivered.len(), 3);
        assert!(delivered.iter().all(|(epoch, _)| *epoch == 1));
        assert_eq!(delivered[1].1.position, recorded(0.1).position);
        // Re-stamped on delivery.
        assert!(delivered.iter().all(|(_, fix)| fix.timestamp.date_naive() != recorded(0.).timestamp.date_naive()));
        assert_eq!(feed.position(), 3);
        assert!((feed.track_length_km() - 0.2).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn resumes_from_where_it_stopped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut feed = ReplayFeed::new(
            (0..5).map(|i| recorded(f64::from(i) * 0.1)).collect(),
            Duration::from_secs(1),
            10.,
        );

        feed.start(FeedSink::new(1, tx.clone()));
        // First fix is immediate, the next one a second later.
        time::sleep(Duration::from_millis(1500)).await;
        feed.stop();
        assert!(!feed.is_active());
        assert_eq!(fixes(&mut rx).len(), 2);

        time::sleep(Duration::from_secs(10)).await;
        assert!(fixes(&mut rx).is_empty());

        let completion = feed.completion();
        feed.start(FeedSink::new(2, tx));
        completion.notified().await;
        let rest = fixes(&mut rx);
        assert_eq!(rest.len(), 3);
        assert!(rest.iter().all(|(epoch, _)| *epoch == 2));
        assert_eq!(rest[0].1.position, recorded(0.2).position);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_replay_reports_unavailable() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut feed = ReplayFeed::new(Vec::new(), Duration::from_secs(1), 10.);
        assert!(feed.is_empty());

        feed.start(FeedSink::new(4, tx));
        assert!(!feed.is_active());
        match rx.try_recv().unwrap() {
            SessionEvent::Feed { epoch: 4, event: FeedEvent::Unavailable(_) } => {}
            other => panic!("unexpected event {other:?}"),
        }
        feed.completion().notified().await;
    }

    #[tokio::test(start_paused = true)]
    async fn filter_skips_jitter() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        // Second point is a metre from the first.
        let mut feed = ReplayFeed::new(vec![recorded(0.), recorded(0.001), recorded(0.05)], Duration::from_secs(1), 10.);
        let completion = feed.completion();

        feed.start(FeedSink::new(1, tx));
        completion.notified().await;
        assert_eq!(fixes(&mut rx).len(), 2);
    }
}

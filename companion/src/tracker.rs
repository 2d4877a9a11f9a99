//! The tracker actor.
//!
//! One task owns the [`TrackingSession`] together with the position feed and the one second
//! ticker. Commands from [`TrackerHandle`]s and events from the feed and ticker reach it over
//! channels and are applied one at a time, so a tick and a fix can never race each other.
//!
//! Each start or resume opens a new epoch and every event carries the epoch it was produced
//! in. Stopping the inputs bumps the epoch, which means anything a feed or ticker still had in
//! flight is discarded when it arrives.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use hike_tracker_data_management::{trip_store::TripStore, StorageError};
use hike_tracker_lib::{route::Route, trip_record::TripRecord};
use tokio::{
    select,
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, trace, warn};

use crate::{
    feed::{FeedEvent, FeedSink, PositionFeed},
    session::{SessionError, SessionSnapshot, SessionState, TrackingSession},
    weather::WeatherSource,
};

const COMMAND_BUFFER: usize = 16;

#[derive(Debug)]
pub(crate) enum SessionEvent {
    Tick { epoch: u64 },
    Feed { epoch: u64, event: FeedEvent },
}

/// Broadcast to everything interested in completed trips, such as the profile view.
#[derive(Debug, Clone, PartialEq)]
pub enum TripEvent {
    Completed(TripRecord),
}

/// Outcome of finishing a session.
///
/// The record is final even when saving it failed; the failure is reported alongside.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedTrip {
    pub record: TripRecord,
    pub storage_warning: Option<StorageError>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerSettings {
    pub tick_interval: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
        }
    }
}

enum Command {
    Start {
        route: Route,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Pause {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Resume {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Finish {
        reply: oneshot::Sender<Result<FinishedTrip, SessionError>>,
    },
    Dismiss {
        reply: oneshot::Sender<()>,
    },
}

/// Cheap to clone. The tracker shuts down once every handle is dropped, pausing a running session first.
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    trip_events: broadcast::Sender<TripEvent>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::Start { .. } => "Start",
            Command::Pause { .. } => "Pause",
            Command::Resume { .. } => "Resume",
            Command::Finish { .. } => "Finish",
            Command::Dismiss { .. } => "Dismiss",
        };
        f.write_str(name)
    }
}

pub fn spawn_tracker(
    feed: Box<dyn PositionFeed>,
    store: Arc<dyn TripStore>,
    weather: Arc<dyn WeatherSource>,
    trip_events: broadcast::Sender<TripEvent>,
    settings: TrackerSettings,
) -> TrackerHandle {
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let session = TrackingSession::new();
    let (snapshots_tx, snapshots_rx) = watch::channel(session.snapshot());

    let tracker = Tracker {
        session,
        feed,
        store,
        weather,
        trip_events: trip_events.clone(),
        snapshots: snapshots_tx,
        events_tx,
        epoch: 0,
        ticker: None,
        settings,
        finished: None,
    };
    tokio::spawn(tracker.run(commands_rx, events_rx));

    TrackerHandle {
        commands: commands_tx,
        snapshots: snapshots_rx,
        trip_events,
    }
}

impl TrackerHandle {
    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::TrackerClosed)?;
        response.await.map_err(|_| SessionError::TrackerClosed)
    }

    pub async fn start(&self, route: Route) -> Result<(), SessionError> {
        self.request(|reply| Command::Start { route, reply }).await?
    }

    pub async fn pause(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Pause { reply }).await?
    }

    pub async fn resume(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Resume { reply }).await?
    }

    /// Finishing again returns the same trip without saving it twice.
    pub async fn finish(&self) -> Result<FinishedTrip, SessionError> {
        self.request(|reply| Command::Finish { reply }).await?
    }

    /// The tracking view went away. A running session is paused, anything else is left alone.
    pub async fn dismiss(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Dismiss { reply }).await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe_trips(&self) -> broadcast::Receiver<TripEvent> {
        self.trip_events.subscribe()
    }
}

struct Tracker {
    session: TrackingSession,
    feed: Box<dyn PositionFeed>,
    store: Arc<dyn TripStore>,
    weather: Arc<dyn WeatherSource>,
    trip_events: broadcast::Sender<TripEvent>,
    snapshots: watch::Sender<SessionSnapshot>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    epoch: u64,
    ticker: Option<JoinHandle<()>>,
    settings: TrackerSettings,
    finished: Option<FinishedTrip>,
}

fn spawn_ticker(period: Duration, epoch: u64, events: mpsc::UnboundedSender<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if events.send(SessionEvent::Tick { epoch }).is_err() {
                break;
            }
        }
    })
}

fn rejected<T>(result: Result<T, SessionError>) -> Result<T, SessionError> {
    if let Err(err) = &result {
        debug!("Rejected: {err}");
    }
    result
}

impl Tracker {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
        debug!("Tracker started");
        loop {
            select! {
                biased;
                Some(event) = events.recv() => self.handle_event(event),
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
            }
        }
        self.shutdown();
    }

    fn handle_event(&mut self, event: SessionEvent) {
        let (epoch, changed) = match event {
            SessionEvent::Tick { epoch } if epoch == self.epoch => (epoch, self.session.tick()),
            SessionEvent::Feed { epoch, event: FeedEvent::Fix(fix) } if epoch == self.epoch => {
                (epoch, self.session.apply_fix(fix))
            }
            SessionEvent::Feed { epoch, event: FeedEvent::Unavailable(unavailable) } if epoch == self.epoch => {
                warn!("{unavailable}");
                (epoch, self.session.mark_position_unavailable())
            }
            SessionEvent::Tick { epoch } | SessionEvent::Feed { epoch, .. } => {
                trace!("Dropping stale event from epoch {epoch}, current is {}", self.epoch);
                return;
            }
        };

        if changed {
            trace!("Applied event from epoch {epoch}");
            self.publish();
        }
    }

    async fn handle_command(&mut self, command: Command) {
        debug!("Handling {command:?}");
        match command {
            Command::Start { route, reply } => {
                let _ = reply.send(rejected(self.start(route)));
            }
            Command::Pause { reply } => {
                let _ = reply.send(rejected(self.pause()));
            }
            Command::Resume { reply } => {
                let _ = reply.send(rejected(self.resume()));
            }
            Command::Finish { reply } => {
                let _ = reply.send(rejected(self.finish().await));
            }
            Command::Dismiss { reply } => {
                if self.session.state() == SessionState::Running {
                    let _ = self.pause();
                }
                let _ = reply.send(());
            }
        }
    }

    fn start(&mut self, route: Route) -> Result<(), SessionError> {
        let name = route.name.clone();
        self.session.start(route, Utc::now())?;
        self.start_inputs();
        info!("Started tracking {name}");
        self.publish();
        Ok(())
    }

    fn pause(&mut self) -> Result<(), SessionError> {
        self.session.pause()?;
        self.stop_inputs();
        info!("Paused after {}s, {:.3} km", self.session.elapsed_secs(), self.session.distance_km());
        self.publish();
        Ok(())
    }

    fn resume(&mut self) -> Result<(), SessionError> {
        self.session.resume()?;
        self.start_inputs();
        info!("Resumed");
        self.publish();
        Ok(())
    }

    async fn finish(&mut self) -> Result<FinishedTrip, SessionError> {
        if let Some(finished) = &self.finished {
            return Ok(finished.clone());
        }

        let weather = self.weather.clone();
        let record = self.session.finish(Utc::now(), || weather.current_conditions())?;
        self.stop_inputs();
        self.publish();
        info!(
            "Finished {}: {:.3} km in {}s",
            record.route_name, record.distance_km, record.duration_secs
        );

        let storage_warning = match self.store.append_record(&record).await {
            Ok(()) => None,
            Err(err) => {
                warn!("Failed to save trip {}: {err}", record.id);
                Some(err)
            }
        };

        if self.trip_events.send(TripEvent::Completed(record.clone())).is_err() {
            debug!("No one is listening for completed trips");
        }

        let finished = FinishedTrip { record, storage_warning };
        self.finished = Some(finished.clone());
        Ok(finished)
    }

    fn start_inputs(&mut self) {
        self.epoch += 1;
        self.feed.start(FeedSink::new(self.epoch, self.events_tx.clone()));
        self.ticker = Some(spawn_ticker(self.settings.tick_interval, self.epoch, self.events_tx.clone()));
    }

    fn stop_inputs(&mut self) {
        self.epoch += 1;
        self.feed.stop();
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.snapshot());
    }

    fn shutdown(&mut self) {
        if self.session.state() == SessionState::Running {
            let _ = self.pause();
        }
        self.stop_inputs();
        debug!("Tracker stopped in state {}", self.session.state());
    }
}

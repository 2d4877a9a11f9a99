use hike_tracker_data_management::{stats::ProfileStats, DataManager, StorageError};
use hike_tracker_lib::trip_record::TripRecord;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::tracker::TripEvent;

/// What the profile screen shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileState {
    pub stats: ProfileStats,
    /// Newest first.
    pub recent_trips: Vec<TripRecord>,
}

impl ProfileState {
    pub fn new(recent_trips: Vec<TripRecord>) -> Self {
        Self {
            stats: ProfileStats::from_records(&recent_trips),
            recent_trips,
        }
    }

    pub fn add(&mut self, trip: TripRecord) {
        self.stats.record(&trip);
        self.recent_trips.insert(0, trip);
    }
}

/// Keeps a [`ProfileState`] current by listening for completed trips.
#[derive(Debug)]
pub struct ProfileSubscription {
    state: watch::Receiver<ProfileState>,
    task: JoinHandle<()>,
}

impl ProfileSubscription {
    pub fn spawn(initial: ProfileState, mut trips: broadcast::Receiver<TripEvent>) -> Self {
        let (state_tx, state) = watch::channel(initial);

        let task = tokio::spawn(async move {
            loop {
                match trips.recv().await {
                    Ok(TripEvent::Completed(trip)) => {
                        debug!("Profile picked up trip {}", trip.id);
                        state_tx.send_modify(|state| state.add(trip));
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Profile missed {missed} completed trips");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self { state, task }
    }

    /// Loads stored trips and then follows new ones.
    pub async fn load(data_manager: &DataManager, trips: broadcast::Receiver<TripEvent>) -> Result<Self, StorageError> {
        let records = data_manager.get_trips().await?;
        Ok(Self::spawn(ProfileState::new(records), trips))
    }

    pub fn current(&self) -> ProfileState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<ProfileState> {
        self.state.clone()
    }
}

impl Drop for ProfileSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use hike_tracker_lib::route::Route;

    use super::*;

    fn trip(km: f64) -> TripRecord {
        let route = Route::new("Kolsai Lakes", 8., 400, "4h");
        TripRecord::new(&route, Utc::now(), Utc::now(), km, 70 * km as u32, 600, "Sunny, 18°C".into())
    }

    #[tokio::test]
    async fn follows_completed_trips() {
        let (tx, rx) = broadcast::channel(4);
        let older = trip(1.);
        let profile = ProfileSubscription::spawn(ProfileState::new(vec![older.clone()]), rx);
        let mut watch = profile.watch();
        assert_eq!(profile.current().stats.total_hikes, 1);

        let newer = trip(2.);
        tx.send(TripEvent::Completed(newer.clone())).unwrap();
        watch.changed().await.unwrap();

        let state = profile.current();
        assert_eq!(state.stats.total_hikes, 2);
        assert_eq!(state.stats.total_distance_km, 3.);
        assert_eq!(state.stats.total_calories, 210);
        assert_eq!(state.recent_trips, vec![newer, older]);
    }

    #[tokio::test]
    async fn loads_stored_trips() {
        let dir = tempfile::tempdir().unwrap();
        let data_manager = DataManager::start(dir.path()).await.unwrap();
        data_manager.record_trip(&trip(4.)).await.unwrap();

        let (_tx, rx) = broadcast::channel(4);
        let profile = ProfileSubscription::load(&data_manager, rx).await.unwrap();
        assert_eq!(profile.current().stats.total_hikes, 1);
        assert_eq!(profile.current().stats.total_duration_secs, 600);
    }
}

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use hike_tracker_lib::trip_record::TripRecord;
use uuid::Uuid;

use crate::{json_store::JsonTripStore, stats::ProfileStats, trip_store::TripStore, StorageError, TRIPS_FILE};

#[derive(Clone)]
pub struct DataManager {
    pub(crate) store: Arc<dyn TripStore>,
}

/// The public interface for all stored hike data.
impl DataManager {
    /// Opens the JSON trip store inside `data_dir`, creating the directory if needed.
    pub async fn start(data_dir: &Path) -> Result<Self, StorageError> {
        if !data_dir.exists() {
            tokio::fs::create_dir_all(data_dir).await
                .map_err(|err| StorageError::Io(format!("Failed to create data directory {:?}: {err}", data_dir)))?;
        }

        let store = JsonTripStore::new(data_dir.join(TRIPS_FILE));
        tracing::info!("Trip store at {:?}", store.path());

        Ok(Self::with_store(Arc::new(store)))
    }

    pub fn with_store(store: Arc<dyn TripStore>) -> Self {
        Self { store }
    }

    pub async fn record_trip(&self, record: &TripRecord) -> Result<(), StorageError> {
        self.store.append_record(record).await
    }

    pub async fn get_trips(&self) -> Result<Vec<TripRecord>, StorageError> {
        self.store.load_records().await
    }

    pub async fn delete_trip(&self, id: Uuid) -> Result<bool, StorageError> {
        self.store.delete_record(id).await
    }

    pub async fn profile_stats(&self) -> Result<ProfileStats, StorageError> {
        Ok(ProfileStats::from_records(&self.get_trips().await?))
    }
}

#[async_trait]
impl TripStore for DataManager {
    async fn append_record(&self, record: &TripRecord) -> Result<(), StorageError> {
        self.record_trip(record).await
    }

    async fn load_records(&self) -> Result<Vec<TripRecord>, StorageError> {
        self.get_trips().await
    }

    async fn delete_record(&self, id: Uuid) -> Result<bool, StorageError> {
        self.delete_trip(id).await
    }
}

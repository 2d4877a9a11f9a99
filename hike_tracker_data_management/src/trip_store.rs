use std::sync::Arc;

use async_trait::async_trait;
use hike_tracker_lib::trip_record::TripRecord;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::StorageError;

/// Durable, ordered collection of trip records, newest first.
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Stores the record at the front of the collection.
    async fn append_record(&self, record: &TripRecord) -> Result<(), StorageError>;

    async fn load_records(&self) -> Result<Vec<TripRecord>, StorageError>;

    /// Returns whether a record with the id existed.
    async fn delete_record(&self, id: Uuid) -> Result<bool, StorageError>;
}

/// Keeps records in process memory only. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct MemoryTripStore {
    records: Arc<Mutex<Vec<TripRecord>>>,
}

#[async_trait]
impl TripStore for MemoryTripStore {
    async fn append_record(&self, record: &TripRecord) -> Result<(), StorageError> {
        self.records.lock().await.insert(0, record.clone());
        Ok(())
    }

    async fn load_records(&self) -> Result<Vec<TripRecord>, StorageError> {
        Ok(self.records.lock().await.clone())
    }

    async fn delete_record(&self, id: Uuid) -> Result<bool, StorageError> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|record| record.id != id);
        Ok(records.len() != before)
    }
}

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use hike_tracker_lib::trip_record::TripRecord;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{trip_store::TripStore, StorageError};

/**
 * Stores all trip records as one JSON array in a single file, newest first.
 * Every write replaces the whole file through a temporary sibling and a rename.
 */
#[derive(Clone)]
pub struct JsonTripStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within the process.
    write_lock: Arc<Mutex<()>>,
}

impl JsonTripStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Vec<TripRecord>, StorageError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StorageError::Io(format!("Failed to read {:?}: {err}", self.path))),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes)
            .map_err(|err| StorageError::Serialization(format!("Failed to parse {:?}: {err}", self.path)))
    }

    async fn write(&self, records: &[TripRecord]) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(records)
            .map_err(|err| StorageError::Serialization(format!("Failed to encode trips: {err}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, bytes).await
            .map_err(|err| StorageError::Io(format!("Failed to write {:?}: {err}", tmp_path)))?;
        tokio::fs::rename(&tmp_path, &self.path).await
            .map_err(|err| StorageError::Io(format!("Failed to replace {:?}: {err}", self.path)))
    }
}

#[async_trait]
impl TripStore for JsonTripStore {
    async fn append_record(&self, record: &TripRecord) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read().await?;
        records.insert(0, record.clone());
        self.write(&records).await?;
        tracing::debug!("Stored trip {} ({} trips in {:?})", record.id, records.len(), self.path);
        Ok(())
    }

    async fn load_records(&self) -> Result<Vec<TripRecord>, StorageError> {
        let _guard = self.write_lock.lock().await;
        self.read().await
    }

    async fn delete_record(&self, id: Uuid) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read().await?;
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.write(&records).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use hike_tracker_lib::{geo::EARTH_RADIUS_KM, position_fix::PositionFix, route::Route};

    use super::*;

    fn record(name: &str, distance_km: f64) -> TripRecord {
        let route = Route::new(name, 8., 900, "4h");
        let start = Utc.with_ymd_and_hms(2025, 7, 14, 6, 30, 12).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 7, 14, 10, 2, 59).unwrap();
        TripRecord::new(&route, start, end, distance_km, 514, 12767, "Partly cloudy, 15°C".into())
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTripStore::new(dir.path().join("trips.json"));
        assert!(store.load_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.json");

        let first = record("Kok Zhailau", 7.3412);
        let second = record("Shymbulak", 3.05);
        {
            let store = JsonTripStore::new(&path);
            store.append_record(&first).await.unwrap();
            store.append_record(&second).await.unwrap();
        }

        let reloaded = JsonTripStore::new(&path).load_records().await.unwrap();
        assert_eq!(reloaded, vec![second, first]);
    }

    #[tokio::test]
    async fn measured_distances_reload_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.json");
        let store = JsonTripStore::new(&path);

        // Odd-sized legs along a diagonal, summed the way a session accumulates them.
        let fix = |i: u32| {
            let step = f64::from(i) * 0.0137 / EARTH_RADIUS_KM;
            PositionFix::from_lat_lon(43.0564 + step.to_degrees(), 76.9839 + (step * 1.3).to_degrees(), None, Utc::now())
        };
        let mut distance_km = 0.;
        let mut stored = vec![record("Exact", 1.3992047284012665)];
        for i in 1..60 {
            distance_km += fix(i - 1).distance_km(&fix(i)) * f64::from(i % 7 + 1);
            stored.push(record("Measured", distance_km));
        }
        for trip in &stored {
            store.append_record(trip).await.unwrap();
        }

        let mut reloaded = JsonTripStore::new(&path).load_records().await.unwrap();
        reloaded.reverse();
        assert_eq!(reloaded.len(), stored.len());
        for (back, original) in reloaded.iter().zip(&stored) {
            assert_eq!(back.distance_km.to_bits(), original.distance_km.to_bits());
            assert_eq!(back, original);
        }
    }

    #[tokio::test]
    async fn file_is_a_json_array_with_iso_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.json");
        let store = JsonTripStore::new(&path);
        store.append_record(&record("Kok Zhailau", 1.)).await.unwrap();

        let value: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["startTime"], "2025-07-14T06:30:12Z");
        assert_eq!(array[0]["endTime"], "2025-07-14T10:02:59Z");
    }

    #[tokio::test]
    async fn corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = JsonTripStore::new(&path);
        assert!(matches!(store.load_records().await, Err(StorageError::Serialization(_))));
        assert!(matches!(store.append_record(&record("x", 1.)).await, Err(StorageError::Serialization(_))));
    }

    #[tokio::test]
    async fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTripStore::new(dir.path().join("nope").join("trips.json"));
        assert!(matches!(store.append_record(&record("x", 1.)).await, Err(StorageError::Io(_))));
    }

    #[tokio::test]
    async fn delete_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trips.json");
        let store = JsonTripStore::new(&path);
        let keep = record("keep", 1.);
        let drop = record("drop", 2.);
        store.append_record(&keep).await.unwrap();
        store.append_record(&drop).await.unwrap();

        assert!(store.delete_record(drop.id).await.unwrap());
        assert_eq!(JsonTripStore::new(&path).load_records().await.unwrap(), vec![keep]);
    }
}

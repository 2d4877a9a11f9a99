mod data_manager;
pub mod gpx_util;
pub mod json_store;
pub mod stats;
pub mod trip_store;

pub use data_manager::*;

pub const DATA_DIR: &str = "data/";
pub const TRIPS_FILE: &str = "trips.json";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("storage io failed: {0}")]
    Io(String),
    #[error("trip serialization failed: {0}")]
    Serialization(String),
    #[error("gpx import failed: {0}")]
    Gpx(String),
}

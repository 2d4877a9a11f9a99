use std::{fs::File, io::{BufReader, Read}, path::Path, str::FromStr};

use chrono::{DateTime, Utc};
use hike_tracker_lib::position_fix::PositionFix;

use crate::StorageError;

/// Reads every track point of a GPX file as a position fix, in file order.
pub fn read_gpx(path: &Path) -> Result<Vec<PositionFix>, StorageError> {
    let file = File::open(path)
        .map_err(|err| StorageError::Io(format!("Failed to open {:?}: {err}", path)))?;
    parse_gpx(BufReader::new(file))
}

/// Points without a timestamp inherit the previous point's time.
pub fn parse_gpx<R: Read>(reader: R) -> Result<Vec<PositionFix>, StorageError> {
    let gpx = gpx::read(reader).map_err(|err| StorageError::Gpx(err.to_string()))?;

    let mut time = DateTime::<Utc>::UNIX_EPOCH;
    let mut fixes: Vec<PositionFix> = Vec::new();
    for track in gpx.tracks {
        for segment in track.segments {
            for point in segment.points {
                if let Some(t) = point.time {
                    let formatted = t.format().map_err(|err| StorageError::Gpx(err.to_string()))?;
                    time = DateTime::<Utc>::from_str(&formatted).map_err(|err| StorageError::Gpx(err.to_string()))?;
                }
                fixes.push(PositionFix::new(point.point(), point.speed, time));
            }
        }
    }

    tracing::debug!("Parsed {} fixes from gpx", fixes.len());

    Ok(fixes)
}

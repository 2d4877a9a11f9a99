use std::{path::{Path, PathBuf}, str::FromStr, time::Duration};

use hike_tracker_data_management::DATA_DIR;
use tracing::warn;

use crate::{feed::DEFAULT_DISTANCE_FILTER_M, localization::Locale, tracker::TrackerSettings};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("line {line}: expected `key = value`")]
    Syntax { line: usize },
    #[error("line {line}: invalid value {value:?} for {key}")]
    Value { line: usize, key: String, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub data_dir: PathBuf,
    pub tick_interval_ms: u64,
    pub distance_filter_m: f64,
    pub replay_interval_ms: u64,
    pub locale: Locale,
}

impl Default for Configuration {
    fn default() -> Self {
        let data_dir = project_root::get_project_root()
            .map(|root| root.join(DATA_DIR))
            .unwrap_or_else(|_| PathBuf::from(DATA_DIR));

        Self {
            data_dir,
            tick_interval_ms: 1000,
            distance_filter_m: DEFAULT_DISTANCE_FILTER_M,
            replay_interval_ms: 1000,
            locale: Locale::En,
        }
    }
}

fn parse_value<T: FromStr>(line: usize, key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Value {
        line,
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl Configuration {
    /// Applies `key = value` lines on top of the defaults. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line.split_once('=').ok_or(ConfigError::Syntax { line: line_no })?;
            let key = key.trim();
            let value = value.trim();

            match key {
                "data_dir" => config.data_dir = PathBuf::from(value),
                "tick_interval_ms" => config.tick_interval_ms = parse_value(line_no, key, value)?,
                "distance_filter_m" => config.distance_filter_m = parse_value(line_no, key, value)?,
                "replay_interval_ms" => config.replay_interval_ms = parse_value(line_no, key, value)?,
                "locale" => config.locale = parse_value(line_no, key, value)?,
                _ => {
                    warn!("Unknown config key: {}", key);
                }
            }
        }

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            tick_interval: Duration::from_millis(self.tick_interval_ms.max(1)),
        }
    }

    pub fn replay_interval(&self) -> Duration {
        Duration::from_millis(self.replay_interval_ms)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Configuration::parse("").unwrap();
        assert_eq!(config, Configuration::default());
        assert_eq!(config.tracker_settings().tick_interval, Duration::from_secs(1));
        assert_eq!(config.distance_filter_m, 10.);
        assert_eq!(config.locale, Locale::En);
    }

    #[test]
    fn parses_known_keys() {
        let config = Configuration::parse(
            "# companion settings\n\
             data_dir = /tmp/hikes\n\
             \n\
             tick_interval_ms=250\n\
             distance_filter_m = 5.5\n\
             replay_interval_ms = 100\n\
             locale = kk\n\
             colour = green\n",
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/tmp/hikes"));
        assert_eq!(config.tick_interval_ms, 250);
        assert_eq!(config.distance_filter_m, 5.5);
        assert_eq!(config.replay_interval(), Duration::from_millis(100));
        assert_eq!(config.locale, Locale::Kk);
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/hikes/log"));
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(matches!(
            Configuration::parse("locale en"),
            Err(ConfigError::Syntax { line: 1 })
        ));
        assert!(matches!(
            Configuration::parse("\ntick_interval_ms = soon"),
            Err(ConfigError::Value { line: 2, .. })
        ));
        assert!(matches!(
            Configuration::parse("locale = de"),
            Err(ConfigError::Value { line: 1, .. })
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("companion.conf");
        assert!(matches!(Configuration::load(&missing), Err(ConfigError::Read { .. })));

        std::fs::write(&missing, "locale = ru\n").unwrap();
        assert_eq!(Configuration::load(&missing).unwrap().locale, Locale::Ru);
    }
}

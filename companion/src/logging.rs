use std::{fs::OpenOptions, io, path::Path};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE: &str = "companion.log";

/// Logs to stdout and appends to `<log_dir>/companion.log`. `RUST_LOG` overrides the default filter.
pub fn init(log_dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(LOG_FILE))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=debug,hike_tracker_data_management=debug", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        .init();

    Ok(())
}

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use companion::{
    config::Configuration,
    feed::ReplayFeed,
    localization::{Locale, Localization},
    profile::{ProfileState, ProfileSubscription},
    session::SessionSnapshot,
    tracker::{spawn_tracker, TrackerHandle},
    weather::{FixedWeather, StubWeather, WeatherSource},
};
use hike_tracker_data_management::{stats::ProfileStats, DataManager};
use hike_tracker_lib::{route::Route, time_format::format_summary, trip_record::TripRecord};
use tokio::{select, sync::broadcast};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "companion")]
#[command(about = "Track hikes and browse recorded trips", long_about = None)]
struct Cli {
    /// `key = value` settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// en, ru or kk
    #[arg(long, global = true)]
    locale: Option<Locale>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a recorded GPX track through a live session and save the trip
    Track {
        gpx_file: PathBuf,
        #[arg(long, default_value = "Unnamed route")]
        route: String,
        /// Target distance, defaults to the length of the track
        #[arg(long)]
        distance_km: Option<f64>,
        #[arg(long, default_value_t = 0)]
        elevation_m: u32,
        #[arg(long, default_value = "")]
        estimated_time: String,
        /// Use these conditions instead of the weather stub
        #[arg(long)]
        weather: Option<String>,
        #[arg(long)]
        tick_ms: Option<u64>,
        #[arg(long)]
        replay_ms: Option<u64>,
    },
    /// List recorded trips, newest first
    Trips,
    /// Show totals over all recorded trips
    Stats,
    /// Delete a recorded trip
    Delete { id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Configuration::load(path)?,
        None => Configuration::default(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }

    companion::logging::init(&config.log_dir()).context("Failed to set up logging")?;
    tracing::debug!("Using {:?}", config);

    let l10n = Localization::new(config.locale);
    let data_manager = DataManager::start(&config.data_dir).await?;

    match cli.command {
        Commands::Track { gpx_file, route, distance_km, elevation_m, estimated_time, weather, tick_ms, replay_ms } => {
            if let Some(tick_ms) = tick_ms {
                config.tick_interval_ms = tick_ms;
            }
            if let Some(replay_ms) = replay_ms {
                config.replay_interval_ms = replay_ms;
            }
            let weather: Arc<dyn WeatherSource> = match weather {
                Some(conditions) => Arc::new(FixedWeather::new(conditions)),
                None => Arc::new(StubWeather),
            };

            let feed = ReplayFeed::from_gpx(&gpx_file, config.replay_interval(), config.distance_filter_m)?;
            let route = Route::new(route, distance_km.unwrap_or_else(|| feed.track_length_km()), elevation_m, estimated_time);
            track(&config, &l10n, data_manager, feed, route, weather).await?;
        }
        Commands::Trips => {
            let trips = data_manager.get_trips().await?;
            if trips.is_empty() {
                println!("{}", l10n.text("no_trips_yet"));
            } else {
                println!("{}", l10n.text("recent_trips"));
                for trip in &trips {
                    print_trip(&l10n, trip);
                }
            }
        }
        Commands::Stats => {
            print_stats(&l10n, &data_manager.profile_stats().await?);
        }
        Commands::Delete { id } => {
            if data_manager.delete_trip(id).await? {
                println!("Deleted {id}");
            } else {
                anyhow::bail!("No trip with id {id}");
            }
        }
    }

    Ok(())
}

async fn track(
    config: &Configuration,
    l10n: &Localization,
    data_manager: DataManager,
    feed: ReplayFeed,
    route: Route,
    weather: Arc<dyn WeatherSource>,
) -> anyhow::Result<()> {
    let completion = feed.completion();
    let (trip_events, _) = broadcast::channel(16);
    let profile = ProfileSubscription::load(&data_manager, trip_events.subscribe()).await?;

    let tracker = spawn_tracker(
        Box::new(feed),
        Arc::new(data_manager),
        weather,
        trip_events,
        config.tracker_settings(),
    );

    println!("{}: {}", l10n.text("tracking"), route.name);
    tracker.start(route).await?;
    follow(l10n, &tracker, completion).await?;

    let finished = tracker.finish().await?;
    println!();
    println!("{}", l10n.text("hike_completed"));
    print_trip(l10n, &finished.record);
    if let Some(warning) = finished.storage_warning {
        eprintln!("Trip was not saved: {warning}");
    }

    // The profile sees the trip through the broadcast.
    let mut profile_state = profile.watch();
    if profile_state.borrow().recent_trips.first().map(|trip| trip.id) != Some(finished.record.id) {
        profile_state.changed().await?;
    }
    let ProfileState { stats, .. } = profile.current();
    println!();
    print_stats(l10n, &stats);

    Ok(())
}

/// Prints a status line every elapsed second until the replay runs out or ctrl-c.
async fn follow(l10n: &Localization, tracker: &TrackerHandle, completion: Arc<tokio::sync::Notify>) -> anyhow::Result<()> {
    let mut snapshots = tracker.watch();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut last_elapsed = None;

    loop {
        select! {
            _ = completion.notified() => break,
            result = &mut ctrl_c => {
                result?;
                tracing::info!("Interrupted, finishing the trip");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if last_elapsed != Some(snapshot.elapsed_secs) {
                    last_elapsed = Some(snapshot.elapsed_secs);
                    print_snapshot(l10n, &snapshot);
                }
            }
        }
    }

    Ok(())
}

fn print_snapshot(l10n: &Localization, snapshot: &SessionSnapshot) {
    println!(
        "{} {} | {} {:.2} km | {} {:.1} km/h | {} {} | {} {} bpm | {} {:.0}%{}",
        l10n.text("elapsed_time"),
        snapshot.formatted_elapsed(),
        l10n.text("distance"),
        snapshot.distance_km,
        l10n.text("speed"),
        snapshot.speed_kmh,
        l10n.text("calories"),
        snapshot.calories_burned,
        l10n.text("heart_rate"),
        snapshot.heart_rate_bpm,
        l10n.text("progress"),
        snapshot.progress * 100.,
        if snapshot.position_available { "" } else { " (no GPS)" },
    );
}

fn print_trip(l10n: &Localization, trip: &TripRecord) {
    println!(
        "{}\t{}\t{} {}\t{} {:.2} km\t{} {}\t{} {} m\t{}",
        trip.id,
        trip.route_name,
        l10n.text("start_time"),
        trip.start_time.format("%d/%m/%Y %H:%M"),
        l10n.text("distance"),
        trip.distance_km,
        l10n.text("duration"),
        format_summary(trip.duration_secs),
        l10n.text("elevation_gain"),
        trip.elevation_gain_m,
        trip.weather_conditions,
    );
}

fn print_stats(l10n: &Localization, stats: &ProfileStats) {
    println!("{}", l10n.text("hiking_statistics"));
    println!("  {}: {}", l10n.text("hikes"), stats.total_hikes);
    println!("  {}: {:.2} km", l10n.text("distance"), stats.total_distance_km);
    println!("  {}: {}", l10n.text("calories"), stats.total_calories);
    println!("  {}: {}", l10n.text("duration"), format_summary(stats.total_duration_secs));
}

//! Track command - run a session against the simulated provider.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use futures::StreamExt;
use nsvtrack::provider::{PermissionAnswer, SimulatedConfig, SimulatedProvider};
use nsvtrack::{PositionSample, SessionConfig, TrackingSession, TrackingState, TrackingStatus};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::common::{format_distance, load_config, ProfileArg};
use crate::error::CliError;

/// Arguments for the track command.
#[derive(Debug, Clone, clap::Args)]
pub struct TrackArgs {
    /// Accuracy profile (overrides tracking.accuracy)
    #[arg(long, value_enum)]
    pub profile: Option<ProfileArg>,

    /// Minimum time between fixes in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Minimum movement between fixes in meters
    #[arg(long)]
    pub min_distance: Option<f64>,

    /// Stop after this many seconds (default: run until Ctrl+C)
    #[arg(long)]
    pub duration: Option<u64>,

    /// Simulated walking speed in m/s
    #[arg(long, default_value_t = 1.4)]
    pub speed: f64,

    /// Simulate a user granting foreground access only
    #[arg(long)]
    pub foreground_only: bool,

    /// Simulate a user denying location access
    #[arg(long)]
    pub deny: bool,

    /// Print one JSON status object per line
    #[arg(long)]
    pub json: bool,

    /// Print the last N points of the track on exit
    #[arg(long, default_value_t = 0)]
    pub trail: usize,
}

/// Session configuration from the config file plus CLI overrides.
fn session_config(args: &TrackArgs, config_path: Option<&Path>) -> Result<SessionConfig, CliError> {
    let mut config = load_config(config_path)?.to_session_config();

    if let Some(profile) = args.profile {
        config.accuracy_profile = profile.into();
    }
    if let Some(interval) = args.interval_ms {
        config.min_interval_ms = interval;
    }
    if let Some(distance) = args.min_distance {
        if !distance.is_finite() || distance < 0.0 {
            return Err(CliError::Config(format!(
                "--min-distance must be zero or positive, got {}",
                distance
            )));
        }
        config.min_distance_meters = distance;
    }
    Ok(config)
}

fn simulated_config(args: &TrackArgs) -> Result<SimulatedConfig, CliError> {
    if !args.speed.is_finite() || args.speed < 0.0 {
        return Err(CliError::Config(format!(
            "--speed must be zero or positive, got {}",
            args.speed
        )));
    }

    let mut config = SimulatedConfig {
        speed_mps: args.speed,
        ..SimulatedConfig::default()
    };
    if args.deny {
        config.foreground = PermissionAnswer::Deny;
    }
    if args.foreground_only {
        config.background = PermissionAnswer::Deny;
    }
    Ok(config)
}

/// Run the track command.
pub fn run(args: TrackArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = session_config(&args, config_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    // Set up signal handler for graceful shutdown
    let shutdown = CancellationToken::new();
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Received shutdown signal, stopping...");
        shutdown_handler.cancel();
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    runtime.block_on(track(args, config, shutdown))
}

async fn track(
    args: TrackArgs,
    config: SessionConfig,
    shutdown: CancellationToken,
) -> Result<(), CliError> {
    let provider = Arc::new(SimulatedProvider::new(simulated_config(&args)?));
    let mut session = TrackingSession::new(provider, config.clone());

    if !args.json {
        println!("nsvtrack v{}", nsvtrack::VERSION);
        println!("============");
        println!();
        println!("Profile:      {}", config.accuracy_profile);
        println!("Interval:     {} ms", config.min_interval_ms);
        println!("Min distance: {} m", config.min_distance_meters);
        if config.filter.is_enabled() {
            println!("Filter:       {:?}", config.filter);
        }
        println!();
        println!("Press Ctrl+C to stop");
        println!();
    }

    session.start().await?;
    info!("Session started");

    let deadline = async {
        match args.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut statuses = Box::pin(session.observer().status_stream());
    let mut last_seen = None;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = &mut deadline => break,
            status = statuses.next() => {
                let Some(status) = status else { break };
                // Only print when the track moved on
                if last_seen != Some((status.history_len, status.current_location)) {
                    last_seen = Some((status.history_len, status.current_location));
                    print_status(&status, args.json)?;
                }
                if let TrackingState::Errored(_) = status.state {
                    break;
                }
            }
        }
    }

    let final_state = session.stop();
    let status = session.status();
    if args.json {
        print_status(&status, true)?;
    } else {
        print_summary(&status, final_state);
        if args.trail > 0 {
            print_trail(&session.observer().recent_history(args.trail));
        }
    }

    match session.error() {
        Some(message) if matches!(final_state, TrackingState::Errored(_)) => {
            Err(CliError::Ended(message))
        }
        _ => Ok(()),
    }
}

fn print_status(status: &TrackingStatus, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string(status)?);
        return Ok(());
    }

    match &status.current_location {
        Some(sample) => println!(
            "[{}] {:<9} {}  {:>10}  ({} samples)",
            local_time(sample),
            status.state.label(),
            describe(sample),
            format_distance(status.distance_m),
            status.history_len
        ),
        None => println!("{:<9} waiting for fix", status.state.label()),
    }
    Ok(())
}

fn describe(sample: &PositionSample) -> String {
    let mut line = format!("{:.6}, {:.6}", sample.latitude(), sample.longitude());
    if let Some(accuracy) = sample.horizontal_accuracy() {
        line.push_str(&format!("  ±{:.0}m", accuracy));
    }
    if let Some(kmh) = sample.speed_kmh() {
        line.push_str(&format!("  {:.1} km/h", kmh));
    }
    line
}

fn local_time(sample: &PositionSample) -> String {
    DateTime::from_timestamp_millis(sample.timestamp_ms())
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

fn print_summary(status: &TrackingStatus, state: TrackingState) {
    println!();
    println!("Session Summary");
    println!("───────────────");
    println!("  State:     {}", state);
    println!("  Access:    {}", status.access);
    println!("  Samples:   {}", status.history_len);
    println!("  Distance:  {}", format_distance(status.distance_m));
    if status.rejected_samples > 0 {
        println!("  Rejected:  {}", status.rejected_samples);
    }
    if let Some(error) = &status.error {
        println!("  Error:     {}", error);
    }
}

fn print_trail(trail: &[PositionSample]) {
    println!();
    println!("Trail (last {})", trail.len());
    for sample in trail {
        println!("  {}  {}", local_time(sample), describe(sample));
    }
}

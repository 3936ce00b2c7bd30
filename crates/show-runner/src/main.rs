//! # Drone Show Runner
//!
//! Headless entry point for the drone show engine. Polls the mock drone
//! feed, builds and exports the demo formation sequence, checks a sample
//! flight plan, then plays the show until it finishes or a shutdown
//! signal arrives.

mod config;
mod sink;

use crate::config::RunnerConfig;
use crate::sink::ShowSink;

use anyhow::Context;
use parking_lot::Mutex;
use show_core::{DroneId, DronePosition, Formation, Waypoint};
use show_patterns::{ShowPattern, animate_towards, demo_sequence, export, generate};
use show_planner::FlightPlanner;
use show_sim::{
    Fleet, FrameDriver, MockDroneFeed, ProjectionStyle, ShowTimeline, project_formation,
    seeded_rng, spawn_poller,
};
use show_telemetry::ShowMetrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("✨ Starting Drone Show Runner v{}", env!("CARGO_PKG_VERSION"));
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = RunnerConfig::load().context("loading configuration")?;
    info!("Configuration loaded");
    info!("   Formation slot: {}s", config.timeline.per_formation_secs);
    info!("   Frame interval: {:?}", config.driver.frame_interval());
    info!("   Feed interval: {:?}", config.feed.poll_interval());
    info!("   Export dir: {}", config.show.export_dir.display());

    let metrics = Arc::new(ShowMetrics::new().context("creating metrics")?);

    // Drone feed
    let fleet = Fleet::new();
    let mut poller = spawn_poller(
        MockDroneFeed::new(config.feed.seed),
        fleet.clone(),
        config.feed.poll_interval(),
    );
    wait_for_fleet(&fleet, config.feed.startup_timeout()).await?;
    let feed_monitor = tokio::spawn(monitor_feed(
        fleet.clone(),
        metrics.clone(),
        config.feed.poll_interval(),
    ));

    let mut drone_ids = fleet.ids();
    drone_ids.truncate(config.show.max_drones);
    info!("🛸 Fleet ready with {} drones", drone_ids.len());

    // Formations
    let formations = build_formations(&config, &drone_ids)?;
    preview_pattern(&config, &fleet, &drone_ids)?;

    // Flight planning
    check_flight_plan(&config, &formations, &drone_ids, &metrics)?;

    // Playback
    let mut timeline = ShowTimeline::new(formations, config.timeline.clone())?;
    let change_metrics = metrics.clone();
    let mut last_index = None;
    timeline.on_formation_change(move |formation: &Formation, index| {
        if last_index != Some(index) {
            last_index = Some(index);
            info!("🎆 Formation {}: {}", index + 1, formation.name);
            change_metrics.record_formation_change(&formation.name);
        }
    });
    timeline.play();
    metrics.set_playback_state(timeline.playback());

    let timeline = Arc::new(Mutex::new(timeline));
    let driver = FrameDriver::new(timeline.clone(), config.driver.frame_interval());
    let mut playback = driver.spawn(ShowSink::new(metrics.clone()));

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("🚀 Show playing: {:.1}s", timeline.lock().duration());
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    tokio::select! {
        frames = playback.finished() => {
            info!("Show complete after {} frames", frames.unwrap_or_default());
        }
        _ = shutdown_signal() => {
            timeline.lock().pause();
        }
    }

    playback.cancel();
    poller.cancel();
    feed_monitor.abort();

    let final_state = *timeline.lock().state();
    metrics.set_playback_state(timeline.lock().playback());
    let summary = fleet.summary();
    info!(
        "Final state: {:.1}s of {:.1}s, formation {}",
        final_state.current_time,
        final_state.duration,
        final_state.current_formation_index + 1
    );
    info!(
        "Fleet: {} drones ({} active, {} warning, {} error), avg battery {:.1}% ({:?})",
        summary.total,
        summary.active,
        summary.warning,
        summary.error,
        summary.average_battery,
        summary.battery_band()
    );
    match metrics.export() {
        Ok(text) => debug!("Metrics:\n{}", text),
        Err(e) => warn!("Failed to export metrics: {}", e),
    }

    info!("🛑 Runner shutdown complete");
    Ok(())
}

/// Initialize logging with tracing
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,show_sim=debug,show_runner=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        }
    }
}

/// Wait until the first feed poll lands
async fn wait_for_fleet(fleet: &Fleet, timeout: Duration) -> anyhow::Result<()> {
    tokio::time::timeout(timeout, async {
        while fleet.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .context("drone feed produced no drones")
}

/// Record fleet health after every poll
async fn monitor_feed(fleet: Fleet, metrics: Arc<ShowMetrics>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    let mut seen = 0;

    loop {
        ticker.tick().await;
        let updates = fleet.update_count();
        if updates != seen {
            seen = updates;
            let summary = fleet.summary();
            metrics.record_feed_poll(&summary);
            debug!(
                "Fleet update {}: {} drones, avg battery {:.1}%",
                updates, summary.total, summary.average_battery
            );
        }
    }
}

/// Build the demo sequence and write every formation to the export dir
fn build_formations(config: &RunnerConfig, drone_ids: &[DroneId]) -> anyhow::Result<Vec<Formation>> {
    let formations = demo_sequence(config.show.center, drone_ids, config.show.rotation)?;

    for formation in &formations {
        export::write_to_dir(formation, &config.show.export_dir)
            .with_context(|| format!("exporting {}", formation.name))?;
    }
    info!("Built {} formations", formations.len());
    Ok(formations)
}

/// Generate the configured pattern, preview it against the live fleet and
/// export it with its timed pattern
fn preview_pattern(config: &RunnerConfig, fleet: &Fleet, drone_ids: &[DroneId]) -> anyhow::Result<()> {
    let params = &config.show.pattern;
    let formation = generate(params, drone_ids)?;

    let mut rng = seeded_rng(config.timeline.seed);
    let preview = project_formation(&formation, 1.0, ProjectionStyle::PREVIEW, &mut rng);
    let halfway = animate_towards(&fleet.snapshot(), &formation, 0.5);
    if let Some(line) = describe_preview(&formation, &preview, &halfway) {
        info!("{}", line);
    }

    export::write_to_dir(&formation, &config.show.export_dir)?;

    let pattern = ShowPattern::from_formation(&formation, config.show.pattern_duration, None);
    let path = config
        .show
        .export_dir
        .join(format!("{}.pattern.json", params.pattern));
    std::fs::write(&path, serde_json::to_string_pretty(&pattern)?)
        .with_context(|| format!("writing {}", path.display()))?;
    info!("Exported {} to {}", pattern.name, path.display());
    Ok(())
}

/// Fly the lead drone through each formation's first slot and validate it
fn check_flight_plan(
    config: &RunnerConfig,
    formations: &[Formation],
    drone_ids: &[DroneId],
    metrics: &ShowMetrics,
) -> anyhow::Result<()> {
    let Some(lead) = drone_ids.first() else {
        return Ok(());
    };

    let planner = FlightPlanner::new(config.planner.default_speed)?.with_limits(config.planner.limits);
    let per_formation = config.timeline.per_formation_secs;

    let waypoints: Vec<Waypoint> = formations
        .iter()
        .enumerate()
        .filter_map(|(i, formation)| {
            formation.slot_point(0).map(|point| {
                Waypoint::new(format!("wp-{}", i + 1), point, planner.default_speed())
                    .at(i as f64 * per_formation)
            })
        })
        .collect();

    let plan = planner.generate_flight_plan(lead.clone(), waypoints);
    let report = planner.validate_flight_plan(&plan);
    metrics.record_validation(&report);

    for message in report.errors() {
        warn!("Flight plan: {}", message);
    }
    info!(
        "Lead flight plan: {:.1}m in {:.1}s ({})",
        plan.total_distance,
        plan.estimated_flight_time,
        if report.valid { "valid" } else { "invalid" }
    );
    Ok(())
}

/// Leader's previewed slot and how far its fleet drone still has to go
/// halfway through the glide
fn describe_preview(
    formation: &Formation,
    preview: &[DronePosition],
    halfway: &[DronePosition],
) -> Option<String> {
    let leader = preview.first()?;
    let target = leader.point();
    let midway = halfway.first()?.point();

    Some(format!(
        "Previewed {}: {} at ({:.6}, {:.6}, {:.0}m), halfway at ({:.6}, {:.6}, {:.0}m), {:.1}m to go",
        formation.name,
        leader.id,
        target.latitude,
        target.longitude,
        target.altitude,
        midway.latitude,
        midway.longitude,
        midway.altitude,
        midway.distance_to(&target)
    ))
}

//! # Show Telemetry - Metrics
//!
//! Prometheus metrics for the drone show engine:
//! - Timeline playback and rendered frames
//! - Drone feed polls and fleet health
//! - Flight plan validation outcomes

use prometheus::{
    Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry,
};
use show_planner::ValidationReport;
use show_sim::{FleetSummary, PlaybackState, SimulationState};
use tracing::info;

const PLAYBACK_STATES: [PlaybackState; 4] = [
    PlaybackState::Stopped,
    PlaybackState::Playing,
    PlaybackState::Paused,
    PlaybackState::Finished,
];

/// Metrics collector for a drone show
pub struct ShowMetrics {
    registry: Registry,

    // Playback metrics
    frames_rendered: IntCounter,
    frame_render_time: Histogram,
    formation_changes: IntCounterVec,
    playback_state: IntGaugeVec,
    sim_time: Gauge,
    formation_index: IntGauge,
    drones_rendered: IntGauge,

    // Feed metrics
    feed_polls: IntCounter,
    fleet_drones: IntGaugeVec,
    fleet_battery: Gauge,

    // Planner metrics
    plans_validated: IntCounterVec,
    plan_findings: IntCounterVec,
}

impl ShowMetrics {
    /// Create a collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        // Playback metrics
        let frames_rendered = IntCounter::new(
            "drone_show_frames_rendered_total",
            "Total frames produced by the show timeline",
        )?;
        registry.register(Box::new(frames_rendered.clone()))?;

        let frame_render_time = Histogram::with_opts(
            HistogramOpts::new(
                "drone_show_frame_render_seconds",
                "Time spent handing a frame to renderers",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.016, 0.033, 0.1]),
        )?;
        registry.register(Box::new(frame_render_time.clone()))?;

        let formation_changes = IntCounterVec::new(
            Opts::new(
                "drone_show_formation_changes_total",
                "Times playback entered a formation",
            ),
            &["formation"],
        )?;
        registry.register(Box::new(formation_changes.clone()))?;

        let playback_state = IntGaugeVec::new(
            Opts::new("drone_show_playback_state", "Current playback state (one-hot)"),
            &["state"],
        )?;
        registry.register(Box::new(playback_state.clone()))?;

        let sim_time = Gauge::new(
            "drone_show_sim_time_seconds",
            "Current position of the show clock",
        )?;
        registry.register(Box::new(sim_time.clone()))?;

        let formation_index = IntGauge::new(
            "drone_show_formation_index",
            "Index of the formation currently shown",
        )?;
        registry.register(Box::new(formation_index.clone()))?;

        let drones_rendered = IntGauge::new(
            "drone_show_drones_rendered",
            "Drones in the most recent frame",
        )?;
        registry.register(Box::new(drones_rendered.clone()))?;

        // Feed metrics
        let feed_polls = IntCounter::new(
            "drone_show_feed_polls_total",
            "Completed drone feed polls",
        )?;
        registry.register(Box::new(feed_polls.clone()))?;

        let fleet_drones = IntGaugeVec::new(
            Opts::new("drone_show_fleet_drones", "Fleet drones by status"),
            &["status"],
        )?;
        registry.register(Box::new(fleet_drones.clone()))?;

        let fleet_battery = Gauge::new(
            "drone_show_fleet_battery_percent",
            "Average fleet battery level",
        )?;
        registry.register(Box::new(fleet_battery.clone()))?;

        // Planner metrics
        let plans_validated = IntCounterVec::new(
            Opts::new("drone_show_plans_validated_total", "Validated flight plans"),
            &["result"],
        )?;
        registry.register(Box::new(plans_validated.clone()))?;

        let plan_findings = IntCounterVec::new(
            Opts::new(
                "drone_show_plan_findings_total",
                "Flight plan limit violations by kind",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(plan_findings.clone()))?;

        info!("📊 Show metrics initialized");

        Ok(Self {
            registry,
            frames_rendered,
            frame_render_time,
            formation_changes,
            playback_state,
            sim_time,
            formation_index,
            drones_rendered,
            feed_polls,
            fleet_drones,
            fleet_battery,
            plans_validated,
            plan_findings,
        })
    }

    /// Get Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> prometheus::Result<String> {
        use prometheus::Encoder;

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    // ========================================================================
    // PLAYBACK METRICS
    // ========================================================================

    /// Record one rendered frame
    pub fn record_frame(&self, state: &SimulationState, drones: usize, render_secs: f64) {
        self.frames_rendered.inc();
        self.frame_render_time.observe(render_secs);
        self.sim_time.set(state.current_time);
        self.formation_index.set(state.current_formation_index as i64);
        self.drones_rendered.set(drones as i64);
    }

    pub fn record_formation_change(&self, formation: &str) {
        self.formation_changes.with_label_values(&[formation]).inc();
    }

    pub fn set_playback_state(&self, state: PlaybackState) {
        for candidate in PLAYBACK_STATES {
            let label = candidate.to_string().to_lowercase();
            self.playback_state
                .with_label_values(&[label.as_str()])
                .set(i64::from(candidate == state));
        }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered.get()
    }

    // ========================================================================
    // FEED METRICS
    // ========================================================================

    /// Record a feed poll and the fleet it produced
    pub fn record_feed_poll(&self, summary: &FleetSummary) {
        self.feed_polls.inc();
        for (status, count) in [
            ("active", summary.active),
            ("inactive", summary.inactive),
            ("warning", summary.warning),
            ("error", summary.error),
        ] {
            self.fleet_drones.with_label_values(&[status]).set(count as i64);
        }
        self.fleet_battery.set(summary.average_battery);
    }

    // ========================================================================
    // PLANNER METRICS
    // ========================================================================

    pub fn record_validation(&self, report: &ValidationReport) {
        let result = if report.valid { "valid" } else { "invalid" };
        self.plans_validated.with_label_values(&[result]).inc();
        for finding in &report.findings {
            self.plan_findings.with_label_values(&[finding.kind()]).inc();
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use show_core::{GeoPoint, Waypoint};
    use show_planner::FlightPlanner;

    fn state(time: f64, index: usize) -> SimulationState {
        SimulationState {
            is_playing: true,
            current_time: time,
            duration: 20.0,
            speed: 1.0,
            current_formation_index: index,
            transition_progress: 0.0,
        }
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = ShowMetrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_metrics_export() {
        let metrics = ShowMetrics::new().unwrap();

        metrics.record_frame(&state(1.0, 0), 12, 0.002);
        metrics.record_frame(&state(6.0, 1), 12, 0.002);
        metrics.record_formation_change("Triangle Formation");
        metrics.set_playback_state(PlaybackState::Playing);

        let export = metrics.export().unwrap();
        assert_eq!(metrics.frames_rendered(), 2);
        assert!(export.contains("drone_show_frames_rendered_total 2"));
        assert!(export.contains("drone_show_formation_index 1"));
        assert!(export.contains("drone_show_playback_state{state=\"playing\"} 1"));
        assert!(export.contains("drone_show_playback_state{state=\"paused\"} 0"));
        assert!(export.contains("formation=\"Triangle Formation\""));
    }

    #[test]
    fn test_feed_and_planner_metrics() {
        let metrics = ShowMetrics::new().unwrap();
        let summary = FleetSummary {
            total: 3,
            active: 2,
            error: 1,
            average_battery: 75.0,
            ..Default::default()
        };
        metrics.record_feed_poll(&summary);

        let planner = FlightPlanner::default();
        let plan = planner.generate_flight_plan(
            "drone-1",
            vec![Waypoint::new("wp-1", GeoPoint::new(35.0, 139.0, 450.0), 30.0)],
        );
        metrics.record_validation(&planner.validate_flight_plan(&plan));

        let export = metrics.export().unwrap();
        assert!(export.contains("drone_show_feed_polls_total 1"));
        assert!(export.contains("drone_show_fleet_drones{status=\"active\"} 2"));
        assert!(export.contains("drone_show_plans_validated_total{result=\"invalid\"} 1"));
        assert!(export.contains("drone_show_plan_findings_total{kind=\"speed_too_high\"} 1"));
        assert!(export.contains("drone_show_plan_findings_total{kind=\"altitude_too_high\"} 1"));
    }
}

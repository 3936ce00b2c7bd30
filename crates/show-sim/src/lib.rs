//! # Show Simulation
//!
//! Runtime side of the drone show engine:
//! - Timeline playback with hold and transition phases
//! - Projection of formations into rendered drone positions
//! - Light themes per formation
//! - A tokio frame driver feeding render sinks
//! - Scene synchronisation for renderers
//! - Mock drone feed polled into a shared fleet view
//!
//! ## Usage
//!
//! ```rust,ignore
//! use show_sim::{ShowTimeline, TimelineConfig};
//!
//! let mut timeline = ShowTimeline::new(formations, TimelineConfig::default())?;
//! timeline.play();
//! timeline.advance(0.016);
//! let drones = timeline.drones();
//! ```

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use show_core::{CoreError, CoreResult};

pub mod driver;
pub mod feed;
pub mod lighting;
pub mod projection;
pub mod scene;
pub mod timeline;

pub use driver::{DEFAULT_FRAME_INTERVAL, DriverHandle, FrameDriver, FrameSink, SharedTimeline};
pub use feed::{
    DEFAULT_POLL_INTERVAL, DroneSource, Fleet, FleetSummary, MockDroneFeed, PollHandle,
    spawn_poller,
};
pub use lighting::{LightCue, LightTheme};
pub use projection::{ProjectionStyle, project_formation};
pub use scene::{SceneDiff, SceneRegistry};
pub use timeline::{FormationCallback, PlaybackState, ShowPhase, ShowTimeline, SimulationState};

/// Timeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Seconds allotted to each formation
    pub per_formation_secs: f64,
    /// Share of each formation's slot spent holding still
    pub hold_fraction: f64,
    pub initial_speed: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    /// Seed for battery and light randomness; entropy when unset
    pub seed: Option<u64>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            per_formation_secs: 5.0,
            hold_fraction: 0.8,
            initial_speed: 1.0,
            min_speed: 0.1,
            max_speed: 5.0,
            seed: None,
        }
    }
}

impl TimelineConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.per_formation_secs.is_finite() && self.per_formation_secs > 0.0) {
            return Err(CoreError::invalid_parameter(
                "per_formation_secs",
                "must be a positive number of seconds",
            ));
        }
        if !(0.0..1.0).contains(&self.hold_fraction) {
            return Err(CoreError::invalid_parameter(
                "hold_fraction",
                "must be in [0, 1)",
            ));
        }
        if !(self.min_speed.is_finite() && self.max_speed.is_finite())
            || self.min_speed <= 0.0
            || self.min_speed > self.max_speed
        {
            return Err(CoreError::invalid_parameter(
                "speed bounds",
                "need 0 < min_speed <= max_speed",
            ));
        }
        if !self.initial_speed.is_finite() {
            return Err(CoreError::invalid_parameter("initial_speed", "must be finite"));
        }
        Ok(())
    }
}

/// Deterministic RNG when seeded, OS entropy otherwise
pub fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

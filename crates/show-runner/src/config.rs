//! Runner configuration
//!
//! Layered with the `config` crate: compiled defaults, then an optional
//! TOML file (`show.toml`, or the path in `SHOW_CONFIG`), then `SHOW_*`
//! environment variables with `__` between nested keys, e.g.
//! `SHOW_TIMELINE__SEED=7` or `SHOW_DRIVER__FRAME_INTERVAL_MS=33`.

use ::config::builder::DefaultState;
use ::config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use show_core::GeoPoint;
use show_patterns::PatternParams;
use show_planner::PlanLimits;
use show_sim::TimelineConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Config file read when `SHOW_CONFIG` is unset
pub const DEFAULT_CONFIG_FILE: &str = "show.toml";

/// Runner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub timeline: TimelineConfig,
    pub driver: DriverConfig,
    pub feed: FeedConfig,
    pub show: ShowConfig,
    pub planner: PlannerConfig,
}

/// Frame driver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub frame_interval_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { frame_interval_ms: 16 }
    }
}

impl DriverConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }
}

/// Mock drone feed settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub poll_interval_ms: u64,
    pub seed: Option<u64>,
    /// Give up waiting for the first poll after this long
    pub startup_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3000,
            seed: None,
            startup_timeout_ms: 5000,
        }
    }
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}

/// What the runner shows and where it writes exports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowConfig {
    /// Center of the demo sequence
    pub center: GeoPoint,
    /// Rotation in degrees recorded on every demo formation
    pub rotation: Option<f64>,
    /// At most this many fleet drones take part
    pub max_drones: usize,
    pub export_dir: PathBuf,
    /// Extra formation generated, previewed and exported next to the demo
    pub pattern: PatternParams,
    /// Seconds of the timed pattern written alongside the formation
    pub pattern_duration: f64,
}

impl Default for ShowConfig {
    fn default() -> Self {
        Self {
            center: GeoPoint::new(35.6762, 139.6503, 80.0),
            rotation: None,
            max_drones: 12,
            export_dir: PathBuf::from("exports"),
            pattern: PatternParams::default(),
            pattern_duration: 10.0,
        }
    }
}

/// Flight planner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub default_speed: f64,
    pub limits: PlanLimits,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_speed: show_planner::DEFAULT_SPEED,
            limits: PlanLimits::default(),
        }
    }
}

impl RunnerConfig {
    /// Load defaults, the config file and the environment, in that order
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path = std::env::var("SHOW_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        Self::defaults()?
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("SHOW")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Defaults overlaid with a TOML document
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from_str(document, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder().add_source(Config::try_from(&Self::default())?))
    }
}

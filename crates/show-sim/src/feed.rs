//! Drone feeds
//!
//! A [`DroneSource`] produces a refreshed list of drone records on demand.
//! [`spawn_poller`] polls one on a fixed interval into a shared [`Fleet`]
//! view. [`MockDroneFeed`] stands in for real telemetry with twelve drones
//! drifting around central Tokyo.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use show_core::{BatteryBand, CoreResult, DroneId, DronePosition, DroneStatus, GeoPoint};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default poll interval for drone feeds
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Produces drone records with unique, stable ids
#[async_trait]
pub trait DroneSource: Send {
    async fn fetch(&mut self) -> CoreResult<Vec<DronePosition>>;
}

// ============================================================================
// MOCK FEED
// ============================================================================

/// Base positions (latitude, longitude) of the mock fleet
const BASE_POSITIONS: [(f64, f64); 12] = [
    (35.6762, 139.6503),
    (35.6586, 139.7454),
    (35.6598, 139.7006),
    (35.6284, 139.7387),
    (35.6938, 139.7036),
    (35.6470, 139.7164),
    (35.6654, 139.7707),
    (35.6809, 139.7669),
    (35.6980, 139.7731),
    (35.6433, 139.6917),
    (35.6851, 139.7528),
    (35.6617, 139.7040),
];

const STATUSES: [DroneStatus; 12] = [
    DroneStatus::Active,
    DroneStatus::Active,
    DroneStatus::Active,
    DroneStatus::Active,
    DroneStatus::Active,
    DroneStatus::Active,
    DroneStatus::Active,
    DroneStatus::Warning,
    DroneStatus::Active,
    DroneStatus::Inactive,
    DroneStatus::Active,
    DroneStatus::Error,
];

const MIN_ALTITUDE: f64 = 30.0;
const MAX_ALTITUDE: f64 = 200.0;

/// Randomly generated fleet that drifts a little on every poll
pub struct MockDroneFeed {
    rng: ChaCha8Rng,
    drones: Vec<DronePosition>,
    fresh: bool,
}

impl MockDroneFeed {
    pub fn new(seed: Option<u64>) -> Self {
        let mut rng = crate::seeded_rng(seed);
        let drones = generate_fleet(&mut rng);
        Self {
            rng,
            drones,
            fresh: true,
        }
    }

    /// Current records without advancing the simulation
    pub fn drones(&self) -> &[DronePosition] {
        &self.drones
    }

    /// Regenerate the whole fleet from the base positions
    pub fn refresh(&mut self) {
        self.drones = generate_fleet(&mut self.rng);
        self.fresh = true;
        debug!("Mock fleet regenerated");
    }

    /// Nudge every drone: small drift, altitude wobble, battery drain
    pub fn jitter(&mut self) {
        let now = Utc::now();
        for drone in &mut self.drones {
            drone.latitude += (self.rng.r#gen::<f64>() - 0.5) * 0.0001;
            drone.longitude += (self.rng.r#gen::<f64>() - 0.5) * 0.0001;
            drone.altitude = (drone.altitude + (self.rng.r#gen::<f64>() - 0.5) * 5.0)
                .clamp(MIN_ALTITUDE, MAX_ALTITUDE);
            drone.battery = (drone.battery - self.rng.r#gen::<f64>() * 0.1).max(0.0);
            drone.last_update = now;
        }
    }
}

fn generate_fleet(rng: &mut ChaCha8Rng) -> Vec<DronePosition> {
    let now = Utc::now();
    BASE_POSITIONS
        .iter()
        .zip(STATUSES)
        .enumerate()
        .map(|(index, (&(lat, lng), status))| {
            let point = GeoPoint::new(
                lat + (rng.r#gen::<f64>() - 0.5) * 0.01,
                lng + (rng.r#gen::<f64>() - 0.5) * 0.01,
                (rng.r#gen::<f64>() * 100.0).floor() + 50.0,
            );
            let mut drone = DronePosition::new(
                format!("drone-{}", index + 1),
                format!("Drone {}", index + 1),
                point,
            );
            drone.status = status;
            drone.battery = (rng.r#gen::<f64>() * 60.0).floor() + 40.0;
            drone.last_update = now - ChronoDuration::milliseconds(rng.gen_range(0..300_000));
            drone
        })
        .collect()
}

#[async_trait]
impl DroneSource for MockDroneFeed {
    async fn fetch(&mut self) -> CoreResult<Vec<DronePosition>> {
        if self.fresh {
            self.fresh = false;
        } else {
            self.jitter();
        }
        Ok(self.drones.clone())
    }
}

// ============================================================================
// FLEET VIEW
// ============================================================================

/// Latest drone records, shared between a poller and its readers
#[derive(Clone, Default)]
pub struct Fleet {
    drones: Arc<DashMap<DroneId, DronePosition>>,
    updates: Arc<AtomicU64>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the fleet with a freshly fetched list.
    ///
    /// Not atomic: a concurrent reader may see new records next to drones
    /// that are about to be dropped, but never misses a drone present in
    /// both the old and new lists. `update_count` moves only once the
    /// replacement is complete.
    pub fn replace_all(&self, drones: Vec<DronePosition>) {
        let incoming: HashSet<DroneId> = drones.iter().map(|d| d.id.clone()).collect();
        for drone in drones {
            self.drones.insert(drone.id.clone(), drone);
        }
        self.drones.retain(|id, _| incoming.contains(id));
        self.updates.fetch_add(1, AtomicOrdering::Release);
    }

    pub fn get(&self, id: &DroneId) -> Option<DronePosition> {
        self.drones.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.drones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drones.is_empty()
    }

    /// Number of completed polls
    pub fn update_count(&self) -> u64 {
        self.updates.load(AtomicOrdering::Acquire)
    }

    /// Drones ordered by id, numeric suffixes compared as numbers
    pub fn snapshot(&self) -> Vec<DronePosition> {
        let mut drones: Vec<DronePosition> =
            self.drones.iter().map(|entry| entry.value().clone()).collect();
        drones.sort_by(|a, b| natural_cmp(a.id.as_str(), b.id.as_str()));
        drones
    }

    pub fn ids(&self) -> Vec<DroneId> {
        self.snapshot().into_iter().map(|d| d.id).collect()
    }

    pub fn summary(&self) -> FleetSummary {
        FleetSummary::from_drones(&self.snapshot())
    }
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let split = |s: &str| {
        let digits = s.len() - s.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let (head, tail) = s.split_at(s.len() - digits);
        (head.to_string(), tail.parse::<u64>().ok())
    };
    split(a).cmp(&split(b)).then_with(|| a.cmp(b))
}

/// Dashboard counts for a fleet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub warning: usize,
    pub error: usize,
    pub average_battery: f64,
    pub low_battery: usize,
    pub critical_battery: usize,
}

impl FleetSummary {
    pub fn from_drones(drones: &[DronePosition]) -> Self {
        let mut summary = Self {
            total: drones.len(),
            ..Default::default()
        };

        for drone in drones {
            match drone.status {
                DroneStatus::Active => summary.active += 1,
                DroneStatus::Inactive => summary.inactive += 1,
                DroneStatus::Warning => summary.warning += 1,
                DroneStatus::Error => summary.error += 1,
            }
            match drone.battery_band() {
                BatteryBand::Good => {}
                BatteryBand::Low => summary.low_battery += 1,
                BatteryBand::Critical => summary.critical_battery += 1,
            }
        }

        if !drones.is_empty() {
            summary.average_battery =
                drones.iter().map(|d| d.battery).sum::<f64>() / drones.len() as f64;
        }
        summary
    }

    /// Band of the fleet's average battery
    pub fn battery_band(&self) -> BatteryBand {
        BatteryBand::from_percent(self.average_battery)
    }
}

// ============================================================================
// POLLER
// ============================================================================

/// Poll `source` every `interval` into `fleet` until cancelled.
///
/// The first poll happens immediately. Failed polls are logged and skipped.
pub fn spawn_poller<S>(mut source: S, fleet: Fleet, interval: Duration) -> PollHandle
where
    S: DroneSource + 'static,
{
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("📡 Drone feed polling every {:?}", interval);

        loop {
            ticker.tick().await;
            match source.fetch().await {
                Ok(drones) => {
                    debug!("Feed poll returned {} drones", drones.len());
                    fleet.replace_all(drones);
                }
                Err(e) => warn!("Drone feed poll failed: {}", e),
            }
        }
    });

    PollHandle { task: Some(task) }
}

/// Handle to a running poller. Dropping it stops polling.
#[derive(Debug)]
pub struct PollHandle {
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Stop polling. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Drone feed poller cancelled");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ============================================================================
// TESTS
// ============================================================================

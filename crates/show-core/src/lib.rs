//! # Show Core
//!
//! Core domain models and types for the drone show engine.
//! This crate provides the shared types used by the formation generator,
//! the show timeline and the flight planner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub mod error;
pub mod geo;

pub use error::{CoreError, CoreResult};
pub use geo::*;

// ============================================================================
// DRONE MODELS
// ============================================================================

/// Unique identifier for a drone, supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DroneId(pub String);

impl DroneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DroneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DroneId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DroneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Operational status of a drone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DroneStatus {
    #[default]
    Active,
    Inactive,
    Warning,
    Error,
}

impl fmt::Display for DroneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DroneStatus::Active => write!(f, "ACTIVE"),
            DroneStatus::Inactive => write!(f, "INACTIVE"),
            DroneStatus::Warning => write!(f, "WARNING"),
            DroneStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Coarse battery classification used by dashboards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryBand {
    Good,
    Low,
    Critical,
}

impl BatteryBand {
    pub fn from_percent(battery: f64) -> Self {
        if battery > 60.0 {
            Self::Good
        } else if battery > 30.0 {
            Self::Low
        } else {
            Self::Critical
        }
    }
}

/// Light animation applied to a drone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightEffect {
    Steady,
    Pulse,
    Fade,
    Strobe,
}

impl fmt::Display for LightEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LightEffect::Steady => write!(f, "steady"),
            LightEffect::Pulse => write!(f, "pulse"),
            LightEffect::Fade => write!(f, "fade"),
            LightEffect::Strobe => write!(f, "strobe"),
        }
    }
}

/// A drone placed in world coordinates for one instant.
///
/// Produced either by projecting a formation slot or by the telemetry feed.
/// Renderers key on `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DronePosition {
    pub id: DroneId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub status: DroneStatus,
    /// Battery level percentage (0-100)
    pub battery: f64,
    pub last_update: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_intensity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_effect: Option<LightEffect>,
}

impl DronePosition {
    pub fn new(id: impl Into<DroneId>, name: impl Into<String>, point: GeoPoint) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            latitude: point.latitude,
            longitude: point.longitude,
            altitude: point.altitude,
            status: DroneStatus::default(),
            battery: 100.0,
            last_update: Utc::now(),
            light_color: None,
            light_intensity: None,
            light_effect: None,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude, self.altitude)
    }

    /// Move to `point`, keeping every other field
    pub fn set_point(&mut self, point: GeoPoint) {
        self.latitude = point.latitude;
        self.longitude = point.longitude;
        self.altitude = point.altitude;
    }

    pub fn battery_band(&self) -> BatteryBand {
        BatteryBand::from_percent(self.battery)
    }
}

// ============================================================================
// FORMATION MODELS
// ============================================================================

/// Role of a slot within a formation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotRole {
    Leader,
    #[default]
    Follower,
    Anchor,
}

/// One position-and-role entry within a formation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormationSlot {
    pub drone_id: DroneId,
    #[serde(rename = "relativePosition")]
    pub relative_offset: RelativeOffset,
    pub role: SlotRole,
}

impl FormationSlot {
    pub fn new(drone_id: DroneId, relative_offset: RelativeOffset, role: SlotRole) -> Self {
        Self {
            drone_id,
            relative_offset,
            role,
        }
    }
}

/// A named geometric arrangement of slots around a center point.
///
/// Slot order is generation order and is significant: interpolation matches
/// slots by index, not by drone id. Values are not mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formation {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "dronePositions")]
    pub slots: Vec<FormationSlot>,
    pub center_point: GeoPoint,
    pub scale: f64,
    /// Rotation in degrees
    pub rotation: f64,
}

impl Formation {
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn drone_ids(&self) -> impl Iterator<Item = &DroneId> {
        self.slots.iter().map(|s| &s.drone_id)
    }

    /// The first slot marked as leader
    pub fn leader(&self) -> Option<&FormationSlot> {
        self.slots.iter().find(|s| s.role == SlotRole::Leader)
    }

    /// World position of slot `index`
    pub fn slot_point(&self, index: usize) -> Option<GeoPoint> {
        self.slots
            .get(index)
            .map(|s| self.center_point.offset_by(&s.relative_offset))
    }
}

// ============================================================================
// FLIGHT PLAN MODELS
// ============================================================================

/// Unique identifier for a waypoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaypointId(pub String);

impl WaypointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for WaypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of action performed on arrival at a waypoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Hover,
    Light,
    Rotate,
    Wait,
}

/// Action performed on arrival at a waypoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub parameters: HashMap<String, serde_json::Value>,
    /// Seconds
    pub duration: f64,
}

impl WaypointAction {
    pub fn new(action_type: ActionType, duration: f64) -> Self {
        Self {
            action_type,
            parameters: HashMap::new(),
            duration,
        }
    }
}

/// A waypoint in a drone flight plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub id: WaypointId,
    pub position: GeoPoint,
    /// Seconds from plan start
    pub timestamp: f64,
    /// Meters per second; zero means "use the planner default"
    pub speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<WaypointAction>,
}

impl Waypoint {
    pub fn new(id: impl Into<String>, position: GeoPoint, speed: f64) -> Self {
        Self {
            id: WaypointId::new(id),
            position,
            timestamp: 0.0,
            speed,
            action: None,
        }
    }

    pub fn with_action(mut self, action: WaypointAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn at(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Fixed safety buffers attached to every flight plan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyMargins {
    /// Meters
    pub altitude_buffer: f64,
    /// Meters
    pub lateral_buffer: f64,
    /// Seconds
    pub temporal_buffer: f64,
}

impl Default for SafetyMargins {
    fn default() -> Self {
        Self {
            altitude_buffer: 5.0,
            lateral_buffer: 10.0,
            temporal_buffer: 2.0,
        }
    }
}

/// Route for a single drone with derived totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightPlan {
    pub drone_id: DroneId,
    pub waypoints: Vec<Waypoint>,
    /// Meters
    pub total_distance: f64,
    /// Seconds
    pub estimated_flight_time: f64,
    pub safety_margins: SafetyMargins,
}

// ============================================================================
// TESTS
// ============================================================================

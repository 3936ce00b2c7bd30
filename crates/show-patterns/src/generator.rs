//! Geometric formation generators
//!
//! Each generator takes a center point, a size and the ordered drone ids to
//! place, and returns a flat formation (every z offset is zero). Slot 0 is
//! always the leader. When fewer ids are supplied than the shape has
//! positions, the formation is partial rather than an error.

use serde::{Deserialize, Serialize};
use show_core::{
    CoreError, CoreResult, DroneId, Formation, FormationSlot, GeoPoint, RelativeOffset, SlotRole,
};
use std::collections::HashSet;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

/// Default number of outer points on a star
pub const DEFAULT_STAR_POINTS: usize = 5;

/// Inner star vertices sit at this fraction of the outer radius
const STAR_INNER_RATIO: f64 = 0.5;

/// Upper bound on drones used by the demo sequence
pub const DEMO_MAX_DRONES: usize = 12;

/// Supported formation shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Star,
    Triangle,
    Circle,
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternType::Star => write!(f, "star"),
            PatternType::Triangle => write!(f, "triangle"),
            PatternType::Circle => write!(f, "circle"),
        }
    }
}

impl FromStr for PatternType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "star" => Ok(Self::Star),
            "triangle" => Ok(Self::Triangle),
            "circle" => Ok(Self::Circle),
            _ => Err(CoreError::unknown_pattern(s)),
        }
    }
}

/// Parameters for [`generate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternParams {
    pub pattern: PatternType,
    pub center: GeoPoint,
    /// Radius for star and circle, side length for triangle (meters)
    pub size: f64,
    pub star_points: usize,
    /// Rotation in degrees recorded on the generated formation
    pub rotation: f64,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            pattern: PatternType::Star,
            center: GeoPoint::new(35.6762, 139.6503, 50.0),
            size: 30.0,
            star_points: DEFAULT_STAR_POINTS,
            rotation: 0.0,
        }
    }
}

/// Generate the formation described by `params`
pub fn generate(params: &PatternParams, drone_ids: &[DroneId]) -> CoreResult<Formation> {
    match params.pattern {
        PatternType::Star => star(
            params.center,
            params.size,
            params.star_points,
            drone_ids,
            params.rotation,
        ),
        PatternType::Triangle => triangle(params.center, params.size, drone_ids, params.rotation),
        PatternType::Circle => circle(params.center, params.size, drone_ids, params.rotation),
    }
}

/// Star with `points` outer vertices alternating with inner vertices at half radius
pub fn create_star(
    center: GeoPoint,
    radius: f64,
    points: usize,
    drone_ids: &[DroneId],
) -> CoreResult<Formation> {
    star(center, radius, points, drone_ids, 0.0)
}

/// Equilateral triangle with extra drones spread evenly along its edges
pub fn create_triangle(
    center: GeoPoint,
    side_length: f64,
    drone_ids: &[DroneId],
) -> CoreResult<Formation> {
    triangle(center, side_length, drone_ids, 0.0)
}

/// One slot per drone, evenly spaced on a circle
pub fn create_circle(
    center: GeoPoint,
    radius: f64,
    drone_ids: &[DroneId],
) -> CoreResult<Formation> {
    circle(center, radius, drone_ids, 0.0)
}

/// The four-pattern demonstration: 5-point star, triangle, circle, 8-point star.
/// `rotation` is recorded on every formation when given.
pub fn demo_sequence(
    center: GeoPoint,
    drone_ids: &[DroneId],
    rotation: Option<f64>,
) -> CoreResult<Vec<Formation>> {
    let ids = &drone_ids[..drone_ids.len().min(DEMO_MAX_DRONES)];
    let rotation = rotation.unwrap_or(0.0);

    Ok(vec![
        star(center, 40.0, 5, ids, rotation)?,
        triangle(center, 60.0, ids, rotation)?,
        circle(center, 35.0, ids, rotation)?,
        star(center, 50.0, 8, ids, rotation)?,
    ])
}

fn star(
    center: GeoPoint,
    radius: f64,
    points: usize,
    drone_ids: &[DroneId],
    rotation: f64,
) -> CoreResult<Formation> {
    validate_inputs("radius", radius, drone_ids)?;
    if points == 0 {
        return Err(CoreError::invalid_parameter("points", "a star needs at least one point"));
    }

    let total_points = points * 2;
    let slots = drone_ids
        .iter()
        .take(total_points)
        .enumerate()
        .map(|(i, id)| {
            let angle = (i as f64 * 2.0 * PI) / total_points as f64;
            let r = if i % 2 == 0 { radius } else { radius * STAR_INNER_RATIO };
            FormationSlot::new(id.clone(), RelativeOffset::polar(angle, r), role_for(i))
        })
        .collect();

    Ok(build(
        "star",
        format!("Star Formation ({points} points)"),
        format!("Star formation with {points} points and radius {radius}m"),
        center,
        rotation,
        slots,
    ))
}

fn triangle(
    center: GeoPoint,
    side_length: f64,
    drone_ids: &[DroneId],
    rotation: f64,
) -> CoreResult<Formation> {
    validate_inputs("side_length", side_length, drone_ids)?;

    let circumradius = side_length / 3f64.sqrt();
    let vertices: Vec<RelativeOffset> = (0..drone_ids.len().min(3))
        .map(|i| RelativeOffset::polar((i as f64 * 2.0 * PI) / 3.0 - PI / 2.0, circumradius))
        .collect();

    let mut slots: Vec<FormationSlot> = vertices
        .iter()
        .zip(drone_ids)
        .enumerate()
        .map(|(i, (offset, id))| FormationSlot::new(id.clone(), *offset, role_for(i)))
        .collect();

    if drone_ids.len() > 3 {
        let per_edge = (drone_ids.len() - 3) / 3;
        let mut remaining = drone_ids[3..].iter();

        for edge in 0..3 {
            let from = vertices[edge];
            let to = vertices[(edge + 1) % 3];

            for j in 1..=per_edge {
                let Some(id) = remaining.next() else { break };
                let t = j as f64 / (per_edge + 1) as f64;
                slots.push(FormationSlot::new(id.clone(), from.lerp(&to, t), SlotRole::Follower));
            }
        }
    }

    Ok(build(
        "triangle",
        "Triangle Formation".to_string(),
        format!("Equilateral triangle formation with {side_length}m sides"),
        center,
        rotation,
        slots,
    ))
}

fn circle(
    center: GeoPoint,
    radius: f64,
    drone_ids: &[DroneId],
    rotation: f64,
) -> CoreResult<Formation> {
    validate_inputs("radius", radius, drone_ids)?;

    let n = drone_ids.len() as f64;
    let slots = drone_ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let angle = (i as f64 * 2.0 * PI) / n;
            FormationSlot::new(id.clone(), RelativeOffset::polar(angle, radius), role_for(i))
        })
        .collect();

    Ok(build(
        "circle",
        "Circle Formation".to_string(),
        format!("Circular formation with {radius}m radius"),
        center,
        rotation,
        slots,
    ))
}

fn role_for(index: usize) -> SlotRole {
    if index == 0 { SlotRole::Leader } else { SlotRole::Follower }
}

fn validate_inputs(size_name: &str, size: f64, drone_ids: &[DroneId]) -> CoreResult<()> {
    if drone_ids.is_empty() {
        return Err(CoreError::EmptyDroneIds);
    }
    if !size.is_finite() || size <= 0.0 {
        return Err(CoreError::invalid_parameter(
            size_name,
            format!("must be a positive number of meters, got {size}"),
        ));
    }

    let mut seen = HashSet::with_capacity(drone_ids.len());
    if let Some(dup) = drone_ids.iter().find(|id| !seen.insert(*id)) {
        return Err(CoreError::invalid_parameter(
            "drone_ids",
            format!("duplicate drone id {dup}"),
        ));
    }
    Ok(())
}

fn build(
    kind: &str,
    name: String,
    description: String,
    center: GeoPoint,
    rotation: f64,
    slots: Vec<FormationSlot>,
) -> Formation {
    debug!("Generated {} with {} slots", name, slots.len());

    Formation {
        id: format!("formation-{kind}-{}", Uuid::new_v4().simple()),
        name,
        description,
        slots,
        center_point: center,
        scale: 1.0,
        rotation,
    }
}

// ============================================================================
// TESTS
// ============================================================================

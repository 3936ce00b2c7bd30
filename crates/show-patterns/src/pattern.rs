//! Timed show patterns derived from formations

use serde::{Deserialize, Serialize};
use show_core::Formation;

/// Window over which slot arrivals are staggered, in seconds
const ARRIVAL_STAGGER_SECS: f64 = 5.0;

/// Pattern classification, inferred from a formation name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowPatternType {
    Star,
    Triangle,
    Circle,
    Line,
    Custom,
}

impl ShowPatternType {
    /// Classify by case-insensitive substring of the formation name
    pub fn classify(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("star") {
            Self::Star
        } else if name.contains("triangle") {
            Self::Triangle
        } else if name.contains("circle") {
            Self::Circle
        } else {
            Self::Custom
        }
    }
}

/// Arrival of one drone at its slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedPosition {
    /// Seconds from pattern start
    pub time: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// A formation laid out in world coordinates with staggered arrival times
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowPattern {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub pattern_type: ShowPatternType,
    pub positions: Vec<TimedPosition>,
    /// Seconds
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ShowPattern {
    pub fn from_formation(formation: &Formation, duration: f64, color: Option<String>) -> Self {
        let count = formation.slot_count() as f64;

        let positions = formation
            .slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let point = formation.center_point.offset_by(&slot.relative_offset);
                TimedPosition {
                    time: (index as f64 / count) * ARRIVAL_STAGGER_SECS,
                    latitude: point.latitude,
                    longitude: point.longitude,
                    altitude: point.altitude,
                }
            })
            .collect();

        Self {
            id: format!("pattern-{}", formation.id),
            name: format!("Pattern: {}", formation.name),
            pattern_type: ShowPatternType::classify(&formation.name),
            positions,
            duration,
            color,
        }
    }
}

//! Projection of formations into world-space drone positions

use chrono::Utc;
use rand::Rng;
use show_core::{DronePosition, DroneStatus, Formation};

use crate::lighting::LightTheme;

/// How projected drones are labelled and decorated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionStyle {
    /// Name prefix, numbered from 1
    pub label: &'static str,
    /// Simulated battery is drawn from [floor, 100)
    pub battery_floor: f64,
    /// Attach light cues from the formation's theme
    pub lights: bool,
}

impl ProjectionStyle {
    /// Drones rendered by the show timeline
    pub const SHOW: Self = Self {
        label: "Light",
        battery_floor: 90.0,
        lights: true,
    };

    /// Drones rendered as a static pattern preview
    pub const PREVIEW: Self = Self {
        label: "Preview Drone",
        battery_floor: 85.0,
        lights: false,
    };
}

/// Place every slot of `formation` in world coordinates.
///
/// `progress` expands the drones from the formation center (0.0) out to
/// their slots (1.0).
pub fn project_formation<R: Rng + ?Sized>(
    formation: &Formation,
    progress: f64,
    style: ProjectionStyle,
    rng: &mut R,
) -> Vec<DronePosition> {
    let center = formation.center_point;
    let theme = LightTheme::for_formation(&formation.name);
    let total = formation.slot_count();
    let now = Utc::now();

    formation
        .slots
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            let target = center.offset_by(&slot.relative_offset);
            let point = center.interpolate(&target, progress);

            let mut drone = DronePosition::new(
                slot.drone_id.clone(),
                format!("{} {}", style.label, index + 1),
                point,
            );
            drone.status = DroneStatus::Active;
            drone.battery = style.battery_floor + rng.r#gen::<f64>() * (100.0 - style.battery_floor);
            drone.last_update = now;

            if style.lights {
                let cue = theme.cue(index, total, rng);
                drone.light_color = Some(cue.color);
                drone.light_intensity = Some(cue.intensity);
                drone.light_effect = Some(cue.effect);
            }
            drone
        })
        .collect()
}

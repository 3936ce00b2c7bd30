//! Formation interpolation and eased fleet animation
//!
//! Slots are matched by position in the slot list, not by drone id. A `from`
//! slot with no counterpart in `to` is passed through unchanged, and extra
//! `to` slots are ignored. This truncation is observable behaviour that the
//! show timeline depends on.

use show_core::{CoreError, CoreResult, DronePosition, Formation, FormationSlot};

/// Intermediate formation at `t` (clamped to [0, 1]) between `from` and `to`.
///
/// Identity, name and roles are carried from `from`.
pub fn interpolate(from: &Formation, to: &Formation, t: f64) -> Formation {
    let t = t.clamp(0.0, 1.0);

    let slots = from
        .slots
        .iter()
        .enumerate()
        .map(|(index, from_slot)| match to.slots.get(index) {
            Some(to_slot) => FormationSlot {
                drone_id: from_slot.drone_id.clone(),
                relative_offset: from_slot.relative_offset.lerp(&to_slot.relative_offset, t),
                role: from_slot.role,
            },
            None => from_slot.clone(),
        })
        .collect();

    Formation {
        id: from.id.clone(),
        name: from.name.clone(),
        description: from.description.clone(),
        slots,
        center_point: from.center_point.interpolate(&to.center_point, t),
        scale: from.scale + t * (to.scale - from.scale),
        rotation: from.rotation + t * (to.rotation - from.rotation),
    }
}

/// `steps + 1` formations sampled at t = 0, 1/steps, ..., 1
pub fn interpolation_sequence(
    from: &Formation,
    to: &Formation,
    steps: usize,
) -> CoreResult<Vec<Formation>> {
    if steps == 0 {
        return Err(CoreError::invalid_parameter("steps", "must be at least 1"));
    }

    Ok((0..=steps)
        .map(|step| {
            let mut formation = interpolate(from, to, step as f64 / steps as f64);
            formation.id = format!("formation-interpolated-{step}");
            formation.name = format!("Interpolated {step}/{steps}");
            formation.description = format!(
                "Interpolation step {step} from {} to {}",
                from.name, to.name
            );
            formation
        })
        .collect())
}

/// Quadratic ease-in-out on [0, 1]
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

/// Glide a fleet snapshot toward the slots of `target` with easing.
///
/// Drone `i` heads for slot `i`; drones beyond the slot count keep their
/// starting position. Every returned drone is marked active.
pub fn animate_towards(from: &[DronePosition], target: &Formation, t: f64) -> Vec<DronePosition> {
    let eased = ease_in_out(t);

    from.iter()
        .enumerate()
        .map(|(index, drone)| {
            let start = drone.point();
            let end = target.slot_point(index).unwrap_or(start);

            let mut moved = drone.clone();
            moved.set_point(start.interpolate(&end, eased));
            moved.status = show_core::DroneStatus::Active;
            moved
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{create_circle, create_star, create_triangle};
    use show_core::{DroneId, DroneStatus, GeoPoint};

    const EPS: f64 = 1e-9;

    fn ids(n: usize) -> Vec<DroneId> {
        (1..=n).map(|i| DroneId::new(format!("drone-{i}"))).collect()
    }

    fn pair() -> (Formation, Formation) {
        let mut a = create_star(GeoPoint::new(35.0, 139.0, 60.0), 40.0, 5, &ids(10)).unwrap();
        let mut b = create_circle(GeoPoint::new(35.001, 139.002, 100.0), 30.0, &ids(10)).unwrap();
        a.rotation = 10.0;
        b.rotation = 90.0;
        b.scale = 3.0;
        (a, b)
    }

    #[test]
    fn test_interpolation_endpoints() {
        let (a, b) = pair();

        let start = interpolate(&a, &b, 0.0);
        assert_eq!(start.slots, a.slots);
        assert_eq!(start.center_point, a.center_point);
        assert_eq!(start.scale, a.scale);
        assert_eq!(start.rotation, a.rotation);

        let end = interpolate(&a, &b, 1.0);
        for (got, want) in end.slots.iter().zip(&b.slots) {
            assert!((got.relative_offset.x - want.relative_offset.x).abs() < EPS);
            assert!((got.relative_offset.y - want.relative_offset.y).abs() < EPS);
        }
        assert!((end.center_point.altitude - 100.0).abs() < EPS);
        assert!((end.scale - 3.0).abs() < EPS);
        assert!((end.rotation - 90.0).abs() < EPS);
    }

    #[test]
    fn test_interpolation_midpoint_is_mean() {
        let (a, b) = pair();
        let mid = interpolate(&a, &b, 0.5);

        for ((m, x), y) in mid.slots.iter().zip(&a.slots).zip(&b.slots) {
            let mean_x = (x.relative_offset.x + y.relative_offset.x) / 2.0;
            let mean_y = (x.relative_offset.y + y.relative_offset.y) / 2.0;
            assert!((m.relative_offset.x - mean_x).abs() < EPS);
            assert!((m.relative_offset.y - mean_y).abs() < EPS);
            assert_eq!(m.role, x.role);
            assert_eq!(m.drone_id, x.drone_id);
        }
        assert!((mid.rotation - 50.0).abs() < EPS);
    }

    #[test]
    fn test_unmatched_slots_pass_through() {
        let center = GeoPoint::new(35.0, 139.0, 60.0);
        let big = create_circle(center, 30.0, &ids(6)).unwrap();
        let small = create_triangle(center, 30.0, &ids(3)).unwrap();

        let forward = interpolate(&big, &small, 0.7);
        assert_eq!(forward.slot_count(), 6);
        assert_eq!(forward.slots[4], big.slots[4]);
        assert_eq!(forward.slots[5], big.slots[5]);

        let backward = interpolate(&small, &big, 0.7);
        assert_eq!(backward.slot_count(), 3);
    }

    #[test]
    fn test_sequence_tags_steps() {
        let (a, b) = pair();
        let seq = interpolation_sequence(&a, &b, 4).unwrap();

        assert_eq!(seq.len(), 5);
        assert_eq!(seq[0].id, "formation-interpolated-0");
        assert_eq!(seq[2].name, "Interpolated 2/4");
        assert_eq!(seq[0].slots, a.slots);
        assert!(seq[4].description.contains(&a.name));
        assert!(interpolation_sequence(&a, &b, 0).is_err());
    }

    #[test]
    fn test_ease_in_out_shape() {
        assert_eq!(ease_in_out(0.0), 0.0);
        assert_eq!(ease_in_out(1.0), 1.0);
        assert!((ease_in_out(0.5) - 0.5).abs() < EPS);
        assert!((ease_in_out(0.25) - 0.125).abs() < EPS);
        assert!(ease_in_out(0.75) > 0.75);
    }

    #[test]
    fn test_animate_towards_extra_drones_stay() {
        let center = GeoPoint::new(35.0, 139.0, 80.0);
        let target = create_triangle(center, 60.0, &ids(3)).unwrap();
        let fleet: Vec<DronePosition> = (0..4)
            .map(|i| {
                let mut d = DronePosition::new(
                    format!("drone-{}", i + 1),
                    format!("Drone {}", i + 1),
                    GeoPoint::new(35.01, 139.01, 50.0),
                );
                d.status = DroneStatus::Warning;
                d
            })
            .collect();

        let done = animate_towards(&fleet, &target, 1.0);
        let expected = target.slot_point(0).unwrap();
        assert!((done[0].latitude - expected.latitude).abs() < EPS);
        assert!((done[0].altitude - 80.0).abs() < EPS);
        assert_eq!(done[3].point(), fleet[3].point());
        assert!(done.iter().all(|d| d.status == DroneStatus::Active));

        let start = animate_towards(&fleet, &target, 0.0);
        assert_eq!(start[0].point(), fleet[0].point());
    }
}

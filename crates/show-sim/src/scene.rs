//! Scene registry
//!
//! Keeps the set of drones a renderer currently shows in step with a frame:
//! ids missing from the frame are discarded, new ids are added and tracked
//! ids are updated in place.

use show_core::{DroneId, DronePosition};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::driver::FrameSink;
use crate::timeline::SimulationState;

/// Changes applied by one [`SceneRegistry::sync`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SceneDiff {
    pub added: Vec<DroneId>,
    pub updated: Vec<DroneId>,
    pub removed: Vec<DroneId>,
}

impl SceneDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

/// Drones currently placed in a scene, keyed by id
#[derive(Debug, Default)]
pub struct SceneRegistry {
    drones: HashMap<DroneId, DronePosition>,
    frames: u64,
    last_state: Option<SimulationState>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile the scene with `frame`
    pub fn sync(&mut self, frame: &[DronePosition]) -> SceneDiff {
        let mut diff = SceneDiff::default();
        let incoming: HashSet<&DroneId> = frame.iter().map(|d| &d.id).collect();

        self.drones.retain(|id, _| {
            let keep = incoming.contains(id);
            if !keep {
                diff.removed.push(id.clone());
            }
            keep
        });

        for drone in frame {
            match self.drones.insert(drone.id.clone(), drone.clone()) {
                Some(_) => diff.updated.push(drone.id.clone()),
                None => diff.added.push(drone.id.clone()),
            }
        }

        diff.removed.sort();
        if !diff.added.is_empty() || !diff.removed.is_empty() {
            debug!(
                "Scene sync: +{} -{} ({} tracked)",
                diff.added.len(),
                diff.removed.len(),
                self.drones.len()
            );
        }
        self.frames += 1;
        diff
    }

    pub fn get(&self, id: &DroneId) -> Option<&DronePosition> {
        self.drones.get(id)
    }

    pub fn len(&self) -> usize {
        self.drones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drones.is_empty()
    }

    /// Number of frames synced so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Playback state of the last rendered frame
    pub fn last_state(&self) -> Option<&SimulationState> {
        self.last_state.as_ref()
    }

    /// Tracked drones ordered by id
    pub fn snapshot(&self) -> Vec<DronePosition> {
        let mut drones: Vec<DronePosition> = self.drones.values().cloned().collect();
        drones.sort_by(|a, b| a.id.cmp(&b.id));
        drones
    }

    pub fn clear(&mut self) {
        self.drones.clear();
    }
}

impl FrameSink for SceneRegistry {
    fn render(&mut self, state: &SimulationState, drones: &[DronePosition]) {
        self.last_state = Some(*state);
        self.sync(drones);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use show_core::GeoPoint;

    fn drone(id: &str, altitude: f64) -> DronePosition {
        DronePosition::new(id, format!("Drone {id}"), GeoPoint::new(35.0, 139.0, altitude))
    }

    #[test]
    fn test_first_sync_adds_everything() {
        let mut scene = SceneRegistry::new();
        let diff = scene.sync(&[drone("a", 50.0), drone("b", 60.0)]);

        assert_eq!(diff.added, vec![DroneId::new("a"), DroneId::new("b")]);
        assert!(diff.updated.is_empty());
        assert!(diff.removed.is_empty());
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn test_sync_discards_unknown_and_updates_tracked() {
        let mut scene = SceneRegistry::new();
        scene.sync(&[drone("a", 50.0), drone("b", 60.0), drone("c", 70.0)]);

        let diff = scene.sync(&[drone("b", 65.0), drone("d", 40.0)]);

        assert_eq!(diff.added, vec![DroneId::new("d")]);
        assert_eq!(diff.updated, vec![DroneId::new("b")]);
        assert_eq!(diff.removed, vec![DroneId::new("a"), DroneId::new("c")]);
        assert_eq!(scene.get(&DroneId::new("b")).unwrap().altitude, 65.0);
        assert!(scene.get(&DroneId::new("a")).is_none());
    }

    #[test]
    fn test_empty_frame_clears_scene() {
        let mut scene = SceneRegistry::new();
        scene.sync(&[drone("a", 50.0)]);

        let diff = scene.sync(&[]);
        assert_eq!(diff.removed.len(), 1);
        assert!(scene.is_empty());
        assert_eq!(scene.frames(), 2);
    }

    #[test]
    fn test_render_records_state() {
        let mut scene = SceneRegistry::new();
        let state = SimulationState {
            is_playing: true,
            current_time: 1.5,
            duration: 10.0,
            speed: 1.0,
            current_formation_index: 0,
            transition_progress: 0.3,
        };

        scene.render(&state, &[drone("b", 1.0), drone("a", 2.0)]);

        assert_eq!(scene.last_state(), Some(&state));
        let ids: Vec<String> = scene.snapshot().into_iter().map(|d| d.id.0).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}

//! Frame sink that keeps a scene in sync and records metrics

use show_core::DronePosition;
use show_sim::{FrameSink, SceneRegistry, SimulationState};
use show_telemetry::ShowMetrics;
use std::sync::Arc;
use std::time::Instant;

pub struct ShowSink {
    scene: SceneRegistry,
    metrics: Arc<ShowMetrics>,
}

impl ShowSink {
    pub fn new(metrics: Arc<ShowMetrics>) -> Self {
        Self {
            scene: SceneRegistry::new(),
            metrics,
        }
    }

    pub fn scene(&self) -> &SceneRegistry {
        &self.scene
    }
}

impl FrameSink for ShowSink {
    fn render(&mut self, state: &SimulationState, drones: &[DronePosition]) {
        let started = Instant::now();
        self.scene.render(state, drones);
        self.metrics
            .record_frame(state, drones.len(), started.elapsed().as_secs_f64());
    }
}

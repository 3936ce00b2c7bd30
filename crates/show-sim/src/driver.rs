//! Frame driver
//!
//! Pumps a shared [`ShowTimeline`] on a fixed interval and hands every
//! produced frame to a [`FrameSink`]. Frames never overlap: the next tick is
//! only awaited once the previous frame has been rendered.

use parking_lot::Mutex;
use show_core::DronePosition;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::timeline::{ShowTimeline, SimulationState};

/// Timeline shared between the driver and whoever issues playback controls
pub type SharedTimeline = Arc<Mutex<ShowTimeline>>;

/// Default frame interval, roughly 60 frames per second
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Render collaborator fed with every frame
#[cfg_attr(test, mockall::automock)]
pub trait FrameSink: Send {
    fn render(&mut self, state: &SimulationState, drones: &[DronePosition]);
}

/// Drives a timeline from a tokio interval
#[derive(Clone)]
pub struct FrameDriver {
    timeline: SharedTimeline,
    interval: Duration,
}

impl FrameDriver {
    pub fn new(timeline: SharedTimeline, interval: Duration) -> Self {
        Self { timeline, interval }
    }

    pub fn timeline(&self) -> &SharedTimeline {
        &self.timeline
    }

    /// Render frames until the timeline stops playing.
    ///
    /// Returns the number of frames rendered.
    pub async fn run<S: FrameSink>(&self, mut sink: S) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut frames = 0u64;

        info!("🎬 Frame driver started ({:?} interval)", self.interval);

        loop {
            ticker.tick().await;

            let keep_going = {
                let mut timeline = self.timeline.lock();
                if !timeline.is_playing() {
                    false
                } else {
                    if timeline.tick(Instant::now().into_std()) {
                        sink.render(timeline.state(), timeline.drones());
                        frames += 1;
                    }
                    timeline.is_playing()
                }
            };

            if !keep_going {
                break;
            }
        }

        debug!("Frame driver stopped after {} frames", frames);
        frames
    }

    /// Run on a background task
    pub fn spawn<S: FrameSink + 'static>(self, sink: S) -> DriverHandle {
        let task = tokio::spawn(async move { self.run(sink).await });
        DriverHandle { task: Some(task) }
    }
}

/// Handle to a spawned frame driver. Dropping it cancels the driver.
#[derive(Debug)]
pub struct DriverHandle {
    task: Option<JoinHandle<u64>>,
}

impl DriverHandle {
    /// Stop scheduling frames. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Frame driver cancelled");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Wait for the driver to stop on its own.
    ///
    /// Returns the frame count, or `None` if it was cancelled.
    pub async fn finished(&mut self) -> Option<u64> {
        let task = self.task.take()?;
        task.await.ok()
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TimelineConfig;
    use crate::timeline::PlaybackState;
    use show_core::{DroneId, GeoPoint};
    use show_patterns::{create_circle, create_star};

    fn shared_timeline() -> SharedTimeline {
        let ids: Vec<DroneId> = (1..=6).map(|i| DroneId::new(format!("drone-{i}"))).collect();
        let center = GeoPoint::new(35.6762, 139.6503, 80.0);
        let formations = vec![
            create_star(center, 40.0, 3, &ids).unwrap(),
            create_circle(center, 35.0, &ids).unwrap(),
        ];
        let config = TimelineConfig {
            per_formation_secs: 1.0,
            seed: Some(5),
            ..Default::default()
        };
        Arc::new(Mutex::new(ShowTimeline::new(formations, config).unwrap()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_exits_when_not_playing() {
        let timeline = shared_timeline();
        let mut sink = MockFrameSink::new();
        sink.expect_render().never();

        let frames = FrameDriver::new(timeline, DEFAULT_FRAME_INTERVAL).run(sink).await;
        assert_eq!(frames, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_plays_to_the_end() {
        let timeline = shared_timeline();
        timeline.lock().play();

        let mut sink = MockFrameSink::new();
        sink.expect_render()
            .withf(|state, drones| state.current_time <= state.duration && drones.len() == 6)
            .returning(|_, _| ());

        let frames = FrameDriver::new(timeline.clone(), Duration::from_millis(250))
            .run(sink)
            .await;

        // one anchoring frame plus eight 250 ms steps over the 2 s show
        assert_eq!(frames, 9);
        let tl = timeline.lock();
        assert_eq!(tl.playback(), PlaybackState::Finished);
        assert_eq!(tl.state().current_time, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_the_driver() {
        let timeline = shared_timeline();
        timeline.lock().play();

        let mut sink = MockFrameSink::new();
        sink.expect_render().returning(|_, _| ());

        let mut handle = FrameDriver::new(timeline.clone(), Duration::from_millis(100)).spawn(sink);
        tokio::time::sleep(Duration::from_millis(450)).await;
        timeline.lock().pause();

        let frames = handle.finished().await;
        assert!(frames.is_some_and(|n| n >= 4));
        let time = timeline.lock().state().current_time;
        assert!(time > 0.0 && time < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let timeline = shared_timeline();
        timeline.lock().play();

        let mut sink = MockFrameSink::new();
        sink.expect_render().returning(|_, _| ());

        let mut handle = FrameDriver::new(timeline, Duration::from_millis(100)).spawn(sink);
        assert!(handle.is_running());

        handle.cancel();
        handle.cancel();
        assert!(!handle.is_running());
        assert_eq!(handle.finished().await, None);
    }
}

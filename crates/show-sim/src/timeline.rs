//! Show timeline playback
//!
//! A timeline owns an ordered list of formations and a virtual clock. Each
//! formation gets an equal slot of the total duration: it holds for the
//! first `hold_fraction` of that slot, then blends toward the next
//! formation for the remainder. The last formation never blends.
//!
//! Time only moves through [`ShowTimeline::advance`] (or
//! [`ShowTimeline::tick`], which derives the delta from a wall clock), so a
//! real frame driver and a test stepping simulated seconds exercise the same
//! code.

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use show_core::{CoreError, CoreResult, DronePosition, Formation};
use show_patterns::interpolate;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

use crate::TimelineConfig;
use crate::projection::{ProjectionStyle, project_formation};

/// Times this close to a slot boundary, in slots, count as the boundary
const SLOT_BOUNDARY_EPSILON: f64 = 1e-9;

/// Playback state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
    Finished,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "STOPPED"),
            PlaybackState::Playing => write!(f, "PLAYING"),
            PlaybackState::Paused => write!(f, "PAUSED"),
            PlaybackState::Finished => write!(f, "FINISHED"),
        }
    }
}

/// Snapshot of the playback clock
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    pub is_playing: bool,
    /// Seconds, always within [0, duration]
    pub current_time: f64,
    /// Seconds
    pub duration: f64,
    pub speed: f64,
    pub current_formation_index: usize,
    /// Progress through the current formation's slot, 0.0 - 1.0
    pub transition_progress: f64,
}

/// What the rendered drones show at the current instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShowPhase {
    /// Stationary at formation `index`
    Hold { index: usize },
    /// Blending from formation `from` to `from + 1`
    Transition { from: usize, progress: f64 },
    /// The last formation, shown at full progress
    Final { index: usize },
}

/// Called with the active formation and its index once per advanced frame
pub type FormationCallback = Box<dyn FnMut(&Formation, usize) + Send>;

/// Playback engine over an ordered formation sequence
pub struct ShowTimeline {
    formations: Vec<Formation>,
    config: TimelineConfig,
    state: SimulationState,
    playback: PlaybackState,
    phase: ShowPhase,
    drones: Vec<DronePosition>,
    rng: ChaCha8Rng,
    /// Wall-clock instant of the previous tick; reset whenever playback resumes
    clock_anchor: Option<Instant>,
    on_formation_change: Option<FormationCallback>,
}

impl ShowTimeline {
    /// Create a stopped timeline showing the first formation
    pub fn new(formations: Vec<Formation>, config: TimelineConfig) -> CoreResult<Self> {
        if formations.is_empty() {
            return Err(CoreError::EmptyTimeline);
        }
        config.validate()?;

        let mut rng = crate::seeded_rng(config.seed);
        let drones = project_formation(&formations[0], 1.0, ProjectionStyle::SHOW, &mut rng);
        let state = SimulationState {
            is_playing: false,
            current_time: 0.0,
            duration: formations.len() as f64 * config.per_formation_secs,
            speed: config.initial_speed.clamp(config.min_speed, config.max_speed),
            current_formation_index: 0,
            transition_progress: 0.0,
        };

        info!(
            "Show timeline created: {} formations, {:.1}s",
            formations.len(),
            state.duration
        );

        Ok(Self {
            formations,
            config,
            state,
            playback: PlaybackState::Stopped,
            phase: ShowPhase::Hold { index: 0 },
            drones,
            rng,
            clock_anchor: None,
            on_formation_change: None,
        })
    }

    pub fn formations(&self) -> &[Formation] {
        &self.formations
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    pub fn phase(&self) -> ShowPhase {
        self.phase
    }

    pub fn is_playing(&self) -> bool {
        self.playback == PlaybackState::Playing
    }

    /// Drones for the current instant
    pub fn drones(&self) -> &[DronePosition] {
        &self.drones
    }

    pub fn current_formation(&self) -> &Formation {
        &self.formations[self.state.current_formation_index]
    }

    pub fn duration(&self) -> f64 {
        self.state.duration
    }

    pub fn per_formation_duration(&self) -> f64 {
        self.state.duration / self.formations.len() as f64
    }

    /// Elapsed share of the whole show, 0 - 100
    pub fn progress_percent(&self) -> f64 {
        self.state.current_time / self.state.duration * 100.0
    }

    /// Register the formation-change callback, replacing any previous one
    pub fn on_formation_change(&mut self, callback: impl FnMut(&Formation, usize) + Send + 'static) {
        self.on_formation_change = Some(Box::new(callback));
    }

    pub fn clear_formation_callback(&mut self) {
        self.on_formation_change = None;
    }

    // ========================================================================
    // CONTROLS
    // ========================================================================

    /// Start or resume playback. A finished show rewinds first.
    pub fn play(&mut self) {
        if self.is_playing() {
            return;
        }
        if self.playback == PlaybackState::Finished {
            self.state.current_time = 0.0;
            self.render_at(0.0, false);
        }

        self.playback = PlaybackState::Playing;
        self.state.is_playing = true;
        self.clock_anchor = None;
        info!("Show playing from {:.2}s", self.state.current_time);
    }

    /// Freeze the clock. No-op unless playing.
    pub fn pause(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.playback = PlaybackState::Paused;
        self.state.is_playing = false;
        self.clock_anchor = None;
        info!("Show paused at {:.2}s", self.state.current_time);
    }

    /// Rewind to the first formation
    pub fn stop(&mut self) {
        self.playback = PlaybackState::Stopped;
        self.state.is_playing = false;
        self.state.current_time = 0.0;
        self.state.current_formation_index = 0;
        self.state.transition_progress = 0.0;
        self.clock_anchor = None;
        self.phase = ShowPhase::Hold { index: 0 };
        self.drones = project_formation(&self.formations[0], 1.0, ProjectionStyle::SHOW, &mut self.rng);
        info!("Show stopped");
    }

    /// Jump to `time` seconds, clamped to [0, duration], without advancing
    pub fn seek(&mut self, time: f64) -> CoreResult<()> {
        if time.is_nan() {
            return Err(CoreError::invalid_parameter("time", "must be a number"));
        }

        let time = time.clamp(0.0, self.state.duration);
        self.state.current_time = time;
        self.render_at(time, false);
        self.settle_idle();
        debug!("Seeked to {:.2}s", time);
        Ok(())
    }

    /// Change the playback multiplier, clamped to the configured bounds
    pub fn set_speed(&mut self, multiplier: f64) -> CoreResult<()> {
        if !multiplier.is_finite() {
            return Err(CoreError::invalid_parameter("speed", "must be finite"));
        }
        self.state.speed = multiplier.clamp(self.config.min_speed, self.config.max_speed);
        debug!("Playback speed set to {}x", self.state.speed);
        Ok(())
    }

    pub fn step_next(&mut self) {
        let index = (self.state.current_formation_index + 1).min(self.formations.len() - 1);
        self.jump_to_formation(index);
    }

    pub fn step_previous(&mut self) {
        let index = self.state.current_formation_index.saturating_sub(1);
        self.jump_to_formation(index);
    }

    // ========================================================================
    // FRAME ADVANCE
    // ========================================================================

    /// Advance using a wall-clock reading. The first tick after `play` only
    /// sets the reference instant.
    ///
    /// Returns true when a frame was produced.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.is_playing() {
            return false;
        }
        let delta = self
            .clock_anchor
            .map(|anchor| now.saturating_duration_since(anchor).as_secs_f64())
            .unwrap_or(0.0);
        self.clock_anchor = Some(now);
        self.advance(delta)
    }

    /// Advance simulated time by `delta_secs` of wall time scaled by speed.
    ///
    /// Returns true when a frame was produced; false when not playing.
    pub fn advance(&mut self, delta_secs: f64) -> bool {
        if !self.is_playing() {
            return false;
        }

        let delta = if delta_secs.is_finite() { delta_secs.max(0.0) } else { 0.0 };
        let time = self.state.current_time + delta * self.state.speed;

        if time >= self.state.duration {
            self.finish();
            return true;
        }

        self.state.current_time = time;
        self.render_at(time, true);
        true
    }

    fn finish(&mut self) {
        let last = self.formations.len() - 1;

        self.playback = PlaybackState::Finished;
        self.state.is_playing = false;
        self.state.current_time = self.state.duration;
        self.state.current_formation_index = last;
        self.state.transition_progress = 1.0;
        self.clock_anchor = None;
        self.phase = ShowPhase::Final { index: last };
        self.drones = project_formation(&self.formations[last], 1.0, ProjectionStyle::SHOW, &mut self.rng);
        info!("Show finished after {:.1}s", self.state.duration);
    }

    fn jump_to_formation(&mut self, index: usize) {
        let time = index as f64 * self.per_formation_duration();
        self.state.current_time = time;
        self.render_at(time, false);
        self.settle_idle();
    }

    /// Idle playback state implied by the current time
    fn settle_idle(&mut self) {
        if self.is_playing() {
            return;
        }
        self.playback = if self.state.current_time >= self.state.duration {
            PlaybackState::Finished
        } else if self.state.current_time == 0.0 && self.playback == PlaybackState::Stopped {
            PlaybackState::Stopped
        } else {
            PlaybackState::Paused
        };
    }

    /// Phase of formation slot `time` falls in, with the raw slot index and
    /// local progress through that slot
    fn evaluate(&self, time: f64) -> (usize, f64, ShowPhase) {
        let count = self.formations.len();
        let last = count - 1;

        if time >= self.state.duration {
            return (last, 1.0, ShowPhase::Final { index: last });
        }

        let per_formation = self.per_formation_duration();
        let slots = time / per_formation;
        let boundary = slots.round();
        // `k * per / per` can land just below k
        let (index, local) = if (slots - boundary).abs() < SLOT_BOUNDARY_EPSILON {
            (boundary as usize, 0.0)
        } else {
            (slots.floor() as usize, (time % per_formation) / per_formation)
        };
        let hold = self.config.hold_fraction;

        let phase = if index >= last {
            ShowPhase::Final { index: last }
        } else if local < hold {
            ShowPhase::Hold { index }
        } else {
            ShowPhase::Transition {
                from: index,
                progress: (local - hold) / (1.0 - hold),
            }
        };
        (index, local, phase)
    }

    fn render_at(&mut self, time: f64, notify: bool) {
        let (index, local, phase) = self.evaluate(time);
        let previous = self.state.current_formation_index;

        self.state.current_formation_index = index.min(self.formations.len() - 1);
        self.state.transition_progress = local;
        self.phase = phase;
        self.drones = render_phase(&self.formations, phase, &mut self.rng);

        if self.state.current_formation_index != previous {
            debug!(
                "Formation {} -> {} ({})",
                previous,
                self.state.current_formation_index,
                self.current_formation().name
            );
        }

        if notify && index < self.formations.len() {
            if let Some(callback) = self.on_formation_change.as_mut() {
                callback(&self.formations[index], index);
            }
        }
    }
}

fn render_phase(formations: &[Formation], phase: ShowPhase, rng: &mut ChaCha8Rng) -> Vec<DronePosition> {
    match phase {
        ShowPhase::Hold { index } | ShowPhase::Final { index } => {
            project_formation(&formations[index], 1.0, ProjectionStyle::SHOW, rng)
        }
        ShowPhase::Transition { from, progress } => {
            let blended = interpolate(&formations[from], &formations[from + 1], progress);
            project_formation(&blended, 1.0, ProjectionStyle::SHOW, rng)
        }
    }
}

impl fmt::Debug for ShowTimeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShowTimeline")
            .field("formations", &self.formations.len())
            .field("state", &self.state)
            .field("playback", &self.playback)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rand::SeedableRng;
    use show_core::{DroneId, GeoPoint};
    use show_patterns::{create_circle, create_star, create_triangle};
    use std::sync::Arc;
    use std::time::Duration;

    fn ids(n: usize) -> Vec<DroneId> {
        (1..=n).map(|i| DroneId::new(format!("drone-{i}"))).collect()
    }

    fn formations() -> Vec<Formation> {
        let center = GeoPoint::new(35.6762, 139.6503, 80.0);
        vec![
            create_star(center, 40.0, 5, &ids(10)).unwrap(),
            create_triangle(GeoPoint::new(35.6763, 139.6504, 100.0), 60.0, &ids(10)).unwrap(),
            create_circle(center, 35.0, &ids(10)).unwrap(),
        ]
    }

    fn timeline() -> ShowTimeline {
        let config = TimelineConfig {
            seed: Some(42),
            ..Default::default()
        };
        ShowTimeline::new(formations(), config).unwrap()
    }

    fn positions(drones: &[DronePosition]) -> Vec<[f64; 3]> {
        drones.iter().map(|d| d.point().to_array()).collect()
    }

    fn expected(formation: &Formation) -> Vec<[f64; 3]> {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        positions(&project_formation(formation, 1.0, ProjectionStyle::SHOW, &mut rng))
    }

    #[test]
    fn test_new_timeline_is_stopped_on_first_formation() {
        let tl = timeline();

        assert_eq!(tl.playback(), PlaybackState::Stopped);
        assert_eq!(tl.duration(), 15.0);
        assert_eq!(tl.per_formation_duration(), 5.0);
        assert_eq!(positions(tl.drones()), expected(&tl.formations()[0]));
        assert!(matches!(
            ShowTimeline::new(Vec::new(), TimelineConfig::default()),
            Err(CoreError::EmptyTimeline)
        ));
    }

    #[test]
    fn test_transition_begins_at_hold_boundary() {
        let mut tl = timeline();
        let f = tl.formations().to_vec();

        tl.seek(3.9).unwrap();
        assert_eq!(tl.phase(), ShowPhase::Hold { index: 0 });
        assert_eq!(positions(tl.drones()), expected(&f[0]));

        tl.seek(4.0).unwrap();
        assert_eq!(tl.phase(), ShowPhase::Transition { from: 0, progress: 0.0 });
        assert_eq!(positions(tl.drones()), expected(&interpolate(&f[0], &f[1], 0.0)));

        tl.seek(5.0).unwrap();
        assert_eq!(tl.phase(), ShowPhase::Hold { index: 1 });
        assert_eq!(tl.state().current_formation_index, 1);
        let at_end = expected(&interpolate(&f[0], &f[1], 1.0));
        for (got, want) in positions(tl.drones()).iter().zip(&at_end) {
            for axis in 0..3 {
                assert!((got[axis] - want[axis]).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_transition_midpoint() {
        let mut tl = timeline();
        let f = tl.formations().to_vec();

        tl.seek(4.5).unwrap();
        match tl.phase() {
            ShowPhase::Transition { from, progress } => {
                assert_eq!(from, 0);
                assert!((progress - 0.5).abs() < 1e-9);
            }
            other => panic!("expected transition, got {other:?}"),
        }
        let mid = expected(&interpolate(&f[0], &f[1], 0.5));
        for (got, want) in positions(tl.drones()).iter().zip(&mid) {
            assert!((got[0] - want[0]).abs() < 1e-9);
            assert!((got[2] - want[2]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_last_formation_never_transitions() {
        let mut tl = timeline();
        let f = tl.formations().to_vec();

        tl.seek(14.9).unwrap();
        assert_eq!(tl.phase(), ShowPhase::Final { index: 2 });
        assert_eq!(positions(tl.drones()), expected(&f[2]));
    }

    #[test]
    fn test_seek_clamps() {
        let mut tl = timeline();

        tl.seek(-5.0).unwrap();
        assert_eq!(tl.state().current_time, 0.0);

        tl.seek(tl.duration() + 100.0).unwrap();
        assert_eq!(tl.state().current_time, 15.0);
        assert_eq!(tl.playback(), PlaybackState::Finished);
        assert_eq!(tl.state().current_formation_index, 2);

        assert!(tl.seek(f64::NAN).is_err());
    }

    #[test]
    fn test_advance_only_while_playing() {
        let mut tl = timeline();
        assert!(!tl.advance(1.0));
        assert_eq!(tl.state().current_time, 0.0);

        tl.play();
        assert!(tl.advance(1.0));
        assert!((tl.state().current_time - 1.0).abs() < 1e-12);

        tl.pause();
        assert_eq!(tl.playback(), PlaybackState::Paused);
        assert!(!tl.advance(1.0));
        assert!((tl.state().current_time - 1.0).abs() < 1e-12);

        tl.play();
        tl.advance(0.5);
        assert!((tl.state().current_time - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_speed_scales_advance_and_is_clamped() {
        let mut tl = timeline();
        tl.set_speed(2.0).unwrap();
        tl.play();
        tl.advance(1.5);
        assert!((tl.state().current_time - 3.0).abs() < 1e-12);

        tl.set_speed(50.0).unwrap();
        assert_eq!(tl.state().speed, 5.0);
        tl.set_speed(0.0).unwrap();
        assert_eq!(tl.state().speed, 0.1);
        assert!(tl.set_speed(f64::INFINITY).is_err());
    }

    #[test]
    fn test_reaching_the_end_finishes() {
        let mut tl = timeline();
        tl.play();
        tl.advance(20.0);

        assert_eq!(tl.playback(), PlaybackState::Finished);
        assert!(!tl.state().is_playing);
        assert_eq!(tl.state().current_time, 15.0);
        assert_eq!(tl.state().transition_progress, 1.0);
        assert!(!tl.advance(1.0));

        // Playing a finished show starts over
        tl.play();
        assert_eq!(tl.state().current_time, 0.0);
        assert!(tl.is_playing());
    }

    #[test]
    fn test_stop_resets_to_first_formation() {
        let mut tl = timeline();
        tl.play();
        tl.advance(7.0);
        tl.stop();

        assert_eq!(tl.playback(), PlaybackState::Stopped);
        assert_eq!(tl.state().current_time, 0.0);
        assert_eq!(tl.state().current_formation_index, 0);
        assert_eq!(positions(tl.drones()), expected(&tl.formations()[0]));

        // stopping twice is harmless
        tl.stop();
        tl.pause();
        assert_eq!(tl.playback(), PlaybackState::Stopped);
    }

    #[test]
    fn test_step_next_and_previous_clamp() {
        let mut tl = timeline();

        tl.step_next();
        assert_eq!(tl.state().current_formation_index, 1);
        assert_eq!(tl.state().current_time, 5.0);
        assert_eq!(tl.playback(), PlaybackState::Paused);

        tl.step_next();
        tl.step_next();
        assert_eq!(tl.state().current_formation_index, 2);
        assert_eq!(tl.state().current_time, 10.0);

        tl.step_previous();
        tl.step_previous();
        tl.step_previous();
        assert_eq!(tl.state().current_formation_index, 0);
        assert_eq!(tl.state().current_time, 0.0);
    }

    fn short_slot_timeline(per_formation_secs: f64) -> ShowTimeline {
        let center = GeoPoint::new(35.6762, 139.6503, 80.0);
        let formations = (0..4)
            .map(|i| create_circle(center, 20.0 + 5.0 * i as f64, &ids(6)).unwrap())
            .collect();
        let config = TimelineConfig {
            per_formation_secs,
            seed: Some(7),
            ..Default::default()
        };
        ShowTimeline::new(formations, config).unwrap()
    }

    #[test]
    fn test_step_next_reaches_last_formation_with_inexact_slot() {
        for per in [0.7, 0.35, 3.3, 6.1] {
            let mut tl = short_slot_timeline(per);

            for expected_index in 1..=3 {
                tl.step_next();
                assert_eq!(tl.state().current_formation_index, expected_index, "slot {per}s");
            }
            assert_eq!(tl.phase(), ShowPhase::Final { index: 3 });

            tl.step_next();
            tl.step_next();
            assert_eq!(tl.state().current_formation_index, 3, "slot {per}s");

            for expected_index in (0..3).rev() {
                tl.step_previous();
                assert_eq!(tl.state().current_formation_index, expected_index, "slot {per}s");
                assert_eq!(tl.phase(), ShowPhase::Hold { index: expected_index });
            }
        }
    }

    #[test]
    fn test_seek_to_slot_boundary_with_inexact_slot() {
        let mut tl = short_slot_timeline(0.7);

        for k in 1..4 {
            tl.seek(k as f64 * 0.7).unwrap();
            assert_eq!(tl.state().current_formation_index, k);
            assert_eq!(tl.state().transition_progress, 0.0);
        }
        assert_eq!(tl.phase(), ShowPhase::Final { index: 3 });

        tl.seek(2.0 * 0.7 - 0.01).unwrap();
        assert_eq!(tl.state().current_formation_index, 1);
        assert!(matches!(tl.phase(), ShowPhase::Transition { from: 1, .. }));
    }

    #[test]
    fn test_callback_fires_once_per_frame() {
        let mut tl = timeline();
        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        tl.on_formation_change(move |_, index| sink.lock().push(index));

        tl.seek(6.0).unwrap();
        assert!(seen.lock().is_empty());

        tl.play();
        tl.advance(1.0);
        tl.advance(2.5);
        tl.advance(100.0);

        assert_eq!(*seen.lock(), vec![1, 1]);
    }

    #[test]
    fn test_tick_uses_wall_clock_deltas() {
        let mut tl = timeline();
        let start = Instant::now();

        assert!(!tl.tick(start));
        tl.play();
        assert!(tl.tick(start));
        assert_eq!(tl.state().current_time, 0.0);

        tl.tick(start + Duration::from_millis(1500));
        assert!((tl.state().current_time - 1.5).abs() < 1e-9);

        // pausing drops the reference so paused wall time is not counted
        tl.pause();
        tl.play();
        tl.tick(start + Duration::from_secs(10));
        tl.tick(start + Duration::from_millis(10_500));
        assert!((tl.state().current_time - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_state_serializes_camel_case() {
        let tl = timeline();
        let json = serde_json::to_string(tl.state()).unwrap();
        assert!(json.contains("\"isPlaying\":false"));
        assert!(json.contains("\"currentFormationIndex\":0"));
        assert!(json.contains("\"transitionProgress\""));
    }
}

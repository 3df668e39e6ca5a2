use crate::runner::{Notice, Presenter, WheelResponse};
use crate::trial::TrialPlan;
use cuex_core::{Stimulus, StimulusSet, TargetDuration};
use cuex_timing::Timer;
use rand::Rng;
use std::ops::ControlFlow;
use std::time::Duration;
use tracing::debug;

const MAX_ERROR_DEG: f64 = 180.0;

/// A participant stand-in for piloting and tests.
///
/// Colour judgements get worse as the target gets shorter: the absolute
/// error is uniform on `0..=2 * expected_error(duration)`. Response latency
/// is spent on the shared timer.
pub struct SimulatedObserver<T: Timer, R: Rng> {
    timer: T,
    rng: R,
    /// Scales the expected error; 1.0 settles around 100 ms. Negative or
    /// NaN values answer perfectly, huge ones at random.
    pub skill: f64,
    pub rt_range_ms: (f64, f64),
    pub notices: Vec<Notice>,
    pub stimuli_shown: usize,
    pub volume: f32,
}

impl<T: Timer, R: Rng> SimulatedObserver<T, R> {
    pub fn new(timer: T, rng: R, skill: f64) -> Self {
        Self {
            timer,
            rng,
            skill,
            rt_range_ms: (450.0, 1200.0),
            notices: Vec::new(),
            stimuli_shown: 0,
            volume: 0.0,
        }
    }

    pub fn expected_error(&self, duration: TargetDuration) -> f64 {
        let base = match duration {
            TargetDuration::Ms33 => 70.0,
            TargetDuration::Ms67 => 45.0,
            TargetDuration::Ms100 => 35.0,
            TargetDuration::Ms150 => 25.0,
        };
        // Angular errors cannot exceed 180 degrees.
        (self.skill.max(0.0) * base).min(MAX_ERROR_DEG)
    }
}

impl<T: Timer, R: Rng> Presenter for SimulatedObserver<T, R> {
    fn load_stimuli(&mut self, stimuli: &StimulusSet) {
        debug!(
            target_deg = stimuli.target_size_deg,
            wheel_deg = stimuli.wheel_diameter_deg,
            mask_cell_deg = stimuli.mask_cell_deg(),
            "stimuli loaded"
        );
    }

    fn show(&mut self, stimulus: &Stimulus) {
        self.stimuli_shown += 1;
        debug!(stimulus = stimulus.kind(), "show");
    }

    fn start_noise(&mut self, plan: &TrialPlan, duration: Duration, volume: f32) {
        self.volume = volume;
        debug!(trial = plan.number, ?duration, volume, "noise started");
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn stop_noise(&mut self) {
        self.volume = 0.0;
    }

    fn collect_response(
        &mut self,
        plan: &TrialPlan,
        _wheel: &Stimulus,
        timeout: Duration,
    ) -> Option<WheelResponse> {
        let target = plan.target.as_ref()?;
        let (lo, hi) = self.rt_range_ms;
        let rt = Duration::from_secs_f64(self.rng.random_range(lo..=hi.max(lo)) / 1000.0);
        if rt > timeout {
            self.timer.sleep(timeout);
            return None;
        }
        self.timer.sleep(rt);

        let spread = 2.0 * self.expected_error(plan.target_duration);
        let magnitude = self.rng.random_range(0.0..=spread);
        let sign = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
        Some(WheelResponse {
            hue_deg: (target.hue_deg + sign * magnitude).rem_euclid(360.0),
        })
    }

    fn notice(&mut self, notice: Notice) -> ControlFlow<()> {
        debug!(?notice, "notice acknowledged");
        self.notices.push(notice);
        ControlFlow::Continue(())
    }
}

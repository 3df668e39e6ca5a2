use crate::config::ExperimentConfig;
use crate::error::SessionError;
use crate::trial::{Discrimination, TrialEvent, TrialPlan};
use cuex_core::{angular_error, Measure, Stimulus, StimulusSet, TrialRecord, TrialState};
use cuex_timing::{wait_until, Timer};
use std::ops::ControlFlow;
use std::time::Duration;
use tracing::debug;

/// Full-screen messages shown between trials or blocks. Each waits for the
/// participant to acknowledge it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Welcome,
    MorePractice,
    PracticeComplete,
    BlockBreak,
    QuarterBreak,
    /// Performance stayed too poor at the longest target duration.
    Abort,
}

impl Notice {
    pub fn text(self) -> &'static str {
        match self {
            Notice::Welcome => {
                "Welcome to the task.\n\
                 Use the warning sounds to prepare for the interval the cue indicates.\n\
                 Respond as quickly as you can, and pick the target colour as accurately as you can.\n\
                 Press any key to begin."
            }
            Notice::MorePractice => "Let's practise a little more.\nPress any key to continue.",
            Notice::PracticeComplete => {
                "Practice is complete. If you have any questions, ask your experimenter.\n\
                 Press any key to begin the experiment."
            }
            Notice::BlockBreak => {
                "Take a break! You have finished a block of trials.\nPress any key to continue."
            }
            Notice::QuarterBreak => "Good job!\nTake a break!\nPress any key to continue...",
            Notice::Abort => {
                "The task cannot continue.\nPlease let the researcher know you have finished."
            }
        }
    }
}

/// A colour picked on the wheel, as a hue in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelResponse {
    pub hue_deg: f64,
}

/// Host display, audio and input.
///
/// The session only describes what should happen; drawing, mixing and
/// reading devices are up to the implementation.
pub trait Presenter {
    /// Called once before the first block so the host can size its assets.
    fn load_stimuli(&mut self, _stimuli: &StimulusSet) {}

    fn show(&mut self, stimulus: &Stimulus);

    /// Starts the trial's noise track at `volume`, long enough to cover
    /// `duration`.
    fn start_noise(&mut self, plan: &TrialPlan, duration: Duration, volume: f32);
    fn set_volume(&mut self, volume: f32);
    fn stop_noise(&mut self);

    /// Shows `wheel` with a cursor until a colour is picked or `timeout`
    /// passes.
    fn collect_response(
        &mut self,
        plan: &TrialPlan,
        wheel: &Stimulus,
        timeout: Duration,
    ) -> Option<WheelResponse>;

    /// Shows `notice` and waits for acknowledgement. `Break` ends the session.
    fn notice(&mut self, notice: Notice) -> ControlFlow<()>;

    /// Processes pending host input while the session waits.
    fn pump(&mut self) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

fn wait_for<T, P>(
    plan: &TrialPlan,
    event: TrialEvent,
    timer: &T,
    presenter: &mut P,
    slice: Duration,
) -> Result<u64, SessionError>
where
    T: Timer,
    P: Presenter + ?Sized,
{
    match plan
        .schedule
        .wait_for(event, timer, slice, || presenter.pump())?
    {
        ControlFlow::Continue(()) => {
            let now = timer.now();
            debug!(
                block = plan.block,
                trial = plan.number,
                event = event.label(),
                state = ?plan.state,
                late_us = now.saturating_sub(plan.schedule.deadline(event)?) / 1_000,
                "event"
            );
            Ok(now)
        }
        ControlFlow::Break(()) => Err(SessionError::Interrupted),
    }
}

/// Runs one trial from cue onset to the end of the response period.
pub fn run_trial<T, P>(
    plan: &mut TrialPlan,
    timer: &T,
    presenter: &mut P,
    config: &ExperimentConfig,
) -> Result<TrialRecord, SessionError>
where
    T: Timer,
    P: Presenter + ?Sized,
{
    let slice = config.poll_interval();

    presenter.start_noise(plan, plan.noise_duration(config), plan.alert.base);
    presenter.show(&Stimulus::Cue(plan.factors.cue_value));
    let start = timer.now();
    plan.schedule.start(start);
    plan.timestamps.start = start;
    plan.state = TrialState::PreCue;

    wait_for(plan, TrialEvent::PlayAlertingSignal, timer, presenter, slice)?;
    presenter.set_volume(plan.alert.cue);
    plan.state = TrialState::Alerting;

    wait_for(plan, TrialEvent::StopAlertingSignal, timer, presenter, slice)?;
    presenter.set_volume(plan.alert.base);
    plan.state = TrialState::PostCue;

    let target_on = wait_for(plan, TrialEvent::TargetOn, timer, presenter, slice)?;

    let discrimination = match plan.target.clone() {
        None => None,
        Some(target) => {
            presenter.show(&Stimulus::Target { rgb: target.rgb });
            plan.timestamps.target_on = Some(target_on);
            plan.state = TrialState::Target;

            wait_for(plan, TrialEvent::MaskOn, timer, presenter, slice)?;
            presenter.show(&Stimulus::Mask(target.mask.clone()));
            plan.state = TrialState::Mask;

            let onset = wait_for(plan, TrialEvent::ResponsePeriod, timer, presenter, slice)?;
            plan.timestamps.response_period = Some(onset);
            plan.state = TrialState::Response;

            let wheel = Stimulus::Wheel {
                rotation_deg: target.wheel_rotation_deg,
            };
            let timeout = Duration::from_millis(config.discrimination_timeout_ms);
            let response = presenter.collect_response(plan, &wheel, timeout);
            let answered = timer.now();
            let rt = timer.elapsed(onset);

            Some(match response {
                Some(r) if rt <= timeout => {
                    plan.timestamps.response = Some(answered);
                    Discrimination {
                        rt: Measure::Value(rt.as_secs_f64() * 1000.0),
                        error: Measure::Value(angular_error(r.hue_deg, target.hue_deg)),
                    }
                }
                _ => Discrimination::timeout(),
            })
        }
    };

    plan.state = TrialState::Complete;
    let record = plan.record(discrimination);
    let stamps = &plan.timestamps;
    let since_start = |ts: Option<u64>| ts.map(|t| t.saturating_sub(stamps.start) / 1_000_000);
    debug!(
        block = plan.block,
        trial = plan.number,
        catch = plan.is_catch(),
        error = ?record.error_deg(),
        target_on_ms = ?since_start(stamps.target_on),
        response_period_ms = ?since_start(stamps.response_period),
        response_ms = ?since_start(stamps.response),
        "trial complete"
    );
    Ok(record)
}

/// Shows the fixation cross for the inter-trial interval, then silences the
/// noise track.
pub fn trial_clean_up<T, P>(
    timer: &T,
    presenter: &mut P,
    config: &ExperimentConfig,
) -> Result<(), SessionError>
where
    T: Timer,
    P: Presenter + ?Sized,
{
    presenter.show(&Stimulus::Fixation);
    let deadline = timer.now() + config.inter_trial_interval_ms * 1_000_000;
    let flow = wait_until(timer, deadline, config.poll_interval(), || presenter.pump());
    presenter.stop_noise();
    match flow {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(()) => Err(SessionError::Interrupted),
    }
}

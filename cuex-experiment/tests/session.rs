use cuex_core::{Stimulus, StimulusSet, TargetDuration, TrialState};
use cuex_experiment::{
    CheckError, ExperimentConfig, MissingErrorPolicy, Notice, Outcome, Presenter, Session,
    SessionError, TrialEvent, TrialPlan, WheelResponse,
};
use cuex_timing::{SimulatedTimer, Timer};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::ops::ControlFlow;
use std::time::Duration;

/// Answers every target with a fixed signed error and records what it was
/// asked to do.
struct ScriptedPresenter {
    timer: SimulatedTimer,
    error_deg: f64,
    /// Per-block overrides of `error_deg`.
    block_errors: Vec<(u32, f64)>,
    respond: bool,
    rt: Duration,
    notices: Vec<Notice>,
    /// Remaining pumps before the host asks to stop.
    pump_budget: Option<usize>,
    quit_on_notice: Option<Notice>,
    target_shown_at: Option<u64>,
    mask_shown_at: Option<u64>,
    /// (target duration, target onset, mask onset, scheduled target onset)
    flashes: Vec<(TargetDuration, u64, u64, u64)>,
    stimuli: Option<StimulusSet>,
}

impl ScriptedPresenter {
    fn new(timer: SimulatedTimer, error_deg: f64) -> Self {
        Self {
            timer,
            error_deg,
            block_errors: Vec::new(),
            respond: true,
            rt: Duration::from_millis(600),
            notices: Vec::new(),
            pump_budget: None,
            quit_on_notice: None,
            target_shown_at: None,
            mask_shown_at: None,
            flashes: Vec::new(),
            stimuli: None,
        }
    }

    fn error_for(&self, block: u32) -> f64 {
        self.block_errors
            .iter()
            .find(|(b, _)| *b == block)
            .map_or(self.error_deg, |(_, e)| *e)
    }

    fn count(&self, notice: Notice) -> usize {
        self.notices.iter().filter(|n| **n == notice).count()
    }
}

impl Presenter for ScriptedPresenter {
    fn load_stimuli(&mut self, stimuli: &StimulusSet) {
        self.stimuli = Some(stimuli.clone());
    }

    fn show(&mut self, stimulus: &Stimulus) {
        match stimulus {
            Stimulus::Target { .. } => self.target_shown_at = Some(self.timer.now()),
            Stimulus::Mask(_) => self.mask_shown_at = Some(self.timer.now()),
            _ => {}
        }
    }

    fn start_noise(&mut self, _plan: &TrialPlan, _duration: Duration, _volume: f32) {}

    fn set_volume(&mut self, _volume: f32) {}

    fn stop_noise(&mut self) {}

    fn collect_response(
        &mut self,
        plan: &TrialPlan,
        _wheel: &Stimulus,
        timeout: Duration,
    ) -> Option<WheelResponse> {
        let target = plan.target.as_ref().expect("wheel shown on a catch trial");
        assert_eq!(plan.state, TrialState::Response);
        assert_eq!(plan.timestamps.target_on, self.target_shown_at);
        self.flashes.push((
            plan.target_duration,
            self.target_shown_at.take().expect("target shown"),
            self.mask_shown_at.take().expect("mask shown"),
            plan.schedule.deadline(TrialEvent::TargetOn).unwrap(),
        ));
        if !self.respond {
            self.timer.sleep(timeout);
            return None;
        }
        self.timer.sleep(self.rt);
        Some(WheelResponse {
            hue_deg: (target.hue_deg + self.error_for(plan.block)).rem_euclid(360.0),
        })
    }

    fn notice(&mut self, notice: Notice) -> ControlFlow<()> {
        self.notices.push(notice);
        if self.quit_on_notice == Some(notice) {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    fn pump(&mut self) -> ControlFlow<()> {
        match self.pump_budget.as_mut() {
            Some(0) => ControlFlow::Break(()),
            Some(n) => {
                *n -= 1;
                ControlFlow::Continue(())
            }
            None => ControlFlow::Continue(()),
        }
    }
}

fn small_config() -> ExperimentConfig {
    ExperimentConfig {
        trials_per_practice_block: 4,
        blocks_per_experiment: 2,
        trials_per_block: 8,
        inter_trial_interval_ms: 200,
        poll_interval_ms: 5,
        ..ExperimentConfig::default()
    }
}

fn session(config: ExperimentConfig, timer: &SimulatedTimer) -> Session<SimulatedTimer, StdRng> {
    Session::new(7, config, timer.clone(), StdRng::seed_from_u64(42))
}

#[test]
fn mid_range_error_keeps_initial_duration() {
    let timer = SimulatedTimer::new();
    let mut session = session(small_config(), &timer);
    let mut presenter = ScriptedPresenter::new(timer.clone(), 40.0);

    let summary = session.run(&mut presenter).unwrap();

    assert_eq!(summary.outcome, Outcome::Completed);
    assert_eq!(summary.practice_blocks, 1);
    assert_eq!(summary.final_target_duration, TargetDuration::Ms100);
    assert_eq!(summary.trials_run, 4 + 2 * 8);
    assert_eq!(summary.checks.len(), 1);
    assert!((summary.checks[0].mean_error - 40.0).abs() < 1e-6);
    assert_eq!(
        presenter.notices[..2],
        [Notice::Welcome, Notice::PracticeComplete]
    );
    assert_eq!(presenter.count(Notice::BlockBreak), 1);
    assert_eq!(presenter.stimuli, Some(StimulusSet::default()));
}

#[test]
fn low_error_steps_down_to_shortest_duration() {
    let timer = SimulatedTimer::new();
    let mut session = session(small_config(), &timer);
    let mut presenter = ScriptedPresenter::new(timer.clone(), -20.0);

    let summary = session.run(&mut presenter).unwrap();

    let path: Vec<(TargetDuration, TargetDuration)> = summary
        .checks
        .iter()
        .map(|c| (c.prior, c.decision.next))
        .collect();
    assert_eq!(
        path,
        [
            (TargetDuration::Ms100, TargetDuration::Ms67),
            (TargetDuration::Ms67, TargetDuration::Ms33),
            (TargetDuration::Ms33, TargetDuration::Ms33),
        ]
    );
    assert_eq!(summary.practice_blocks, 3);
    assert_eq!(presenter.count(Notice::MorePractice), 2);

    // Inserted practice blocks push the test blocks back.
    let records = session.results();
    let test_blocks: Vec<u32> = records.iter().filter(|r| !r.practice).map(|r| r.block).collect();
    assert_eq!(test_blocks.first(), Some(&4));
    assert_eq!(test_blocks.last(), Some(&5));
    assert!(records
        .iter()
        .filter(|r| !r.practice)
        .all(|r| r.target_duration == TargetDuration::Ms33));
}

#[test]
fn high_error_at_longest_duration_aborts() {
    let timer = SimulatedTimer::new();
    let mut session = session(small_config(), &timer);
    let mut presenter = ScriptedPresenter::new(timer.clone(), 60.0);

    let summary = session.run(&mut presenter).unwrap();

    assert_eq!(summary.outcome, Outcome::Aborted);
    assert_eq!(summary.final_target_duration, TargetDuration::Ms150);
    assert_eq!(summary.checks.len(), 2);
    assert!(summary.checks[1].decision.abort);
    assert_eq!(presenter.notices.last(), Some(&Notice::Abort));
    assert!(session.results().iter().all(|r| r.practice));
    assert_eq!(session.results().len(), 8);
}

#[test]
fn unanswered_block_counts_as_zero_error() {
    let timer = SimulatedTimer::new();
    let mut session = session(small_config(), &timer);
    let mut presenter = ScriptedPresenter::new(timer.clone(), 0.0);
    presenter.respond = false;

    let summary = session.run(&mut presenter).unwrap();

    assert_eq!(summary.outcome, Outcome::Completed);
    assert_eq!(summary.checks[0].mean_error, 0.0);
    assert_eq!(summary.checks[0].decision.next, TargetDuration::Ms67);
    assert_eq!(summary.final_target_duration, TargetDuration::Ms33);
    let first = &session.results()[0];
    assert_eq!(first.rt_ms(), None);
    assert_eq!(first.error_deg(), None);
    assert!(!first.is_catch());
}

#[test]
fn unanswered_block_fails_when_surfaced() {
    let timer = SimulatedTimer::new();
    let config = ExperimentConfig {
        missing_error_policy: MissingErrorPolicy::Surface,
        ..small_config()
    };
    let mut session = session(config, &timer);
    let mut presenter = ScriptedPresenter::new(timer.clone(), 0.0);
    presenter.respond = false;

    let err = session.run(&mut presenter).unwrap_err();

    assert!(matches!(
        err,
        SessionError::Check(CheckError::NoPerformanceData {
            participant_id: 7,
            block: 1
        })
    ));
    assert_eq!(session.results().len(), 4);
    assert_eq!(session.target_duration(), TargetDuration::Ms100);
}

#[test]
fn host_can_interrupt_while_waiting() {
    let timer = SimulatedTimer::new();
    let mut session = session(small_config(), &timer);
    let mut presenter = ScriptedPresenter::new(timer.clone(), 40.0);
    presenter.pump_budget = Some(50);

    let summary = session.run(&mut presenter).unwrap();

    assert_eq!(summary.outcome, Outcome::Interrupted);
    assert!(summary.trials_run < 4);
    assert!(summary.checks.is_empty());
}

#[test]
fn declining_a_notice_interrupts() {
    let timer = SimulatedTimer::new();
    let mut session = session(small_config(), &timer);
    let mut presenter = ScriptedPresenter::new(timer.clone(), 40.0);
    presenter.quit_on_notice = Some(Notice::PracticeComplete);

    let summary = session.run(&mut presenter).unwrap();

    assert_eq!(summary.outcome, Outcome::Interrupted);
    assert_eq!(summary.trials_run, 4);
    assert!(session.results().iter().all(|r| r.practice));
}

#[test]
fn test_blocks_pause_each_quarter() {
    let timer = SimulatedTimer::new();
    let mut session = session(small_config(), &timer);
    let mut presenter = ScriptedPresenter::new(timer.clone(), 40.0);

    session.run(&mut presenter).unwrap();

    // 8 trials per block: breaks before trials 3, 5 and 7.
    assert_eq!(presenter.count(Notice::QuarterBreak), 2 * 3);
}

#[test]
fn targets_flash_on_schedule() {
    let timer = SimulatedTimer::new();
    let mut session = session(small_config(), &timer);
    let mut presenter = ScriptedPresenter::new(timer.clone(), -20.0);

    session.run(&mut presenter).unwrap();

    assert!(!presenter.flashes.is_empty());
    for (duration, target_on, mask_on, scheduled) in &presenter.flashes {
        assert_eq!(target_on, scheduled);
        assert_eq!(
            Duration::from_nanos(mask_on - target_on),
            duration.as_duration()
        );
    }
    let durations: Vec<TargetDuration> = presenter.flashes.iter().map(|f| f.0).collect();
    assert!(durations.contains(&TargetDuration::Ms100));
    assert!(durations.contains(&TargetDuration::Ms67));
    assert!(durations.contains(&TargetDuration::Ms33));
}

#[test]
fn catch_trials_only_in_test_blocks() {
    let timer = SimulatedTimer::new();
    let config = ExperimentConfig {
        trials_per_practice_block: 40,
        trials_per_block: 80,
        ..small_config()
    };
    let mut session = session(config, &timer);
    let mut presenter = ScriptedPresenter::new(timer.clone(), 40.0);

    session.run(&mut presenter).unwrap();

    let records = session.results();
    assert!(records.iter().filter(|r| r.practice).all(|r| !r.is_catch()));
    let catch = records
        .iter()
        .find(|r| r.is_catch())
        .expect("a test block with catch trials");
    assert!(!catch.practice);
    assert_eq!(catch.ctoa_ms, 1600);

    let row = serde_json::to_value(catch).unwrap();
    assert_eq!(row["discrimination_error"], "catch");
    assert_eq!(row["discrimination_rt"], "catch");
    assert_eq!(row["target_rgb"], "catch");
    assert_eq!(row["cue_valid"], "catch");
    assert_eq!(row["ctoa"], 1600);
}

#[test]
fn each_check_sees_only_its_own_block() {
    let timer = SimulatedTimer::new();
    let mut session = session(small_config(), &timer);
    let mut presenter = ScriptedPresenter::new(timer.clone(), 40.0);
    presenter.block_errors = vec![(1, 10.0), (2, 45.0)];

    let summary = session.run(&mut presenter).unwrap();

    assert_eq!(summary.checks.len(), 2);
    assert_eq!(summary.checks[0].block, 1);
    assert!((summary.checks[0].mean_error - 10.0).abs() < 1e-6);
    assert_eq!(summary.checks[0].decision.next, TargetDuration::Ms67);
    assert_eq!(summary.checks[1].block, 2);
    assert!((summary.checks[1].mean_error - 45.0).abs() < 1e-6);
    assert_eq!(summary.checks[1].prior, TargetDuration::Ms67);
    assert_eq!(summary.final_target_duration, TargetDuration::Ms67);
}

#[test]
fn abort_ends_the_session_even_if_the_notice_is_declined() {
    let timer = SimulatedTimer::new();
    let mut session = session(small_config(), &timer);
    let mut presenter = ScriptedPresenter::new(timer.clone(), 60.0);
    presenter.quit_on_notice = Some(Notice::Abort);

    let summary = session.run(&mut presenter).unwrap();

    assert_eq!(summary.outcome, Outcome::Aborted);
    assert_eq!(presenter.notices.last(), Some(&Notice::Abort));
    assert!(session.results().iter().all(|r| r.practice));
}

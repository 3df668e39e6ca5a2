use crate::blocks::{BlockPlan, BlockScheduler, BlockSpec};
use crate::config::ExperimentConfig;
use crate::error::SessionError;
use crate::performance::{block_error, Cell, ErrorQuery, QueryError};
use crate::runner::{run_trial, trial_clean_up, Notice, Presenter};
use crate::staircase::Decision;
use crate::trial::{quarter_break_due, TrialPlan};
use cuex_core::{Catchable, Measure, Phase, SessionPhase, TargetDuration, TrialRecord};
use cuex_timing::Timer;
use rand::Rng;
use serde::Serialize;
use std::ops::ControlFlow;
use tracing::{error, info};

/// Mutable per-session values read by trial preparation.
///
/// `target_duration` is only ever written by the performance check.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub participant_id: u32,
    pub block_number: u32,
    pub trial_number: u32,
    pub practicing: bool,
    pub target_duration: TargetDuration,
}

/// In-memory trial log; answers performance queries for the staircase.
#[derive(Debug, Clone, Default)]
pub struct TrialStore {
    records: Vec<TrialRecord>,
}

impl TrialStore {
    pub fn push(&mut self, record: TrialRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ErrorQuery for TrialStore {
    fn discrimination_errors(
        &self,
        participant_id: u32,
        block: u32,
    ) -> Result<Vec<Cell>, QueryError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.participant_id == participant_id && r.block == block)
            .map(|r| match r.discrimination_error {
                Catchable::Value(Measure::Value(v)) => Cell::Number(v),
                Catchable::Value(Measure::Timeout) => Cell::Text(cuex_core::TIMEOUT_LABEL.into()),
                Catchable::Catch => Cell::Text(cuex_core::CATCH_LABEL.into()),
            })
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    /// Ended by the staircase at the longest duration.
    Aborted,
    /// Ended by the host.
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    Continue,
    Abort,
}

/// One staircase evaluation, kept for the session summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CheckLog {
    pub block: u32,
    pub prior: TargetDuration,
    pub mean_error: f64,
    pub decision: Decision,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub participant_id: u32,
    pub outcome: Outcome,
    pub trials_run: usize,
    pub practice_blocks: u32,
    pub final_target_duration: TargetDuration,
    pub checks: Vec<CheckLog>,
}

/// Top-level driver: owns the session context, block plan and trial log,
/// and runs blocks against a host [`Presenter`].
pub struct Session<T, R>
where
    T: Timer,
    R: Rng,
{
    phase: SessionPhase,
    ctx: SessionContext,
    config: ExperimentConfig,
    plan: BlockPlan,
    store: TrialStore,
    timer: T,
    rng: R,
    checks: Vec<CheckLog>,
    practice_blocks: u32,
    welcomed: bool,
}

impl<T, R> Session<T, R>
where
    T: Timer,
    R: Rng,
{
    pub fn new(participant_id: u32, config: ExperimentConfig, timer: T, rng: R) -> Self {
        Self {
            phase: SessionPhase::default(),
            ctx: SessionContext {
                participant_id,
                block_number: 0,
                trial_number: 0,
                practicing: false,
                target_duration: config.initial_target_duration,
            },
            plan: BlockPlan::from_config(&config),
            config,
            store: TrialStore::default(),
            timer,
            rng,
            checks: Vec::new(),
            practice_blocks: 0,
            welcomed: false,
        }
    }

    /// Runs every remaining block.
    pub fn run<P: Presenter + ?Sized>(
        &mut self,
        presenter: &mut P,
    ) -> Result<SessionSummary, SessionError> {
        info!(
            participant_id = self.ctx.participant_id,
            blocks = self.plan.len(),
            target_duration = %self.ctx.target_duration,
            "session started"
        );
        presenter.load_stimuli(&self.config.stimuli);

        let outcome = loop {
            let Some(block) = self.plan.next_block() else {
                break Outcome::Completed;
            };
            match self.run_block(block, presenter) {
                Ok(BlockOutcome::Continue) => {}
                Ok(BlockOutcome::Abort) => break Outcome::Aborted,
                Err(SessionError::Interrupted) => {
                    presenter.stop_noise();
                    break Outcome::Interrupted;
                }
                Err(e) => return Err(e),
            }
        };

        self.phase = SessionPhase::Debrief;
        let summary = self.summary(outcome);
        info!(
            outcome = ?summary.outcome,
            trials = summary.trials_run,
            practice_blocks = summary.practice_blocks,
            target_duration = %summary.final_target_duration,
            "session finished"
        );
        Ok(summary)
    }

    pub fn run_block<P: Presenter + ?Sized>(
        &mut self,
        block: BlockSpec,
        presenter: &mut P,
    ) -> Result<BlockOutcome, SessionError> {
        self.begin_block(block, presenter)?;
        debug_assert!(self.phase.runs_trials());

        let trials = block.draw_trials(&mut self.rng);
        for (i, factors) in trials.into_iter().enumerate() {
            self.ctx.trial_number = i as u32 + 1;
            if quarter_break_due(&self.ctx, &self.config) {
                acknowledge(presenter, Notice::QuarterBreak)?;
            }

            let mut plan = TrialPlan::prepare(&self.ctx, factors, &self.config, &mut self.rng)?;
            let record = run_trial(&mut plan, &self.timer, presenter, &self.config)?;
            self.store.push(record);
            trial_clean_up(&self.timer, presenter, &self.config)?;
        }

        if block.practice {
            return self.performance_check(presenter);
        }
        Ok(BlockOutcome::Continue)
    }

    fn begin_block<P: Presenter + ?Sized>(
        &mut self,
        block: BlockSpec,
        presenter: &mut P,
    ) -> Result<(), SessionError> {
        let notice = if block.practice {
            self.enter_phase(SessionPhase::Practice);
            self.practice_blocks += 1;
            if self.welcomed {
                Notice::MorePractice
            } else {
                Notice::Welcome
            }
        } else if !self.phase.is_testing() {
            let ran_practice = self.phase.is_practice();
            self.enter_phase(SessionPhase::Testing);
            if ran_practice {
                Notice::PracticeComplete
            } else {
                Notice::Welcome
            }
        } else {
            Notice::BlockBreak
        };
        self.welcomed = true;

        self.ctx.block_number = block.number;
        self.ctx.practicing = block.practice;
        self.ctx.trial_number = 0;
        info!(
            block = block.number,
            practice = block.practice,
            trials = block.trial_count,
            target_duration = %self.ctx.target_duration,
            "block started"
        );
        acknowledge(presenter, notice)
    }

    fn enter_phase(&mut self, phase: SessionPhase) {
        while self.phase != phase {
            match self.phase.next() {
                Some(next) => self.phase = next,
                None => break,
            }
        }
    }

    /// Feeds the block's mean error to the staircase and applies the
    /// decision: updates the target duration, queues another practice block,
    /// or ends the session.
    pub fn performance_check<P: Presenter + ?Sized>(
        &mut self,
        presenter: &mut P,
    ) -> Result<BlockOutcome, SessionError> {
        let block = self.ctx.block_number;
        let participant_id = self.ctx.participant_id;
        let prior = self.ctx.target_duration;
        info!(block, prior = %prior, "performance check");

        let mean_error = block_error(
            &self.store,
            participant_id,
            block,
            self.config.missing_error_policy,
        )
        .inspect_err(|e| error!(block, error = %e, "performance check failed"))?;

        let decision = self.config.thresholds.evaluate(mean_error, prior);
        self.ctx.target_duration = decision.next;
        self.checks.push(CheckLog {
            block,
            prior,
            mean_error,
            decision,
        });
        info!(
            block,
            mean_error,
            prior = %prior,
            next = %decision.next,
            more_practice = decision.continue_practicing,
            abort = decision.abort,
            "target duration adjusted"
        );

        if decision.abort {
            error!(
                block,
                mean_error,
                "error too high at the longest target duration, ending session"
            );
            // The session ends whether or not the notice is acknowledged.
            match presenter.notice(Notice::Abort) {
                ControlFlow::Continue(()) => info!("abort notice acknowledged"),
                ControlFlow::Break(()) => info!("abort notice dismissed by the host"),
            }
            return Ok(BlockOutcome::Abort);
        }
        if decision.continue_practicing {
            self.plan.insert_block(BlockSpec::practice(
                block + 1,
                self.config.trials_per_practice_block,
            ));
        }
        Ok(BlockOutcome::Continue)
    }

    pub fn summary(&self, outcome: Outcome) -> SessionSummary {
        SessionSummary {
            participant_id: self.ctx.participant_id,
            outcome,
            trials_run: self.store.len(),
            practice_blocks: self.practice_blocks,
            final_target_duration: self.ctx.target_duration,
            checks: self.checks.clone(),
        }
    }

    pub fn target_duration(&self) -> TargetDuration {
        self.ctx.target_duration
    }

    /// Experiment results
    pub fn results(&self) -> &[TrialRecord] {
        self.store.records()
    }
}

fn acknowledge<P: Presenter + ?Sized>(
    presenter: &mut P,
    notice: Notice,
) -> Result<(), SessionError> {
    match presenter.notice(notice) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(()) => Err(SessionError::Interrupted),
    }
}

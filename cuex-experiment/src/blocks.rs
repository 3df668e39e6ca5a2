use crate::config::ExperimentConfig;
use cuex_core::{CueValidity, CueValue, SignalIntensity, TrialFactors};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::VecDeque;

/// Relative frequency of each cue validity within a block.
const VALIDITY_WEIGHTS: [(CueValidity, usize); 3] = [
    (CueValidity::Valid, 8),
    (CueValidity::InvalidShort, 1),
    (CueValidity::InvalidLong, 1),
];
/// Relative frequency of target (false) and catch (true) trials.
const CATCH_WEIGHTS: [(bool, usize); 2] = [(false, 3), (true, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockSpec {
    pub number: u32,
    pub practice: bool,
    pub trial_count: u32,
    /// Drop catch trials from the factor set.
    pub exclude_catch: bool,
}

impl BlockSpec {
    pub fn practice(number: u32, trial_count: u32) -> Self {
        Self {
            number,
            practice: true,
            trial_count,
            exclude_catch: true,
        }
    }

    pub fn testing(number: u32, trial_count: u32) -> Self {
        Self {
            number,
            practice: false,
            trial_count,
            exclude_catch: false,
        }
    }

    /// Factors for every trial of the block: the weighted full factorial,
    /// shuffled, repeated until it covers `trial_count`.
    pub fn draw_trials<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<TrialFactors> {
        let pool = factor_pool(self.exclude_catch);
        let n = self.trial_count as usize;
        let mut trials = Vec::with_capacity(n + pool.len());
        while trials.len() < n {
            let mut round = pool.clone();
            round.shuffle(rng);
            trials.extend(round);
        }
        trials.truncate(n);
        trials
    }
}

fn factor_pool(exclude_catch: bool) -> Vec<TrialFactors> {
    let mut pool = Vec::new();
    for signal_intensity in SignalIntensity::ALL {
        for cue_value in CueValue::ALL {
            for (cue_validity, vw) in VALIDITY_WEIGHTS {
                for (catch_trial, cw) in CATCH_WEIGHTS {
                    if catch_trial && exclude_catch {
                        continue;
                    }
                    let factors = TrialFactors {
                        signal_intensity,
                        cue_value,
                        cue_validity,
                        catch_trial,
                    };
                    pool.extend(std::iter::repeat_n(factors, vw * cw));
                }
            }
        }
    }
    pool
}

/// Accepts extra blocks while a session is running.
pub trait BlockScheduler {
    /// Inserts `spec` at position `spec.number`; queued blocks at or after
    /// that number shift back by one.
    fn insert_block(&mut self, spec: BlockSpec);
}

/// Blocks still to run, in order.
#[derive(Debug, Clone, Default)]
pub struct BlockPlan {
    queue: VecDeque<BlockSpec>,
}

impl BlockPlan {
    /// One practice block (when enabled) followed by the test blocks,
    /// numbered from 1.
    pub fn from_config(config: &ExperimentConfig) -> Self {
        let mut queue = VecDeque::new();
        let mut number = 1;
        if config.run_practice_blocks {
            queue.push_back(BlockSpec::practice(number, config.trials_per_practice_block));
            number += 1;
        }
        for _ in 0..config.blocks_per_experiment {
            queue.push_back(BlockSpec::testing(number, config.trials_per_block));
            number += 1;
        }
        Self { queue }
    }

    pub fn next_block(&mut self) -> Option<BlockSpec> {
        self.queue.pop_front()
    }

    pub fn remaining(&self) -> impl Iterator<Item = &BlockSpec> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl BlockScheduler for BlockPlan {
    fn insert_block(&mut self, spec: BlockSpec) {
        for block in self.queue.iter_mut().filter(|b| b.number >= spec.number) {
            block.number += 1;
        }
        let at = self
            .queue
            .iter()
            .position(|b| b.number > spec.number)
            .unwrap_or(self.queue.len());
        self.queue.insert(at, spec);
    }
}

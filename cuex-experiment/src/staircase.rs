//! Adaptive target-duration staircase run after each practice block.

use cuex_core::TargetDuration;
use serde::{Deserialize, Serialize};

/// Mean absolute error bounds, in degrees. Below `lower` the task is too
/// easy; above `upper` it is too hard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub lower: f64,
    pub upper: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            lower: 30.0,
            upper: 50.0,
        }
    }
}

/// Outcome of one performance check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub next: TargetDuration,
    pub continue_practicing: bool,
    pub abort: bool,
}

impl Decision {
    fn settle(next: TargetDuration) -> Self {
        Self {
            next,
            continue_practicing: false,
            abort: false,
        }
    }

    fn practice(next: TargetDuration) -> Self {
        Self {
            next,
            continue_practicing: true,
            abort: false,
        }
    }

    fn abort(current: TargetDuration) -> Self {
        Self {
            next: current,
            continue_practicing: false,
            abort: true,
        }
    }
}

impl Thresholds {
    /// Decides the next target duration from the block's mean absolute
    /// error.
    ///
    /// The floor (33 ms) can only get longer and stops practice either way;
    /// the ceiling (150 ms) aborts the session when errors stay above
    /// `upper`. In between, an error inside `lower..=upper` settles on the
    /// current duration; 100 ms keeps practising after either adjustment,
    /// 67 ms only after shortening.
    pub fn evaluate(&self, mean_error: f64, current: TargetDuration) -> Decision {
        use TargetDuration::*;

        let too_hard = mean_error > self.upper;
        let too_easy = mean_error < self.lower;

        match current {
            Ms150 if too_hard => Decision::abort(current),
            Ms150 => Decision::settle(current),
            Ms33 if too_hard => Decision::settle(current.longer()),
            Ms33 => Decision::settle(current),
            Ms100 if too_hard => Decision::practice(current.longer()),
            Ms100 if too_easy => Decision::practice(current.shorter()),
            Ms100 => Decision::settle(current),
            Ms67 if too_easy => Decision::practice(current.shorter()),
            Ms67 if too_hard => Decision::settle(current.longer()),
            Ms67 => Decision::settle(current),
        }
    }
}

/// [`Thresholds::evaluate`] with the default 30/50 bounds.
pub fn evaluate(mean_error: f64, current: TargetDuration) -> Decision {
    Thresholds::default().evaluate(mean_error, current)
}

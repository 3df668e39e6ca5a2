use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Target presentation time, restricted to the four staircase steps.
///
/// Ordered from shortest (hardest) to longest (easiest). Moving along the
/// staircase only ever goes to a neighbouring step; the ends saturate.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u64", into = "u64")]
pub enum TargetDuration {
    Ms33,
    Ms67,
    #[default]
    Ms100,
    Ms150,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("{0} ms is not a target duration step (expected 33, 67, 100 or 150)")]
    Unsupported(u64),
}

impl TargetDuration {
    pub const ALL: [TargetDuration; 4] = [Self::Ms33, Self::Ms67, Self::Ms100, Self::Ms150];

    pub const fn as_millis(self) -> u64 {
        match self {
            Self::Ms33 => 33,
            Self::Ms67 => 67,
            Self::Ms100 => 100,
            Self::Ms150 => 150,
        }
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.as_millis())
    }

    /// Position in [`TargetDuration::ALL`].
    pub const fn step(self) -> usize {
        self as usize
    }

    /// One step shorter, saturating at 33 ms.
    pub fn shorter(self) -> Self {
        Self::ALL[self.step().saturating_sub(1)]
    }

    /// One step longer, saturating at 150 ms.
    pub fn longer(self) -> Self {
        Self::ALL[(self.step() + 1).min(Self::ALL.len() - 1)]
    }
}

impl From<TargetDuration> for u64 {
    fn from(d: TargetDuration) -> u64 {
        d.as_millis()
    }
}

impl TryFrom<u64> for TargetDuration {
    type Error = DurationError;

    fn try_from(ms: u64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_millis() == ms)
            .ok_or(DurationError::Unsupported(ms))
    }
}

impl fmt::Display for TargetDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ms", self.as_millis())
    }
}

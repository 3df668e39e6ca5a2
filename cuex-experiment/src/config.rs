use crate::performance::MissingErrorPolicy;
use crate::staircase::Thresholds;
use cuex_core::{StimulusSet, TargetDuration};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Session parameters. Every field has a default, so a partial JSON file
/// only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub run_practice_blocks: bool,
    pub trials_per_practice_block: u32,
    pub blocks_per_experiment: u32,
    pub trials_per_block: u32,
    /// Cue-to-alert interval is drawn from a shifted exponential with this
    /// floor and mean, rejecting draws above the ceiling.
    pub fixation_min_ms: u64,
    pub fixation_mean_ms: u64,
    pub fixation_max_ms: u64,
    pub cue_duration_ms: u64,
    pub mask_duration_ms: u64,
    pub discrimination_timeout_ms: u64,
    pub inter_trial_interval_ms: u64,
    pub base_volume: f32,
    pub hi_cue_volume: f32,
    pub initial_target_duration: TargetDuration,
    pub thresholds: Thresholds,
    pub missing_error_policy: MissingErrorPolicy,
    /// Longest sleep between input pumps while waiting for an event.
    pub poll_interval_ms: u64,
    pub stimuli: StimulusSet,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            run_practice_blocks: true,
            trials_per_practice_block: 20,
            blocks_per_experiment: 4,
            trials_per_block: 120,
            fixation_min_ms: 700,
            fixation_mean_ms: 1000,
            fixation_max_ms: 2500,
            cue_duration_ms: 100,
            mask_duration_ms: 50,
            discrimination_timeout_ms: 5000,
            inter_trial_interval_ms: 1000,
            base_volume: 0.1,
            hi_cue_volume: 0.2,
            initial_target_duration: TargetDuration::Ms100,
            thresholds: Thresholds::default(),
            missing_error_policy: MissingErrorPolicy::AssumeZero,
            poll_interval_ms: 1,
            stimuli: StimulusSet::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.run_practice_blocks && self.trials_per_practice_block == 0 {
            return invalid("trials_per_practice_block must be positive".into());
        }
        if self.blocks_per_experiment == 0 {
            return invalid("blocks_per_experiment must be positive".into());
        }
        if self.trials_per_block == 0 || self.trials_per_block % 4 != 0 {
            return invalid(format!(
                "trials_per_block must be a positive multiple of 4, got {}",
                self.trials_per_block
            ));
        }
        if !(self.fixation_min_ms < self.fixation_mean_ms
            && self.fixation_mean_ms <= self.fixation_max_ms)
        {
            return invalid(format!(
                "fixation interval needs min < mean <= max, got {}/{}/{}",
                self.fixation_min_ms, self.fixation_mean_ms, self.fixation_max_ms
            ));
        }
        let t = self.thresholds;
        if !(t.lower.is_finite() && t.upper.is_finite() && 0.0 <= t.lower && t.lower < t.upper) {
            return invalid(format!(
                "thresholds need 0 <= lower < upper, got {}/{}",
                t.lower, t.upper
            ));
        }
        let volumes = [
            ("base_volume", self.base_volume),
            ("hi_cue_volume", self.hi_cue_volume),
        ];
        for (name, v) in volumes {
            if !(0.0..=1.0).contains(&v) {
                return invalid(format!("{name} must be within 0..=1, got {v}"));
            }
        }
        if self.poll_interval_ms == 0 {
            return invalid("poll_interval_ms must be positive".into());
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Trials between breaks in a test block.
    pub fn quarter_block(&self) -> u32 {
        self.trials_per_block / 4
    }
}

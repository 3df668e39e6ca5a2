use serde::{Deserialize, Serialize};

/// CTOA used on catch trials, where no target follows the cue.
pub const CATCH_CTOA_MS: u64 = 1600;

/// Visual cue shown at trial onset: a short or long dash string announcing
/// the likely wait before the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueValue {
    Short,
    Long,
}

/// Whether the cue predicted the actual CTOA, and if not, which one was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueValidity {
    Valid,
    InvalidShort,
    InvalidLong,
}

/// Level change of the alerting signal; `Hi` raises the noise volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalIntensity {
    Lo,
    Hi,
}

impl CueValue {
    pub const ALL: [CueValue; 2] = [Self::Short, Self::Long];

    pub fn label(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }
}

impl CueValidity {
    pub const ALL: [CueValidity; 3] = [Self::Valid, Self::InvalidShort, Self::InvalidLong];

    pub fn label(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::InvalidShort => "invalid_short",
            Self::InvalidLong => "invalid_long",
        }
    }
}

impl SignalIntensity {
    pub const ALL: [SignalIntensity; 2] = [Self::Lo, Self::Hi];

    pub fn label(self) -> &'static str {
        match self {
            Self::Lo => "lo",
            Self::Hi => "hi",
        }
    }
}

/// Cue-target onset asynchrony for a cue and its validity.
///
/// A valid short cue waits 400 ms and a valid long cue 1600 ms; invalid cues
/// use one of the other two intervals.
pub fn ctoa_ms(cue: CueValue, validity: CueValidity) -> u64 {
    use CueValidity::*;
    match (cue, validity) {
        (CueValue::Short, Valid) => 400,
        (CueValue::Short, InvalidShort) => 1000,
        (CueValue::Short, InvalidLong) => 1600,
        (CueValue::Long, Valid) => 1600,
        (CueValue::Long, InvalidShort) => 400,
        (CueValue::Long, InvalidLong) => 1000,
    }
}

/// Independent variables of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrialFactors {
    pub signal_intensity: SignalIntensity,
    pub cue_value: CueValue,
    pub cue_validity: CueValidity,
    pub catch_trial: bool,
}

impl TrialFactors {
    pub fn ctoa_ms(&self) -> u64 {
        if self.catch_trial {
            CATCH_CTOA_MS
        } else {
            ctoa_ms(self.cue_value, self.cue_validity)
        }
    }
}

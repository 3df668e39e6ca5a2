use crate::duration::TargetDuration;
use crate::factors::{CueValidity, SignalIntensity};
use serde::{Serialize, Serializer};

/// Label written in place of discrimination fields on catch trials.
pub const CATCH_LABEL: &str = "catch";
/// Label written when the colour wheel timed out without a selection.
pub const TIMEOUT_LABEL: &str = "timeout";

/// Where a running trial currently is in its event sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    /// Cue on screen, baseline noise playing.
    PreCue,
    Alerting,
    /// Waiting out the CTOA.
    PostCue,
    Target,
    Mask,
    Response,
    Complete,
}

/// A field that is replaced by [`CATCH_LABEL`] on catch trials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Catchable<T> {
    Value(T),
    Catch,
}

impl<T> Catchable<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Catchable::Value(v) => Some(v),
            Catchable::Catch => None,
        }
    }

    pub fn is_catch(&self) -> bool {
        matches!(self, Catchable::Catch)
    }
}

impl<T: Serialize> Serialize for Catchable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Catchable::Value(v) => v.serialize(serializer),
            Catchable::Catch => serializer.serialize_str(CATCH_LABEL),
        }
    }
}

/// A measured response quantity, or the timeout sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measure {
    Value(f64),
    Timeout,
}

impl Measure {
    pub fn value(self) -> Option<f64> {
        match self {
            Measure::Value(v) => Some(v),
            Measure::Timeout => None,
        }
    }
}

impl Serialize for Measure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Measure::Value(v) => serializer.serialize_f64(*v),
            Measure::Timeout => serializer.serialize_str(TIMEOUT_LABEL),
        }
    }
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub participant_id: u32,
    #[serde(rename = "block_num")]
    pub block: u32,
    #[serde(rename = "trial_num")]
    pub trial: u32,
    pub practice: bool,
    #[serde(rename = "fix_duration")]
    pub fixation_ms: f64,
    pub target_duration: TargetDuration,
    #[serde(rename = "ctoa")]
    pub ctoa_ms: u64,
    pub cue_valid: Catchable<CueValidity>,
    pub signal_intensity: SignalIntensity,
    pub target_rgb: Catchable<[u8; 3]>,
    /// Milliseconds from wheel onset to selection.
    pub discrimination_rt: Catchable<Measure>,
    /// Signed hue difference in degrees, see [`angular_error`].
    pub discrimination_error: Catchable<Measure>,
}

impl TrialRecord {
    pub fn is_catch(&self) -> bool {
        self.discrimination_error.is_catch()
    }

    pub fn error_deg(&self) -> Option<f64> {
        self.discrimination_error.value().and_then(|m| m.value())
    }

    pub fn rt_ms(&self) -> Option<f64> {
        self.discrimination_rt.value().and_then(|m| m.value())
    }
}

/// Signed shortest distance from `target_deg` to `response_deg` on the
/// colour wheel, in (-180, 180].
pub fn angular_error(response_deg: f64, target_deg: f64) -> f64 {
    let d = (response_deg - target_deg).rem_euclid(360.0);
    if d > 180.0 { d - 360.0 } else { d }
}

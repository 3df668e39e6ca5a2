pub mod duration;
pub mod factors;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use duration::{DurationError, TargetDuration};
pub use factors::{ctoa_ms, CueValidity, CueValue, SignalIntensity, TrialFactors, CATCH_CTOA_MS};
pub use phase::{Phase, SessionPhase};
pub use stimulus::{hue_to_rgb, MaskGrid, Stimulus, StimulusSet};
pub use trial::{
    angular_error, Catchable, Measure, TrialRecord, TrialState, CATCH_LABEL, TIMEOUT_LABEL,
};

pub mod blocks;
pub mod config;
pub mod error;
pub mod observer;
pub mod performance;
pub mod runner;
pub mod staircase;
pub mod state;
pub mod trial;
pub use blocks::{BlockPlan, BlockScheduler, BlockSpec};
pub use config::{ConfigError, ExperimentConfig};
pub use error::SessionError;
pub use observer::SimulatedObserver;
pub use performance::{
    block_error, mean_absolute_error, Cell, CheckError, ErrorQuery, MissingErrorPolicy, QueryError,
};
pub use runner::{run_trial, trial_clean_up, Notice, Presenter, WheelResponse};
pub use staircase::{evaluate, Decision, Thresholds};
pub use state::{Outcome, Session, SessionContext, SessionSummary, TrialStore};
pub use trial::{TrialEvent, TrialPlan};

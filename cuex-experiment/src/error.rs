use crate::performance::CheckError;
use cuex_timing::ScheduleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The host asked to stop (window closed, escape pressed).
    #[error("session interrupted by the host")]
    Interrupted,
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Check(#[from] CheckError),
}

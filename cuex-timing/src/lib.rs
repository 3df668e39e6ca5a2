pub mod schedule;
pub mod timer;

pub use schedule::{wait_until, EventSchedule, ScheduleError};
pub use timer::{HighPrecisionTimer, SimulatedTimer, Timer};

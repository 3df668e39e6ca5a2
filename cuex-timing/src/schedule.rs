use crate::timer::Timer;
use std::fmt::Debug;
use std::ops::ControlFlow;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("event {0} is already scheduled")]
    Duplicate(String),
    #[error("event {0} is not scheduled")]
    Unknown(String),
}

/// Labelled deadlines stored as offsets from an origin timestamp.
///
/// Offsets are fixed when the schedule is built; [`EventSchedule::start`]
/// pins the origin, turning every offset into an absolute deadline on the
/// timer's clock.
#[derive(Debug, Clone)]
pub struct EventSchedule<E> {
    origin_ns: u64,
    events: Vec<(E, u64)>,
}

impl<E: Copy + PartialEq + Debug> Default for EventSchedule<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Copy + PartialEq + Debug> EventSchedule<E> {
    pub fn new() -> Self {
        Self {
            origin_ns: 0,
            events: Vec::new(),
        }
    }

    pub fn register(&mut self, event: E, offset: Duration) -> Result<(), ScheduleError> {
        if self.offset(event).is_some() {
            return Err(ScheduleError::Duplicate(format!("{event:?}")));
        }
        self.events.push((event, offset.as_nanos() as u64));
        Ok(())
    }

    /// Registers `event` `gap` after the most recently registered one and
    /// returns its offset from the origin.
    pub fn register_after(&mut self, event: E, gap: Duration) -> Result<Duration, ScheduleError> {
        let last = self.events.last().map_or(0, |(_, off)| *off);
        let offset = Duration::from_nanos(last) + gap;
        self.register(event, offset)?;
        Ok(offset)
    }

    pub fn start(&mut self, origin_ns: u64) {
        self.origin_ns = origin_ns;
    }

    pub fn origin(&self) -> u64 {
        self.origin_ns
    }

    pub fn offset(&self, event: E) -> Option<Duration> {
        self.events
            .iter()
            .find(|(e, _)| *e == event)
            .map(|(_, off)| Duration::from_nanos(*off))
    }

    pub fn deadline(&self, event: E) -> Result<u64, ScheduleError> {
        self.offset(event)
            .map(|off| self.origin_ns + off.as_nanos() as u64)
            .ok_or_else(|| ScheduleError::Unknown(format!("{event:?}")))
    }

    /// True while `now_ns` has not yet reached the event's deadline.
    pub fn before(&self, event: E, now_ns: u64) -> Result<bool, ScheduleError> {
        Ok(now_ns < self.deadline(event)?)
    }

    /// Events whose deadline has been reached, in registration order.
    pub fn due(&self, now_ns: u64) -> impl Iterator<Item = E> + '_ {
        self.events
            .iter()
            .filter(move |(_, off)| self.origin_ns + off <= now_ns)
            .map(|(e, _)| *e)
    }

    pub fn events(&self) -> impl Iterator<Item = (E, Duration)> + '_ {
        self.events
            .iter()
            .map(|(e, off)| (*e, Duration::from_nanos(*off)))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Suspends until `event` is due, see [`wait_until`].
    pub fn wait_for<T, F>(
        &self,
        event: E,
        timer: &T,
        slice: Duration,
        pump: F,
    ) -> Result<ControlFlow<()>, ScheduleError>
    where
        T: Timer,
        F: FnMut() -> ControlFlow<()>,
    {
        let deadline = self.deadline(event)?;
        Ok(wait_until(timer, deadline, slice, pump))
    }
}

/// Sleeps until `deadline_ns` in slices of at most `slice`, calling `pump`
/// at each suspension point so the host can process input.
///
/// Returns `Break` as soon as `pump` does. A deadline already in the past
/// returns `Continue` without pumping.
pub fn wait_until<T, F>(
    timer: &T,
    deadline_ns: u64,
    slice: Duration,
    mut pump: F,
) -> ControlFlow<()>
where
    T: Timer,
    F: FnMut() -> ControlFlow<()>,
{
    loop {
        let now = timer.now();
        if now >= deadline_ns {
            return ControlFlow::Continue(());
        }
        if pump().is_break() {
            return ControlFlow::Break(());
        }
        let remaining = Duration::from_nanos(deadline_ns - now);
        let step = if slice.is_zero() {
            remaining
        } else {
            remaining.min(slice)
        };
        timer.sleep(step);
    }
}

/// Defines session phases and behavior
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    fn next(&self) -> Option<Self>;

    fn is_practice(&self) -> bool {
        false
    }
    fn is_testing(&self) -> bool {
        false
    }

    /// Phases in which trials are run.
    fn runs_trials(&self) -> bool {
        self.is_practice() || self.is_testing()
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Default)]
pub enum SessionPhase {
    #[default]
    Welcome,
    Practice,
    Testing,
    Debrief,
}

impl Phase for SessionPhase {
    fn next(&self) -> Option<Self> {
        use SessionPhase::*;
        Some(match self {
            Welcome => Practice,
            Practice => Testing,
            Testing => Debrief,
            Debrief => return None,
        })
    }

    fn is_practice(&self) -> bool {
        matches!(self, SessionPhase::Practice)
    }

    fn is_testing(&self) -> bool {
        matches!(self, SessionPhase::Testing)
    }
}

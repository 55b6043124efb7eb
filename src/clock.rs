use chrono::{DateTime, Utc};

/// Source of the current instant. Lesson resolution only ever asks the clock,
/// so tests can pin "now" to a fixed point.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    pub instant: DateTime<Utc>,
}

impl FixedClock {
    pub const fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}

use chrono::{DateTime, NaiveDate, Utc};

/// Wall-clock and calendar-day source for the enforcement pipeline.
///
/// Everything that compares timestamps or detects midnight rollover goes
/// through this trait so the decision logic stays deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar-day identity used for daily-limit resets.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LimitMode {
    /// Blocked entirely until a fixed end timestamp.
    Detox,
    /// Blocked once today's accumulated foreground time exceeds a budget.
    DailyLimit,
}

/// One restriction per application.
///
/// Exactly one of `detox_ends_at` / `daily_limit_minutes` is meaningful,
/// selected by `mode`. `used_today_minutes` is only valid relative to
/// `last_reset_day`; reconcile before reading or comparing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitRecord {
    pub package: String,
    pub mode: LimitMode,
    pub detox_ends_at: Option<DateTime<Utc>>,
    pub daily_limit_minutes: u32,
    pub used_today_minutes: u32,
    pub last_reset_day: NaiveDate,
    /// Inactive records persist (so a streak history survives) but are
    /// excluded from the live restriction set.
    pub is_active: bool,
    /// Consecutive days this restriction has survived.
    pub streak: u32,
}

impl LimitRecord {
    pub fn detox(package: impl Into<String>, ends_at: DateTime<Utc>, today: NaiveDate) -> Self {
        Self {
            package: package.into(),
            mode: LimitMode::Detox,
            detox_ends_at: Some(ends_at),
            daily_limit_minutes: 0,
            used_today_minutes: 0,
            last_reset_day: today,
            is_active: true,
            streak: 0,
        }
    }

    pub fn daily_limit(package: impl Into<String>, minutes: u32, today: NaiveDate) -> Self {
        Self {
            package: package.into(),
            mode: LimitMode::DailyLimit,
            detox_ends_at: None,
            daily_limit_minutes: minutes,
            used_today_minutes: 0,
            last_reset_day: today,
            is_active: true,
            streak: 0,
        }
    }

    /// Zero today's usage if the calendar day has rolled over.
    /// Returns true when a rollover happened.
    pub fn reconcile_day(&mut self, today: NaiveDate) -> bool {
        if self.last_reset_day == today {
            return false;
        }
        self.used_today_minutes = 0;
        self.last_reset_day = today;
        self.streak = self.streak.saturating_add(1);
        true
    }

    /// Usage for comparisons, without mutating: a stale `last_reset_day`
    /// means today's usage is effectively zero.
    pub fn effective_used_minutes(&self, today: NaiveDate) -> u32 {
        if self.last_reset_day == today {
            self.used_today_minutes
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::day;

    #[test]
    fn reconcile_is_noop_within_the_same_day() {
        let mut record = LimitRecord::daily_limit("app.x", 30, day(2024, 1, 1));
        record.used_today_minutes = 12;

        assert!(!record.reconcile_day(day(2024, 1, 1)));
        assert_eq!(record.used_today_minutes, 12);
        assert_eq!(record.streak, 0);
    }

    #[test]
    fn reconcile_resets_usage_and_bumps_streak_on_rollover() {
        let mut record = LimitRecord::daily_limit("app.x", 30, day(2024, 1, 1));
        record.used_today_minutes = 45;

        assert!(record.reconcile_day(day(2024, 1, 2)));
        assert_eq!(record.used_today_minutes, 0);
        assert_eq!(record.last_reset_day, day(2024, 1, 2));
        assert_eq!(record.streak, 1);
    }

    #[test]
    fn effective_usage_ignores_stale_days_without_mutating() {
        let mut record = LimitRecord::daily_limit("app.x", 30, day(2024, 1, 1));
        record.used_today_minutes = 45;

        assert_eq!(record.effective_used_minutes(day(2024, 1, 2)), 0);
        assert_eq!(record.effective_used_minutes(day(2024, 1, 1)), 45);
        assert_eq!(record.used_today_minutes, 45);
    }
}

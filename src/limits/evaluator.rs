use chrono::{DateTime, NaiveDate, Utc};

use crate::events::BlockReason;

use super::record::{LimitMode, LimitRecord};

/// The enforcement decision for one record at one instant.
///
/// Recomputed on demand, never persisted. `remaining_minutes` and
/// `remaining_days` are clamped to zero for display; `blocked` carries the
/// raw comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub blocked: bool,
    pub reason: BlockReason,
    pub remaining_minutes: i64,
    pub remaining_days: i64,
}

impl Verdict {
    fn allowed() -> Self {
        Self {
            blocked: false,
            reason: BlockReason::None,
            remaining_minutes: 0,
            remaining_days: 0,
        }
    }
}

/// Decide whether access to `record`'s package is currently denied.
///
/// Pure and side-effect free; safe to call at any rate. Day reconciliation
/// here is read-only — writing the reset back belongs to whoever owns the
/// mutable record (see `LimitStore::report_usage`).
pub fn evaluate(record: &LimitRecord, now: DateTime<Utc>, today: NaiveDate) -> Verdict {
    if !record.is_active {
        return Verdict::allowed();
    }

    match record.mode {
        LimitMode::Detox => {
            let Some(ends_at) = record.detox_ends_at else {
                // A detox with no end timestamp counts as expired.
                return Verdict::allowed();
            };
            if now < ends_at {
                Verdict {
                    blocked: true,
                    reason: BlockReason::DetoxActive,
                    remaining_minutes: 0,
                    remaining_days: (ends_at - now).num_days(),
                }
            } else {
                Verdict::allowed()
            }
        }
        LimitMode::DailyLimit => {
            let used = i64::from(record.effective_used_minutes(today));
            let remaining = i64::from(record.daily_limit_minutes) - used;
            if remaining <= 0 {
                Verdict {
                    blocked: true,
                    reason: BlockReason::LimitExceeded,
                    remaining_minutes: 0,
                    remaining_days: 0,
                }
            } else {
                Verdict {
                    blocked: false,
                    reason: BlockReason::LimitWarning,
                    remaining_minutes: remaining,
                    remaining_days: 0,
                }
            }
        }
    }
}

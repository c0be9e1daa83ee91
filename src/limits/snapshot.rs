//! Whole-file JSON persistence for the restriction set.
//!
//! The snapshot is the only channel between the command surface and the
//! event-driven detector, which may run in a different process: writers
//! replace the whole file, readers re-read it. Last writer wins, which is
//! acceptable because edits are user-paced.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use super::record::{LimitMode, LimitRecord};

/// One persisted restriction, keyed externally by package id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRecord {
    mode: LimitMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detox_ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    daily_limit_minutes: u32,
    #[serde(default = "default_active")]
    is_active: bool,
    #[serde(default)]
    used_today_minutes: u32,
    #[serde(default)]
    last_reset_day: Option<NaiveDate>,
    #[serde(default)]
    streak: u32,
}

fn default_active() -> bool {
    true
}

impl SnapshotRecord {
    fn into_record(self, package: String) -> LimitRecord {
        LimitRecord {
            package,
            mode: self.mode,
            detox_ends_at: self.detox_ends_at,
            daily_limit_minutes: self.daily_limit_minutes,
            used_today_minutes: self.used_today_minutes,
            // A legacy entry without a reset day reads as long-stale, so its
            // usage is treated as zero until the next reconciliation.
            last_reset_day: self.last_reset_day.unwrap_or_default(),
            is_active: self.is_active,
            streak: self.streak,
        }
    }

    fn from_record(record: &LimitRecord) -> Self {
        Self {
            mode: record.mode,
            detox_ends_at: record.detox_ends_at,
            daily_limit_minutes: record.daily_limit_minutes,
            is_active: record.is_active,
            used_today_minutes: record.used_today_minutes,
            last_reset_day: Some(record.last_reset_day),
            streak: record.streak,
        }
    }
}

/// Load every persisted record. A missing or unreadable snapshot degrades to
/// an empty set — blocking nothing is the safe failure mode.
pub fn load(path: &Path) -> HashMap<String, LimitRecord> {
    if !path.exists() {
        return HashMap::new();
    }

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!("Failed to read restriction snapshot {}: {err}", path.display());
            return HashMap::new();
        }
    };

    let parsed: HashMap<String, SnapshotRecord> = match serde_json::from_str(&contents) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("Ignoring corrupt restriction snapshot {}: {err}", path.display());
            return HashMap::new();
        }
    };

    parsed
        .into_iter()
        .map(|(package, record)| {
            let record = record.into_record(package.clone());
            (package, record)
        })
        .collect()
}

/// Records with `isActive = true` — the live restriction set a collaborator
/// enforces against.
pub fn load_active(path: &Path) -> HashMap<String, LimitRecord> {
    let mut records = load(path);
    records.retain(|_, record| record.is_active);
    records
}

/// Projection of the live set down to its package ids.
pub fn load_active_packages(path: &Path) -> HashSet<String> {
    load_active(path).into_keys().collect()
}

/// Replace the snapshot with `records`. The write completing is what lets a
/// mutating caller report success.
pub fn save(path: &Path, records: &HashMap<String, LimitRecord>) -> Result<()> {
    let snapshot: HashMap<&String, SnapshotRecord> = records
        .iter()
        .map(|(package, record)| (package, SnapshotRecord::from_record(record)))
        .collect();

    let serialized = serde_json::to_string_pretty(&snapshot)?;
    fs::write(path, serialized)
        .with_context(|| format!("failed to write restriction snapshot to {}", path.display()))
}

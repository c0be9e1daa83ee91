use std::{
    collections::{HashMap, HashSet},
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use anyhow::Result;
use chrono::NaiveDate;
use log::{info, warn};

use super::record::LimitRecord;
use super::snapshot;

/// Owning store for the restriction set.
///
/// Every mutation is flushed to the snapshot file before the call returns
/// success, so the event-driven detector (possibly in another process) can
/// pick it up by re-reading — the two sides never share live references.
pub struct LimitStore {
    path: PathBuf,
    records: RwLock<HashMap<String, LimitRecord>>,
}

impl LimitStore {
    /// Open the store backed by `path`, loading whatever snapshot is there.
    /// A missing or corrupt snapshot starts the store empty.
    pub fn open(path: PathBuf) -> Self {
        let records = snapshot::load(&path);
        info!(
            "Loaded {} restriction(s) from {}",
            records.len(),
            path.display()
        );
        Self {
            path,
            records: RwLock::new(records),
        }
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, HashMap<String, LimitRecord>> {
        self.records.read().unwrap_or_else(|poisoned| {
            warn!("LimitStore lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, HashMap<String, LimitRecord>> {
        self.records.write().unwrap_or_else(|poisoned| {
            warn!("LimitStore lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Add or replace a restriction and persist the snapshot.
    pub fn add(&self, record: LimitRecord) -> Result<()> {
        let mut records = self.write_lock();
        info!("Restricting {} ({:?})", record.package, record.mode);
        records.insert(record.package.clone(), record);
        snapshot::save(&self.path, &records)
    }

    /// Lift a restriction. Unknown packages are a no-op, not an error.
    /// Returns whether anything was removed.
    pub fn remove(&self, package: &str) -> Result<bool> {
        let mut records = self.write_lock();
        if records.remove(package).is_none() {
            return Ok(false);
        }
        info!("Restriction lifted for {package}");
        snapshot::save(&self.path, &records)?;
        Ok(true)
    }

    /// Mark a restriction cancelled: it stays on record but no longer
    /// enforces, and its streak is broken.
    pub fn deactivate(&self, package: &str) -> Result<bool> {
        let mut records = self.write_lock();
        let Some(record) = records.get_mut(package) else {
            return Ok(false);
        };
        record.is_active = false;
        record.streak = 0;
        info!("Restriction cancelled for {package}");
        snapshot::save(&self.path, &records)?;
        Ok(true)
    }

    pub fn get(&self, package: &str) -> Option<LimitRecord> {
        self.read_lock().get(package).cloned()
    }

    /// Package ids of the live (active) restriction set.
    pub fn packages(&self) -> HashSet<String> {
        self.read_lock()
            .values()
            .filter(|record| record.is_active)
            .map(|record| record.package.clone())
            .collect()
    }

    /// Every record, active or not.
    pub fn all(&self) -> HashMap<String, LimitRecord> {
        self.read_lock().clone()
    }

    /// Overwrite today's usage for `package`, reconciling the day first.
    /// Unknown packages are a no-op. Persists only when something changed.
    pub fn report_usage(&self, package: &str, minutes: u32, today: NaiveDate) -> Result<()> {
        let mut records = self.write_lock();
        let Some(record) = records.get_mut(package) else {
            return Ok(());
        };

        let rolled = record.reconcile_day(today);
        if !rolled && record.used_today_minutes == minutes {
            return Ok(());
        }
        record.used_today_minutes = minutes;
        snapshot::save(&self.path, &records)
    }

    /// Drop the in-memory set and re-read the latest snapshot.
    pub fn reload(&self) {
        let mut records = self.write_lock();
        *records = snapshot::load(&self.path);
    }
}

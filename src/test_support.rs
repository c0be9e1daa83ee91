//! Mock collaborators shared by the unit tests.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::clock::Clock;
use crate::foreground::{ForegroundApp, ForegroundProvider};
use crate::monitor::OverlaySurface;

pub(crate) fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

pub(crate) fn day(y: i32, mo: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, mo, d).unwrap()
}

/// A clock the test advances by hand.
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(crate) fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SurfaceCall {
    Present(String),
    Dismiss,
}

/// Overlay surface that records every call; clones share the record.
#[derive(Clone, Default)]
pub(crate) struct RecordingSurface {
    calls: Arc<Mutex<Vec<SurfaceCall>>>,
    fail_present: Arc<AtomicBool>,
}

impl RecordingSurface {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn fail_present(&self, fail: bool) {
        self.fail_present.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn present_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, SurfaceCall::Present(_)))
            .count()
    }
}

impl OverlaySurface for RecordingSurface {
    fn present(&mut self, package: &str) -> Result<()> {
        if self.fail_present.load(Ordering::SeqCst) {
            bail!("overlay window refused");
        }
        self.calls
            .lock()
            .unwrap()
            .push(SurfaceCall::Present(package.to_string()));
        Ok(())
    }

    fn dismiss(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push(SurfaceCall::Dismiss);
        Ok(())
    }
}

/// Foreground provider the test scripts by hand; clones share the slot.
#[derive(Clone, Default)]
pub(crate) struct ScriptedProvider {
    current: Arc<Mutex<Option<ForegroundApp>>>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn switch_to(&self, package: &str, since: DateTime<Utc>) {
        *self.current.lock().unwrap() = Some(ForegroundApp::new(package, since));
    }

    pub(crate) fn clear(&self) {
        *self.current.lock().unwrap() = None;
    }
}

impl ForegroundProvider for ScriptedProvider {
    fn current(&self) -> Option<ForegroundApp> {
        self.current.lock().unwrap().clone()
    }
}

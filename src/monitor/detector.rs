use std::{collections::HashMap, path::PathBuf, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use log::debug;
use tokio::sync::broadcast;

use crate::clock::Clock;
use crate::events::{BlockEvent, BlockReason};
use crate::limits::{evaluate, snapshot, LimitRecord};

use super::filter::{EventFilter, FilterDecision};
use super::overlay::OverlayController;

/// How old the snapshot projection may grow before the next event re-reads it.
pub const DEFAULT_REFRESH_MS: u64 = 5_000;

/// The event-driven enforcement collaborator.
///
/// Runs wherever window-change events are delivered — typically a different
/// process from the command surface that owns the `LimitStore`. It therefore
/// holds no live reference to the store: consistency comes from re-reading
/// the persisted snapshot, bounded by a refresh interval so that events
/// (which arrive many times per second) don't each hit the disk.
///
/// Unlike the polling loop it never reports usage; it only enforces.
pub struct Detector {
    snapshot_path: PathBuf,
    filter: EventFilter,
    overlay: OverlayController,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<BlockEvent>,
    records: HashMap<String, LimitRecord>,
    refreshed_at: Option<DateTime<Utc>>,
    refresh_every: Duration,
}

impl Detector {
    pub fn new(
        snapshot_path: PathBuf,
        filter: EventFilter,
        overlay: OverlayController,
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<BlockEvent>,
    ) -> Self {
        Self::with_refresh_interval(
            snapshot_path,
            filter,
            overlay,
            clock,
            events,
            DEFAULT_REFRESH_MS,
        )
    }

    pub fn with_refresh_interval(
        snapshot_path: PathBuf,
        filter: EventFilter,
        overlay: OverlayController,
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<BlockEvent>,
        refresh_ms: u64,
    ) -> Self {
        Self {
            snapshot_path,
            filter,
            overlay,
            clock,
            events,
            records: HashMap::new(),
            refreshed_at: None,
            refresh_every: Duration::milliseconds(refresh_ms as i64),
        }
    }

    /// Handle one pushed window-change event.
    pub fn on_window_event(&mut self, package: &str) {
        let now = self.clock.now();
        self.refresh_if_stale(now);

        match self.filter.classify(package) {
            FilterDecision::Ignore | FilterDecision::Home => {
                self.overlay.on_navigation_away(now);
            }
            FilterDecision::Candidate => {
                let today = self.clock.today();
                let record = self.records.get(package);
                let verdict = record.map(|r| evaluate(r, now, today));

                self.overlay.on_candidate(package, verdict.as_ref(), now);

                if let (Some(record), Some(verdict)) = (record, verdict) {
                    if verdict.reason != BlockReason::None {
                        let _ = self.events.send(BlockEvent {
                            package: package.to_string(),
                            reason: verdict.reason,
                            remaining_minutes: verdict.remaining_minutes,
                            remaining_days: verdict.remaining_days,
                            daily_limit: record.daily_limit_minutes,
                        });
                    }
                }
            }
        }
    }

    /// Force a reload on the next event, e.g. after a pushed "restrictions
    /// changed" signal.
    pub fn invalidate(&mut self) {
        self.refreshed_at = None;
    }

    fn refresh_if_stale(&mut self, now: DateTime<Utc>) {
        let stale = self
            .refreshed_at
            .map(|at| now.signed_duration_since(at) >= self.refresh_every)
            .unwrap_or(true);
        if !stale {
            return;
        }

        self.records = snapshot::load_active(&self.snapshot_path);
        self.refreshed_at = Some(now);
        debug!(
            "Detector reloaded {} active restriction(s) from snapshot",
            self.records.len()
        );
    }
}

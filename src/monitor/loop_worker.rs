use std::{collections::HashMap, sync::Arc};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{error, info};
use tokio::sync::{broadcast, Mutex};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::events::{BlockEvent, BlockReason};
use crate::foreground::ForegroundProvider;
use crate::limits::{evaluate, LimitMode, LimitStore};

use super::filter::{EventFilter, FilterDecision};
use super::overlay::OverlayController;

pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;

/// Per-day foreground time accounting for daily-limit packages.
///
/// The OS usage oracle is out of reach here, so the loop meters time itself:
/// the usage persisted before metering began plus the foreground time
/// accumulated since, truncated to whole minutes. Totals are monotonic
/// within a day and start over at rollover.
pub(crate) struct UsageMeter {
    day: NaiveDate,
    entries: HashMap<String, MeterEntry>,
}

struct MeterEntry {
    base_minutes: u32,
    foreground_ms: u64,
}

impl UsageMeter {
    pub(crate) fn new(day: NaiveDate) -> Self {
        Self {
            day,
            entries: HashMap::new(),
        }
    }

    /// Credit `elapsed_ms` of foreground time to `package` and return the
    /// total minutes used today. `base_minutes` seeds a package first seen
    /// today with its already-persisted usage.
    pub(crate) fn credit(
        &mut self,
        package: &str,
        base_minutes: u32,
        elapsed_ms: u64,
        today: NaiveDate,
    ) -> u32 {
        if today != self.day {
            self.entries.clear();
            self.day = today;
        }

        let entry = self
            .entries
            .entry(package.to_string())
            .or_insert(MeterEntry {
                base_minutes,
                foreground_ms: 0,
            });
        entry.foreground_ms += elapsed_ms;
        entry.base_minutes + (entry.foreground_ms / 60_000) as u32
    }
}

/// The polling enforcement loop: every tick, resolve the current foreground
/// package through the filter → store → evaluator → overlay pipeline and
/// report metered usage back into the store.
#[allow(clippy::too_many_arguments)]
pub async fn monitor_loop(
    provider: Arc<dyn ForegroundProvider>,
    store: Arc<LimitStore>,
    filter: EventFilter,
    overlay: Arc<Mutex<OverlayController>>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<BlockEvent>,
    tick_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut meter = UsageMeter::new(clock.today());
    let tick_ms = tick_interval.as_millis() as u64;

    info!("Enforcement monitor started ({tick_ms}ms tick)");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let result = run_tick(
                    provider.as_ref(),
                    &store,
                    &filter,
                    &overlay,
                    clock.as_ref(),
                    &events,
                    &mut meter,
                    tick_ms,
                )
                .await;

                // A failed side effect never stops the loop.
                if let Err(err) = result {
                    error!("enforcement tick failed: {err:?}");
                }
            }
            _ = cancel_token.cancelled() => {
                info!("Enforcement monitor shutting down");
                break;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn run_tick(
    provider: &dyn ForegroundProvider,
    store: &LimitStore,
    filter: &EventFilter,
    overlay: &Mutex<OverlayController>,
    clock: &dyn Clock,
    events: &broadcast::Sender<BlockEvent>,
    meter: &mut UsageMeter,
    tick_ms: u64,
) -> Result<()> {
    let now = clock.now();
    let today = clock.today();

    let Some(app) = provider.current() else {
        // An unknown foreground app is an Ignore signal.
        overlay.lock().await.on_navigation_away(now);
        return Ok(());
    };

    match filter.classify(&app.package) {
        FilterDecision::Ignore | FilterDecision::Home => {
            overlay.lock().await.on_navigation_away(now);
        }
        FilterDecision::Candidate => {
            let record = store.get(&app.package);
            let verdict = record.as_ref().map(|r| evaluate(r, now, today));

            overlay
                .lock()
                .await
                .on_candidate(&app.package, verdict.as_ref(), now);

            let (Some(record), Some(verdict)) = (record, verdict) else {
                return Ok(());
            };

            if verdict.reason != BlockReason::None {
                // No subscribers is fine; the send result only counts them.
                let _ = events.send(BlockEvent {
                    package: app.package.clone(),
                    reason: verdict.reason,
                    remaining_minutes: verdict.remaining_minutes,
                    remaining_days: verdict.remaining_days,
                    daily_limit: record.daily_limit_minutes,
                });
            }

            // Polling variant only: feed metered foreground time back into
            // the store so the budget actually drains. The stored value may
            // be ahead of the meter (an external usage report); never regress
            // it within a day.
            if record.is_active && record.mode == LimitMode::DailyLimit {
                let base = record.effective_used_minutes(today);
                let minutes = meter.credit(&app.package, base, tick_ms, today).max(base);
                store
                    .report_usage(&app.package, minutes, today)
                    .with_context(|| format!("failed to persist usage for {}", app.package))?;
            }
        }
    }

    Ok(())
}

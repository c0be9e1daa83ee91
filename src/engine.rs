use std::{collections::HashMap, path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};
use tokio::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::events::BlockEvent;
use crate::foreground::{ForegroundApp, ForegroundProvider};
use crate::limits::{LimitMode, LimitRecord, LimitStore};
use crate::monitor::loop_worker::DEFAULT_TICK_INTERVAL_MS;
use crate::monitor::overlay::DEFAULT_DEBOUNCE_MS;
use crate::monitor::{EventFilter, MonitorController, OverlayController, OverlaySurface};

/// Tunables for one enforcement engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Snapshot file shared with the event-driven detector.
    pub snapshot_path: PathBuf,
    /// Our own package id; never evaluated or blocked.
    pub own_package: String,
    /// Home/launcher surfaces that dismiss the overlay (exact ids).
    pub home_surfaces: Vec<String>,
    /// Home/launcher surfaces matched by prefix.
    pub home_surface_prefixes: Vec<String>,
    /// Polling cadence of the enforcement loop.
    pub tick_interval_ms: u64,
    /// Minimum gap between overlay show-triggers for the same package.
    pub debounce_ms: u64,
}

impl EngineConfig {
    pub fn new(snapshot_path: PathBuf, own_package: impl Into<String>) -> Self {
        Self {
            snapshot_path,
            own_package: own_package.into(),
            home_surfaces: crate::monitor::filter::default_home_exact(),
            home_surface_prefixes: crate::monitor::filter::default_home_prefixes(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// Command surface tying the store, the overlay controller, and the polling
/// monitor together. All commands return `Result`; failures are surfaced to
/// the caller and never take the enforcement loop down.
pub struct Engine {
    config: EngineConfig,
    store: Arc<LimitStore>,
    overlay: Arc<Mutex<OverlayController>>,
    provider: Arc<dyn ForegroundProvider>,
    clock: Arc<dyn Clock>,
    filter: EventFilter,
    events: broadcast::Sender<BlockEvent>,
    monitor: MonitorController,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        provider: Arc<dyn ForegroundProvider>,
        surface: Box<dyn OverlaySurface>,
    ) -> Self {
        Self::with_clock(config, provider, surface, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: EngineConfig,
        provider: Arc<dyn ForegroundProvider>,
        surface: Box<dyn OverlaySurface>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = Arc::new(LimitStore::open(config.snapshot_path.clone()));
        let overlay = Arc::new(Mutex::new(OverlayController::with_debounce(
            surface,
            config.debounce_ms,
        )));
        let filter = EventFilter::with_home_surfaces(
            config.own_package.clone(),
            config.home_surfaces.clone(),
            config.home_surface_prefixes.clone(),
        );
        let (events, _) = broadcast::channel(64);

        Self {
            config,
            store,
            overlay,
            provider,
            clock,
            filter,
            events,
            monitor: MonitorController::new(),
        }
    }

    /// Start the polling enforcement loop. Fails if already running.
    pub fn start(&mut self) -> Result<()> {
        self.monitor.start(
            self.provider.clone(),
            self.store.clone(),
            self.filter.clone(),
            self.overlay.clone(),
            self.clock.clone(),
            self.events.clone(),
            Duration::from_millis(self.config.tick_interval_ms),
        )
    }

    pub async fn stop(&mut self) -> Result<()> {
        self.monitor.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.monitor.is_running()
    }

    /// Restrict `package`. For `Detox` an end timestamp is required; for
    /// `DailyLimit` a non-zero minute budget.
    pub fn add_restriction(
        &self,
        package: &str,
        mode: LimitMode,
        detox_ends_at: Option<DateTime<Utc>>,
        daily_limit_minutes: u32,
    ) -> Result<()> {
        let today = self.clock.today();
        let record = match mode {
            LimitMode::Detox => {
                let Some(ends_at) = detox_ends_at else {
                    bail!("detox restriction requires an end timestamp");
                };
                LimitRecord::detox(package, ends_at, today)
            }
            LimitMode::DailyLimit => {
                if daily_limit_minutes == 0 {
                    bail!("daily limit must be greater than zero");
                }
                LimitRecord::daily_limit(package, daily_limit_minutes, today)
            }
        };
        self.store.add(record)
    }

    /// Lift a restriction entirely. A matching overlay hides immediately
    /// rather than waiting for the next navigation event.
    pub async fn remove_restriction(&self, package: &str) -> Result<()> {
        if self.store.remove(package)? {
            self.overlay
                .lock()
                .await
                .on_restriction_removed(package, self.clock.now());
        }
        Ok(())
    }

    /// The user gave up on this restriction: streak broken, record kept but
    /// inactive, overlay hidden.
    pub async fn cancel_restriction(&self, package: &str) -> Result<()> {
        if self.store.deactivate(package)? {
            self.overlay
                .lock()
                .await
                .on_restriction_removed(package, self.clock.now());
        }
        Ok(())
    }

    /// Overwrite today's usage for `package` (e.g. from an external usage
    /// oracle). Unknown packages are a no-op.
    pub fn report_usage(&self, package: &str, minutes: u32) -> Result<()> {
        self.store.report_usage(package, minutes, self.clock.today())
    }

    /// Every restriction on record, active or not.
    pub fn restrictions(&self) -> HashMap<String, LimitRecord> {
        self.store.all()
    }

    pub fn current_foreground(&self) -> Option<ForegroundApp> {
        self.provider.current()
    }

    /// Subscribe to enforcement notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<BlockEvent> {
        self.events.subscribe()
    }

    /// The store backing this engine, for embedding code that needs direct
    /// read access.
    pub fn store(&self) -> &Arc<LimitStore> {
        &self.store
    }
}

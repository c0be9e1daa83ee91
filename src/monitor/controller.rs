use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::events::BlockEvent;
use crate::foreground::ForegroundProvider;
use crate::limits::LimitStore;

use super::filter::EventFilter;
use super::loop_worker::monitor_loop;
use super::overlay::OverlayController;

/// Owns the polling loop task: at most one runs at a time.
pub struct MonitorController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl MonitorController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        provider: Arc<dyn ForegroundProvider>,
        store: Arc<LimitStore>,
        filter: EventFilter,
        overlay: Arc<Mutex<OverlayController>>,
        clock: Arc<dyn Clock>,
        events: broadcast::Sender<BlockEvent>,
        tick_interval: Duration,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("monitor already active");
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        let handle = tokio::spawn(monitor_loop(
            provider,
            store,
            filter,
            overlay,
            clock,
            events,
            tick_interval,
            token_clone,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("monitor loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for MonitorController {
    fn default() -> Self {
        Self::new()
    }
}

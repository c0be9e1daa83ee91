use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use crate::limits::Verdict;

/// Platform capability that can put up and tear down the blocking modal.
///
/// Both calls are expected to be idempotent; calling `dismiss` with nothing
/// shown is fine.
pub trait OverlaySurface: Send {
    fn present(&mut self, package: &str) -> Result<()>;
    fn dismiss(&mut self) -> Result<()>;
}

/// Whether the blocking modal is up, and for which package.
///
/// Lives only in the controller's memory; a restarted process starts over at
/// `Hidden` and re-derives everything from the next events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayState {
    Hidden,
    Showing {
        package: String,
        shown_at: DateTime<Utc>,
    },
}

/// Minimum gap between successive show-triggers for the same package.
pub const DEFAULT_DEBOUNCE_MS: u64 = 2_000;

/// Owns the overlay lifecycle: show / keep / hide decisions, the debounce
/// window, and the guarantee that at most one overlay window is ever active.
pub struct OverlayController {
    surface: Box<dyn OverlaySurface>,
    state: OverlayState,
    debounce: Duration,
    /// Package most recently shown or dismissed, and when. Drives debounce.
    last_trigger: Option<(String, DateTime<Utc>)>,
}

impl OverlayController {
    pub fn new(surface: Box<dyn OverlaySurface>) -> Self {
        Self::with_debounce(surface, DEFAULT_DEBOUNCE_MS)
    }

    pub fn with_debounce(surface: Box<dyn OverlaySurface>, debounce_ms: u64) -> Self {
        Self {
            surface,
            state: OverlayState::Hidden,
            debounce: Duration::milliseconds(debounce_ms as i64),
            last_trigger: None,
        }
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn showing_package(&self) -> Option<&str> {
        match &self.state {
            OverlayState::Showing { package, .. } => Some(package),
            OverlayState::Hidden => None,
        }
    }

    /// A candidate navigation event. `verdict` is `None` when the package is
    /// not in the restriction set.
    pub fn on_candidate(&mut self, package: &str, verdict: Option<&Verdict>, now: DateTime<Utc>) {
        let blocked = verdict.map(|v| v.blocked).unwrap_or(false);

        match &self.state {
            OverlayState::Showing { package: shown, .. } if shown == package => {
                // Same package still in front: the existing overlay stays up.
                // Re-presenting here is what causes visible flicker, since
                // these repeat events arrive many times per second.
            }
            OverlayState::Showing { .. } if blocked => self.replace(package, now),
            OverlayState::Showing { .. } => {
                // Restricted apps surface internal events under names that
                // look like other packages; never auto-hide on those. Only a
                // home/self navigation or an explicit removal hides.
            }
            OverlayState::Hidden if blocked => self.show(package, now),
            OverlayState::Hidden => {}
        }
    }

    /// The user navigated to home/shell or to our own surfaces: hard dismiss.
    pub fn on_navigation_away(&mut self, now: DateTime<Utc>) {
        self.hide(now);
    }

    /// A restriction was lifted while its overlay may be up; takes effect
    /// immediately rather than waiting for the next event.
    pub fn on_restriction_removed(&mut self, package: &str, now: DateTime<Utc>) {
        if self.showing_package() == Some(package) {
            self.hide(now);
        }
    }

    fn show(&mut self, package: &str, now: DateTime<Utc>) {
        if self.debounced(package, now) {
            debug!("Overlay re-show for {package} suppressed by debounce");
            return;
        }

        match self.surface.present(package) {
            Ok(()) => {
                info!("Overlay presented for {package}");
                self.state = OverlayState::Showing {
                    package: package.to_string(),
                    shown_at: now,
                };
            }
            Err(err) => {
                // Stay Hidden so the next qualifying event retries; listeners
                // still get notified, which is the degraded mode.
                warn!("Overlay presentation failed for {package}: {err:#}");
            }
        }
        self.last_trigger = Some((package.to_string(), now));
    }

    /// Swap the overlay to another blocked package: the old window must be
    /// released before the next one is acquired.
    fn replace(&mut self, package: &str, now: DateTime<Utc>) {
        if let Err(err) = self.surface.dismiss() {
            warn!("Overlay dismiss failed: {err:#}");
        }
        self.state = OverlayState::Hidden;

        match self.surface.present(package) {
            Ok(()) => {
                info!("Overlay moved to {package}");
                self.state = OverlayState::Showing {
                    package: package.to_string(),
                    shown_at: now,
                };
            }
            Err(err) => {
                warn!("Overlay presentation failed for {package}: {err:#}");
            }
        }
        self.last_trigger = Some((package.to_string(), now));
    }

    fn hide(&mut self, now: DateTime<Utc>) {
        let OverlayState::Showing { package, .. } = &self.state else {
            return;
        };
        let package = package.clone();

        if let Err(err) = self.surface.dismiss() {
            warn!("Overlay dismiss failed for {package}: {err:#}");
        }
        info!("Overlay dismissed for {package}");
        self.state = OverlayState::Hidden;
        self.last_trigger = Some((package, now));
    }

    fn debounced(&self, package: &str, now: DateTime<Utc>) -> bool {
        match &self.last_trigger {
            Some((last, at)) => last == package && now.signed_duration_since(*at) < self.debounce,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::BlockReason;
    use crate::test_support::{utc, RecordingSurface, SurfaceCall};
    use chrono::Duration;

    fn blocked_verdict() -> Verdict {
        Verdict {
            blocked: true,
            reason: BlockReason::LimitExceeded,
            remaining_minutes: 0,
            remaining_days: 0,
        }
    }

    fn warning_verdict() -> Verdict {
        Verdict {
            blocked: false,
            reason: BlockReason::LimitWarning,
            remaining_minutes: 5,
            remaining_days: 0,
        }
    }

    fn controller() -> (OverlayController, RecordingSurface) {
        let surface = RecordingSurface::new();
        let controller = OverlayController::with_debounce(Box::new(surface.clone()), 2_000);
        (controller, surface)
    }

    #[test]
    fn blocked_candidate_presents_the_overlay() {
        let (mut controller, surface) = controller();
        let now = utc(2024, 1, 1, 12, 0, 0);

        controller.on_candidate("app.x", Some(&blocked_verdict()), now);

        assert_eq!(controller.showing_package(), Some("app.x"));
        assert_eq!(surface.calls(), vec![SurfaceCall::Present("app.x".into())]);
    }

    #[test]
    fn unrestricted_candidate_from_hidden_is_a_noop() {
        let (mut controller, surface) = controller();

        controller.on_candidate("app.other", None, utc(2024, 1, 1, 12, 0, 0));

        assert_eq!(controller.state(), &OverlayState::Hidden);
        assert!(surface.calls().is_empty());
    }

    #[test]
    fn warning_verdict_does_not_present() {
        let (mut controller, surface) = controller();

        controller.on_candidate("app.x", Some(&warning_verdict()), utc(2024, 1, 1, 12, 0, 0));

        assert_eq!(controller.state(), &OverlayState::Hidden);
        assert!(surface.calls().is_empty());
    }

    #[test]
    fn repeated_events_for_the_shown_package_keep_one_overlay() {
        let (mut controller, surface) = controller();
        let mut now = utc(2024, 1, 1, 12, 0, 0);

        controller.on_candidate("app.x", Some(&blocked_verdict()), now);
        for _ in 0..10 {
            now += Duration::seconds(1);
            controller.on_candidate("app.x", Some(&blocked_verdict()), now);
        }

        assert_eq!(surface.calls(), vec![SurfaceCall::Present("app.x".into())]);
    }

    #[test]
    fn show_triggers_within_debounce_window_present_once() {
        let (mut controller, surface) = controller();
        let now = utc(2024, 1, 1, 12, 0, 0);

        controller.on_candidate("app.x", Some(&blocked_verdict()), now);
        controller.on_navigation_away(now + Duration::milliseconds(100));
        // Re-entering the app inside the debounce window must not re-show.
        controller.on_candidate(
            "app.x",
            Some(&blocked_verdict()),
            now + Duration::milliseconds(600),
        );

        assert_eq!(
            surface.calls(),
            vec![
                SurfaceCall::Present("app.x".into()),
                SurfaceCall::Dismiss,
            ]
        );
        assert_eq!(controller.state(), &OverlayState::Hidden);
    }

    #[test]
    fn show_trigger_after_debounce_window_presents_again() {
        let (mut controller, surface) = controller();
        let now = utc(2024, 1, 1, 12, 0, 0);

        controller.on_candidate("app.x", Some(&blocked_verdict()), now);
        controller.on_navigation_away(now + Duration::seconds(1));
        controller.on_candidate("app.x", Some(&blocked_verdict()), now + Duration::seconds(4));

        assert_eq!(
            surface.calls(),
            vec![
                SurfaceCall::Present("app.x".into()),
                SurfaceCall::Dismiss,
                SurfaceCall::Present("app.x".into()),
            ]
        );
    }

    #[test]
    fn another_blocked_package_replaces_the_overlay() {
        let (mut controller, surface) = controller();
        let now = utc(2024, 1, 1, 12, 0, 0);

        controller.on_candidate("app.x", Some(&blocked_verdict()), now);
        controller.on_candidate("app.y", Some(&blocked_verdict()), now + Duration::seconds(5));

        assert_eq!(controller.showing_package(), Some("app.y"));
        assert_eq!(
            surface.calls(),
            vec![
                SurfaceCall::Present("app.x".into()),
                SurfaceCall::Dismiss,
                SurfaceCall::Present("app.y".into()),
            ]
        );
    }

    #[test]
    fn unrestricted_candidate_does_not_hide_a_showing_overlay() {
        let (mut controller, surface) = controller();
        let now = utc(2024, 1, 1, 12, 0, 0);

        controller.on_candidate("app.x", Some(&blocked_verdict()), now);
        // Internal sub-view events of the blocked app arrive under names that
        // look like other packages.
        controller.on_candidate("app.x.internal", None, now + Duration::seconds(1));

        assert_eq!(controller.showing_package(), Some("app.x"));
        assert_eq!(surface.calls(), vec![SurfaceCall::Present("app.x".into())]);
    }

    #[test]
    fn navigation_away_always_dismisses() {
        let (mut controller, surface) = controller();
        let now = utc(2024, 1, 1, 12, 0, 0);

        controller.on_candidate("app.x", Some(&blocked_verdict()), now);
        controller.on_navigation_away(now + Duration::seconds(3));

        assert_eq!(controller.state(), &OverlayState::Hidden);
        assert_eq!(
            surface.calls(),
            vec![SurfaceCall::Present("app.x".into()), SurfaceCall::Dismiss]
        );
    }

    #[test]
    fn navigation_away_while_hidden_is_a_noop() {
        let (mut controller, surface) = controller();

        controller.on_navigation_away(utc(2024, 1, 1, 12, 0, 0));

        assert!(surface.calls().is_empty());
    }

    #[test]
    fn restriction_removed_hides_the_matching_overlay_immediately() {
        let (mut controller, surface) = controller();
        let now = utc(2024, 1, 1, 12, 0, 0);

        controller.on_candidate("app.x", Some(&blocked_verdict()), now);
        controller.on_restriction_removed("app.x", now + Duration::seconds(1));

        assert_eq!(controller.state(), &OverlayState::Hidden);
        assert_eq!(
            surface.calls(),
            vec![SurfaceCall::Present("app.x".into()), SurfaceCall::Dismiss]
        );
    }

    #[test]
    fn restriction_removed_for_another_package_changes_nothing() {
        let (mut controller, surface) = controller();
        let now = utc(2024, 1, 1, 12, 0, 0);

        controller.on_candidate("app.x", Some(&blocked_verdict()), now);
        controller.on_restriction_removed("app.y", now + Duration::seconds(1));

        assert_eq!(controller.showing_package(), Some("app.x"));
        assert_eq!(surface.calls(), vec![SurfaceCall::Present("app.x".into())]);
    }

    #[test]
    fn failed_presentation_leaves_the_machine_hidden() {
        let surface = RecordingSurface::new();
        surface.fail_present(true);
        let mut controller = OverlayController::with_debounce(Box::new(surface.clone()), 2_000);
        let now = utc(2024, 1, 1, 12, 0, 0);

        controller.on_candidate("app.x", Some(&blocked_verdict()), now);
        assert_eq!(controller.state(), &OverlayState::Hidden);

        // Once the platform recovers, the next event outside the debounce
        // window presents normally.
        surface.fail_present(false);
        controller.on_candidate("app.x", Some(&blocked_verdict()), now + Duration::seconds(3));
        assert_eq!(controller.showing_package(), Some("app.x"));
    }
}

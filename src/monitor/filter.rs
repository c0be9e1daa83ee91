/// Where a raw foreground event should be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Our own surfaces, or an unknown/empty package. Never evaluated, and
    /// clears any overlay (returning to our own app is leaving the blocked
    /// one).
    Ignore,
    /// The launcher / home / system shell. Hard dismiss signal.
    Home,
    /// Anything else; resolved downstream by restriction-set membership.
    Candidate,
}

const DEFAULT_HOME_EXACT: &[&str] = &["com.android.systemui", "com.android.launcher3"];
const DEFAULT_HOME_PREFIXES: &[&str] = &["com.google.android.apps.nexuslauncher"];

pub(crate) fn default_home_exact() -> Vec<String> {
    DEFAULT_HOME_EXACT.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn default_home_prefixes() -> Vec<String> {
    DEFAULT_HOME_PREFIXES.iter().map(|s| s.to_string()).collect()
}

/// Classifies raw package-name events before any restriction lookup.
///
/// The OS emits many internal events per second from within the same visible
/// app (sub-views, toasts) under names that are neither home nor self; those
/// must land in `Candidate`, where an absent restriction record makes them
/// harmless.
#[derive(Debug, Clone)]
pub struct EventFilter {
    own_package: String,
    home_exact: Vec<String>,
    home_prefixes: Vec<String>,
}

impl EventFilter {
    /// Filter for `own_package` with the stock home/shell surfaces.
    pub fn new(own_package: impl Into<String>) -> Self {
        Self {
            own_package: own_package.into(),
            home_exact: default_home_exact(),
            home_prefixes: default_home_prefixes(),
        }
    }

    /// Filter with a custom set of home/shell surfaces.
    pub fn with_home_surfaces(
        own_package: impl Into<String>,
        home_exact: Vec<String>,
        home_prefixes: Vec<String>,
    ) -> Self {
        Self {
            own_package: own_package.into(),
            home_exact,
            home_prefixes,
        }
    }

    pub fn classify(&self, package: &str) -> FilterDecision {
        if package.is_empty() || package == self.own_package {
            return FilterDecision::Ignore;
        }
        if self.home_exact.iter().any(|home| home == package)
            || self
                .home_prefixes
                .iter()
                .any(|prefix| package.starts_with(prefix.as_str()))
        {
            return FilterDecision::Home;
        }
        FilterDecision::Candidate
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The most recently active application, as reported by the platform probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForegroundApp {
    pub package: String,
    /// When this package last became the foreground app.
    pub active_since: DateTime<Utc>,
}

impl ForegroundApp {
    pub fn new(package: impl Into<String>, active_since: DateTime<Utc>) -> Self {
        Self {
            package: package.into(),
            active_since,
        }
    }
}

/// Opaque supplier of the current foreground application.
///
/// Implementations wrap whatever platform facility reports app switches.
/// `None` means the platform could not name a foreground app right now; the
/// pipeline treats that the same as an event for our own surfaces.
pub trait ForegroundProvider: Send + Sync {
    fn current(&self) -> Option<ForegroundApp>;
}

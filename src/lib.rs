//! Digital-wellbeing enforcement engine.
//!
//! Watches which application is in the foreground and, for applications the
//! user has restricted (a fixed-term detox or a rolling daily limit), blocks
//! interaction by driving a full-screen overlay. Platform concerns — how the
//! foreground app is detected, how the overlay is drawn — stay behind the
//! [`ForegroundProvider`] and [`OverlaySurface`] traits.

pub mod clock;
pub mod engine;
pub mod events;
pub mod foreground;
pub mod limits;
pub mod monitor;

#[cfg(test)]
mod test_support;

pub use clock::{Clock, SystemClock};
pub use engine::{Engine, EngineConfig};
pub use events::{BlockEvent, BlockReason};
pub use foreground::{ForegroundApp, ForegroundProvider};
pub use limits::{evaluate, LimitMode, LimitRecord, LimitStore, Verdict};
pub use monitor::{
    Detector, EventFilter, FilterDecision, MonitorController, OverlayController, OverlayState,
    OverlaySurface,
};

/// Initialize logging for embedding binaries (reads `RUST_LOG`).
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}

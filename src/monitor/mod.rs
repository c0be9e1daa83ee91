pub mod controller;
pub mod detector;
pub mod filter;
pub mod loop_worker;
pub mod overlay;

pub use controller::MonitorController;
pub use detector::Detector;
pub use filter::{EventFilter, FilterDecision};
pub use overlay::{OverlayController, OverlayState, OverlaySurface};

use serde::{Deserialize, Serialize};

/// Why access to a package is (or is about to be) denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockReason {
    None,
    DetoxActive,
    LimitExceeded,
    LimitWarning,
}

/// Enforcement notification broadcast to UI listeners.
///
/// Emitted on every tick/event that resolves to a restricted package, so a
/// listener can surface "time remaining" notices as well as hard blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockEvent {
    pub package: String,
    pub reason: BlockReason,
    pub remaining_minutes: i64,
    pub remaining_days: i64,
    pub daily_limit: u32,
}

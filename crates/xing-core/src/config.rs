//! Controller run-time configuration.

use std::time::Duration;

/// Pacing configuration for the controller's background tasks.
///
/// These are the only recognized run-time options of the engine itself;
/// policy-specific timing (light phase durations) travels with the policy,
/// and the empirical motion constants are fixed in the policy modules.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlConfig {
    /// Wall-clock pause between update-task iterations — one simulation tick
    /// per interval.  Default 100 ms (10 ticks/s).
    pub tick_interval: Duration,

    /// Wall-clock pause between admission-task polls of the entry queue.
    /// Admission is gated per origin per tick, so polling much faster than
    /// `tick_interval` only reduces admission latency, never order.
    pub admission_poll: Duration,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            admission_poll: Duration::from_millis(1),
        }
    }
}

impl ControlConfig {
    /// A config with the given tick interval and the default admission poll.
    pub fn with_tick_interval(tick_interval: Duration) -> Self {
        Self { tick_interval, ..Self::default() }
    }
}

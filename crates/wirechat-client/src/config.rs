//! Channel tuning knobs.

use crate::backoff::ReconnectPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`ChannelManager`](crate::ChannelManager).
///
/// All durations are in milliseconds so the struct maps directly onto a
/// config file section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Period between heartbeat pings.
    pub heartbeat_interval_ms: u64,
    /// Reconnect attempts allowed after a drop before giving up.
    pub max_reconnect_attempts: u32,
    /// Delay before the first reconnect attempt; doubles on each attempt.
    pub reconnect_base_delay_ms: u64,
    /// Ceiling on the reconnect delay. Unbounded when unset.
    pub reconnect_max_delay_ms: Option<u64>,
    /// Add up to half the delay again as random jitter.
    pub reconnect_jitter: bool,
    /// Close the connection if no pong arrives this long after a ping.
    /// No deadline when unset.
    pub pong_timeout_ms: Option<u64>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 30_000,
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1_000,
            reconnect_max_delay_ms: None,
            reconnect_jitter: false,
            pong_timeout_ms: None,
        }
    }
}

impl ChannelConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic.
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }

    pub fn pong_timeout(&self) -> Option<Duration> {
        self.pong_timeout_ms.map(Duration::from_millis)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_attempts: self.max_reconnect_attempts,
            base_delay: Duration::from_millis(self.reconnect_base_delay_ms),
            max_delay: self.reconnect_max_delay_ms.map(Duration::from_millis),
            jitter: self.reconnect_jitter,
        }
    }
}

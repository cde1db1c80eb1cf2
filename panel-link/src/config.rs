//! Link configuration
//!
//! Framing parameters must match the peer. Retry timing is local and may
//! differ per endpoint.

use embassy_time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use panel_link_protocol::{ConfigError, FramerConfig};

/// Default wait for an ACK before retransmitting
pub const DEFAULT_RETRY_INTERVAL_MS: u32 = 1000;

/// Default number of transmissions per frame
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Default wait for a free transmit buffer
pub const DEFAULT_POOL_TIMEOUT_MS: u32 = 1000;

/// Retransmission policy
///
/// A frame is transmitted up to `attempts` times, waiting `interval_ms`
/// for its ACK after each transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct RetryPolicy {
    /// Time to wait for an ACK after each transmission
    pub interval_ms: u32,
    /// Total transmissions, the first one included
    pub attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Create a policy
    pub const fn new(interval_ms: u32, attempts: u32) -> Self {
        Self {
            interval_ms,
            attempts,
        }
    }

    /// Interval as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms as u64)
    }

    /// Longest time a send can wait for its ACK
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.interval_ms as u64 * self.attempts as u64)
    }

    /// Check the policy allows at least one transmission
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attempts == 0 {
            return Err(ConfigError::ZeroRetryCount);
        }
        Ok(())
    }
}

/// Complete link configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct LinkConfig {
    /// Frame format, shared with the peer
    pub framing: FramerConfig,
    /// Default retry policy for sends
    pub retry: RetryPolicy,
    /// Wait for a free transmit buffer before giving up
    pub pool_timeout_ms: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            framing: FramerConfig::default(),
            retry: RetryPolicy::default(),
            pool_timeout_ms: DEFAULT_POOL_TIMEOUT_MS,
        }
    }
}

impl LinkConfig {
    /// Pool timeout as a duration
    pub fn pool_timeout(&self) -> Duration {
        Duration::from_millis(self.pool_timeout_ms as u64)
    }

    /// Check the configuration against payload capacity `capacity` and
    /// transmit frame size `frame_size`
    pub fn validate(&self, capacity: usize, frame_size: usize) -> Result<(), ConfigError> {
        self.framing.validate(capacity)?;
        self.retry.validate()?;
        let largest = panel_link_protocol::calc_frame_size(
            self.framing.magic.len(),
            self.framing.max_payload as usize,
        );
        if frame_size < largest {
            return Err(ConfigError::BufferTooSmall);
        }
        Ok(())
    }
}

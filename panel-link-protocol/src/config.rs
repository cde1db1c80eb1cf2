//! Framing configuration
//!
//! Both endpoints must agree on the magic marker and the maximum payload
//! size out-of-band; nothing here is negotiated on the wire.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::frame::{DEFAULT_MAGIC, DEFAULT_MAX_PAYLOAD};

/// Longest supported magic marker
pub const MAX_MAGIC_LEN: usize = 4;

/// Raw storage for a magic marker
pub type MagicBytes = Vec<u8, MAX_MAGIC_LEN>;

/// Configuration errors
///
/// These are the only errors treated as fatal: they are reported when a
/// decoder or link is constructed and mean it must not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Magic marker is empty or longer than [`MAX_MAGIC_LEN`]
    InvalidMagic,
    /// Configured maximum payload exceeds the compile-time capacity
    PayloadCapacityExceeded,
    /// A buffer cannot hold a maximum-size frame
    BufferTooSmall,
    /// Retry policy allows no transmission at all
    ZeroRetryCount,
    /// Decoder framing differs from the link's
    FramingMismatch,
}

/// Frame start marker
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "MagicBytes", into = "MagicBytes")
)]
pub struct Magic {
    bytes: MagicBytes,
}

impl Magic {
    /// Create a magic marker from 1 to [`MAX_MAGIC_LEN`] bytes
    pub fn new(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.is_empty() {
            return Err(ConfigError::InvalidMagic);
        }
        let bytes = Vec::from_slice(bytes).map_err(|_| ConfigError::InvalidMagic)?;
        Ok(Self { bytes })
    }

    /// Marker bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Marker length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a magic marker has at least one byte
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// First marker byte, where resynchronization restarts
    pub fn first(&self) -> u8 {
        self.bytes[0]
    }
}

impl Default for Magic {
    fn default() -> Self {
        Self {
            bytes: Vec::from_slice(&DEFAULT_MAGIC).unwrap_or_default(),
        }
    }
}

impl TryFrom<MagicBytes> for Magic {
    type Error = ConfigError;

    fn try_from(bytes: MagicBytes) -> Result<Self, Self::Error> {
        if bytes.is_empty() {
            return Err(ConfigError::InvalidMagic);
        }
        Ok(Self { bytes })
    }
}

impl From<Magic> for MagicBytes {
    fn from(magic: Magic) -> Self {
        magic.bytes
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            ConfigError::InvalidMagic => "magic must be 1 to 4 bytes",
            ConfigError::PayloadCapacityExceeded => "max payload exceeds capacity",
            ConfigError::BufferTooSmall => "buffer cannot hold a maximum-size frame",
            ConfigError::ZeroRetryCount => "retry count must be at least 1",
            ConfigError::FramingMismatch => "decoder framing differs from the link",
        };
        f.write_str(msg)
    }
}

/// Decoder configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct FramerConfig {
    /// Frame start marker
    pub magic: Magic,
    /// Largest accepted payload; longer declared lengths are rejected
    pub max_payload: u16,
    /// Accept DATA frames with an empty payload
    ///
    /// Off by default: a zero length DATA frame is treated as line noise.
    pub allow_empty_data: bool,
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            magic: Magic::default(),
            max_payload: DEFAULT_MAX_PAYLOAD as u16,
            allow_empty_data: false,
        }
    }
}

impl FramerConfig {
    /// Check the configuration against a decoder payload capacity
    pub fn validate(&self, capacity: usize) -> Result<(), ConfigError> {
        if self.magic.is_empty() {
            return Err(ConfigError::InvalidMagic);
        }
        if self.max_payload as usize > capacity {
            return Err(ConfigError::PayloadCapacityExceeded);
        }
        Ok(())
    }
}

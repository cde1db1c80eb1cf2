//! Link error types

use panel_link_protocol::FrameError;
use panel_link_hal::Fault;

/// Why a send did not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// Payload exceeds the configured maximum
    PayloadTooLarge,
    /// DATA frames must carry a payload
    EmptyPayload,
    /// Send queue stayed full for the whole retry budget
    QueueFull,
    /// No transmit buffer became free in time
    PoolExhausted,
    /// No ACK after every attempt
    Exhausted {
        /// Sequence number the frame was sent with
        sequence: u16,
        /// Transmissions made
        attempts: u32,
    },
    /// Transport write failed
    Transport(Fault),
}

impl From<FrameError> for SendError {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::EmptyData => SendError::EmptyPayload,
            _ => SendError::PayloadTooLarge,
        }
    }
}

impl core::fmt::Display for SendError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SendError::PayloadTooLarge => f.write_str("payload too large"),
            SendError::EmptyPayload => f.write_str("empty payload"),
            SendError::QueueFull => f.write_str("send queue full"),
            SendError::PoolExhausted => f.write_str("no transmit buffer available"),
            SendError::Exhausted { sequence, attempts } => {
                write!(f, "frame {} not acknowledged after {} attempts", sequence, attempts)
            }
            SendError::Transport(fault) => write!(f, "transport fault: {:?}", fault),
        }
    }
}

/// Every ack-wait slot is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegistryFull;

/// No ACK arrived before the deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AckTimeout;

/// No transmit buffer was returned before the deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PoolTimeout;

impl From<PoolTimeout> for SendError {
    fn from(_: PoolTimeout) -> Self {
        SendError::PoolExhausted
    }
}

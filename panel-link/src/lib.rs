//! Reliable panel link
//!
//! Acknowledged, retrying delivery of small payloads between the control
//! panel and its host, over any transport implementing the
//! `panel-link-hal` traits.
//!
//! ```text
//!   send / enqueue                         PayloadHandler
//!        │                                       ▲
//!        ▼                                       │
//! ┌──────────────┐   wait    ┌──────────┐   ┌──────────────┐
//! │ Link         │◄──────────┤ registry │◄──┤ LinkReceiver │
//! │ seq, pool,   │           └──────────┘ ACK│ decoder,     │
//! │ retry        │◄─────── send_ack ─────────┤ dedup        │
//! └──────┬───────┘                 DATA      └──────▲───────┘
//!        │ FrameTx (one write at a time)            │ FrameRx
//!        ▼                                          │
//!   ════════════════════ transport ═════════════════╧════
//! ```
//!
//! - Every DATA frame gets a fresh sequence number and is retransmitted
//!   until the peer ACKs it or the retry budget runs out.
//! - Every received DATA frame is ACKed at once, then delivered to the
//!   handler unless it is a retransmission already delivered.
//!
//! Frames can be sent inline with [`Link::send`], which returns once the
//! outcome is known, or queued with [`Link::enqueue`] for a task running
//! [`Link::run_sender`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to the other modules
mod fmt;

pub mod config;
pub mod error;
pub mod handler;
pub mod link;
pub mod pool;
pub mod receiver;
pub mod registry;
pub mod sequence;

#[cfg(test)]
mod testing;

pub use config::{LinkConfig, RetryPolicy};
pub use error::{AckTimeout, PoolTimeout, RegistryFull, SendError};
pub use handler::PayloadHandler;
pub use link::{Link, PendingFrame, DEFAULT_QUEUE_DEPTH};
pub use pool::{FramePool, PoolBuffer, TX_POOL_BLOCKS};
pub use receiver::{LinkReceiver, RECENT_SEQUENCES};
pub use registry::{AckRegistry, AckWait, ACK_SLOTS};
pub use sequence::SequenceCounter;

pub use panel_link_hal::{Fault, FrameRx, FrameTx};
pub use panel_link_protocol::{BufferedFramer, ConfigError, FrameDecoder, Framer, FramerConfig, Magic};

//! Panel-link wire protocol
//!
//! This crate defines the framing used between the control-panel device
//! and its host over any byte transport (UART, Bluetooth SPP). It turns a
//! continuous, possibly corrupted byte stream into integrity-checked frames
//! and back.
//!
//! # Frame format
//!
//! ```text
//! ┌───────┬────────┬──────────┬──────┬─────────────┬───────┐
//! │ MAGIC │ LENGTH │ SEQUENCE │ TYPE │ PAYLOAD     │ CRC16 │
//! │ 1–4B  │ 2B BE  │ 2B BE    │ 1B   │ LENGTH B    │ 2B BE │
//! └───────┴────────┴──────────┴──────┴─────────────┴───────┘
//! ```
//!
//! The CRC16-CCITT covers every byte before it, magic included. TYPE is
//! `0` for DATA and `1` for ACK; an ACK carries the sequence of the DATA
//! frame it acknowledges and no payload.
//!
//! Two decoders are provided behind [`FrameDecoder`]: [`Framer`], a
//! byte-at-a-time state machine, and [`BufferedFramer`], which parses whole
//! frames out of a receive buffer. Both produce the same frames regardless
//! of how the input is chunked.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to the other modules
mod fmt;

pub mod buffered;
pub mod config;
pub mod crc;
pub mod decoder;
pub mod frame;
pub mod frame_buffer;
pub mod framer;
pub mod scanner;
pub mod sequence;

pub use buffered::BufferedFramer;
pub use config::{ConfigError, FramerConfig, Magic, MAX_MAGIC_LEN};
pub use crc::{crc16_ccitt, Crc16};
pub use decoder::{decode_all, FrameDecoder};
pub use frame::{
    calc_frame_size, Frame, FrameError, FrameType, DEFAULT_MAGIC, DEFAULT_MAX_FRAME,
    DEFAULT_MAX_PAYLOAD, MAX_ACK_FRAME_SIZE, MAX_FRAME_OVERHEAD,
};
pub use framer::Framer;
pub use sequence::{is_newer, RecentSequences};

//! Panel-link transport abstraction
//!
//! This crate defines what the link needs from a byte transport, so the
//! same link code runs over a UART, a Bluetooth SPP channel or an
//! in-memory pipe.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  panel-link (ack, retry, dispatch)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  panel-link-hal (this crate - traits)   │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ embedded-io-  │       │ pipe          │
//! │ async drivers │       │ (loopback)    │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`transport::FrameTx`] - Write complete frames
//! - [`transport::FrameRx`] - Read arbitrarily chunked bytes

#![no_std]
#![deny(unsafe_code)]

pub mod pipe;
pub mod transport;

// Re-export key traits at crate root for convenience
pub use pipe::{Endpoint, Loopback, PipeRx, PipeTx};
pub use transport::{Fault, FrameRx, FrameTx};

//! Byte transport abstractions
//!
//! The link only needs two primitives from a transport: write a complete
//! frame, and read whatever bytes have arrived. Any `embedded-io-async`
//! reader or writer (a buffered UART, a Bluetooth SPP channel, an
//! in-memory pipe) provides them through the blanket implementations.

use core::future::Future;

use embedded_io::{Error, ErrorKind};
use embedded_io_async::{Read, Write};

/// Frame transmitter
///
/// Async trait for writing encoded frames to a transport.
pub trait FrameTx {
    /// Error type for transmit operations
    type Error: Error;

    /// Write a complete encoded frame
    ///
    /// Waits under backpressure; returns only once every byte has been
    /// handed to the transport.
    fn write_frame(&mut self, frame: &[u8]) -> impl Future<Output = Result<(), Self::Error>>;
}

impl<W: Write> FrameTx for W {
    type Error = W::Error;

    async fn write_frame(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        self.write_all(frame).await?;
        self.flush().await
    }
}

/// Byte receiver
///
/// Async trait for reading arbitrarily chunked bytes from a transport.
pub trait FrameRx {
    /// Error type for receive operations
    type Error: Error;

    /// Wait for received bytes
    ///
    /// Returns the number of bytes placed at the start of `buf`.
    fn receive(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, Self::Error>>;
}

impl<R: Read> FrameRx for R {
    type Error = R::Error;

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.read(buf).await
    }
}

/// Transport failure class
///
/// Every fault invalidates a partially received frame. None of them is
/// fatal to the link; the sender's retries recover the lost frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// Receive buffer or FIFO overflowed, bytes were lost
    Overrun,
    /// Parity, framing or noise error on the line
    Corrupted,
    /// Peer or link went away
    Disconnected,
    /// Anything else
    Other,
}

impl Fault {
    /// Classify a transport error
    pub fn classify<E: Error>(err: &E) -> Self {
        Self::from_kind(err.kind())
    }

    /// Classify an `embedded-io` error kind
    pub fn from_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::OutOfMemory => Fault::Overrun,
            ErrorKind::InvalidData => Fault::Corrupted,
            ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe => Fault::Disconnected,
            _ => Fault::Other,
        }
    }
}

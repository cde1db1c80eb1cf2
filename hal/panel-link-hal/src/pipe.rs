//! In-memory transport
//!
//! A pair of byte pipes connecting two endpoints, for loopback and host
//! testing. Endpoints borrow the pipes they use, so any number of
//! independent links can coexist.

use core::convert::Infallible;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::pipe::Pipe;
use embedded_io::ErrorType;
use embedded_io_async::{Read, Write};

/// Write half of a pipe
pub struct PipeTx<'p, M: RawMutex, const N: usize> {
    pipe: &'p Pipe<M, N>,
}

/// Read half of a pipe
pub struct PipeRx<'p, M: RawMutex, const N: usize> {
    pipe: &'p Pipe<M, N>,
}

/// Split a pipe into its write and read halves
pub fn split<M: RawMutex, const N: usize>(pipe: &Pipe<M, N>) -> (PipeTx<'_, M, N>, PipeRx<'_, M, N>) {
    (PipeTx { pipe }, PipeRx { pipe })
}

impl<M: RawMutex, const N: usize> ErrorType for PipeTx<'_, M, N> {
    type Error = Infallible;
}

impl<M: RawMutex, const N: usize> Write for PipeTx<'_, M, N> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(self.pipe.write(buf).await)
    }
}

impl<M: RawMutex, const N: usize> ErrorType for PipeRx<'_, M, N> {
    type Error = Infallible;
}

impl<M: RawMutex, const N: usize> Read for PipeRx<'_, M, N> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.pipe.read(buf).await)
    }
}

/// One side of a [`Loopback`]
pub struct Endpoint<'p, M: RawMutex, const N: usize> {
    /// Bytes sent to the other side
    pub tx: PipeTx<'p, M, N>,
    /// Bytes received from the other side
    pub rx: PipeRx<'p, M, N>,
}

/// Two pipes wired back to back
pub struct Loopback<M: RawMutex, const N: usize> {
    a_to_b: Pipe<M, N>,
    b_to_a: Pipe<M, N>,
}

impl<M: RawMutex, const N: usize> Default for Loopback<M, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const N: usize> Loopback<M, N> {
    /// Create an empty loopback
    pub const fn new() -> Self {
        Self {
            a_to_b: Pipe::new(),
            b_to_a: Pipe::new(),
        }
    }

    /// The two endpoints; what one writes, the other reads
    pub fn endpoints(&self) -> (Endpoint<'_, M, N>, Endpoint<'_, M, N>) {
        let (a_tx, b_rx) = split(&self.a_to_b);
        let (b_tx, a_rx) = split(&self.b_to_a);
        (
            Endpoint { tx: a_tx, rx: a_rx },
            Endpoint { tx: b_tx, rx: b_rx },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{FrameRx, FrameTx};
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    #[test]
    fn test_loopback_both_directions() {
        let loopback: Loopback<NoopRawMutex, 64> = Loopback::new();
        let (mut a, mut b) = loopback.endpoints();

        block_on(async {
            a.tx.write_frame(b"ping").await.unwrap();
            b.tx.write_frame(b"pong").await.unwrap();

            let mut buf = [0u8; 16];
            let n = b.rx.receive(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"ping");
            let n = a.rx.receive(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"pong");
        });
    }

    #[test]
    fn test_partial_reads() {
        let pipe: Pipe<NoopRawMutex, 16> = Pipe::new();
        let (mut tx, mut rx) = split(&pipe);

        block_on(async {
            tx.write_frame(&[1, 2, 3, 4, 5]).await.unwrap();
            let mut buf = [0u8; 2];
            assert_eq!(rx.receive(&mut buf).await.unwrap(), 2);
            assert_eq!(buf, [1, 2]);
            let mut rest = [0u8; 8];
            let n = rx.receive(&mut rest).await.unwrap();
            assert_eq!(&rest[..n], &[3, 4, 5]);
        });
    }
}

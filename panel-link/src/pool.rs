//! Transmit buffer pool
//!
//! A fixed set of frame-sized buffers handed out through a queue of free
//! indices. A buffer belongs to one sender at a time and goes back on the
//! queue when its [`PoolBuffer`] is dropped, on every exit path.

use core::ops::{Deref, DerefMut};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{with_timeout, Duration};

use crate::error::PoolTimeout;
use crate::registry::ACK_SLOTS;

/// Default number of transmit buffers
///
/// A sender holds its buffer for its whole retry loop, so one buffer per
/// ack-wait slot lets every slot be in use at once.
pub const TX_POOL_BLOCKS: usize = ACK_SLOTS;

/// Pool of `P` transmit buffers of `F` bytes
pub struct FramePool<M: RawMutex, const F: usize, const P: usize = TX_POOL_BLOCKS> {
    blocks: [Mutex<M, [u8; F]>; P],
    free: Channel<M, u8, P>,
}

impl<M: RawMutex, const F: usize, const P: usize> Default for FramePool<M, F, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const F: usize, const P: usize> FramePool<M, F, P> {
    /// Create a pool with every buffer free
    pub fn new() -> Self {
        const { assert!(P <= u8::MAX as usize, "block index must fit in u8") };
        let free = Channel::new();
        for index in 0..P {
            let _ = free.try_send(index as u8);
        }
        Self {
            blocks: core::array::from_fn(|_| Mutex::new([0; F])),
            free,
        }
    }

    /// Check out a buffer, waiting up to `timeout` for one to be returned
    pub async fn take(&self, timeout: Duration) -> Result<PoolBuffer<'_, M, F, P>, PoolTimeout> {
        let index = match with_timeout(timeout, self.free.receive()).await {
            Ok(index) => index as usize,
            Err(_) => {
                warn!("no transmit buffer free after {} ms", timeout.as_millis());
                return Err(PoolTimeout);
            }
        };
        // Uncontended: the index was ours alone
        let guard = self.blocks[index].lock().await;
        Ok(PoolBuffer {
            pool: self,
            index,
            guard: Some(guard),
        })
    }

    /// Buffers currently free
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

/// A checked-out transmit buffer
pub struct PoolBuffer<'p, M: RawMutex, const F: usize, const P: usize> {
    pool: &'p FramePool<M, F, P>,
    index: usize,
    guard: Option<MutexGuard<'p, M, [u8; F]>>,
}

impl<M: RawMutex, const F: usize, const P: usize> Deref for PoolBuffer<'_, M, F, P> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match &self.guard {
            Some(guard) => &guard[..],
            None => &[],
        }
    }
}

impl<M: RawMutex, const F: usize, const P: usize> DerefMut for PoolBuffer<'_, M, F, P> {
    fn deref_mut(&mut self) -> &mut [u8] {
        match &mut self.guard {
            Some(guard) => &mut guard[..],
            None => &mut [],
        }
    }
}

impl<M: RawMutex, const F: usize, const P: usize> Drop for PoolBuffer<'_, M, F, P> {
    fn drop(&mut self) {
        // Unlock before the index becomes visible to the next taker
        drop(self.guard.take());
        let _ = self.pool.free.try_send(self.index as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    type Pool = FramePool<NoopRawMutex, 16, 2>;

    #[test]
    fn test_take_and_return() {
        let pool = Pool::new();
        block_on(async {
            let mut a = pool.take(Duration::from_millis(10)).await.unwrap();
            assert_eq!(a.len(), 16);
            a[0] = 0x19;
            assert_eq!(pool.available(), 1);

            let b = pool.take(Duration::from_millis(10)).await.unwrap();
            assert_eq!(pool.available(), 0);
            drop(a);
            drop(b);
            assert_eq!(pool.available(), 2);
        });
    }

    #[test]
    fn test_exhausted_pool_times_out() {
        let pool = Pool::new();
        block_on(async {
            let _a = pool.take(Duration::from_millis(10)).await.unwrap();
            let _b = pool.take(Duration::from_millis(10)).await.unwrap();
            assert!(matches!(
                pool.take(Duration::from_millis(20)).await,
                Err(PoolTimeout)
            ));
        });
    }

    #[test]
    fn test_returned_on_error_path() {
        let pool = Pool::new();
        let failing = |pool: &Pool| -> Result<(), PoolTimeout> {
            let _buffer = block_on(pool.take(Duration::from_millis(10)))?;
            Err(PoolTimeout)
        };
        for _ in 0..5 {
            assert!(failing(&pool).is_err());
        }
        assert_eq!(pool.available(), 2);
    }
}

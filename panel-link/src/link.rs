//! Send side of the link
//!
//! [`Link`] owns the transport writer, the outbound sequence counter, the
//! ack-wait registry and the transmit buffers. Frames go out in one of two
//! ways:
//!
//! - [`Link::send`] transmits from the calling task and retries inline,
//!   returning once the frame is acknowledged or the retries run out.
//! - [`Link::enqueue`] copies the payload into the send queue and returns.
//!   A single task running [`Link::run_sender`] drains the queue in order,
//!   one frame in flight at a time.
//!
//! ACKs for received DATA frames bypass both and are written immediately.
//! All writes share one lock, so an ACK never interleaves with a frame.

use core::future::poll_fn;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_time::{with_timeout, Timer};
use heapless::Vec;

use panel_link_hal::{Fault, FrameTx};
use panel_link_protocol::{
    is_newer, ConfigError, Frame, DEFAULT_MAX_FRAME, DEFAULT_MAX_PAYLOAD, MAX_ACK_FRAME_SIZE,
};

use crate::config::{LinkConfig, RetryPolicy};
use crate::error::SendError;
use crate::pool::{FramePool, TX_POOL_BLOCKS};
use crate::registry::{AckRegistry, ACK_SLOTS};
use crate::sequence::SequenceCounter;

/// Default send queue depth
pub const DEFAULT_QUEUE_DEPTH: usize = 8;

/// A queued DATA frame
///
/// Holds its own copy of the payload; the caller's buffer is free as soon
/// as [`Link::enqueue`] returns.
#[derive(Debug, Clone)]
pub struct PendingFrame<const N: usize> {
    /// Assigned sequence number
    pub sequence: u16,
    /// Payload copy
    pub payload: Vec<u8, N>,
    /// Retry policy for this frame
    pub retry: RetryPolicy,
}

/// Reliable frame link over transport writer `T`
///
/// `N` is the payload capacity, `F` the size of a transmit buffer, `Q`
/// the send queue depth, `S` the number of ack-wait slots and `P` the
/// number of transmit buffers.
///
/// Every frame in flight holds one buffer and one slot. With `P` below `S`
/// the pool runs out first and the extra slots are never used; with `P`
/// above `S` a sender that finds no free slot still transmits and waits out
/// each attempt without being woken by the ACK.
pub struct Link<
    M: RawMutex,
    T: FrameTx,
    const N: usize = DEFAULT_MAX_PAYLOAD,
    const F: usize = DEFAULT_MAX_FRAME,
    const Q: usize = DEFAULT_QUEUE_DEPTH,
    const S: usize = ACK_SLOTS,
    const P: usize = TX_POOL_BLOCKS,
> {
    config: LinkConfig,
    writer: Mutex<M, T>,
    sequence: SequenceCounter,
    registry: AckRegistry<M, S>,
    pool: FramePool<M, F, P>,
    queue: Channel<M, PendingFrame<N>, Q>,
    // Held while a queued frame takes its sequence number
    admission: BlockingMutex<M, ()>,
}

impl<M, T, const N: usize, const F: usize, const Q: usize, const S: usize, const P: usize>
    Link<M, T, N, F, Q, S, P>
where
    M: RawMutex,
    T: FrameTx,
{
    /// Create a link writing to `writer`
    ///
    /// Fails if the configuration does not fit the link's capacities.
    pub fn new(writer: T, config: LinkConfig) -> Result<Self, ConfigError> {
        Self::with_sequence(writer, config, SequenceCounter::new())
    }

    /// Create a link whose sequence numbers continue from `sequence`
    pub fn with_sequence(
        writer: T,
        config: LinkConfig,
        sequence: SequenceCounter,
    ) -> Result<Self, ConfigError> {
        config.validate(N, F)?;
        Ok(Self {
            config,
            writer: Mutex::new(writer),
            sequence,
            registry: AckRegistry::new(),
            pool: FramePool::new(),
            queue: Channel::new(),
            admission: BlockingMutex::new(()),
        })
    }

    /// Link configuration
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Most recently assigned sequence number
    pub fn last_sequence(&self) -> u16 {
        self.sequence.current()
    }

    /// Frames waiting in the send queue
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Send a payload with the default retry policy, retrying inline
    ///
    /// Returns the sequence number once the peer acknowledged the frame.
    pub async fn send(&self, payload: &[u8]) -> Result<u16, SendError> {
        self.send_with(payload, self.config.retry).await
    }

    /// Send a payload, retrying inline according to `retry`
    pub async fn send_with(&self, payload: &[u8], retry: RetryPolicy) -> Result<u16, SendError> {
        self.check_payload(payload)?;
        let sequence = self.sequence.next();
        self.deliver(sequence, payload, retry).await?;
        Ok(sequence)
    }

    /// Queue a payload for the sender task with the default retry policy
    ///
    /// Returns the assigned sequence number once the frame is queued.
    pub async fn enqueue(&self, payload: &[u8]) -> Result<u16, SendError> {
        self.enqueue_with(payload, self.config.retry).await
    }

    /// Queue a payload for the sender task
    ///
    /// While the queue is full, waits up to `retry.interval_ms` for room,
    /// `retry.attempts` times, then gives up with [`SendError::QueueFull`].
    /// The sequence number is taken only once the frame is admitted, so
    /// queue order is sequence order and a rejected payload uses none.
    pub async fn enqueue_with(&self, payload: &[u8], retry: RetryPolicy) -> Result<u16, SendError> {
        self.check_payload(payload)?;
        let payload: Vec<u8, N> = Vec::from_slice(payload).map_err(|_| SendError::PayloadTooLarge)?;

        for _ in 0..retry.attempts.max(1) {
            let room = poll_fn(|cx| self.queue.poll_ready_to_send(cx));
            if with_timeout(retry.interval(), room).await.is_err() {
                continue;
            }
            // Another producer may have taken the free entry meanwhile
            if let Some(sequence) = self.admit(&payload, retry) {
                trace!("seq {} queued", sequence);
                return Ok(sequence);
            }
        }

        warn!("send queue full, {} byte payload dropped", payload.len());
        Err(SendError::QueueFull)
    }

    /// Number and queue a frame in one step, if there is room
    fn admit(&self, payload: &Vec<u8, N>, retry: RetryPolicy) -> Option<u16> {
        self.admission.lock(|_| {
            // Only admission adds to the queue, so room seen here stays
            if self.queue.is_full() {
                return None;
            }
            let sequence = self.sequence.next();
            let pending = PendingFrame {
                sequence,
                payload: payload.clone(),
                retry,
            };
            self.queue.try_send(pending).ok()?;
            Some(sequence)
        })
    }

    /// Transmit the next queued frame and wait for its outcome
    ///
    /// Returns its sequence number once acknowledged.
    pub async fn process_next(&self) -> Result<u16, SendError> {
        let pending = self.queue.receive().await;
        self.deliver(pending.sequence, &pending.payload, pending.retry)
            .await?;
        Ok(pending.sequence)
    }

    /// Drain the send queue forever
    ///
    /// Run this in exactly one task when using [`Link::enqueue`].
    pub async fn run_sender(&self) -> ! {
        info!("link sender started");
        loop {
            match self.process_next().await {
                Ok(sequence) => trace!("seq {} delivered", sequence),
                Err(err) => warn!("queued send failed: {:?}", err),
            }
        }
    }

    /// Acknowledge a received DATA frame
    ///
    /// Written once, never retried.
    pub async fn send_ack(&self, sequence: u16) -> Result<(), SendError> {
        let mut buffer = [0u8; MAX_ACK_FRAME_SIZE];
        let len = Frame::ack(sequence).encode(&self.config.framing.magic, &mut buffer)?;
        self.write(&buffer[..len]).await
    }

    /// Route a received ACK to the sender waiting for it
    ///
    /// Returns false if no sender was waiting.
    pub fn deliver_ack(&self, sequence: u16) -> bool {
        if self.registry.deliver_ack(sequence) {
            trace!("ack for seq {}", sequence);
            return true;
        }

        let last = self.sequence.current();
        if sequence == last || is_newer(last, sequence) {
            debug!("stale ack for seq {}", sequence);
        } else {
            warn!("ack for unknown seq {}, last sent {}", sequence, last);
        }
        false
    }

    fn check_payload(&self, payload: &[u8]) -> Result<(), SendError> {
        if payload.len() > self.config.framing.max_payload as usize || payload.len() > N {
            return Err(SendError::PayloadTooLarge);
        }
        if payload.is_empty() && !self.config.framing.allow_empty_data {
            return Err(SendError::EmptyPayload);
        }
        Ok(())
    }

    /// Transmit a DATA frame until acknowledged or out of attempts
    async fn deliver(&self, sequence: u16, payload: &[u8], retry: RetryPolicy) -> Result<(), SendError> {
        let mut buffer = self.pool.take(self.config.pool_timeout()).await?;
        let len = Frame::data(sequence, payload).encode(&self.config.framing.magic, &mut buffer)?;
        let attempts = retry.attempts.max(1);

        for attempt in 1..=attempts {
            // Claimed before writing so an immediate ACK is not missed
            let wait = self.registry.begin_wait(sequence);
            self.write(&buffer[..len]).await?;

            match wait {
                Ok(wait) => {
                    if wait.wait(retry.interval()).await.is_ok() {
                        trace!("seq {} acked on attempt {}", sequence, attempt);
                        return Ok(());
                    }
                }
                // Nothing to wait on; let the attempt run its course
                Err(_) => Timer::after(retry.interval()).await,
            }

            if attempt < attempts {
                debug!("no ack for seq {}, attempt {}/{}", sequence, attempt, attempts);
            }
        }

        warn!("seq {} not acknowledged after {} attempts", sequence, attempts);
        Err(SendError::Exhausted { sequence, attempts })
    }

    async fn write(&self, bytes: &[u8]) -> Result<(), SendError> {
        let mut writer = self.writer.lock().await;
        writer.write_frame(bytes).await.map_err(|err| {
            let fault = Fault::classify(&err);
            warn!("transport write failed: {:?}", fault);
            SendError::Transport(fault)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{decoded, framing, Capture};
    use embassy_futures::block_on;
    use embassy_futures::join::{join, join3, join_array};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embassy_time::{Duration, Instant};
    use panel_link_protocol::FrameType;
    use std::cell::RefCell;

    type TestLink<'a> = Link<NoopRawMutex, Capture<'a>, 64, 80, 2>;

    fn config(interval_ms: u32, attempts: u32) -> LinkConfig {
        LinkConfig {
            framing: framing(),
            retry: RetryPolicy::new(interval_ms, attempts),
            pool_timeout_ms: 100,
        }
    }

    #[test]
    fn test_new_validates_capacity() {
        let frames = RefCell::new(std::vec::Vec::new());
        let result: Result<Link<NoopRawMutex, Capture<'_>, 64, 32, 2>, _> =
            Link::new(Capture { frames: &frames }, config(10, 1));
        assert!(matches!(result, Err(ConfigError::BufferTooSmall)));
    }

    #[test]
    fn test_send_retries_until_exhausted() {
        let frames = RefCell::new(std::vec::Vec::new());
        let link: TestLink = Link::new(Capture { frames: &frames }, config(20, 3)).unwrap();

        let start = Instant::now();
        let result = block_on(link.send(b"hello"));
        let elapsed = start.elapsed();

        assert_eq!(result, Err(SendError::Exhausted { sequence: 1, attempts: 3 }));
        assert!(elapsed >= Duration::from_millis(60));
        assert_eq!(decoded(&frames.borrow()), [(1, FrameType::Data); 3]);
        assert_eq!(link.pool.available(), TX_POOL_BLOCKS);
        assert_eq!(link.registry.free_slots(), ACK_SLOTS);
    }

    #[test]
    fn test_send_acknowledged() {
        let frames = RefCell::new(std::vec::Vec::new());
        let link: TestLink = Link::new(Capture { frames: &frames }, config(200, 3)).unwrap();

        let (result, _) = block_on(join(link.send(b"hello"), async {
            // Delivered while the sender is waiting
            while !link.deliver_ack(1) {
                embassy_futures::yield_now().await;
            }
        }));
        assert_eq!(result, Ok(1));
        assert_eq!(frames.borrow().len(), 1);
    }

    #[test]
    fn test_payload_checks() {
        let frames = RefCell::new(std::vec::Vec::new());
        let link: TestLink = Link::new(Capture { frames: &frames }, config(10, 1)).unwrap();

        assert_eq!(block_on(link.send(&[0; 65])), Err(SendError::PayloadTooLarge));
        assert_eq!(block_on(link.send(&[])), Err(SendError::EmptyPayload));
        assert_eq!(block_on(link.enqueue(&[])), Err(SendError::EmptyPayload));
        assert!(frames.borrow().is_empty());
        assert_eq!(link.last_sequence(), 0);
    }

    #[test]
    fn test_send_ack_bypasses_retry() {
        let frames = RefCell::new(std::vec::Vec::new());
        let link: TestLink = Link::new(Capture { frames: &frames }, config(10, 3)).unwrap();

        block_on(link.send_ack(42)).unwrap();
        assert_eq!(decoded(&frames.borrow()), [(42, FrameType::Ack)]);
    }

    #[test]
    fn test_queue_full_after_retry_budget() {
        let frames = RefCell::new(std::vec::Vec::new());
        let link: TestLink = Link::new(Capture { frames: &frames }, config(10, 2)).unwrap();

        block_on(async {
            assert_eq!(link.enqueue(b"a").await, Ok(1));
            assert_eq!(link.enqueue(b"b").await, Ok(2));

            let start = Instant::now();
            assert_eq!(link.enqueue(b"c").await, Err(SendError::QueueFull));
            assert!(start.elapsed() >= Duration::from_millis(20));
        });
        assert_eq!(link.queued(), 2);
        // The rejected payload took no sequence number
        assert_eq!(link.last_sequence(), 2);
        // Nothing is written until the sender runs
        assert!(frames.borrow().is_empty());

        block_on(async {
            assert_eq!(link.queue.receive().await.sequence, 1);
            assert_eq!(link.enqueue(b"d").await, Ok(3));
        });
    }

    #[test]
    fn test_enqueue_numbers_in_queue_order() {
        let frames = RefCell::new(std::vec::Vec::new());
        let link: TestLink = Link::new(Capture { frames: &frames }, config(50, 4)).unwrap();

        let (c, d, drained) = block_on(async {
            link.enqueue(b"a").await.unwrap();
            link.enqueue(b"b").await.unwrap();
            // Both wait for room while the queue drains
            join3(link.enqueue(b"c"), link.enqueue(b"d"), async {
                let first = link.queue.receive().await.sequence;
                embassy_futures::yield_now().await;
                let second = link.queue.receive().await.sequence;
                [first, second]
            })
            .await
        });
        assert_eq!(drained, [1, 2]);

        let mut queued = std::vec::Vec::new();
        while let Ok(pending) = link.queue.try_receive() {
            queued.push((pending.sequence, pending.payload.to_vec()));
        }
        let (c, d) = (c.unwrap(), d.unwrap());
        let mut expected = [(c, b"c".to_vec()), (d, b"d".to_vec())];
        expected.sort();
        assert_eq!(queued, expected);
        assert_eq!(queued[0].0, 3);
        assert_eq!(queued[1].0, 4);
    }

    #[test]
    fn test_registry_full_still_transmits() {
        // Four buffers, two ack-wait slots
        type NarrowLink<'a> = Link<NoopRawMutex, Capture<'a>, 64, 80, 2, 2, 4>;
        let frames = RefCell::new(std::vec::Vec::new());
        let link: NarrowLink = Link::new(Capture { frames: &frames }, config(20, 2)).unwrap();

        let start = Instant::now();
        let (a, b, c) = block_on(join3(link.send(b"a"), link.send(b"b"), link.send(b"c")));
        assert!(start.elapsed() >= Duration::from_millis(40));

        let mut results = [a, b, c];
        results.sort_by_key(|result| match result {
            Err(SendError::Exhausted { sequence, .. }) => *sequence,
            _ => u16::MAX,
        });
        let expected: [Result<u16, SendError>; 3] =
            [1, 2, 3].map(|sequence| Err(SendError::Exhausted { sequence, attempts: 2 }));
        assert_eq!(results, expected);

        // The sender without a slot wrote every attempt too
        let mut sequences: std::vec::Vec<u16> =
            decoded(&frames.borrow()).into_iter().map(|(sequence, _)| sequence).collect();
        sequences.sort_unstable();
        assert_eq!(sequences, [1, 1, 2, 2, 3, 3]);
        assert_eq!(link.registry.free_slots(), 2);
        assert_eq!(link.pool.available(), 4);
    }

    #[test]
    fn test_default_pool_covers_every_slot() {
        let frames = RefCell::new(std::vec::Vec::new());
        let link: TestLink = Link::new(Capture { frames: &frames }, config(20, 1)).unwrap();

        let results = block_on(join_array(core::array::from_fn::<_, 6, _>(|_| link.send(b"x"))));
        for result in results {
            assert!(matches!(result, Err(SendError::Exhausted { attempts: 1, .. })), "{:?}", result);
        }
        assert_eq!(frames.borrow().len(), 6);
    }

    #[test]
    fn test_process_next_in_order() {
        let frames = RefCell::new(std::vec::Vec::new());
        let link: TestLink = Link::new(Capture { frames: &frames }, config(10, 1)).unwrap();

        block_on(async {
            link.enqueue(b"first").await.unwrap();
            link.enqueue(b"second").await.unwrap();

            let (first, _) = join(link.process_next(), async {
                while !link.deliver_ack(1) {
                    embassy_futures::yield_now().await;
                }
            })
            .await;
            assert_eq!(first, Ok(1));
            assert_eq!(
                link.process_next().await,
                Err(SendError::Exhausted { sequence: 2, attempts: 1 })
            );
        });
        assert_eq!(decoded(&frames.borrow()), [(1, FrameType::Data), (2, FrameType::Data)]);
    }

    #[test]
    fn test_unmatched_acks() {
        let frames = RefCell::new(std::vec::Vec::new());
        let link: TestLink = Link::with_sequence(
            Capture { frames: &frames },
            config(10, 1),
            SequenceCounter::starting_after(10),
        )
        .unwrap();

        // Stale and unknown are both dropped
        assert!(!link.deliver_ack(5));
        assert!(!link.deliver_ack(500));
    }
}

//! Receive side of the link
//!
//! [`LinkReceiver`] turns transport bytes into frames and dispatches them:
//! an ACK wakes the sender waiting for it, a DATA frame is acknowledged
//! and then handed to the [`PayloadHandler`].
//!
//! The peer retransmits a DATA frame whose ACK was lost. Such a frame is
//! acknowledged again but delivered to the handler only once.

use embassy_sync::blocking_mutex::raw::RawMutex;

use panel_link_hal::{Fault, FrameRx, FrameTx};
use panel_link_protocol::{
    ConfigError, FrameDecoder, FrameType, RecentSequences, DEFAULT_MAX_FRAME, DEFAULT_MAX_PAYLOAD,
};

use crate::handler::PayloadHandler;
use crate::link::{Link, DEFAULT_QUEUE_DEPTH};
use crate::pool::TX_POOL_BLOCKS;
use crate::registry::ACK_SLOTS;

/// DATA sequences remembered for duplicate suppression
pub const RECENT_SEQUENCES: usize = 8;

/// Transport read size
pub const READ_CHUNK: usize = 64;

/// Dispatches received frames for a [`Link`]
pub struct LinkReceiver<
    'l,
    M: RawMutex,
    T: FrameTx,
    D: FrameDecoder,
    H: PayloadHandler,
    const N: usize = DEFAULT_MAX_PAYLOAD,
    const F: usize = DEFAULT_MAX_FRAME,
    const Q: usize = DEFAULT_QUEUE_DEPTH,
    const S: usize = ACK_SLOTS,
    const P: usize = TX_POOL_BLOCKS,
> {
    link: &'l Link<M, T, N, F, Q, S, P>,
    decoder: D,
    handler: H,
    recent: RecentSequences<RECENT_SEQUENCES>,
}

impl<'l, M, T, D, H, const N: usize, const F: usize, const Q: usize, const S: usize, const P: usize>
    LinkReceiver<'l, M, T, D, H, N, F, Q, S, P>
where
    M: RawMutex,
    T: FrameTx,
    D: FrameDecoder,
    H: PayloadHandler,
{
    /// Create a receiver for `link`
    ///
    /// Fails with [`ConfigError::FramingMismatch`] unless `decoder` expects
    /// the same framing the link sends with.
    pub fn new(link: &'l Link<M, T, N, F, Q, S, P>, decoder: D, handler: H) -> Result<Self, ConfigError> {
        if decoder.config() != &link.config().framing {
            return Err(ConfigError::FramingMismatch);
        }
        Ok(Self {
            link,
            decoder,
            handler,
            recent: RecentSequences::new(),
        })
    }

    /// The link this receiver serves
    pub fn link(&self) -> &'l Link<M, T, N, F, Q, S, P> {
        self.link
    }

    /// The payload handler
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Process a chunk of received bytes
    ///
    /// Any chunking is accepted; a frame split across calls completes on
    /// the call that supplies its last byte. Returns the number of frames
    /// dispatched.
    pub async fn on_receive(&mut self, mut bytes: &[u8]) -> usize {
        let mut dispatched = 0;
        loop {
            let (taken, frame) = self.decoder.decode(bytes);
            bytes = &bytes[taken..];
            let Some(frame) = frame else {
                return dispatched;
            };
            dispatched += 1;

            match frame.frame_type {
                FrameType::Ack => {
                    self.link.deliver_ack(frame.sequence);
                }
                FrameType::Data => {
                    // Acknowledge first so the peer stops retrying even if
                    // the handler is slow
                    if let Err(err) = self.link.send_ack(frame.sequence).await {
                        warn!("ack for seq {} not sent: {:?}", frame.sequence, err);
                    }
                    if self.recent.record(frame.sequence) {
                        self.handler.on_frame_payload(frame.payload);
                    } else {
                        debug!("duplicate seq {}, not delivered", frame.sequence);
                    }
                }
            }
        }
    }

    /// Recover from a transport fault
    ///
    /// A partially received frame is discarded. After a disconnect the peer
    /// may have restarted its numbering, so the duplicate history is
    /// dropped too.
    pub fn on_fault(&mut self, fault: Fault) {
        warn!("transport fault: {:?}", fault);
        self.decoder.reset();
        if fault == Fault::Disconnected {
            self.recent.clear();
        }
    }

    /// Read from `rx` and dispatch forever
    pub async fn run<R: FrameRx>(&mut self, rx: &mut R) -> ! {
        info!("link receiver started");
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match rx.receive(&mut buf).await {
                Ok(n) => {
                    self.on_receive(&buf[..n]).await;
                }
                Err(err) => self.on_fault(Fault::classify(&err)),
            }
        }
    }
}

impl<M, T, const N: usize, const F: usize, const Q: usize, const S: usize, const P: usize>
    Link<M, T, N, F, Q, S, P>
where
    M: RawMutex,
    T: FrameTx,
{
    /// Create a receiver dispatching to `handler`
    ///
    /// See [`LinkReceiver::new`].
    pub fn receiver<D: FrameDecoder, H: PayloadHandler>(
        &self,
        decoder: D,
        handler: H,
    ) -> Result<LinkReceiver<'_, M, T, D, H, N, F, Q, S, P>, ConfigError> {
        LinkReceiver::new(self, decoder, handler)
    }
}

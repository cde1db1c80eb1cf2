//! Application payload delivery

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

/// Receives the payload of every new DATA frame
///
/// Called from the receive path after the frame's ACK has been sent. The
/// payload is only borrowed for the duration of the call; copy what must
/// outlive it.
pub trait PayloadHandler {
    /// Handle one payload
    fn on_frame_payload(&mut self, payload: &[u8]);
}

impl<H: PayloadHandler + ?Sized> PayloadHandler for &mut H {
    fn on_frame_payload(&mut self, payload: &[u8]) {
        (**self).on_frame_payload(payload);
    }
}

/// Forwards payloads to another task through a channel
///
/// Payloads are dropped, with a warning, while the channel is full.
impl<M: RawMutex, const N: usize, const C: usize> PayloadHandler for &Channel<M, Vec<u8, N>, C> {
    fn on_frame_payload(&mut self, payload: &[u8]) {
        let Ok(copy) = Vec::from_slice(payload) else {
            warn!("payload of {} bytes does not fit, dropping", payload.len());
            return;
        };
        if self.try_send(copy).is_err() {
            warn!("payload channel full, dropping payload");
        }
    }
}

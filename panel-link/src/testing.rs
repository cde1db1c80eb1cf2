//! Shared helpers for unit tests

use core::convert::Infallible;
use std::cell::RefCell;
use std::vec::Vec;

use panel_link_protocol::{decode_all, FrameType, Framer, FramerConfig};

/// Payload capacity used throughout the tests
pub const TEST_PAYLOAD: usize = 64;

/// Records every frame written to it
pub struct Capture<'a> {
    pub frames: &'a RefCell<Vec<Vec<u8>>>,
}

impl embedded_io_async::ErrorType for Capture<'_> {
    type Error = Infallible;
}

impl embedded_io_async::Write for Capture<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Infallible> {
        self.frames.borrow_mut().push(buf.to_vec());
        Ok(buf.len())
    }
}

pub fn framing() -> FramerConfig {
    FramerConfig {
        max_payload: TEST_PAYLOAD as u16,
        ..Default::default()
    }
}

pub fn framer() -> Framer<TEST_PAYLOAD> {
    Framer::new(framing()).unwrap()
}

/// Sequence and type of every frame in `frames`
pub fn decoded(frames: &[Vec<u8>]) -> Vec<(u16, FrameType)> {
    let mut framer = framer();
    let mut out = Vec::new();
    for bytes in frames {
        decode_all(&mut framer, bytes, |frame| out.push((frame.sequence, frame.frame_type)));
    }
    out
}

//! Common interface of the frame decoders

use crate::buffered::BufferedFramer;
use crate::config::FramerConfig;
use crate::frame::Frame;
use crate::framer::Framer;

/// A stream-to-frame decoder
///
/// Decoders are fed arbitrarily chunked input. A call returns the number of
/// bytes taken and at most one frame, which stays borrowed from the decoder
/// until the next call. When no frame is returned all input was taken.
pub trait FrameDecoder {
    /// Take input bytes until a frame completes
    fn decode<'a>(&'a mut self, input: &[u8]) -> (usize, Option<Frame<'a>>);

    /// Discard any partially received frame
    fn reset(&mut self);

    /// Framing this decoder expects
    fn config(&self) -> &FramerConfig;
}

impl<const N: usize> FrameDecoder for Framer<N> {
    fn decode<'a>(&'a mut self, input: &[u8]) -> (usize, Option<Frame<'a>>) {
        self.feed_bytes(input)
    }

    fn reset(&mut self) {
        Framer::reset(self);
    }

    fn config(&self) -> &FramerConfig {
        Framer::config(self)
    }
}

impl<const B: usize> FrameDecoder for BufferedFramer<B> {
    fn decode<'a>(&'a mut self, input: &[u8]) -> (usize, Option<Frame<'a>>) {
        BufferedFramer::decode(self, input)
    }

    fn reset(&mut self) {
        BufferedFramer::reset(self);
    }

    fn config(&self) -> &FramerConfig {
        BufferedFramer::config(self)
    }
}

/// Decode every frame in `input`, calling `on_frame` for each
///
/// Returns the number of frames decoded.
pub fn decode_all<D, F>(decoder: &mut D, mut input: &[u8], mut on_frame: F) -> usize
where
    D: FrameDecoder + ?Sized,
    F: FnMut(Frame<'_>),
{
    let mut count = 0;
    loop {
        let (taken, frame) = decoder.decode(input);
        input = &input[taken..];
        match frame {
            Some(frame) => {
                on_frame(frame);
                count += 1;
            }
            None => return count,
        }
    }
}

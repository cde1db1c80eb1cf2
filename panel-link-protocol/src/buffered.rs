//! Buffer-based frame decoder
//!
//! [`BufferedFramer`] accumulates received bytes in a [`FrameBuffer`] and
//! parses whole frames in place once enough bytes are present. Garbage in
//! front of the magic marker is discarded eagerly, so the buffer only ever
//! holds a candidate frame and whatever arrived behind it.
//!
//! Because `B` holds the largest frame the configuration allows, the buffer
//! never fills up without a complete frame at its front. A header that
//! turns out to be false costs one byte and the scan moves on to the next
//! marker, so a full buffer never has to be compacted or dropped.

use crate::config::{ConfigError, FramerConfig};
use crate::crc::crc16_ccitt;
use crate::frame::{calc_frame_size, header_size, Frame, FrameError, FrameType, CRC_SIZE};
use crate::frame_buffer::FrameBuffer;
use crate::scanner::{find_sequence, partial_suffix_len};

/// Buffer-based frame decoder with `B` bytes of receive buffer
#[derive(Debug, Clone)]
pub struct BufferedFramer<const B: usize> {
    config: FramerConfig,
    buffer: FrameBuffer<B>,
    /// Length of the frame returned by the previous call, still at the front
    emitted: usize,
}

/// Check the fixed fields of a frame header
fn check_header(config: &FramerConfig, length: u16, type_byte: u8) -> Result<FrameType, FrameError> {
    if length > config.max_payload {
        return Err(FrameError::InvalidLength);
    }
    let frame_type = FrameType::from_byte(type_byte).ok_or(FrameError::InvalidType)?;
    if frame_type == FrameType::Data && length == 0 && !config.allow_empty_data {
        return Err(FrameError::EmptyData);
    }
    Ok(frame_type)
}

impl<const B: usize> BufferedFramer<B> {
    /// Create a decoder
    ///
    /// Fails unless `B` can hold a frame with the largest configured payload.
    pub fn new(config: FramerConfig) -> Result<Self, ConfigError> {
        config.validate(B)?;
        if B < calc_frame_size(config.magic.len(), config.max_payload as usize) {
            return Err(ConfigError::BufferTooSmall);
        }
        Ok(Self {
            config,
            buffer: FrameBuffer::new(),
            emitted: 0,
        })
    }

    /// Decoder configuration
    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    /// Bytes held for a frame that has not completed yet
    pub fn buffered(&self) -> usize {
        self.buffer.len() - self.emitted
    }

    /// Discard all buffered bytes
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.emitted = 0;
    }

    /// Buffer bytes until a frame completes
    ///
    /// Returns the number of input bytes taken and the frame, if one
    /// completed. Frames already buffered are returned before any more
    /// input is taken, so call again with the remaining input (possibly
    /// empty) until no frame is returned.
    pub fn decode(&mut self, input: &[u8]) -> (usize, Option<Frame<'_>>) {
        if self.emitted > 0 {
            self.buffer.consume(self.emitted);
            self.emitted = 0;
        }

        let mut taken = 0;
        loop {
            if let Some(len) = self.scan() {
                self.emitted = len;
                return (taken, Some(self.front_frame(len)));
            }
            if taken == input.len() {
                return (taken, None);
            }
            taken += self.buffer.insert(&input[taken..]);
        }
    }

    /// Discard bytes until the buffer starts with a complete valid frame
    ///
    /// Returns the frame length, or `None` if more bytes are needed.
    fn scan(&mut self) -> Option<usize> {
        let magic = self.config.magic.as_bytes();
        let m = magic.len();

        loop {
            let data = self.buffer.as_slice();

            let Some(start) = find_sequence(data, magic) else {
                // Keep only a tail that may still grow into the marker
                let stale = data.len() - partial_suffix_len(data, magic);
                self.buffer.consume(stale);
                return None;
            };
            if start > 0 {
                trace!("skipping {} bytes before magic", start);
                self.buffer.consume(start);
                continue;
            }

            if data.len() < header_size(m) {
                return None;
            }
            let length = u16::from_be_bytes([data[m], data[m + 1]]);
            if let Err(err) = check_header(&self.config, length, data[m + 4]) {
                warn!("rejected frame header: {:?}", err);
                self.buffer.consume(1);
                continue;
            }

            let total = calc_frame_size(m, length as usize);
            if data.len() < total {
                return None;
            }

            let crc_at = total - CRC_SIZE;
            let received = u16::from_be_bytes([data[crc_at], data[crc_at + 1]]);
            let computed = crc16_ccitt(&data[..crc_at]);
            if received != computed {
                error!("crc mismatch: received {}, computed {}", received, computed);
                self.buffer.consume(1);
                continue;
            }
            return Some(total);
        }
    }

    /// View the validated frame of `len` bytes at the front of the buffer
    fn front_frame(&self, len: usize) -> Frame<'_> {
        let data = self.buffer.as_slice();
        let m = self.config.magic.len();
        Frame {
            sequence: u16::from_be_bytes([data[m + 2], data[m + 3]]),
            // Checked by scan
            frame_type: FrameType::from_byte(data[m + 4]).unwrap_or(FrameType::Ack),
            payload: &data[header_size(m)..len - CRC_SIZE],
        }
    }

}

//! Streaming frame decoder
//!
//! [`Framer`] is a byte-at-a-time state machine. It keeps the header bytes
//! it has seen so far, so a rejected header can be rescanned from the byte
//! after its first magic byte; a real frame may start inside a false match.

use heapless::Vec;

use crate::config::{ConfigError, FramerConfig};
use crate::crc::Crc16;
use crate::frame::{Frame, FrameError, FrameType, CRC_SIZE, LENGTH_SIZE, MAX_HEADER_SIZE, SEQUENCE_SIZE};
use crate::scanner::find_sequence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    /// Matching the magic marker
    SeekMagic,
    /// Reading LENGTH
    Length,
    /// Reading SEQUENCE
    Sequence,
    /// Reading TYPE
    Type,
    /// Reading payload bytes
    Payload,
    /// Reading CRC16
    Crc,
}

/// Streaming frame decoder with payload capacity `N`
#[derive(Debug, Clone)]
pub struct Framer<const N: usize> {
    config: FramerConfig,
    state: State,
    header: Vec<u8, MAX_HEADER_SIZE>,
    length: u16,
    sequence: u16,
    frame_type: FrameType,
    payload: Vec<u8, N>,
    crc_bytes: Vec<u8, CRC_SIZE>,
    crc: Crc16,
}

impl<const N: usize> Framer<N> {
    /// Create a decoder
    ///
    /// Fails if the configured maximum payload does not fit in `N`.
    pub fn new(config: FramerConfig) -> Result<Self, ConfigError> {
        config.validate(N)?;
        Ok(Self {
            config,
            state: State::SeekMagic,
            header: Vec::new(),
            length: 0,
            sequence: 0,
            frame_type: FrameType::Data,
            payload: Vec::new(),
            crc_bytes: Vec::new(),
            crc: Crc16::new(),
        })
    }

    /// Decoder configuration
    pub fn config(&self) -> &FramerConfig {
        &self.config
    }

    /// True while no frame is partially decoded
    pub fn is_idle(&self) -> bool {
        self.state == State::SeekMagic && self.header.is_empty()
    }

    /// Drop any partial frame and go back to seeking the magic marker
    pub fn reset(&mut self) {
        self.state = State::SeekMagic;
        self.header.clear();
        self.crc_bytes.clear();
        self.payload.clear();
        self.length = 0;
        self.sequence = 0;
    }

    /// Feed a single byte to the decoder
    ///
    /// Returns `Ok(Some(frame))` when a complete valid frame is decoded,
    /// `Ok(None)` when more bytes are needed, or `Err` when this byte caused
    /// a frame to be dropped. The decoder has already resynchronized when an
    /// error is returned, so feeding can simply continue.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame<'_>>, FrameError> {
        if self.step(byte)? {
            Ok(Some(self.frame()))
        } else {
            Ok(None)
        }
    }

    /// Feed bytes until a frame completes
    ///
    /// Returns the number of bytes consumed and the frame, if one completed.
    /// Bytes after a completed frame are not consumed. Dropped frames are
    /// logged and skipped.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> (usize, Option<Frame<'_>>) {
        for (i, &byte) in bytes.iter().enumerate() {
            if let Ok(true) = self.step(byte) {
                return (i + 1, Some(self.frame()));
            }
        }
        (bytes.len(), None)
    }

    fn frame(&self) -> Frame<'_> {
        Frame {
            sequence: self.sequence,
            frame_type: self.frame_type,
            payload: &self.payload,
        }
    }

    fn magic_len(&self) -> usize {
        self.config.magic.len()
    }

    /// Advance the state machine, returning true when a frame completed
    fn step(&mut self, byte: u8) -> Result<bool, FrameError> {
        match self.state {
            State::SeekMagic => {
                self.seek_magic(byte);
                Ok(false)
            }
            State::Length => {
                let _ = self.header.push(byte);
                let m = self.magic_len();
                if self.header.len() == m + LENGTH_SIZE {
                    let length = u16::from_be_bytes([self.header[m], self.header[m + 1]]);
                    if length > self.config.max_payload {
                        return self.reject(FrameError::InvalidLength);
                    }
                    self.length = length;
                    self.state = State::Sequence;
                }
                Ok(false)
            }
            State::Sequence => {
                let _ = self.header.push(byte);
                let at = self.magic_len() + LENGTH_SIZE;
                if self.header.len() == at + SEQUENCE_SIZE {
                    self.sequence = u16::from_be_bytes([self.header[at], self.header[at + 1]]);
                    self.state = State::Type;
                }
                Ok(false)
            }
            State::Type => {
                let _ = self.header.push(byte);
                let Some(frame_type) = FrameType::from_byte(byte) else {
                    return self.reject(FrameError::InvalidType);
                };
                if frame_type == FrameType::Data && self.length == 0 && !self.config.allow_empty_data {
                    return self.reject(FrameError::EmptyData);
                }

                self.frame_type = frame_type;
                self.crc = Crc16::new();
                self.crc.update(&self.header);
                self.payload.clear();
                self.crc_bytes.clear();
                self.state = if self.length == 0 {
                    State::Crc
                } else {
                    State::Payload
                };
                Ok(false)
            }
            State::Payload => {
                // Cannot fail: length was checked against max_payload <= N
                let _ = self.payload.push(byte);
                self.crc.update_byte(byte);
                if self.payload.len() == self.length as usize {
                    self.state = State::Crc;
                }
                Ok(false)
            }
            State::Crc => {
                let _ = self.crc_bytes.push(byte);
                if self.crc_bytes.len() < CRC_SIZE {
                    return Ok(false);
                }

                let received = u16::from_be_bytes([self.crc_bytes[0], self.crc_bytes[1]]);
                let computed = self.crc.value();
                self.state = State::SeekMagic;
                self.header.clear();
                self.crc_bytes.clear();

                if received != computed {
                    error!(
                        "crc mismatch on seq {}: received {}, computed {}",
                        self.sequence, received, computed
                    );
                    return Err(FrameError::InvalidChecksum);
                }
                Ok(true)
            }
        }
    }

    fn seek_magic(&mut self, byte: u8) {
        let _ = self.header.push(byte);
        loop {
            let magic = self.config.magic.as_bytes();
            if magic.starts_with(&self.header) {
                break;
            }
            // Restart at the next occurrence of the first magic byte
            match find_sequence(&self.header[1..], &magic[..1]) {
                Some(offset) => {
                    let start = offset + 1;
                    self.header.rotate_left(start);
                    self.header.truncate(self.header.len() - start);
                }
                None => {
                    self.header.clear();
                    break;
                }
            }
        }
        if self.header.len() == self.magic_len() {
            trace!("magic found");
            self.state = State::Length;
        }
    }

    /// Drop the current header and rescan it from its second byte
    fn reject(&mut self, err: FrameError) -> Result<bool, FrameError> {
        warn!("rejected frame header: {:?}", err);
        let header = self.header.clone();
        self.reset();
        // A replayed header is shorter than any frame, so it cannot complete one
        for &byte in &header[1..] {
            let _ = self.step(byte);
        }
        Err(err)
    }
}

//! Frame encoding for the panel-link protocol.
//!
//! Frame format (all integers big-endian):
//! - MAGIC (1-4 bytes): start marker agreed by both endpoints
//! - LENGTH (2 bytes): payload length
//! - SEQUENCE (2 bytes): sender sequence number
//! - TYPE (1 byte): `0` DATA, `1` ACK
//! - PAYLOAD (LENGTH bytes)
//! - CRC16 (2 bytes): CRC16-CCITT of every preceding byte, magic included

use heapless::Vec;

use crate::config::{Magic, MAX_MAGIC_LEN};
use crate::crc::Crc16;

/// Magic marker used by the control panel and its bridge
pub const DEFAULT_MAGIC: [u8; 2] = [0x19, 0x16];

/// Default largest payload
pub const DEFAULT_MAX_PAYLOAD: usize = 240;

/// Default transmit frame buffer size
pub const DEFAULT_MAX_FRAME: usize = 256;

/// LENGTH field size
pub const LENGTH_SIZE: usize = 2;
/// SEQUENCE field size
pub const SEQUENCE_SIZE: usize = 2;
/// TYPE field size
pub const TYPE_SIZE: usize = 1;
/// CRC16 field size
pub const CRC_SIZE: usize = 2;

/// Bytes between the magic marker and the payload
pub const FIELDS_SIZE: usize = LENGTH_SIZE + SEQUENCE_SIZE + TYPE_SIZE;

/// Largest header (magic + fixed fields)
pub const MAX_HEADER_SIZE: usize = MAX_MAGIC_LEN + FIELDS_SIZE;

/// Largest non-payload overhead of a frame
pub const MAX_FRAME_OVERHEAD: usize = MAX_HEADER_SIZE + CRC_SIZE;

/// Size of an encoded ACK frame with the largest magic
pub const MAX_ACK_FRAME_SIZE: usize = MAX_FRAME_OVERHEAD;

/// Total wire size of a frame
///
/// Used to size buffers and to reject oversized sends before anything is
/// written to the transport.
pub const fn calc_frame_size(magic_len: usize, payload_len: usize) -> usize {
    magic_len + FIELDS_SIZE + payload_len + CRC_SIZE
}

/// Header size (magic + fixed fields) for a given magic length
pub const fn header_size(magic_len: usize) -> usize {
    magic_len + FIELDS_SIZE
}

/// Errors that can occur during frame decoding or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Buffer too small for encoding
    BufferTooSmall,
    /// Declared length exceeds the configured maximum
    InvalidLength,
    /// TYPE byte is neither DATA nor ACK
    InvalidType,
    /// DATA frame with an empty payload
    EmptyData,
    /// Checksum mismatch
    InvalidChecksum,
}

/// Frame kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FrameType {
    /// Application payload, must be acknowledged
    Data = 0,
    /// Acknowledges the DATA frame with the same sequence
    Ack = 1,
}

impl FrameType {
    /// Parse a frame type from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(FrameType::Data),
            1 => Some(FrameType::Ack),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// A decoded or outgoing frame
///
/// The payload borrows from the decoder or the caller; decoded frames are
/// only valid until the decoder is fed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame<'a> {
    /// Sequence number
    pub sequence: u16,
    /// Frame kind
    pub frame_type: FrameType,
    /// Payload bytes, empty for ACK frames
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Create a DATA frame
    pub fn data(sequence: u16, payload: &'a [u8]) -> Self {
        Self {
            sequence,
            frame_type: FrameType::Data,
            payload,
        }
    }

    /// Create an ACK frame for `sequence`
    pub fn ack(sequence: u16) -> Self {
        Self {
            sequence,
            frame_type: FrameType::Ack,
            payload: &[],
        }
    }

    /// Encoded size of this frame
    pub fn encoded_len(&self, magic: &Magic) -> usize {
        calc_frame_size(magic.len(), self.payload.len())
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, magic: &Magic, buffer: &mut [u8]) -> Result<usize, FrameError> {
        if self.payload.len() > u16::MAX as usize {
            return Err(FrameError::PayloadTooLarge);
        }

        let frame_len = self.encoded_len(magic);
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let m = magic.len();
        let body = m + FIELDS_SIZE;
        let crc_at = body + self.payload.len();

        buffer[..m].copy_from_slice(magic.as_bytes());
        buffer[m..m + 2].copy_from_slice(&(self.payload.len() as u16).to_be_bytes());
        buffer[m + 2..m + 4].copy_from_slice(&self.sequence.to_be_bytes());
        buffer[m + 4] = self.frame_type.to_byte();
        buffer[body..crc_at].copy_from_slice(self.payload);

        let mut crc = Crc16::new();
        crc.update(&buffer[..crc_at]);
        buffer[crc_at..frame_len].copy_from_slice(&crc.value().to_be_bytes());

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec<const S: usize>(&self, magic: &Magic) -> Result<Vec<u8, S>, FrameError> {
        let mut vec = Vec::new();
        vec.resize_default(self.encoded_len(magic))
            .map_err(|_| FrameError::BufferTooSmall)?;
        let len = self.encode(magic, &mut vec)?;
        vec.truncate(len);
        Ok(vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FramerConfig;
    use crate::framer::Framer;

    #[test]
    fn test_frame_size() {
        assert_eq!(calc_frame_size(2, 0), 9);
        assert_eq!(calc_frame_size(2, 4), 13);
        assert_eq!(calc_frame_size(4, 240), 251);
        assert!(calc_frame_size(MAX_MAGIC_LEN, DEFAULT_MAX_PAYLOAD) <= DEFAULT_MAX_FRAME);
    }

    const PING: [u8; 13] = [
        0x19, 0x16, // magic
        0x00, 0x04, // length
        0x00, 0x07, // sequence
        0x00, // DATA
        b'P', b'I', b'N', b'G', // payload
        0x3B, 0x17, // CRC16
    ];

    #[test]
    fn test_ping_bytes() {
        let encoded: Vec<u8, 32> = Frame::data(7, b"PING").encode_to_vec(&Magic::default()).unwrap();
        assert_eq!(encoded, PING);
    }

    #[test]
    fn test_ping_decodes() {
        let mut framer: Framer<16> = Framer::new(FramerConfig {
            max_payload: 16,
            ..Default::default()
        })
        .unwrap();

        let (taken, frame) = framer.feed_bytes(&PING);
        assert_eq!(taken, PING.len());
        let frame = frame.unwrap();
        assert_eq!(frame.sequence, 7);
        assert_eq!(frame.frame_type, FrameType::Data);
        assert_eq!(frame.payload, b"PING");
    }

    #[test]
    fn test_ack_encoding() {
        let magic = Magic::default();
        let encoded: Vec<u8, 16> = Frame::ack(0xBEEF).encode_to_vec(&magic).unwrap();

        assert_eq!(encoded.len(), 9);
        assert_eq!(&encoded[..7], &[0x19, 0x16, 0x00, 0x00, 0xBE, 0xEF, 0x01]);
    }

    #[test]
    fn test_buffer_too_small() {
        let magic = Magic::default();
        let mut buffer = [0u8; 12];
        assert_eq!(
            Frame::data(1, b"PING").encode(&magic, &mut buffer),
            Err(FrameError::BufferTooSmall)
        );

        let result: Result<Vec<u8, 8>, _> = Frame::ack(1).encode_to_vec(&magic);
        assert_eq!(result, Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_frame_type_bytes() {
        assert_eq!(FrameType::from_byte(0), Some(FrameType::Data));
        assert_eq!(FrameType::from_byte(1), Some(FrameType::Ack));
        assert_eq!(FrameType::from_byte(2), None);
        assert_eq!(FrameType::Ack.to_byte(), 1);
    }
}

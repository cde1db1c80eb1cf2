//! CRC16-CCITT checksum
//!
//! Polynomial `0x1021`, initial value `0xFFFF`, no reflection and no final
//! XOR (the "CCITT-FALSE" parameter set). The checksum is transmitted
//! big-endian after the payload.
//!
//! [`Crc16`] is a running checksum: feeding the fields of a frame one after
//! another produces the same value as checksumming their concatenation,
//! which lets the streaming decoder verify a frame without keeping its
//! header around.

/// Generator polynomial
pub const CRC16_POLY: u16 = 0x1021;

/// Initial register value
pub const CRC16_INIT: u16 = 0xFFFF;

const TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC16_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Running CRC16-CCITT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Crc16 {
    value: u16,
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc16 {
    /// Start a new checksum
    pub const fn new() -> Self {
        Self { value: CRC16_INIT }
    }

    /// Continue a checksum from a previously computed value
    pub const fn with_initial(value: u16) -> Self {
        Self { value }
    }

    /// Feed a single byte
    #[inline]
    pub fn update_byte(&mut self, byte: u8) {
        let index = ((self.value >> 8) as u8 ^ byte) as usize;
        self.value = (self.value << 8) ^ TABLE[index];
    }

    /// Feed a run of bytes
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.update_byte(byte);
        }
    }

    /// Current checksum value
    pub const fn value(&self) -> u16 {
        self.value
    }
}

/// Checksum a contiguous byte slice
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(data);
    crc.value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        // Standard check input for CRC-16/CCITT-FALSE
        assert_eq!(crc16_ccitt(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty_input_is_initial_value() {
        assert_eq!(crc16_ccitt(&[]), CRC16_INIT);
    }

    #[test]
    fn test_chained_fields_match_concatenation() {
        let magic = [0x19, 0x16];
        let header = [0x00, 0x04, 0x00, 0x07, 0x00];
        let payload = b"PING";

        let mut running = Crc16::new();
        running.update(&magic);
        running.update(&header);
        running.update(payload);

        let mut whole = [0u8; 11];
        whole[..2].copy_from_slice(&magic);
        whole[2..7].copy_from_slice(&header);
        whole[7..].copy_from_slice(payload);

        assert_eq!(running.value(), crc16_ccitt(&whole));
    }

    #[test]
    fn test_with_initial_continues() {
        let first = crc16_ccitt(b"1234");
        let mut rest = Crc16::with_initial(first);
        rest.update(b"56789");
        assert_eq!(rest.value(), 0x29B1);
    }

    #[test]
    fn test_table_matches_bitwise() {
        fn bitwise(data: &[u8]) -> u16 {
            let mut crc = CRC16_INIT;
            for &b in data {
                crc ^= (b as u16) << 8;
                for _ in 0..8 {
                    crc = if crc & 0x8000 != 0 {
                        (crc << 1) ^ CRC16_POLY
                    } else {
                        crc << 1
                    };
                }
            }
            crc
        }

        let data: [u8; 64] = core::array::from_fn(|i| (i as u8).wrapping_mul(37));
        assert_eq!(crc16_ccitt(&data), bitwise(&data));
    }
}

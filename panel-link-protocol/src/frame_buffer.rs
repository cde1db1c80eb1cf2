//! Fixed-capacity receive buffer
//!
//! A linear buffer with a read cursor. Consumed bytes are reclaimed lazily:
//! the live region is shifted to the front only when an insert would not
//! fit behind it.

/// Linear receive buffer holding up to `B` bytes
#[derive(Debug, Clone)]
pub struct FrameBuffer<const B: usize> {
    data: [u8; B],
    read: usize,
    write: usize,
}

impl<const B: usize> Default for FrameBuffer<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const B: usize> FrameBuffer<B> {
    /// Create an empty buffer
    pub const fn new() -> Self {
        Self {
            data: [0; B],
            read: 0,
            write: 0,
        }
    }

    /// Buffered byte count
    pub fn len(&self) -> usize {
        self.write - self.read
    }

    /// True when nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }

    /// Room left, counting consumed bytes that can be reclaimed
    pub fn free(&self) -> usize {
        B - self.len()
    }

    /// Buffered bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.read..self.write]
    }

    /// Append as much of `bytes` as fits, returning the count taken
    pub fn insert(&mut self, bytes: &[u8]) -> usize {
        let count = bytes.len().min(self.free());
        if B - self.write < count {
            self.compact();
        }
        self.data[self.write..self.write + count].copy_from_slice(&bytes[..count]);
        self.write += count;
        count
    }

    /// Drop `count` bytes from the front
    pub fn consume(&mut self, count: usize) {
        self.read = (self.read + count).min(self.write);
        if self.read == self.write {
            self.read = 0;
            self.write = 0;
        }
    }

    /// Move the live region to the start of storage
    pub fn compact(&mut self) {
        if self.read > 0 {
            self.data.copy_within(self.read..self.write, 0);
            self.write -= self.read;
            self.read = 0;
        }
    }

    /// Discard everything
    pub fn clear(&mut self) {
        self.read = 0;
        self.write = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_consume() {
        let mut buffer: FrameBuffer<8> = FrameBuffer::new();
        assert_eq!(buffer.insert(&[1, 2, 3]), 3);
        assert_eq!(buffer.as_slice(), &[1, 2, 3]);

        buffer.consume(2);
        assert_eq!(buffer.as_slice(), &[3]);
        assert_eq!(buffer.free(), 7);

        buffer.consume(1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_insert() {
        let mut buffer: FrameBuffer<4> = FrameBuffer::new();
        assert_eq!(buffer.insert(&[1, 2, 3, 4, 5, 6]), 4);
        assert_eq!(buffer.insert(&[7]), 0);
        assert_eq!(buffer.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_insert_reclaims_consumed_space() {
        let mut buffer: FrameBuffer<4> = FrameBuffer::new();
        buffer.insert(&[1, 2, 3, 4]);
        buffer.consume(3);
        assert_eq!(buffer.insert(&[5, 6, 7]), 3);
        assert_eq!(buffer.as_slice(), &[4, 5, 6, 7]);
    }
}

//! Outbound sequence numbering

use portable_atomic::{AtomicU16, Ordering};

/// Shared counter handing out DATA sequence numbers
///
/// Numbers start at 1 and wrap from 65535 to 0. Every caller gets a
/// distinct number within one wrap of the counter.
#[derive(Debug)]
pub struct SequenceCounter {
    last: AtomicU16,
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceCounter {
    /// Create a counter whose first number is 1
    pub const fn new() -> Self {
        Self::starting_after(0)
    }

    /// Create a counter whose first number is `last + 1`
    pub const fn starting_after(last: u16) -> Self {
        Self {
            last: AtomicU16::new(last),
        }
    }

    /// Take the next sequence number
    pub fn next(&self) -> u16 {
        self.last.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Most recently issued number
    pub fn current(&self) -> u16 {
        self.last.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_one() {
        let counter = SequenceCounter::new();
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
        assert_eq!(counter.current(), 2);
    }

    #[test]
    fn test_wraps_to_zero() {
        let counter = SequenceCounter::starting_after(65534);
        assert_eq!(counter.next(), 65535);
        assert_eq!(counter.next(), 0);
        assert_eq!(counter.next(), 1);
        assert!(panel_link_protocol::is_newer(0, 65535));
    }
}

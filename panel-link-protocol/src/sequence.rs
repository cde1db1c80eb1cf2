//! Sequence number arithmetic
//!
//! Sequence numbers are 16-bit and wrap, so ordering is defined modulo
//! 2^16: `a` is newer than `b` when it lies less than half the number
//! space ahead of it. Under this rule 0 is newer than 65535.

use heapless::Deque;

/// True if `candidate` comes after `reference`
pub fn is_newer(candidate: u16, reference: u16) -> bool {
    distance(reference, candidate) > 0
}

/// Signed number of steps from `from` to `to`
pub fn distance(from: u16, to: u16) -> i16 {
    to.wrapping_sub(from) as i16
}

/// The last `K` sequence numbers delivered by a peer
///
/// Used to recognize a retransmitted DATA frame whose ACK was lost, so the
/// payload is handed to the application only once.
#[derive(Debug, Clone)]
pub struct RecentSequences<const K: usize> {
    seen: Deque<u16, K>,
}

impl<const K: usize> Default for RecentSequences<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const K: usize> RecentSequences<K> {
    /// Create an empty history
    pub const fn new() -> Self {
        Self { seen: Deque::new() }
    }

    /// Record a delivered sequence number
    ///
    /// Returns false if it is already in the history.
    pub fn record(&mut self, sequence: u16) -> bool {
        if self.contains(sequence) {
            return false;
        }
        if self.seen.is_full() {
            self.seen.pop_front();
        }
        let _ = self.seen.push_back(sequence);
        true
    }

    /// True if `sequence` was delivered recently
    pub fn contains(&self, sequence: u16) -> bool {
        self.seen.iter().any(|&s| s == sequence)
    }

    /// Most recently recorded sequence number
    pub fn last(&self) -> Option<u16> {
        self.seen.back().copied()
    }

    /// Forget everything, e.g. after the peer restarted
    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_newer_wraps() {
        assert!(is_newer(1, 0));
        assert!(is_newer(0, 65535));
        assert!(is_newer(5, 65530));
        assert!(!is_newer(65535, 0));
        assert!(!is_newer(7, 7));
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance(65535, 0), 1);
        assert_eq!(distance(0, 65535), -1);
        assert_eq!(distance(10, 20), 10);
    }

    #[test]
    fn test_recent_sequences() {
        let mut recent: RecentSequences<3> = RecentSequences::new();
        assert!(recent.record(1));
        assert!(!recent.record(1));
        assert!(recent.record(2));
        assert!(recent.record(3));
        assert_eq!(recent.last(), Some(3));

        // Oldest entry falls out
        assert!(recent.record(4));
        assert!(!recent.contains(1));
        assert!(recent.record(1));

        recent.clear();
        assert_eq!(recent.last(), None);
    }

    #[test]
    fn test_recent_sequences_across_wrap() {
        let mut recent: RecentSequences<4> = RecentSequences::new();
        assert!(recent.record(65534));
        assert!(recent.record(65535));
        assert!(recent.record(0));
        assert!(!recent.record(65535));
    }
}

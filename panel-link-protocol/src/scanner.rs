//! Byte-sequence search
//!
//! The magic marker is only a few bytes long, so a plain scan that
//! pre-filters on the first byte is all that is needed.

/// Find the first occurrence of `needle` in `haystack`
///
/// Returns the offset of the match, or `None` if there is no match or the
/// needle is empty.
pub fn find_sequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    let first = *needle.first()?;
    if haystack.len() < needle.len() {
        return None;
    }

    (0..=haystack.len() - needle.len())
        .find(|&i| haystack[i] == first && &haystack[i..i + needle.len()] == needle)
}

/// Length of the longest suffix of `haystack` that is a proper prefix of `needle`
///
/// These are the bytes that may still turn into a match once more data
/// arrives, so they must survive when the rest of the buffer is discarded.
pub fn partial_suffix_len(haystack: &[u8], needle: &[u8]) -> usize {
    let max = needle.len().saturating_sub(1).min(haystack.len());
    (1..=max)
        .rev()
        .find(|&n| haystack[haystack.len() - n..] == needle[..n])
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_at_start_middle_end() {
        assert_eq!(find_sequence(&[0x19, 0x16, 0x00], &[0x19, 0x16]), Some(0));
        assert_eq!(find_sequence(&[0x00, 0x19, 0x16, 0x00], &[0x19, 0x16]), Some(1));
        assert_eq!(find_sequence(&[0x00, 0x00, 0x19, 0x16], &[0x19, 0x16]), Some(2));
    }

    #[test]
    fn test_find_none() {
        assert_eq!(find_sequence(&[0x19, 0x19, 0x00], &[0x19, 0x16]), None);
        assert_eq!(find_sequence(&[0x19], &[0x19, 0x16]), None);
        assert_eq!(find_sequence(&[], &[0x19]), None);
        assert_eq!(find_sequence(&[0x19], &[]), None);
    }

    #[test]
    fn test_find_repeating_first_byte() {
        // First byte recurs inside the needle
        let needle = [0xAA, 0xAA, 0x55];
        assert_eq!(find_sequence(&[0xAA, 0xAA, 0xAA, 0x55], &needle), Some(1));
    }

    #[test]
    fn test_partial_suffix() {
        let magic = [0x19, 0x16, 0x42];
        assert_eq!(partial_suffix_len(&[0x00, 0x19], &magic), 1);
        assert_eq!(partial_suffix_len(&[0x00, 0x19, 0x16], &magic), 2);
        assert_eq!(partial_suffix_len(&[0x00, 0x16], &magic), 0);
        // A complete match is not a partial one
        assert_eq!(partial_suffix_len(&[0x19, 0x16, 0x42], &magic), 0);
        assert_eq!(partial_suffix_len(&[], &magic), 0);
    }
}

//! Letter frequency maps over the 26-letter Latin alphabet.
//!
//! A [`FrequencyMap`] is a fixed `[usize; 26]` array indexed by letter, so
//! building one and comparing two never allocates. It is used both for a
//! segment's available pool and for the slice of a candidate word that the
//! segment governs.
//!
//! # Example
//!
//! ```rust
//! use wordshape_core::letters::FrequencyMap;
//!
//! let pool = FrequencyMap::from_letters("caat");
//! assert_eq!(pool.count('a'), 2);
//! assert!(FrequencyMap::from_letters("cat").is_subset_of(&pool));
//! assert!(!FrequencyMap::from_letters("catt").is_subset_of(&pool));
//! ```

/// Number of letters in the supported alphabet.
pub const ALPHABET_LEN: usize = 26;

/// Index of an ASCII letter in `0..26`, case-insensitive.
///
/// Returns `None` for anything that is not `a-z` / `A-Z`.
#[inline]
pub fn letter_index(byte: u8) -> Option<usize> {
    let lower = byte.to_ascii_lowercase();
    if lower.is_ascii_lowercase() {
        Some((lower - b'a') as usize)
    } else {
        None
    }
}

/// Multiset of letters: how many times each of `a..=z` occurs.
///
/// Absent letters have count zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FrequencyMap {
    counts: [usize; ALPHABET_LEN],
}

impl FrequencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the letters of `s`. Upper-case letters are folded to lower
    /// case; non-letters are ignored.
    pub fn from_letters(s: &str) -> Self {
        let mut map = Self::new();
        for b in s.bytes() {
            if let Some(i) = letter_index(b) {
                map.counts[i] += 1;
            }
        }
        map
    }

    /// Occurrences of `letter` (case-insensitive). Non-letters are always 0.
    pub fn count(&self, letter: char) -> usize {
        if !letter.is_ascii() {
            return 0;
        }
        letter_index(letter as u8).map_or(0, |i| self.counts[i])
    }

    /// Raw count by alphabet index.
    #[inline]
    pub fn count_at(&self, index: usize) -> usize {
        self.counts[index]
    }

    /// True when every letter's count is `<=` the same letter's count in
    /// `pool`.
    pub fn is_subset_of(&self, pool: &FrequencyMap) -> bool {
        self.counts
            .iter()
            .zip(pool.counts.iter())
            .all(|(used, available)| used <= available)
    }
}

/// Check a slice of a candidate word against a pool without building an
/// intermediate map for the slice first.
///
/// Stops at the first letter whose running count exceeds the pool, or at
/// the first byte that is not a letter.
#[inline]
pub fn fits_pool(slice: &[u8], pool: &FrequencyMap) -> bool {
    let mut used = [0usize; ALPHABET_LEN];
    for &b in slice {
        let Some(i) = letter_index(b) else {
            return false;
        };
        used[i] += 1;
        if used[i] > pool.count_at(i) {
            return false;
        }
    }
    true
}

//! Dictionary word-list cleaning, checksumming, and lookup.
//!
//! Raw dictionary text arrives from an untrusted remote source. [`validate`]
//! turns it into a clean, lower-cased, deduplicated [`WordList`] or rejects
//! it outright.
//!
//! # Token rules
//!
//! Text is split on any ASCII whitespace. A token is accepted when:
//!
//! 1. it is 1 to [`MAX_WORD_LEN`] bytes long,
//! 2. it only contains `a-z`, `A-Z`, and `-`,
//! 3. it is not made of hyphens alone,
//! 4. it neither starts nor ends with `-`,
//! 5. it contains no `--`.
//!
//! Rejected tokens are counted in [`ParsedWords::rejected`] and otherwise
//! ignored. The only hard failures are bad encoding and too few accepted
//! words.
//!
//! # Checksum
//!
//! [`checksum`] is a SHA-256 over the sorted, deduplicated words joined with
//! `\n`, so any permutation of the same word set hashes identically.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::error::ValidationError;

/// Longest accepted word, in bytes.
pub const MAX_WORD_LEN: usize = 50;

/// Default minimum number of accepted words for a dictionary load.
pub const DEFAULT_MIN_WORDS: usize = 1000;

/// Result of tokenizing raw text, before the minimum-size check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedWords {
    /// Accepted words, lower-cased, sorted, deduplicated.
    pub words: Vec<String>,
    /// Number of tokens that failed the token rules.
    pub rejected: usize,
    /// Number of accepted tokens that were duplicates after lower-casing.
    pub duplicates: usize,
}

/// Check that `content` is non-empty printable ASCII plus whitespace.
pub fn check_encoding(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::ContentEncoding {
            reason: "content is empty".to_string(),
        });
    }
    if let Some((pos, b)) = content
        .bytes()
        .enumerate()
        .find(|(_, b)| !(b.is_ascii_graphic() || *b == b' ' || b.is_ascii_whitespace()))
    {
        return Err(ValidationError::ContentEncoding {
            reason: format!(
                "byte 0x{:02x} at offset {} is not printable ASCII",
                b, pos
            ),
        });
    }
    Ok(())
}

/// True if `token` passes every token rule.
pub fn is_valid_token(token: &str) -> bool {
    let bytes = token.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_WORD_LEN {
        return false;
    }
    if !bytes.iter().all(|b| b.is_ascii_alphabetic() || *b == b'-') {
        return false;
    }
    if bytes.iter().all(|b| *b == b'-') {
        return false;
    }
    if bytes[0] == b'-' || bytes[bytes.len() - 1] == b'-' {
        return false;
    }
    !token.contains("--")
}

/// Tokenize `content` and keep the valid tokens, without checking encoding
/// or a minimum count.
///
/// Useful for small local word lists where the minimum does not apply.
pub fn parse_words(content: &str) -> ParsedWords {
    let mut accepted = BTreeSet::new();
    let mut rejected = 0;
    let mut duplicates = 0;

    for token in content.split_ascii_whitespace() {
        if !is_valid_token(token) {
            rejected += 1;
            continue;
        }
        if !accepted.insert(token.to_ascii_lowercase()) {
            duplicates += 1;
        }
    }

    ParsedWords {
        words: accepted.into_iter().collect(),
        rejected,
        duplicates,
    }
}

/// Full validation: encoding check, tokenizing, and the minimum count.
///
/// # Errors
///
/// - [`ValidationError::ContentEncoding`] for empty or non-ASCII input.
/// - [`ValidationError::InsufficientWords`] when fewer than `min_words`
///   tokens are accepted.
pub fn validate(content: &str, min_words: usize) -> Result<ParsedWords, ValidationError> {
    check_encoding(content)?;
    let parsed = parse_words(content);
    if parsed.words.len() < min_words {
        return Err(ValidationError::InsufficientWords {
            found: parsed.words.len(),
            required: min_words,
        });
    }
    Ok(parsed)
}

/// Order-independent SHA-256 digest of a word set, as lower-case hex.
pub fn checksum<S: AsRef<str>>(words: &[S]) -> String {
    let set: BTreeSet<&str> = words.iter().map(|w| w.as_ref()).collect();
    let mut hasher = Sha256::new();
    for (i, word) in set.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\n");
        }
        hasher.update(word.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// An immutable, sorted, deduplicated list of dictionary words.
///
/// Built once per load and shared behind an `Arc`; a refresh replaces the
/// whole list rather than mutating it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordList {
    words: Vec<String>,
}

impl WordList {
    /// Sort and deduplicate `words`.
    pub fn new(mut words: Vec<String>) -> Self {
        words.sort_unstable();
        words.dedup();
        Self { words }
    }

    /// Binary-search lookup after trimming and lower-casing `word`.
    pub fn contains(&self, word: &str) -> bool {
        let needle = word.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.words
            .binary_search_by(|w| w.as_str().cmp(needle.as_str()))
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.words
    }
}

impl From<ParsedWords> for WordList {
    fn from(parsed: ParsedWords) -> Self {
        WordList::new(parsed.words)
    }
}

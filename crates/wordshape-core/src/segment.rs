//! Segments: the constraint units a word shape is built from.
//!
//! A segment pairs a pool of available letters with the exact number of
//! letters its slice of the word must have. An ordered list of segments
//! describes a whole word: the first segment governs the first
//! `target_length` letters, the second governs the next slice, and so on.
//!
//! Validation is structural and happens before any filtering. Each problem
//! is reported as a [`SegmentIssue`] carrying the segment index, the
//! violated [`SegmentConstraint`], the offending value, and a suggested fix.
//!
//! # Notation
//!
//! On the command line a segment is written `letters:length`:
//!
//! ```rust
//! use wordshape_core::segment::Segment;
//!
//! let seg: Segment = "CAAT:3".parse().unwrap();
//! assert_eq!(seg.available_letters, "caat");
//! assert_eq!(seg.target_length, 3);
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Maximum number of segments in one word shape.
pub const MAX_SEGMENTS: usize = 6;

/// One letter pool and the exact length of the slice it governs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Letters that may be drawn from. Duplicates are significant, order is not.
    pub available_letters: String,
    /// Exact number of letters in this segment's slice of the word.
    pub target_length: usize,
}

impl Segment {
    /// Build a segment, lower-casing and trimming the letter pool.
    pub fn new(available_letters: impl AsRef<str>, target_length: usize) -> Self {
        Self {
            available_letters: available_letters.as_ref().trim().to_ascii_lowercase(),
            target_length,
        }
    }

    /// Number of letters in the pool.
    pub fn pool_size(&self) -> usize {
        self.available_letters.chars().count()
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.available_letters, self.target_length)
    }
}

/// Failure to read the `letters:length` notation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentParseError {
    #[error("segment \"{input}\" is missing ':' (expected letters:length, e.g. caat:3)")]
    MissingSeparator { input: String },

    #[error("segment \"{input}\" has an invalid length \"{length}\" (expected a whole number)")]
    InvalidLength { input: String, length: String },
}

impl FromStr for Segment {
    type Err = SegmentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (letters, length) =
            s.rsplit_once(':')
                .ok_or_else(|| SegmentParseError::MissingSeparator {
                    input: s.to_string(),
                })?;
        let target_length =
            length
                .trim()
                .parse::<usize>()
                .map_err(|_| SegmentParseError::InvalidLength {
                    input: s.to_string(),
                    length: length.to_string(),
                })?;
        Ok(Segment::new(letters, target_length))
    }
}

/// Which structural rule a segment (or the segment list) broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SegmentConstraint {
    /// The list must hold between 1 and [`MAX_SEGMENTS`] segments.
    SegmentCount,
    /// The letter pool must not be empty.
    LettersNonEmpty,
    /// The letter pool may only contain `a-z`.
    LettersAlphabetic,
    /// `target_length` must be at least 1.
    LengthPositive,
    /// `target_length` may not exceed the pool size.
    LengthWithinPool,
}

impl SegmentConstraint {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentConstraint::SegmentCount => "segment-count",
            SegmentConstraint::LettersNonEmpty => "letters-non-empty",
            SegmentConstraint::LettersAlphabetic => "letters-alphabetic",
            SegmentConstraint::LengthPositive => "length-positive",
            SegmentConstraint::LengthWithinPool => "length-within-pool",
        }
    }
}

/// A single structural problem, with enough detail to render an
/// actionable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentIssue {
    /// Zero-based segment index; `None` for problems with the list itself.
    pub segment_index: Option<usize>,
    pub constraint: SegmentConstraint,
    /// The offending value, rendered as text.
    pub value: String,
    pub message: String,
    pub suggestion: String,
}

/// Validation outcome for one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentValidation {
    pub index: usize,
    pub valid: bool,
    pub issues: Vec<SegmentIssue>,
}

/// Validation outcome for a whole segment list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentReport {
    /// Problems with the list as a whole (segment count).
    pub list_issues: Vec<SegmentIssue>,
    /// One entry per segment, in order.
    pub segments: Vec<SegmentValidation>,
}

impl SegmentReport {
    pub fn is_valid(&self) -> bool {
        self.list_issues.is_empty() && self.segments.iter().all(|s| s.valid)
    }

    /// The first problem found: list-level problems come before
    /// per-segment ones, and segments are visited in order.
    pub fn first_issue(&self) -> Option<&SegmentIssue> {
        self.list_issues
            .first()
            .or_else(|| self.segments.iter().flat_map(|s| s.issues.iter()).next())
    }

    pub fn issues(&self) -> impl Iterator<Item = &SegmentIssue> {
        self.list_issues
            .iter()
            .chain(self.segments.iter().flat_map(|s| s.issues.iter()))
    }
}

/// Check a single segment at position `index`.
pub fn validate_segment(index: usize, segment: &Segment) -> SegmentValidation {
    let mut issues = Vec::new();
    let label = index + 1;
    let pool_size = segment.pool_size();

    if segment.available_letters.is_empty() {
        issues.push(SegmentIssue {
            segment_index: Some(index),
            constraint: SegmentConstraint::LettersNonEmpty,
            value: String::new(),
            message: format!("segment {} has no available letters", label),
            suggestion: format!("add at least one letter to segment {}", label),
        });
    } else if let Some(bad) = segment
        .available_letters
        .chars()
        .find(|c| !c.is_ascii_lowercase())
    {
        issues.push(SegmentIssue {
            segment_index: Some(index),
            constraint: SegmentConstraint::LettersAlphabetic,
            value: bad.to_string(),
            message: format!(
                "segment {} contains '{}'; only letters a-z are allowed",
                label, bad
            ),
            suggestion: format!("remove '{}' from segment {}", bad, label),
        });
    }

    if segment.target_length == 0 {
        issues.push(SegmentIssue {
            segment_index: Some(index),
            constraint: SegmentConstraint::LengthPositive,
            value: segment.target_length.to_string(),
            message: format!("segment {} has a target length of 0", label),
            suggestion: format!("set the length of segment {} to at least 1", label),
        });
    } else if pool_size > 0 && segment.target_length > pool_size {
        issues.push(SegmentIssue {
            segment_index: Some(index),
            constraint: SegmentConstraint::LengthWithinPool,
            value: segment.target_length.to_string(),
            message: format!(
                "segment {} wants {} letters but only {} are available",
                label, segment.target_length, pool_size
            ),
            suggestion: format!(
                "lower the length of segment {} to {} or add {} more letter{}",
                label,
                pool_size,
                segment.target_length - pool_size,
                if segment.target_length - pool_size == 1 { "" } else { "s" }
            ),
        });
    }

    SegmentValidation {
        index,
        valid: issues.is_empty(),
        issues,
    }
}

/// Validate every segment and the list length.
pub fn validate_segments(segments: &[Segment]) -> SegmentReport {
    let mut list_issues = Vec::new();
    if segments.is_empty() || segments.len() > MAX_SEGMENTS {
        list_issues.push(SegmentIssue {
            segment_index: None,
            constraint: SegmentConstraint::SegmentCount,
            value: segments.len().to_string(),
            message: format!(
                "{} segments given; between 1 and {} are allowed",
                segments.len(),
                MAX_SEGMENTS
            ),
            suggestion: if segments.is_empty() {
                "add at least one segment, e.g. caat:3".to_string()
            } else {
                format!("merge or drop segments to keep at most {}", MAX_SEGMENTS)
            },
        });
    }

    SegmentReport {
        list_issues,
        segments: segments
            .iter()
            .enumerate()
            .map(|(i, s)| validate_segment(i, s))
            .collect(),
    }
}

/// Split `word` into consecutive slices of the given lengths.
///
/// Returns `None` when the lengths do not add up to the word's length or a
/// boundary would fall inside a multi-byte character.
///
/// ```rust
/// use wordshape_core::segment::split_word;
///
/// assert_eq!(split_word("abcd", &[2, 2]), Some(vec!["ab", "cd"]));
/// assert_eq!(split_word("abcd", &[3]), None);
/// ```
pub fn split_word<'a>(word: &'a str, lengths: &[usize]) -> Option<Vec<&'a str>> {
    if lengths.iter().sum::<usize>() != word.len() {
        return None;
    }
    let mut slices = Vec::with_capacity(lengths.len());
    let mut offset = 0;
    for &len in lengths {
        slices.push(word.get(offset..offset + len)?);
        offset += len;
    }
    Some(slices)
}

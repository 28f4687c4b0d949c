//! Segment filter engine.
//!
//! Given an ordered list of [`Segment`]s and a dictionary, [`filter`]
//! returns every word that can be cut into consecutive slices, one per
//! segment, where each slice has exactly the segment's `target_length`
//! and draws no letter more often than the segment's pool provides.
//!
//! # Algorithm
//!
//! 1. Validate the segments structurally ([`validate_segments`]). The first
//!    problem short-circuits with a `validation` error; nothing is scanned.
//! 2. `total = Σ target_length`. Only words of exactly that length are
//!    candidates; this O(1) check discards most of the dictionary.
//! 3. Each candidate is cut at the precomputed segment offsets.
//! 4. Each slice is checked against its pool with a multiset-subset test
//!    over a fixed 26-letter array ([`fits_pool`]), failing fast on the
//!    first segment that does not fit.
//! 5. Matches are lower-cased, sorted, and deduplicated.
//! 6. No matches yields an empty list plus a `constraint` error.
//!
//! The engine is pure: it reads its inputs, allocates its output, and
//! touches no shared state, so it can run on any thread.
//!
//! # Example
//!
//! ```rust
//! use wordshape_core::filter::filter;
//! use wordshape_core::segment::Segment;
//!
//! let result = filter(&[Segment::new("caat", 3)], &["cat", "act", "tac", "dog"]);
//! assert_eq!(result.words, vec!["act", "cat", "tac"]);
//! assert!(result.error.is_none());
//! ```

use serde::Serialize;
use std::ops::Range;
use std::time::Instant;

use crate::error::ErrorKind;
use crate::letters::{fits_pool, FrequencyMap};
use crate::segment::{validate_segments, Segment, SegmentIssue};

/// Message attached to a zero-match result.
pub const NO_MATCHES_MESSAGE: &str = "no dictionary words satisfy the provided segment constraints";

/// A classified filter failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterError {
    pub kind: ErrorKind,
    pub message: String,
    /// The structural problem, for `validation` errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<SegmentIssue>,
}

impl FilterError {
    pub fn validation(issue: SegmentIssue) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: issue.message.clone(),
            issue: Some(issue),
        }
    }

    pub fn no_matches() -> Self {
        Self {
            kind: ErrorKind::Constraint,
            message: NO_MATCHES_MESSAGE.to_string(),
            issue: None,
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Processing,
            message: message.into(),
            issue: None,
        }
    }
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)?;
        if let Some(issue) = &self.issue {
            write!(f, " ({})", issue.suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for FilterError {}

/// Counters and timing for one filter call. Always populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterMetadata {
    pub processing_time_ms: f64,
    /// Dictionary entries looked at by the length pre-filter.
    pub processed_words: usize,
    /// Entries that survived the length pre-filter.
    pub total_candidates: usize,
    pub segment_count: usize,
}

/// Output of [`filter`]. Built fresh per call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterResult {
    /// Matches, lower-cased and sorted.
    pub words: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FilterError>,
    pub metadata: FilterMetadata,
}

impl FilterResult {
    /// A result with no words and the given error.
    pub fn failed(error: FilterError, metadata: FilterMetadata) -> Self {
        Self {
            words: Vec::new(),
            error: Some(error),
            metadata,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Precomputed per-segment pools and byte ranges.
#[derive(Debug, Clone)]
struct SegmentPlan {
    pools: Vec<FrequencyMap>,
    ranges: Vec<Range<usize>>,
    total_length: usize,
}

impl SegmentPlan {
    fn new(segments: &[Segment]) -> Self {
        let mut offset = 0;
        let mut ranges = Vec::with_capacity(segments.len());
        for s in segments {
            ranges.push(offset..offset + s.target_length);
            offset += s.target_length;
        }
        Self {
            pools: segments
                .iter()
                .map(|s| FrequencyMap::from_letters(&s.available_letters))
                .collect(),
            ranges,
            total_length: offset,
        }
    }

    fn matches(&self, word: &[u8]) -> Result<bool, FilterError> {
        for (range, pool) in self.ranges.iter().zip(self.pools.iter()) {
            let slice = word.get(range.clone()).ok_or_else(|| {
                FilterError::processing(format!(
                    "candidate of length {} cannot be split at {:?}",
                    word.len(),
                    range
                ))
            })?;
            if !fits_pool(slice, pool) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Run the segment filter over `dictionary`.
///
/// Never panics on bad input: structural problems, zero matches, and
/// internal failures are all reported through [`FilterResult::error`].
pub fn filter<S: AsRef<str>>(segments: &[Segment], dictionary: &[S]) -> FilterResult {
    let started = Instant::now();
    let mut metadata = FilterMetadata {
        segment_count: segments.len(),
        ..FilterMetadata::default()
    };

    let report = validate_segments(segments);
    if let Some(issue) = report.first_issue() {
        metadata.processing_time_ms = elapsed_ms(started);
        return FilterResult::failed(FilterError::validation(issue.clone()), metadata);
    }

    let outcome = scan(segments, dictionary, &mut metadata);
    metadata.processing_time_ms = elapsed_ms(started);

    match outcome {
        Ok(words) if words.is_empty() => FilterResult::failed(FilterError::no_matches(), metadata),
        Ok(words) => FilterResult {
            words,
            error: None,
            metadata,
        },
        Err(e) => FilterResult::failed(e, metadata),
    }
}

fn scan<S: AsRef<str>>(
    segments: &[Segment],
    dictionary: &[S],
    metadata: &mut FilterMetadata,
) -> Result<Vec<String>, FilterError> {
    let plan = SegmentPlan::new(segments);
    let mut words = Vec::new();

    for entry in dictionary {
        metadata.processed_words += 1;
        let word = entry.as_ref().trim();
        if word.len() != plan.total_length || !word.is_ascii() {
            continue;
        }
        metadata.total_candidates += 1;
        if plan.matches(word.as_bytes())? {
            words.push(word.to_ascii_lowercase());
        }
    }

    words.sort_unstable();
    words.dedup();
    Ok(words)
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

//! Segment filtering against a loaded word list.
//!
//! The matching itself lives in `wordshape_core::filter` and is pure CPU
//! work; [`filter_words`] moves it off the async runtime. The `run_*`
//! functions back the `filter` and `validate` commands.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::load_cmd;
use crate::progress::ProgressMode;
use wordshape_core::filter::{filter, FilterError, FilterMetadata, FilterResult};
use wordshape_core::segment::{split_word, validate_segments, Segment};
use wordshape_core::words::{parse_words, WordList};

/// Run the filter on a blocking thread.
///
/// A panic inside the filter surfaces as a `processing` error rather than
/// tearing down the caller.
pub async fn filter_words(segments: Vec<Segment>, words: Arc<WordList>) -> FilterResult {
    let segment_count = segments.len();
    match tokio::task::spawn_blocking(move || filter(&segments, words.as_slice())).await {
        Ok(result) => result,
        Err(e) => FilterResult::failed(
            FilterError::processing(format!("filter task failed: {}", e)),
            FilterMetadata {
                segment_count,
                ..FilterMetadata::default()
            },
        ),
    }
}

/// Output options for `wordshape filter`.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub json: bool,
    /// Show each match split into its segments.
    pub explain: bool,
    /// Filter this local list instead of the managed dictionary.
    pub words_file: Option<std::path::PathBuf>,
}

/// Run the filter command. Returns `false` when the result carries an error.
pub async fn run_filter(
    config: &Config,
    segments: Vec<Segment>,
    opts: &FilterOptions,
    progress: ProgressMode,
) -> Result<bool> {
    let result = match &opts.words_file {
        Some(path) => filter_words(segments.clone(), Arc::new(read_word_file(path)?)).await,
        None => {
            let manager = load_cmd::ready_manager(config, progress).await?;
            manager.filter(segments.clone()).await
        }
    };

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(result.is_ok());
    }

    if let Some(err) = &result.error {
        eprintln!("{}", err);
        return Ok(false);
    }

    let lengths: Vec<usize> = segments.iter().map(|s| s.target_length).collect();
    for word in &result.words {
        match (opts.explain, split_word(word, &lengths)) {
            (true, Some(parts)) => println!("{:<24} {}", word, parts.join(" | ")),
            _ => println!("{}", word),
        }
    }
    eprintln!(
        "{} match{} ({} candidates of {} words, {:.1} ms)",
        result.words.len(),
        if result.words.len() == 1 { "" } else { "es" },
        result.metadata.total_candidates,
        result.metadata.processed_words,
        result.metadata.processing_time_ms
    );
    Ok(true)
}

/// Run the validate command. Returns `false` when any issue was found.
pub fn run_validate(segments: &[Segment], json: bool) -> Result<bool> {
    let report = validate_segments(segments);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.is_valid());
    }

    if report.is_valid() {
        println!("{} segment(s) valid", segments.len());
        return Ok(true);
    }

    for issue in report.issues() {
        let location = match issue.segment_index {
            Some(i) => format!("segment {}", i + 1),
            None => "segments".to_string(),
        };
        println!("{:<12} {}: {}", location, issue.constraint.as_str(), issue.message);
        println!("{:<12} hint: {}", "", issue.suggestion);
    }
    Ok(false)
}

/// Load a local word list without the minimum-count check.
fn read_word_file(path: &Path) -> Result<WordList> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read word file: {}", path.display()))?;
    let parsed = parse_words(&content);
    tracing::debug!(
        words = parsed.words.len(),
        rejected = parsed.rejected,
        path = %path.display(),
        "read local word list"
    );
    Ok(WordList::from(parsed))
}

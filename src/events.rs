//! Loading state and lifecycle events of the dictionary manager.
//!
//! The manager owns a [`LoadingState`] and hands out copies. Every change is
//! announced as a [`DictionaryEvent`] on a `tokio::sync::broadcast`
//! channel; a subscriber stops listening by dropping its receiver.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::LoadFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Idle,
    Loading,
    Loaded,
    Cached,
    Error,
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::Idle => "idle",
            LoadStatus::Loading => "loading",
            LoadStatus::Loaded => "loaded",
            LoadStatus::Cached => "cached",
            LoadStatus::Error => "error",
        }
    }

    /// Whether words are available in this state.
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadStatus::Loaded | LoadStatus::Cached)
    }

    /// Allowed transitions:
    ///
    /// ```text
    /// idle → loading → loaded | cached | error
    /// error → loading            (retry)
    /// loaded | cached → loading  (refresh)
    /// any → idle                 (clear cache)
    /// ```
    pub fn can_transition_to(&self, next: LoadStatus) -> bool {
        use LoadStatus::*;
        match (self, next) {
            (_, Idle) => true,
            (Idle | Error | Loaded | Cached, Loading) => true,
            (Loading, Loaded | Cached | Error) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the manager's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadingState {
    pub status: LoadStatus,
    /// 0 to 100.
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<LoadFailure>,
    /// Terminal failures since the manager was created.
    pub retry_count: u32,
    pub last_attempt: Option<DateTime<Utc>>,
}

impl Default for LoadingState {
    fn default() -> Self {
        Self {
            status: LoadStatus::Idle,
            progress: 0,
            error: None,
            retry_count: 0,
            last_attempt: None,
        }
    }
}

/// Coarse milestones of a network load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStage {
    Requesting,
    Downloaded,
    Validated,
    Checksummed,
    Stored,
    Done,
}

impl LoadStage {
    pub fn percent(&self) -> u8 {
        match self {
            LoadStage::Requesting => 10,
            LoadStage::Downloaded => 30,
            LoadStage::Validated => 50,
            LoadStage::Checksummed => 70,
            LoadStage::Stored => 90,
            LoadStage::Done => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStage::Requesting => "requesting",
            LoadStage::Downloaded => "downloaded",
            LoadStage::Validated => "validated",
            LoadStage::Checksummed => "checksummed",
            LoadStage::Stored => "stored",
            LoadStage::Done => "done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum DictionaryEvent {
    LoadingStarted { source: String },
    LoadingProgress { stage: LoadStage, progress: u8 },
    LoadingCompleted { words: usize },
    CacheLoaded { words: usize },
    LoadingFailed { error: LoadFailure },
    CacheCleared,
}

impl DictionaryEvent {
    /// The wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            DictionaryEvent::LoadingStarted { .. } => "loading-started",
            DictionaryEvent::LoadingProgress { .. } => "loading-progress",
            DictionaryEvent::LoadingCompleted { .. } => "loading-completed",
            DictionaryEvent::CacheLoaded { .. } => "cache-loaded",
            DictionaryEvent::LoadingFailed { .. } => "loading-failed",
            DictionaryEvent::CacheCleared => "cache-cleared",
        }
    }
}

//! Dictionary manager: acquisition, caching, and lookup.
//!
//! [`DictionaryManager`] owns the loaded word list and its
//! [`LoadingState`]. It prefers a fresh cache entry and falls back to the
//! configured [`DictionarySource`]:
//!
//! ```text
//! initialize ──▶ cache valid? ──yes──▶ load cache ──▶ cached
//!                    │ no (or corrupt)
//!                    ▼
//!              load_dictionary ──▶ validate URL
//!                                   ──▶ retry { timeout(fetch) ──▶ validate words }
//!                                   ──▶ checksum ──▶ cache save (best effort) ──▶ loaded
//! ```
//!
//! # Concurrency
//!
//! Only one load runs at a time; a second `initialize`, `load_dictionary`,
//! or `refresh` while one is in flight returns [`LoadError::AlreadyLoading`].
//! [`clear_cache`](DictionaryManager::clear_cache) is always allowed and
//! supersedes any load still running: that load finishes its I/O but its
//! results are discarded and the state it would have written is left
//! alone.
//!
//! State is guarded by `parking_lot` locks that are never held across an
//! `.await`. Readers get snapshots (`Arc<WordList>`, cloned
//! [`LoadingState`]) so a reload never invalidates a result already handed
//! out.

use anyhow::Context;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::cache::{CacheMetadata, CacheStore, CachedDictionary};
use crate::config::Config;
use crate::error::LoadError;
use crate::events::{DictionaryEvent, LoadStage, LoadStatus, LoadingState};
use crate::kv::{KvStore, SqliteKvStore};
use crate::retry::{with_exponential_backoff, with_timeout};
use crate::source::{validate_source_url, DictionarySource, HttpSource};
use wordshape_core::filter::{FilterError, FilterMetadata, FilterResult};
use wordshape_core::segment::Segment;
use wordshape_core::words::{self, WordList};

/// Capacity of the event channel. Slow subscribers miss the oldest events.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Where a successful initialization got its words from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "from", rename_all = "kebab-case")]
pub enum LoadOutcome {
    /// Words were already in memory; nothing was done.
    AlreadyLoaded { words: usize },
    Cache { words: usize },
    Network { words: usize, cached: bool },
}

impl LoadOutcome {
    pub fn word_count(&self) -> usize {
        match self {
            LoadOutcome::AlreadyLoaded { words }
            | LoadOutcome::Cache { words }
            | LoadOutcome::Network { words, .. } => *words,
        }
    }
}

/// Observability snapshot returned by [`DictionaryManager::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct DictionaryStats {
    pub status: LoadStatus,
    /// Words held in memory.
    pub word_count: usize,
    /// Words recorded in the cache entry, if one exists.
    pub cached_words: Option<usize>,
    pub cache_size_bytes: u64,
    pub cache_valid: bool,
    pub loaded_at: Option<DateTime<Utc>>,
    pub source: String,
    pub retry_count: u32,
}

/// Resets the in-flight flag when a load ends or its future is dropped.
///
/// A load abandoned mid-flight leaves the status at `loading`; the guard
/// rolls it back to what it was before the load began, or to `idle` when
/// the words that status described are gone.
struct InFlight<'a> {
    manager: &'a DictionaryManager,
    previous: LoadStatus,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        {
            let mut state = self.manager.state.write();
            if state.status == LoadStatus::Loading {
                let has_words = self.manager.words.read().is_some();
                let restored = if self.previous.is_ready() && has_words {
                    self.previous
                } else {
                    LoadStatus::Idle
                };
                debug!(restored = %restored, "dictionary load abandoned");
                state.status = restored;
                state.progress = if restored.is_ready() { 100 } else { 0 };
            }
        }
        self.manager.in_flight.store(false, Ordering::Release);
    }
}

pub struct DictionaryManager {
    config: Config,
    source: Arc<dyn DictionarySource>,
    cache: CacheStore,
    state: RwLock<LoadingState>,
    words: RwLock<Option<Arc<WordList>>>,
    metadata: RwLock<Option<CacheMetadata>>,
    events: broadcast::Sender<DictionaryEvent>,
    in_flight: AtomicBool,
    generation: AtomicU64,
}

impl DictionaryManager {
    pub fn new(config: Config, source: Arc<dyn DictionarySource>, store: Arc<dyn KvStore>) -> Self {
        let cache = CacheStore::new(store, &config.cache.key_prefix, config.cache.expiry());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            source,
            cache,
            state: RwLock::new(LoadingState::default()),
            words: RwLock::new(None),
            metadata: RwLock::new(None),
            events,
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Production wiring: SQLite-backed cache and HTTPS source.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let store = SqliteKvStore::open(&config.cache.path)
            .await
            .with_context(|| format!("opening cache at {}", config.cache.path.display()))?;
        let source = HttpSource::new(Duration::from_secs(config.dictionary.timeout_secs))?;
        Ok(Self::new(config.clone(), Arc::new(source), Arc::new(store)))
    }

    /// Receive every subsequent [`DictionaryEvent`]. Drop the receiver to
    /// unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<DictionaryEvent> {
        self.events.subscribe()
    }

    pub fn loading_state(&self) -> LoadingState {
        self.state.read().clone()
    }

    /// The loaded word list, if any.
    pub fn words(&self) -> Option<Arc<WordList>> {
        self.words.read().clone()
    }

    /// Whether `word` (trimmed, case-insensitive) is in the loaded list.
    /// Always `false` before a load completes.
    pub fn has_word(&self, word: &str) -> bool {
        self.words
            .read()
            .as_ref()
            .map_or(false, |list| list.contains(word))
    }

    /// Make the dictionary available, preferring a valid cache entry.
    ///
    /// A cache hit performs no network I/O. A missing, expired, or corrupt
    /// entry falls through to [`load_dictionary`](Self::load_dictionary).
    pub async fn initialize(&self) -> Result<LoadOutcome, LoadError> {
        let _guard = self.begin()?;

        if let Some(list) = self.words() {
            if self.state.read().status.is_ready() {
                return Ok(LoadOutcome::AlreadyLoaded { words: list.len() });
            }
        }

        if self.cache.is_valid().await {
            if let Some(data) = self.cache.load().await {
                return Ok(self.publish_cached(data));
            }
            debug!("cache entry rejected, loading from source");
        }

        self.load_locked().await
    }

    /// Fetch from the source regardless of the cache.
    pub async fn load_dictionary(&self) -> Result<LoadOutcome, LoadError> {
        let _guard = self.begin()?;
        self.load_locked().await
    }

    /// Clear the cache, then load from the source.
    pub async fn refresh(&self) -> Result<LoadOutcome, LoadError> {
        let _guard = self.begin()?;
        self.clear_cache().await;
        self.load_locked().await
    }

    /// Drop the cache entry and the in-memory list and return to idle.
    ///
    /// Any load still running is superseded. Returns whether the cache
    /// removal itself succeeded.
    pub async fn clear_cache(&self) -> bool {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let removed = self.cache.clear().await;
        {
            let mut state = self.state.write();
            *self.words.write() = None;
            *self.metadata.write() = None;
            state.status = LoadStatus::Idle;
            state.progress = 0;
            state.error = None;
        }
        info!(removed, "dictionary cache cleared");
        self.emit(DictionaryEvent::CacheCleared);
        removed
    }

    /// Run the segment filter against the loaded list.
    ///
    /// Before a load completes this returns a processing error rather than
    /// an empty match set.
    pub async fn filter(&self, segments: Vec<Segment>) -> FilterResult {
        match self.words() {
            Some(list) => crate::filter::filter_words(segments, list).await,
            None => FilterResult::failed(
                FilterError::processing("dictionary is not loaded"),
                FilterMetadata {
                    segment_count: segments.len(),
                    ..FilterMetadata::default()
                },
            ),
        }
    }

    pub async fn stats(&self) -> DictionaryStats {
        let state = self.loading_state();
        let word_count = self.words().map_or(0, |list| list.len());
        let stored = self.cache.metadata().await;
        let metadata = self.metadata.read().clone().or_else(|| stored.clone());

        DictionaryStats {
            status: state.status,
            word_count,
            cached_words: stored.map(|m| m.size),
            cache_size_bytes: self.cache.size_bytes().await,
            cache_valid: self.cache.is_valid().await,
            loaded_at: metadata.as_ref().map(|m| m.loaded_at),
            source: metadata
                .map(|m| m.source)
                .unwrap_or_else(|| self.config.dictionary.url.clone()),
            retry_count: state.retry_count,
        }
    }

    fn begin(&self) -> Result<InFlight<'_>, LoadError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LoadError::AlreadyLoading)?;
        Ok(InFlight {
            manager: self,
            previous: self.state.read().status,
        })
    }

    fn emit(&self, event: DictionaryEvent) {
        debug!(event = event.name(), "dictionary event");
        // No receivers is not an error.
        let _ = self.events.send(event);
    }

    fn transition(&self, next: LoadStatus, progress: u8) {
        let mut state = self.state.write();
        debug_assert!(
            state.status.can_transition_to(next),
            "invalid transition {} -> {}",
            state.status,
            next
        );
        state.status = next;
        state.progress = progress;
    }

    fn stage(&self, generation: u64, stage: LoadStage) {
        if self.is_superseded(generation) {
            return;
        }
        self.state.write().progress = stage.percent();
        self.emit(DictionaryEvent::LoadingProgress {
            stage,
            progress: stage.percent(),
        });
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) != generation
    }

    fn publish_cached(&self, data: CachedDictionary) -> LoadOutcome {
        let list = WordList::new(data.words);
        let count = list.len();
        self.transition(LoadStatus::Loading, 0);
        *self.words.write() = Some(Arc::new(list));
        *self.metadata.write() = Some(data.metadata);
        {
            let mut state = self.state.write();
            state.error = None;
        }
        self.transition(LoadStatus::Cached, 100);
        info!(words = count, "dictionary loaded from cache");
        self.emit(DictionaryEvent::CacheLoaded { words: count });
        LoadOutcome::Cache { words: count }
    }

    /// Network load. The caller holds the in-flight guard.
    async fn load_locked(&self) -> Result<LoadOutcome, LoadError> {
        let generation = self.generation.load(Ordering::Acquire);
        let url = self.config.dictionary.url.clone();

        {
            let mut state = self.state.write();
            debug_assert!(state.status.can_transition_to(LoadStatus::Loading));
            state.status = LoadStatus::Loading;
            state.progress = 0;
            state.error = None;
            state.last_attempt = Some(Utc::now());
        }
        info!(source = %url, "loading dictionary");
        self.emit(DictionaryEvent::LoadingStarted { source: url.clone() });

        match self.fetch_and_store(generation, &url).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if self.is_superseded(generation) {
                    debug!(error = %e, "superseded load failed, ignoring");
                    return Err(e);
                }
                let failure = e.to_failure();
                {
                    let mut state = self.state.write();
                    state.status = LoadStatus::Error;
                    state.progress = 0;
                    state.error = Some(failure.clone());
                    state.retry_count += 1;
                }
                warn!(kind = %failure.kind, error = %e, "dictionary load failed");
                self.emit(DictionaryEvent::LoadingFailed { error: failure });
                Err(e)
            }
        }
    }

    async fn fetch_and_store(&self, generation: u64, url: &str) -> Result<LoadOutcome, LoadError> {
        let parsed = validate_source_url(url)?;
        let policy = self.config.retry.policy();
        let timeout = Duration::from_secs(self.config.dictionary.timeout_secs);
        let max_size = self.config.dictionary.max_size_bytes;
        let min_words = self.config.dictionary.min_word_count;

        let target = &parsed;

        self.stage(generation, LoadStage::Requesting);
        let parsed_words = with_exponential_backoff(&policy, |attempt| {
            async move {
                if attempt > 0 {
                    debug!(attempt, "retrying dictionary fetch");
                }
                let body = with_timeout(timeout, self.source.fetch(target, max_size)).await?;
                self.stage(generation, LoadStage::Downloaded);
                let words = words::validate(&body, min_words)?;
                self.stage(generation, LoadStage::Validated);
                Ok::<_, LoadError>(words)
            }
        })
        .await?;

        if parsed_words.rejected > 0 || parsed_words.duplicates > 0 {
            debug!(
                rejected = parsed_words.rejected,
                duplicates = parsed_words.duplicates,
                "dropped unusable lines"
            );
        }

        let list = WordList::from(parsed_words);
        let metadata = CacheMetadata::for_words(list.as_slice(), url, Utc::now());
        self.stage(generation, LoadStage::Checksummed);

        if self.is_superseded(generation) {
            info!("dictionary load superseded by a cache clear, discarding result");
            return Err(LoadError::Processing(
                "load superseded by a cache clear".to_string(),
            ));
        }

        let data = CachedDictionary {
            words: list.as_slice().to_vec(),
            metadata: metadata.clone(),
        };
        let cached = self.cache.save(&data).await;
        self.stage(generation, LoadStage::Stored);

        if self.is_superseded(generation) {
            // The clear raced with the save; undo the write.
            self.cache.clear().await;
            info!("dictionary load superseded by a cache clear, discarding result");
            return Err(LoadError::Processing(
                "load superseded by a cache clear".to_string(),
            ));
        }

        let count = list.len();
        // Checked and published under the state lock so a concurrent
        // `clear_cache` lands either before (and wins) or after.
        let published = {
            let mut state = self.state.write();
            if self.is_superseded(generation) {
                false
            } else {
                debug_assert!(state.status.can_transition_to(LoadStatus::Loaded));
                *self.words.write() = Some(Arc::new(list));
                *self.metadata.write() = Some(metadata);
                state.status = LoadStatus::Loaded;
                state.progress = LoadStage::Done.percent();
                true
            }
        };
        if !published {
            self.cache.clear().await;
            info!("dictionary load superseded by a cache clear, discarding result");
            return Err(LoadError::Processing(
                "load superseded by a cache clear".to_string(),
            ));
        }
        self.emit(DictionaryEvent::LoadingProgress {
            stage: LoadStage::Done,
            progress: LoadStage::Done.percent(),
        });
        info!(words = count, cached, "dictionary loaded");
        self.emit(DictionaryEvent::LoadingCompleted { words: count });
        Ok(LoadOutcome::Network {
            words: count,
            cached,
        })
    }
}

//! Dictionary cache on top of a [`KvStore`].
//!
//! A cached dictionary is two values under a namespaced prefix:
//!
//! ```text
//! {prefix}:words      JSON array of strings
//! {prefix}:metadata   JSON CacheMetadata
//! ```
//!
//! Both are written in one [`KvStore::set_many`] call and removed in one
//! [`KvStore::remove_many`] call, so callers never see one updated without
//! the other.
//!
//! The cache is best-effort. [`CacheStore::save`] reports failure as
//! `false` after logging it; [`CacheStore::load`] returns `None` for
//! anything missing, unreadable, or inconsistent, and clears inconsistent
//! entries so they are not read again.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::kv::KvStore;
use wordshape_core::words::checksum;

/// Bumped whenever the cached layout changes; older entries are then
/// treated as expired.
pub const CACHE_FORMAT_VERSION: &str = "2";

/// Integrity and provenance record stored next to the word list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub version: String,
    pub source: String,
    pub loaded_at: DateTime<Utc>,
    pub size: usize,
    pub checksum: String,
}

impl CacheMetadata {
    /// Metadata for `words` (already sorted and deduplicated) fetched from
    /// `source` at `loaded_at`.
    pub fn for_words(words: &[String], source: &str, loaded_at: DateTime<Utc>) -> Self {
        Self {
            version: CACHE_FORMAT_VERSION.to_string(),
            source: source.to_string(),
            loaded_at,
            size: words.len(),
            checksum: checksum(words),
        }
    }
}

/// A word list together with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDictionary {
    pub words: Vec<String>,
    pub metadata: CacheMetadata,
}

pub struct CacheStore {
    store: Arc<dyn KvStore>,
    words_key: String,
    metadata_key: String,
    expiry: Duration,
}

impl CacheStore {
    pub fn new(store: Arc<dyn KvStore>, key_prefix: &str, expiry: Duration) -> Self {
        Self {
            store,
            words_key: format!("{}:words", key_prefix),
            metadata_key: format!("{}:metadata", key_prefix),
            expiry,
        }
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Write the dictionary, reporting storage failures as an error value.
    pub async fn try_save(&self, data: &CachedDictionary) -> Result<(), LoadError> {
        let words = serde_json::to_string(&data.words)
            .map_err(|e| LoadError::Storage(format!("serialize words: {}", e)))?;
        let metadata = serde_json::to_string(&data.metadata)
            .map_err(|e| LoadError::Storage(format!("serialize metadata: {}", e)))?;
        self.store
            .set_many(&[
                (self.words_key.as_str(), words.as_str()),
                (self.metadata_key.as_str(), metadata.as_str()),
            ])
            .await
            .map_err(|e| LoadError::Storage(format!("{:#}", e)))
    }

    /// Best-effort write. Never fails; returns whether the write landed.
    pub async fn save(&self, data: &CachedDictionary) -> bool {
        match self.try_save(data).await {
            Ok(()) => {
                debug!(words = data.words.len(), "dictionary cached");
                true
            }
            Err(e) => {
                warn!(error = %e, "could not cache dictionary, continuing without cache");
                false
            }
        }
    }

    /// Read only the metadata record.
    pub async fn metadata(&self) -> Option<CacheMetadata> {
        let raw = match self.store.get(&self.metadata_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "could not read cache metadata");
                return None;
            }
        };
        serde_json::from_str(&raw).ok()
    }

    /// Whether a fresh, current-format cache entry exists.
    pub async fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now()).await
    }

    /// [`is_valid`](Self::is_valid) against an explicit clock. An entry
    /// exactly `expiry` old is no longer valid.
    pub async fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let Some(meta) = self.metadata().await else {
            return false;
        };
        if meta.version != CACHE_FORMAT_VERSION {
            debug!(
                found = %meta.version,
                expected = CACHE_FORMAT_VERSION,
                "cache version mismatch"
            );
            return false;
        }
        now - meta.loaded_at < self.expiry
    }

    /// Read and verify the cached dictionary.
    ///
    /// Structurally broken or inconsistent entries are cleared and `None`
    /// is returned; partial data is never handed out.
    pub async fn load(&self) -> Option<CachedDictionary> {
        let (raw_words, raw_meta) = match (
            self.store.get(&self.words_key).await,
            self.store.get(&self.metadata_key).await,
        ) {
            (Ok(w), Ok(m)) => (w, m),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %format!("{:#}", e), "could not read cache");
                return None;
            }
        };

        let (raw_words, raw_meta) = match (raw_words, raw_meta) {
            (None, None) => return None,
            (Some(w), Some(m)) => (w, m),
            _ => {
                self.invalidate("only one of words/metadata present").await;
                return None;
            }
        };

        let words = match parse_word_array(&raw_words) {
            Some(words) => words,
            None => {
                self.invalidate("words entry is not an array of strings").await;
                return None;
            }
        };

        let metadata: CacheMetadata = match serde_json::from_str::<serde_json::Value>(&raw_meta)
            .ok()
            .filter(|v| v.is_object())
            .and_then(|v| serde_json::from_value(v).ok())
        {
            Some(m) => m,
            None => {
                self.invalidate("metadata entry is not a valid object").await;
                return None;
            }
        };

        if metadata.size != words.len() {
            self.invalidate("word count does not match metadata").await;
            return None;
        }
        if checksum(&words) != metadata.checksum {
            self.invalidate("checksum mismatch").await;
            return None;
        }

        Some(CachedDictionary { words, metadata })
    }

    /// Remove both entries. Returns whether the removal succeeded.
    pub async fn clear(&self) -> bool {
        match self
            .store
            .remove_many(&[self.words_key.as_str(), self.metadata_key.as_str()])
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "could not clear cache");
                false
            }
        }
    }

    /// Stored bytes across both entries.
    pub async fn size_bytes(&self) -> u64 {
        let mut total = 0;
        for key in [&self.words_key, &self.metadata_key] {
            if let Ok(Some(n)) = self.store.value_size(key).await {
                total += n;
            }
        }
        total
    }

    async fn invalidate(&self, reason: &str) {
        warn!(reason, "discarding corrupt dictionary cache");
        self.clear().await;
    }
}

fn parse_word_array(raw: &str) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;

    fn sample(loaded_at: DateTime<Utc>) -> CachedDictionary {
        let words: Vec<String> = ["act", "cat", "dog"].iter().map(|s| s.to_string()).collect();
        let metadata =
            CacheMetadata::for_words(&words, "https://example.test/words.txt", loaded_at);
        CachedDictionary { words, metadata }
    }

    fn cache(kv: Arc<MemoryKvStore>) -> CacheStore {
        CacheStore::new(kv, "test", Duration::hours(24))
    }

    #[tokio::test]
    async fn round_trip() {
        let kv = Arc::new(MemoryKvStore::new());
        let cache = cache(kv.clone());
        let data = sample(Utc::now());

        assert!(cache.save(&data).await);
        assert_eq!(kv.len(), 2);
        assert_eq!(cache.load().await, Some(data.clone()));
        assert!(cache.is_valid().await);
        assert!(cache.size_bytes().await > 0);
    }

    #[tokio::test]
    async fn empty_cache_is_invalid_and_loads_nothing() {
        let cache = cache(Arc::new(MemoryKvStore::new()));
        assert!(!cache.is_valid().await);
        assert_eq!(cache.load().await, None);
        assert_eq!(cache.size_bytes().await, 0);
    }

    #[tokio::test]
    async fn expiry_boundary() {
        let kv = Arc::new(MemoryKvStore::new());
        let cache = cache(kv);
        let loaded_at = Utc::now();
        cache.save(&sample(loaded_at)).await;

        let just_before = loaded_at + Duration::hours(24) - Duration::milliseconds(1);
        assert!(cache.is_valid_at(just_before).await);
        assert!(!cache.is_valid_at(loaded_at + Duration::hours(24)).await);
        assert!(!cache.is_valid_at(loaded_at + Duration::hours(48)).await);
    }

    #[tokio::test]
    async fn version_mismatch_is_invalid() {
        let kv = Arc::new(MemoryKvStore::new());
        let cache = cache(kv);
        let mut data = sample(Utc::now());
        data.metadata.version = "1".to_string();
        cache.save(&data).await;
        assert!(!cache.is_valid().await);
    }

    #[tokio::test]
    async fn corrupt_words_are_cleared() {
        let kv = Arc::new(MemoryKvStore::new());
        let cache = cache(kv.clone());
        cache.save(&sample(Utc::now())).await;

        kv.insert_raw("test:words", "[\"cat\", 42]");
        assert_eq!(cache.load().await, None);
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn non_object_metadata_is_cleared() {
        let kv = Arc::new(MemoryKvStore::new());
        let cache = cache(kv.clone());
        cache.save(&sample(Utc::now())).await;

        kv.insert_raw("test:metadata", "[1, 2, 3]");
        assert_eq!(cache.load().await, None);
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn checksum_mismatch_is_cleared() {
        let kv = Arc::new(MemoryKvStore::new());
        let cache = cache(kv.clone());
        cache.save(&sample(Utc::now())).await;

        kv.insert_raw("test:words", "[\"act\", \"cat\", \"cow\"]");
        assert_eq!(cache.load().await, None);
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn half_written_entry_is_cleared() {
        let kv = Arc::new(MemoryKvStore::new());
        kv.insert_raw("test:words", "[\"cat\"]");
        let cache = cache(kv.clone());
        assert_eq!(cache.load().await, None);
        assert!(kv.is_empty());
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let kv = Arc::new(MemoryKvStore::new());
        let cache = cache(kv.clone());
        cache.save(&sample(Utc::now())).await;
        assert!(cache.clear().await);
        assert!(kv.is_empty());
        assert!(!cache.is_valid().await);
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl KvStore for FailingStore {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("disk unavailable")
        }
        async fn set_many(&self, _entries: &[(&str, &str)]) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        async fn remove_many(&self, _keys: &[&str]) -> anyhow::Result<()> {
            anyhow::bail!("read-only")
        }
    }

    #[tokio::test]
    async fn storage_failures_degrade_quietly() {
        let cache = CacheStore::new(Arc::new(FailingStore), "test", Duration::hours(24));
        let data = sample(Utc::now());
        assert!(!cache.save(&data).await);
        assert!(matches!(
            cache.try_save(&data).await,
            Err(LoadError::Storage(_))
        ));
        assert_eq!(cache.load().await, None);
        assert!(!cache.is_valid().await);
        assert!(!cache.clear().await);
    }
}

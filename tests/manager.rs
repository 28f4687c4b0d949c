//! Dictionary manager behavior against in-process sources and stores.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use reqwest::Url;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use wordshape::cache::{CacheMetadata, CacheStore, CachedDictionary};
use wordshape::config::Config;
use wordshape::dictionary::{DictionaryManager, LoadOutcome};
use wordshape::error::LoadError;
use wordshape::events::{DictionaryEvent, LoadStatus};
use wordshape::kv::{KvStore, MemoryKvStore};
use wordshape::source::DictionarySource;
use wordshape_core::error::{ErrorKind, ValidationError};
use wordshape_core::segment::Segment;

/// `n` distinct lower-case words, one per line.
fn word_body(n: usize) -> String {
    (0..n)
        .map(|i| {
            let mut rest = i;
            let mut word = String::new();
            loop {
                word.push((b'a' + (rest % 26) as u8) as char);
                rest /= 26;
                if rest == 0 {
                    break word;
                }
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn test_config() -> Config {
    let mut config = Config::minimal();
    config.dictionary.url = "https://dictionary.test/words.txt".into();
    config.dictionary.min_word_count = 1000;
    config.retry.max_retries = 3;
    config.retry.initial_delay_ms = 1;
    config.retry.max_delay_ms = 4;
    config
}

/// Replays a queue of responses, then repeats the last one.
struct Scripted {
    responses: Mutex<VecDeque<Result<String, LoadError>>>,
    last: Mutex<Option<Result<String, LoadError>>>,
    calls: AtomicU32,
    max_size_seen: AtomicU64,
}

fn clone_result(r: &Result<String, LoadError>) -> Result<String, LoadError> {
    match r {
        Ok(body) => Ok(body.clone()),
        Err(LoadError::Network(m)) => Err(LoadError::Network(m.clone())),
        Err(LoadError::HttpStatus { status, url }) => Err(LoadError::HttpStatus {
            status: *status,
            url: url.clone(),
        }),
        Err(LoadError::TooLarge { size, limit }) => Err(LoadError::TooLarge {
            size: *size,
            limit: *limit,
        }),
        Err(other) => Err(LoadError::Processing(other.to_string())),
    }
}

impl Scripted {
    fn new(responses: Vec<Result<String, LoadError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
            max_size_seen: AtomicU64::new(0),
        })
    }

    fn ok(body: String) -> Arc<Self> {
        Self::new(vec![Ok(body)])
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DictionarySource for Scripted {
    async fn fetch(&self, _url: &Url, max_size: u64) -> Result<String, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.max_size_seen.store(max_size, Ordering::SeqCst);
        let next = self.responses.lock().pop_front();
        match next {
            Some(r) => {
                let out = clone_result(&r);
                *self.last.lock() = Some(r);
                out
            }
            None => match self.last.lock().as_ref() {
                Some(r) => clone_result(r),
                None => Err(LoadError::Network("no response scripted".into())),
            },
        }
    }
}

/// Blocks inside `fetch` until released.
struct Gated {
    body: String,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl DictionarySource for Gated {
    async fn fetch(&self, _url: &Url, _max_size: u64) -> Result<String, LoadError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.body.clone())
    }
}

struct ReadOnlyStore;

#[async_trait]
impl KvStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
    async fn set_many(&self, _entries: &[(&str, &str)]) -> anyhow::Result<()> {
        anyhow::bail!("quota exceeded")
    }
    async fn remove_many(&self, _keys: &[&str]) -> anyhow::Result<()> {
        Ok(())
    }
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<DictionaryEvent>) -> Vec<DictionaryEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn cold_start_downloads_and_caches() {
    let source = Scripted::ok(word_body(1500));
    let kv = Arc::new(MemoryKvStore::new());
    let manager = DictionaryManager::new(test_config(), source.clone(), kv.clone());
    let mut rx = manager.subscribe();

    let outcome = manager.initialize().await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Network {
            words: 1500,
            cached: true
        }
    );
    assert_eq!(source.calls(), 1);
    assert_eq!(
        source.max_size_seen.load(Ordering::SeqCst),
        test_config().dictionary.max_size_bytes
    );
    assert_eq!(kv.len(), 2);

    let state = manager.loading_state();
    assert_eq!(state.status, LoadStatus::Loaded);
    assert_eq!(state.progress, 100);
    assert!(state.last_attempt.is_some());

    let events = drain(&mut rx);
    let names: Vec<&str> = events.iter().map(|e| e.name()).collect();
    assert_eq!(names.first(), Some(&"loading-started"));
    assert_eq!(names.last(), Some(&"loading-completed"));

    let progress: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            DictionaryEvent::LoadingProgress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![10, 30, 50, 70, 90, 100]);
}

#[tokio::test]
async fn warm_start_uses_cache_without_network() {
    let kv = Arc::new(MemoryKvStore::new());
    let first = DictionaryManager::new(test_config(), Scripted::ok(word_body(1200)), kv.clone());
    first.initialize().await.unwrap();

    let offline = Scripted::new(vec![Err(LoadError::Network("offline".into()))]);
    let second = DictionaryManager::new(test_config(), offline.clone(), kv.clone());
    let mut rx = second.subscribe();

    let outcome = second.initialize().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Cache { words: 1200 });
    assert_eq!(offline.calls(), 0);
    assert_eq!(second.loading_state().status, LoadStatus::Cached);
    assert!(second.has_word("ab"));

    let events = drain(&mut rx);
    assert_eq!(events, vec![DictionaryEvent::CacheLoaded { words: 1200 }]);
}

#[tokio::test]
async fn expired_cache_triggers_download() {
    let kv = Arc::new(MemoryKvStore::new());
    let config = test_config();
    let cache = CacheStore::new(kv.clone(), &config.cache.key_prefix, config.cache.expiry());
    let words = vec!["stale".to_string()];
    let metadata = CacheMetadata::for_words(
        &words,
        &config.dictionary.url,
        Utc::now() - ChronoDuration::hours(25),
    );
    assert!(cache.save(&CachedDictionary { words, metadata }).await);

    let source = Scripted::ok(word_body(1000));
    let manager = DictionaryManager::new(config, source.clone(), kv);
    let outcome = manager.initialize().await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Network { words: 1000, .. }));
    assert_eq!(source.calls(), 1);
    assert!(!manager.has_word("stale"));
}

#[tokio::test]
async fn corrupt_cache_is_discarded_and_reloaded() {
    let kv = Arc::new(MemoryKvStore::new());
    DictionaryManager::new(test_config(), Scripted::ok(word_body(1000)), kv.clone())
        .initialize()
        .await
        .unwrap();
    kv.insert_raw("wordshape:words", "[\"tampered\"]");

    let source = Scripted::ok(word_body(1000));
    let manager = DictionaryManager::new(test_config(), source.clone(), kv);
    let outcome = manager.initialize().await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Network { .. }));
    assert_eq!(source.calls(), 1);
    assert!(!manager.has_word("tampered"));
}

#[tokio::test]
async fn too_few_words_fails_without_retry_or_cache() {
    let source = Scripted::ok(word_body(500));
    let kv = Arc::new(MemoryKvStore::new());
    let manager = DictionaryManager::new(test_config(), source.clone(), kv.clone());
    let mut rx = manager.subscribe();

    let err = manager.initialize().await.unwrap_err();
    assert!(matches!(
        err,
        LoadError::Validation(ValidationError::InsufficientWords {
            found: 500,
            required: 1000
        })
    ));
    assert_eq!(source.calls(), 1);
    assert!(kv.is_empty());

    let state = manager.loading_state();
    assert_eq!(state.status, LoadStatus::Error);
    assert_eq!(state.retry_count, 1);
    let failure = state.error.unwrap();
    assert_eq!(failure.kind, ErrorKind::Validation);
    assert!(!failure.retryable);

    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, DictionaryEvent::LoadingFailed { .. })));
    assert!(!manager.has_word("a"));
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let source = Scripted::new(vec![
        Err(LoadError::Network("connection reset".into())),
        Err(LoadError::HttpStatus {
            status: 503,
            url: "https://dictionary.test/words.txt".into(),
        }),
        Ok(word_body(1000)),
    ]);
    let manager =
        DictionaryManager::new(test_config(), source.clone(), Arc::new(MemoryKvStore::new()));

    manager.initialize().await.unwrap();
    assert_eq!(source.calls(), 3);
    assert_eq!(manager.loading_state().status, LoadStatus::Loaded);
}

#[tokio::test]
async fn persistent_server_errors_exhaust_retries() {
    let source = Scripted::new(vec![Err(LoadError::HttpStatus {
        status: 502,
        url: "https://dictionary.test/words.txt".into(),
    })]);
    let manager =
        DictionaryManager::new(test_config(), source.clone(), Arc::new(MemoryKvStore::new()));

    let err = manager.initialize().await.unwrap_err();
    match err {
        LoadError::RetriesExhausted { attempts, source: cause } => {
            assert_eq!(attempts, 4);
            assert!(matches!(*cause, LoadError::HttpStatus { status: 502, .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(source.calls(), 4);
    assert_eq!(
        manager.loading_state().error.map(|f| f.kind),
        Some(ErrorKind::Network)
    );
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let source = Scripted::new(vec![Err(LoadError::HttpStatus {
        status: 404,
        url: "https://dictionary.test/words.txt".into(),
    })]);
    let manager =
        DictionaryManager::new(test_config(), source.clone(), Arc::new(MemoryKvStore::new()));
    assert!(matches!(
        manager.initialize().await,
        Err(LoadError::HttpStatus { status: 404, .. })
    ));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn oversized_body_is_a_size_error() {
    let source = Scripted::new(vec![Err(LoadError::TooLarge {
        size: 6 * 1024 * 1024,
        limit: 5 * 1024 * 1024,
    })]);
    let manager =
        DictionaryManager::new(test_config(), source.clone(), Arc::new(MemoryKvStore::new()));
    let err = manager.initialize().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Size);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn insecure_url_fails_before_any_fetch() {
    let mut config = test_config();
    config.dictionary.url = "http://dictionary.test/words.txt".into();
    let source = Scripted::ok(word_body(1000));
    let manager = DictionaryManager::new(config, source.clone(), Arc::new(MemoryKvStore::new()));

    let err = manager.initialize().await.unwrap_err();
    assert!(matches!(err, LoadError::InvalidSource { .. }));
    assert_eq!(source.calls(), 0);
    assert_eq!(manager.loading_state().status, LoadStatus::Error);
}

#[tokio::test]
async fn storage_failure_does_not_fail_the_load() {
    let manager = DictionaryManager::new(
        test_config(),
        Scripted::ok(word_body(1000)),
        Arc::new(ReadOnlyStore),
    );
    let outcome = manager.initialize().await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Network {
            words: 1000,
            cached: false
        }
    );
    assert_eq!(manager.loading_state().status, LoadStatus::Loaded);
    assert!(manager.has_word("a"));
}

#[tokio::test]
async fn membership_is_case_insensitive() {
    let body = format!("{}\nAardvark\nzebra", word_body(1000));
    let manager = DictionaryManager::new(
        test_config(),
        Scripted::ok(body),
        Arc::new(MemoryKvStore::new()),
    );
    assert!(!manager.has_word("zebra"));
    manager.initialize().await.unwrap();
    assert!(manager.has_word("zebra"));
    assert!(manager.has_word("  AARDVARK "));
    assert!(!manager.has_word("unicorn"));
}

#[tokio::test]
async fn concurrent_load_is_rejected() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let source = Arc::new(Gated {
        body: word_body(1000),
        entered: entered.clone(),
        release: release.clone(),
    });
    let manager = Arc::new(DictionaryManager::new(
        test_config(),
        source,
        Arc::new(MemoryKvStore::new()),
    ));

    let background = manager.clone();
    let first = tokio::spawn(async move { background.load_dictionary().await });
    entered.notified().await;

    assert!(matches!(
        manager.initialize().await,
        Err(LoadError::AlreadyLoading)
    ));
    assert!(matches!(
        manager.refresh().await,
        Err(LoadError::AlreadyLoading)
    ));
    assert_eq!(manager.loading_state().status, LoadStatus::Loading);

    release.notify_one();
    first.await.unwrap().unwrap();
    assert_eq!(manager.loading_state().status, LoadStatus::Loaded);
}

#[tokio::test]
async fn clearing_during_a_load_discards_its_result() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let kv = Arc::new(MemoryKvStore::new());
    let manager = Arc::new(DictionaryManager::new(
        test_config(),
        Arc::new(Gated {
            body: word_body(1000),
            entered: entered.clone(),
            release: release.clone(),
        }),
        kv.clone(),
    ));

    let background = manager.clone();
    let load = tokio::spawn(async move { background.load_dictionary().await });
    entered.notified().await;

    assert!(manager.clear_cache().await);
    release.notify_one();
    assert!(load.await.unwrap().is_err());

    assert_eq!(manager.loading_state().status, LoadStatus::Idle);
    assert!(manager.words().is_none());
    assert!(kv.is_empty());
}

#[tokio::test]
async fn abandoned_load_returns_to_idle_and_can_be_retried() {
    let release = Arc::new(Notify::new());
    let kv = Arc::new(MemoryKvStore::new());
    let manager = DictionaryManager::new(
        test_config(),
        Arc::new(Gated {
            body: word_body(1000),
            entered: Arc::new(Notify::new()),
            release: release.clone(),
        }),
        kv.clone(),
    );

    let abandoned =
        tokio::time::timeout(std::time::Duration::from_millis(20), manager.initialize()).await;
    assert!(abandoned.is_err());
    assert_eq!(manager.loading_state().status, LoadStatus::Idle);
    assert_eq!(manager.loading_state().progress, 0);
    assert!(manager.words().is_none());

    release.notify_one();
    let outcome = manager.initialize().await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Network { cached: true, .. }));
    assert_eq!(manager.loading_state().status, LoadStatus::Loaded);
}

#[tokio::test]
async fn abandoned_reload_keeps_loaded_words() {
    let release = Arc::new(Notify::new());
    let manager = DictionaryManager::new(
        test_config(),
        Arc::new(Gated {
            body: word_body(1000),
            entered: Arc::new(Notify::new()),
            release: release.clone(),
        }),
        Arc::new(MemoryKvStore::new()),
    );
    release.notify_one();
    manager.load_dictionary().await.unwrap();

    let abandoned = tokio::time::timeout(
        std::time::Duration::from_millis(20),
        manager.load_dictionary(),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(manager.loading_state().status, LoadStatus::Loaded);
    assert_eq!(manager.loading_state().progress, 100);
    assert_eq!(manager.words().unwrap().len(), 1000);
    assert!(manager.has_word("a"));
}

#[tokio::test]
async fn refresh_downloads_again() {
    let source = Scripted::ok(word_body(1000));
    let kv = Arc::new(MemoryKvStore::new());
    let manager = DictionaryManager::new(test_config(), source.clone(), kv.clone());
    manager.initialize().await.unwrap();

    let mut rx = manager.subscribe();
    let outcome = manager.refresh().await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Network { .. }));
    assert_eq!(source.calls(), 2);

    let events = drain(&mut rx);
    assert_eq!(events.first(), Some(&DictionaryEvent::CacheCleared));
    assert_eq!(kv.len(), 2);
}

#[tokio::test]
async fn clear_cache_resets_state() {
    let kv = Arc::new(MemoryKvStore::new());
    let manager = DictionaryManager::new(test_config(), Scripted::ok(word_body(1000)), kv.clone());
    manager.initialize().await.unwrap();

    assert!(manager.clear_cache().await);
    assert!(kv.is_empty());
    assert!(manager.words().is_none());
    assert!(!manager.has_word("a"));
    assert_eq!(manager.loading_state().status, LoadStatus::Idle);
}

#[tokio::test]
async fn stats_reflect_cache() {
    let kv = Arc::new(MemoryKvStore::new());
    let manager = DictionaryManager::new(test_config(), Scripted::ok(word_body(1000)), kv);

    let before = manager.stats().await;
    assert_eq!(before.word_count, 0);
    assert_eq!(before.cached_words, None);
    assert!(!before.cache_valid);
    assert!(before.loaded_at.is_none());

    manager.initialize().await.unwrap();
    let after = manager.stats().await;
    assert_eq!(after.word_count, 1000);
    assert_eq!(after.cached_words, Some(1000));
    assert!(after.cache_valid);
    assert!(after.cache_size_bytes > 0);
    assert_eq!(after.source, "https://dictionary.test/words.txt");
    assert_eq!(after.status, LoadStatus::Loaded);
}

#[tokio::test]
async fn filters_loaded_words() {
    let body = format!("{}\ncatdog\ncatgod\ntacdog", word_body(1000));
    let manager = DictionaryManager::new(
        test_config(),
        Scripted::ok(body),
        Arc::new(MemoryKvStore::new()),
    );
    manager.initialize().await.unwrap();

    let result = manager
        .filter(vec![Segment::new("caat", 3), Segment::new("dgoo", 3)])
        .await;
    assert!(result.is_ok(), "{:?}", result.error);
    assert_eq!(result.words, vec!["catdog", "catgod", "tacdog"]);
    assert_eq!(result.metadata.processed_words, 1003);
}

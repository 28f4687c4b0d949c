//! Key-value storage abstraction for the dictionary cache.
//!
//! The [`KvStore`] trait is the only persistence surface the cache needs:
//! string keys, string values, and multi-key writes that land together or
//! not at all. Two backends ship with the crate:
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`SqliteKvStore`] | persistent cache between runs (sqlx, WAL) |
//! | [`MemoryKvStore`] | tests and ephemeral sessions |
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

mod memory;
mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

use anyhow::Result;
use async_trait::async_trait;

/// Abstract key-value backend.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read one key.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write several keys atomically: after a successful return all of
    /// them hold the new values; after an error none of them changed.
    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<()>;

    /// Remove several keys atomically. Missing keys are ignored.
    async fn remove_many(&self, keys: &[&str]) -> Result<()>;

    /// Stored size of a value in bytes, if the key exists.
    async fn value_size(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.get(key).await?.map(|v| v.len() as u64))
    }
}

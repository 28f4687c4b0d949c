//! # Wordshape
//!
//! Find every dictionary word that can be assembled from a sequence of
//! letter-pool segments.
//!
//! A dictionary is downloaded once, validated, and cached in SQLite; the
//! segment filter then runs in memory against the cached list.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌──────────────┐
//! │ HTTPS source │──▶│ retry + verify │──▶│ SQLite cache │
//! └──────────────┘   └───────┬────────┘   └──────┬───────┘
//!                            ▼                   │
//!                    ┌───────────────┐◀──────────┘
//!                    │  WordList     │
//!                    └───────┬───────┘
//!                            ▼
//!                    ┌───────────────┐
//!                    │ segment filter│  (wordshape-core)
//!                    └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! wordshape init                    # download or load from cache
//! wordshape filter caat:3 dgoo:3    # words made of 3 from "caat" then 3 from "dgoo"
//! wordshape has cat dog
//! wordshape stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Load errors and their classification |
//! | [`retry`] | Exponential backoff with jitter, attempt timeouts |
//! | [`source`] | Dictionary sources (HTTPS) |
//! | [`kv`] | Key-value storage (SQLite, memory) |
//! | [`db`] | Database connection and schema |
//! | [`cache`] | Dictionary cache with integrity checks |
//! | [`events`] | Loading state and lifecycle events |
//! | [`dictionary`] | Dictionary manager |
//! | [`filter`] | Segment filtering and the `filter`/`validate` commands |
//! | [`load_cmd`] | `init`, `refresh`, `clear-cache`, `has` |
//! | [`progress`] | Progress reporting on stderr |
//! | [`stats`] | Cache overview |

pub mod cache;
pub mod config;
pub mod db;
pub mod dictionary;
pub mod error;
pub mod events;
pub mod filter;
pub mod kv;
pub mod load_cmd;
pub mod progress;
pub mod retry;
pub mod source;
pub mod stats;

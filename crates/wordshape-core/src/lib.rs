//! # wordshape core
//!
//! Pure, synchronous logic for wordshape: letter frequency maps, segment
//! validation, dictionary cleaning and checksumming, and the segment filter
//! engine.
//!
//! This crate contains no tokio, sqlx, network, or filesystem code. The
//! `wordshape` crate wraps it with configuration, the download and cache
//! pipeline, and the CLI.

pub mod error;
pub mod filter;
pub mod letters;
pub mod segment;
pub mod words;

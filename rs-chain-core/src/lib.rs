//! Word-level Markov chain text generation library.
//!
//! This crate provides:
//! - A first-order transition table trained from token sequences
//! - Weighted successor sampling with a uniform fallback for unknown and
//!   terminal words
//! - Lossless JSON and postcard snapshots
//! - File helpers to train from corpora and cache snapshots next to them
//!
//! The chain itself performs no I/O and holds no configuration. File access
//! is confined to [`store`], settings to [`config`].

/// Transition table, sampler and snapshots.
pub mod model;

/// Settings for the programs wrapping the chain.
pub mod config;

/// Error type shared by every operation.
pub mod error;

/// Corpus training and snapshot files.
pub mod store;

/// I/O utilities (file loading, path helpers).
///
/// Not exposed
pub(crate) mod io;

pub use error::{ChainError, Result};

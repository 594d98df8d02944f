//! Top-level module for the word chain.
//!
//! This module provides a first-order Markov chain over words, including:
//! - The transition-count table (`TransitionTable`)
//! - Weighted sampling of candidates (`WeightedSampler`)
//! - Snapshot encoding (JSON and postcard)

/// Sparse word → (word → count) table.
///
/// Handles transition recording, successor sampling with a uniform
/// fallback, text generation and snapshots.
pub mod table;

/// Proportional random selection over positive integer weights.
///
/// Built fresh for every draw by the table.
pub mod sampler;

/// On-disk shape of a table and its validation.
///
/// Not exposed publicly, go through `TransitionTable` instead.
mod snapshot;

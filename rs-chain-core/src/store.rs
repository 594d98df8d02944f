//! File-backed training and snapshot persistence.
//!
//! Everything touching the disk lives here so that [`TransitionTable`]
//! stays free of I/O.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::{SnapshotFormat, TrainingUnit};
use crate::error::{ChainError, Result};
use crate::io;
use crate::model::table::TransitionTable;

/// Extension of corpus files inside a data folder.
pub const CORPUS_EXTENSION: &str = "txt";

/// Splits text on whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
	text.split_whitespace().map(str::to_owned).collect()
}

/// Cuts `text` into token sequences.
///
/// Blank lines produce no sequence.
pub fn sequences(text: &str, unit: TrainingUnit) -> Vec<Vec<String>> {
	match unit {
		TrainingUnit::Line => text
			.lines()
			.map(tokenize)
			.filter(|tokens| !tokens.is_empty())
			.collect(),
		TrainingUnit::Document => {
			let tokens = tokenize(text);
			if tokens.is_empty() { Vec::new() } else { vec![tokens] }
		}
	}
}

/// Ingests every sequence of `text` into `table`.
///
/// Returns the number of transitions recorded.
pub fn train_text(table: &mut TransitionTable, text: &str, unit: TrainingUnit) -> usize {
	sequences(text, unit)
		.iter()
		.map(|sequence| table.ingest(sequence))
		.sum()
}

/// Reads a corpus file and ingests it into `table`.
///
/// Returns the number of transitions recorded.
pub fn train_file<P: AsRef<Path>>(table: &mut TransitionTable, corpus: P, unit: TrainingUnit) -> Result<usize> {
	let corpus = corpus.as_ref();
	let text = io::read_file(corpus)?;
	let recorded = train_text(table, &text, unit);
	debug!(
		"trained on {}: {} transitions, {} known words",
		corpus.display(),
		recorded,
		table.len()
	);
	Ok(recorded)
}

/// Writes a snapshot of `table` to `path`, replacing any previous file.
pub fn save<P: AsRef<Path>>(table: &TransitionTable, path: P, format: SnapshotFormat) -> Result<()> {
	let path = path.as_ref();
	let bytes = match format {
		SnapshotFormat::Json => table.serialize()?.into_bytes(),
		SnapshotFormat::Binary => table.to_bytes()?,
	};
	io::write_atomic(path, &bytes)?;
	debug!("snapshot written to {} ({} bytes)", path.display(), bytes.len());
	Ok(())
}

/// Loads a snapshot, picking the format from the file extension.
pub fn load<P: AsRef<Path>>(path: P) -> Result<TransitionTable> {
	let path = path.as_ref();
	match SnapshotFormat::from_path(path) {
		SnapshotFormat::Json => TransitionTable::deserialize(&io::read_file(path)?),
		SnapshotFormat::Binary => TransitionTable::from_bytes(&std::fs::read(path)?),
	}
}

/// Path of the snapshot cached next to a corpus.
///
/// Example: `data/lunch.txt` → `data/lunch.json`
pub fn snapshot_path<P: AsRef<Path>>(corpus: P, format: SnapshotFormat) -> PathBuf {
	io::sibling_path(corpus, format.extension())
}

/// Loads the snapshot cached next to `corpus`, or trains from the corpus.
///
/// When no usable snapshot exists the corpus is read, a table is trained
/// and its snapshot is written for the next run. A corrupt snapshot is
/// reported and replaced rather than trusted.
pub fn load_or_train<P: AsRef<Path>>(corpus: P, unit: TrainingUnit, format: SnapshotFormat) -> Result<TransitionTable> {
	let corpus = corpus.as_ref();
	let cached = snapshot_path(corpus, format);

	if cached.exists() {
		match load(&cached) {
			Ok(table) => {
				info!("loaded {} words from {}", table.len(), cached.display());
				return Ok(table);
			}
			Err(ChainError::CorruptData(reason)) => {
				warn!("ignoring {}: {}", cached.display(), reason);
			}
			Err(e) => return Err(e),
		}
	}

	let mut table = TransitionTable::new();
	train_file(&mut table, corpus, unit)?;
	save(&table, &cached, format)?;
	info!("trained {} words from {}", table.len(), corpus.display());
	Ok(table)
}

/// Name of a corpus, its file name without extension.
pub fn corpus_name<P: AsRef<Path>>(corpus: P) -> Result<String> {
	Ok(io::get_filename(corpus)?)
}

/// Names of the corpora available in `dir`, sorted.
pub fn list_corpora<P: AsRef<Path>>(dir: P) -> Result<Vec<String>> {
	io::list_files(dir, CORPUS_EXTENSION)?
		.iter()
		.map(corpus_name)
		.collect()
}

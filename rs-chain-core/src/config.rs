use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};
use crate::io;

/// How a corpus file is cut into token sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingUnit {
	/// Every line is its own sequence.
	#[default]
	Line,
	/// The whole file is a single sequence.
	Document,
}

/// Encoding used for snapshot files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
	/// Pretty-printed JSON, `.json`.
	#[default]
	Json,
	/// Postcard, `.bin`.
	Binary,
}

impl SnapshotFormat {
	/// File extension used for this format.
	pub fn extension(self) -> &'static str {
		match self {
			Self::Json => "json",
			Self::Binary => "bin",
		}
	}

	/// Guesses the format from a file extension. Anything but `.bin` is JSON.
	pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
		match path.as_ref().extension() {
			Some(ext) if ext == "bin" => Self::Binary,
			_ => Self::Json,
		}
	}
}

/// Settings shared by the command line and the HTTP server.
///
/// The chain itself holds no configuration: these values only drive the
/// I/O shell around it. Every field may be omitted from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
	/// Folder holding corpora (`*.txt`) and their snapshots.
	pub data_dir: PathBuf,
	/// How corpora are split into sequences.
	pub unit: TrainingUnit,
	/// Words generated after the first one.
	pub length: usize,
	/// Fixed random seed; `None` seeds from the OS.
	pub seed: Option<u64>,
	/// Format of snapshots written next to corpora.
	pub snapshot: SnapshotFormat,
	/// Default log filter, overridden by `RUST_LOG`.
	pub log_level: String,
}

impl Default for ChainConfig {
	fn default() -> Self {
		Self {
			data_dir: PathBuf::from("./data"),
			unit: TrainingUnit::Line,
			length: 30,
			seed: None,
			snapshot: SnapshotFormat::Json,
			log_level: "info".to_owned(),
		}
	}
}

impl ChainConfig {
	/// Loads a JSON config file.
	///
	/// # Errors
	/// - [`ChainError::Io`] if the file cannot be read
	/// - [`ChainError::Config`] if it is not a valid config document
	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
		let text = io::read_file(path)?;
		serde_json::from_str(&text).map_err(|e| ChainError::Config(e.to_string()))
	}

	/// Data folder with `"."` resolved to the working directory.
	pub fn data_dir(&self) -> PathBuf {
		io::normalize_folder(&self.data_dir)
	}

	/// Random source for generation, seeded when `seed` is set.
	pub fn rng(&self) -> StdRng {
		match self.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_os_rng(),
		}
	}
}

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, trace};
use rand::Rng;

use crate::error::{ChainError, Result};

use super::sampler::WeightedSampler;
use super::snapshot::{Snapshot, SnapshotRef};

/// Successor counts of a single word.
pub(crate) type Row = BTreeMap<String, u64>;

/// Every known word and its successor counts.
pub(crate) type Rows = BTreeMap<String, Row>;

/// First-order Markov chain over words.
///
/// Conceptually a square matrix indexed by every word seen so far, where the
/// cell `(w1, w2)` counts how many times `w2` immediately followed `w1`.
/// Only non-zero cells are stored.
///
/// # Responsibilities
/// - Record observed transitions, one pair or one sequence at a time
/// - Sample a successor weighted by counts, falling back to a uniform pick
///   over all known words when the word has no successor
/// - Generate text by chaining samples
/// - Snapshot to JSON or postcard and load back with validation
///
/// # Invariants
/// - Every known word owns a row, possibly empty
/// - Every successor of a row is itself a known word
/// - Every stored count is >= 1
///
/// Rows are ordered maps so that a seeded random source always walks the
/// candidates in the same order and produces the same text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransitionTable {
	rows: Rows,
}

impl TransitionTable {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of known words.
	pub fn len(&self) -> usize {
		self.rows.len()
	}

	/// Returns `true` if nothing was ever recorded.
	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// Returns `true` if `word` appeared in any ingested sequence.
	pub fn contains(&self, word: &str) -> bool {
		self.rows.contains_key(word)
	}

	/// How many times `next_word` followed `word`. Zero if never observed.
	pub fn count(&self, word: &str, next_word: &str) -> u64 {
		self.rows
			.get(word)
			.and_then(|row| row.get(next_word))
			.copied()
			.unwrap_or(0)
	}

	/// Sum of every recorded transition.
	pub fn transition_count(&self) -> u64 {
		self.rows.values().flat_map(Row::values).sum()
	}

	/// Known words, in lexicographic order.
	pub fn words(&self) -> impl Iterator<Item = &str> {
		self.rows.keys().map(String::as_str)
	}

	/// Observed successors of `word` with their counts.
	///
	/// Empty for an unknown word or a word only ever seen last in a sequence.
	pub fn successors<'a>(&'a self, word: &str) -> impl Iterator<Item = (&'a str, u64)> + 'a {
		self.rows
			.get(word)
			.into_iter()
			.flat_map(|row| row.iter().map(|(next_word, count)| (next_word.as_str(), *count)))
	}

	/// Records one occurrence of `next_word` immediately following `word`.
	///
	/// Both words become known. A new word starts with no successor.
	pub fn record(&mut self, word: &str, next_word: &str) {
		if !self.rows.contains_key(next_word) {
			self.rows.insert(next_word.to_owned(), Row::new());
		}
		if !self.rows.contains_key(word) {
			self.rows.insert(word.to_owned(), Row::new());
		}
		if let Some(row) = self.rows.get_mut(word) {
			*row.entry(next_word.to_owned()).or_insert(0) += 1;
		}
	}

	/// Records every consecutive pair of `sequence`, in order.
	///
	/// Sequences shorter than two words record nothing. Separate calls are
	/// never bridged: the last word of one sequence is not linked to the
	/// first word of the next.
	///
	/// Returns the number of transitions recorded.
	pub fn ingest<S: AsRef<str>>(&mut self, sequence: &[S]) -> usize {
		if sequence.len() < 2 {
			return 0;
		}

		for pair in sequence.windows(2) {
			self.record(pair[0].as_ref(), pair[1].as_ref());
		}
		sequence.len() - 1
	}

	/// Picks a word uniformly among all known words.
	///
	/// # Errors
	/// Returns [`ChainError::EmptyModel`] if no word is known.
	pub fn sample_first<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String> {
		if self.rows.is_empty() {
			return Err(ChainError::EmptyModel);
		}

		let sampler = WeightedSampler::uniform(self.rows.keys())?;
		Ok(sampler.next(rng).to_string())
	}

	/// Picks the word following `word`.
	///
	/// - If `word` has recorded successors, they are drawn proportionally
	///   to their counts.
	/// - Otherwise (unknown word, or a word only seen last in a sequence),
	///   every known word is equally likely, `word` itself included.
	///
	/// # Errors
	/// Returns [`ChainError::EmptyModel`] if no word is known.
	pub fn sample_next<R: Rng + ?Sized>(&self, word: &str, rng: &mut R) -> Result<String> {
		match self.rows.get(word) {
			Some(row) if !row.is_empty() => {
				let sampler = WeightedSampler::new(row.iter().map(|(next_word, count)| (next_word, *count)))?;
				Ok(sampler.next(rng).to_string())
			}
			_ => {
				trace!("no successor for {word:?}, picking uniformly");
				self.sample_first(rng)
			}
		}
	}

	/// Lazily generates `length + 1` words.
	///
	/// The first word comes from [`sample_first`](Self::sample_first), each
	/// following one from [`sample_next`](Self::sample_next) on the previous
	/// word. The iterator ends right after yielding an error.
	pub fn walk<'a, R: Rng + ?Sized>(&'a self, length: usize, rng: &'a mut R) -> Walk<'a, R> {
		Walk {
			table: self,
			rng,
			remaining: length.saturating_add(1),
			previous: None,
		}
	}

	/// Generates `length + 1` words.
	///
	/// # Errors
	/// Returns [`ChainError::EmptyModel`] if no word is known.
	pub fn generate<R: Rng + ?Sized>(&self, length: usize, rng: &mut R) -> Result<Vec<String>> {
		self.walk(length, rng).collect()
	}

	/// Writes a pretty-printed JSON snapshot of the whole table.
	pub fn serialize(&self) -> Result<String> {
		serde_json::to_string_pretty(&SnapshotRef::new(&self.rows)).map_err(|e| ChainError::Encode(e.to_string()))
	}

	/// Rebuilds a table from a JSON snapshot.
	///
	/// # Errors
	/// Returns [`ChainError::CorruptData`] if the text is not a snapshot or
	/// describes an inconsistent table (zero or negative counts, duplicate
	/// keys, successors without a row).
	pub fn deserialize(text: &str) -> Result<Self> {
		let snapshot: Snapshot = serde_json::from_str(text).map_err(|e| ChainError::corrupt(e.to_string()))?;
		Self::from_snapshot(snapshot)
	}

	/// Writes a compact postcard snapshot of the whole table.
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		postcard::to_stdvec(&SnapshotRef::new(&self.rows)).map_err(|e| ChainError::Encode(e.to_string()))
	}

	/// Rebuilds a table from a postcard snapshot.
	///
	/// # Errors
	/// Same conditions as [`deserialize`](Self::deserialize), plus trailing
	/// bytes after the snapshot.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
		let (snapshot, rest): (Snapshot, _) =
			postcard::take_from_bytes(bytes).map_err(|e| ChainError::corrupt(e.to_string()))?;
		if !rest.is_empty() {
			return Err(ChainError::corrupt(format!("{} trailing bytes after snapshot", rest.len())));
		}
		Self::from_snapshot(snapshot)
	}

	fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
		let table = Self { rows: snapshot.into_rows()? };
		debug!(
			"snapshot decoded: {} words, {} transitions",
			table.len(),
			table.transition_count()
		);
		Ok(table)
	}
}

/// Renders the table as rows of `current word` and columns of `next word`.
///
/// Zero cells are blank and every column is as wide as its widest entry.
impl fmt::Display for TransitionTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let key_width = self.rows.keys().map(|word| word.chars().count()).max().unwrap_or(0);
		let columns: Vec<(&str, usize)> = self
			.rows
			.keys()
			.map(|column| {
				let widest_count = self
					.rows
					.values()
					.filter_map(|row| row.get(column))
					.map(|count| count.to_string().len())
					.max()
					.unwrap_or(0);
				(column.as_str(), widest_count.max(column.chars().count()))
			})
			.collect();

		write!(f, "|{:key_width$}|", "")?;
		for &(column, width) in &columns {
			write!(f, "{column:>width$}|")?;
		}
		writeln!(f)?;

		for (word, row) in &self.rows {
			write!(f, "|{word:>key_width$}|")?;
			for &(column, width) in &columns {
				match row.get(column) {
					Some(count) => write!(f, "{count:>width$}|")?,
					None => write!(f, "{:width$}|", "")?,
				}
			}
			writeln!(f)?;
		}
		Ok(())
	}
}

/// Lazy generator returned by [`TransitionTable::walk`].
pub struct Walk<'a, R: ?Sized> {
	table: &'a TransitionTable,
	rng: &'a mut R,
	remaining: usize,
	previous: Option<String>,
}

impl<R: Rng + ?Sized> Iterator for Walk<'_, R> {
	type Item = Result<String>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.remaining == 0 {
			return None;
		}

		let word = match &self.previous {
			None => self.table.sample_first(&mut *self.rng),
			Some(previous) => self.table.sample_next(previous, &mut *self.rng),
		};

		match word {
			Ok(word) => {
				self.remaining -= 1;
				self.previous = Some(word.clone());
				Some(Ok(word))
			}
			Err(e) => {
				self.remaining = 0;
				Some(Err(e))
			}
		}
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		(0, Some(self.remaining))
	}
}

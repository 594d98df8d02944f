use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};

use super::table::Rows;

/// Version written in every snapshot. Any other value is rejected.
pub(crate) const SNAPSHOT_VERSION: u32 = 1;

/// Borrowed view of a table, used when writing a snapshot.
///
/// The field order must stay in sync with [`Snapshot`]: postcard is not
/// self-describing and decodes fields positionally.
#[derive(Serialize)]
pub(crate) struct SnapshotRef<'a> {
	version: u32,
	transitions: &'a Rows,
}

impl<'a> SnapshotRef<'a> {
	pub(crate) fn new(transitions: &'a Rows) -> Self {
		Self { version: SNAPSHOT_VERSION, transitions }
	}
}

/// Owned snapshot as read back from JSON or postcard.
///
/// Decoding only checks the shape. [`Snapshot::into_rows`] checks the
/// table invariants before anything is handed to the caller.
#[derive(Deserialize)]
pub(crate) struct Snapshot {
	version: u32,
	transitions: UniqueMap<UniqueMap<u64>>,
}

impl Snapshot {
	/// Validates the snapshot and returns the table rows.
	///
	/// # Errors
	/// Returns [`ChainError::CorruptData`] if:
	/// - the version is unknown
	/// - a count is zero
	/// - a successor word has no row of its own
	pub(crate) fn into_rows(self) -> Result<Rows> {
		if self.version != SNAPSHOT_VERSION {
			return Err(ChainError::corrupt(format!(
				"unsupported snapshot version {} (expected {})",
				self.version, SNAPSHOT_VERSION
			)));
		}

		let rows: Rows = self
			.transitions
			.0
			.into_iter()
			.map(|(word, successors)| (word, successors.0))
			.collect();

		for (word, successors) in &rows {
			for (next_word, count) in successors {
				if *count == 0 {
					return Err(ChainError::corrupt(format!(
						"transition {word:?} -> {next_word:?} has a zero count"
					)));
				}
				if !rows.contains_key(next_word) {
					return Err(ChainError::corrupt(format!(
						"transition {word:?} -> {next_word:?} targets a word with no row"
					)));
				}
			}
		}

		Ok(rows)
	}
}

/// String-keyed map that refuses duplicate keys when deserialized.
///
/// `BTreeMap` silently keeps the last value of a repeated key, which would
/// hide conflicting entries in a hand-edited snapshot.
pub(crate) struct UniqueMap<V>(BTreeMap<String, V>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for UniqueMap<V> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		deserializer.deserialize_map(UniqueMapVisitor(PhantomData))
	}
}

struct UniqueMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueMapVisitor<V> {
	type Value = UniqueMap<V>;

	fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
		formatter.write_str("a map with unique string keys")
	}

	fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
		let mut map = BTreeMap::new();
		while let Some((key, value)) = access.next_entry::<String, V>()? {
			if map.contains_key(&key) {
				return Err(serde::de::Error::custom(format!("duplicate key {key:?}")));
			}
			map.insert(key, value);
		}
		Ok(UniqueMap(map))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn rows_of(text: &str) -> Result<Rows> {
		let snapshot: Snapshot = serde_json::from_str(text).map_err(|e| ChainError::corrupt(e.to_string()))?;
		snapshot.into_rows()
	}

	#[test]
	fn accepts_consistent_rows() {
		let rows = rows_of(r#"{"version":1,"transitions":{"a":{"b":2},"b":{}}}"#).unwrap();
		assert_eq!(rows["a"]["b"], 2);
		assert!(rows["b"].is_empty());
	}

	#[test]
	fn rejects_unknown_version() {
		let result = rows_of(r#"{"version":2,"transitions":{}}"#);
		assert!(matches!(result, Err(ChainError::CorruptData(_))));
	}

	#[test]
	fn rejects_zero_count() {
		let result = rows_of(r#"{"version":1,"transitions":{"a":{"a":0}}}"#);
		assert!(matches!(result, Err(ChainError::CorruptData(_))));
	}

	#[test]
	fn rejects_successor_without_row() {
		let result = rows_of(r#"{"version":1,"transitions":{"a":{"b":1}}}"#);
		assert!(matches!(result, Err(ChainError::CorruptData(_))));
	}

	#[test]
	fn rejects_duplicate_keys() {
		let outer = rows_of(r#"{"version":1,"transitions":{"a":{},"a":{}}}"#);
		assert!(matches!(outer, Err(ChainError::CorruptData(_))));

		let inner = rows_of(r#"{"version":1,"transitions":{"a":{"a":1,"a":3}}}"#);
		assert!(matches!(inner, Err(ChainError::CorruptData(_))));
	}
}

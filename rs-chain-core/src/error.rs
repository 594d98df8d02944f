use thiserror::Error;

/// Result type used across the chain crate.
pub type Result<T, E = ChainError> = std::result::Result<T, E>;

/// Every failure a chain operation can report.
///
/// None of these are retried internally: the operation that raised the
/// error produced no partial result.
#[derive(Debug, Error)]
pub enum ChainError {
	/// Sampling or generation was requested on a table with no known word.
	#[error("the chain is empty, train it or load a snapshot first")]
	EmptyModel,

	/// A sampler was built from an empty candidate set or a zero weight.
	///
	/// The transition table never builds such a sampler, so seeing this
	/// error means an internal invariant was broken.
	#[error("invalid weight: {0}")]
	InvalidWeight(String),

	/// A snapshot could not be decoded into a consistent table.
	#[error("corrupt snapshot: {0}")]
	CorruptData(String),

	/// A snapshot could not be encoded.
	#[error("cannot encode snapshot: {0}")]
	Encode(String),

	/// A configuration file could not be parsed.
	#[error("invalid configuration: {0}")]
	Config(String),

	/// File access performed by the store helpers.
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl ChainError {
	pub(crate) fn corrupt<S: Into<String>>(msg: S) -> Self {
		Self::CorruptData(msg.into())
	}

	pub(crate) fn invalid_weight<S: Into<String>>(msg: S) -> Self {
		Self::InvalidWeight(msg.into())
	}
}

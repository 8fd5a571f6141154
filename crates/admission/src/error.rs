//! Error types for admission and configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::Resources;

/// Errors raised while loading or writing capacity configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading or writing a configuration file.
	#[error("I/O error on {path}: {error}")]
	Io {
		/// Path to the file that failed.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The configuration file exists but is not a valid limits record.
	#[error("invalid config {path}: {error}")]
	Parse {
		/// Path to the offending file.
		path: PathBuf,
		/// The underlying decode error.
		error: serde_json::Error,
	},

	/// A human-readable size string could not be parsed.
	#[error("invalid size {input:?}: {reason}")]
	InvalidSize {
		/// The string as given.
		input: String,
		/// Parser diagnostic.
		reason: String,
	},
}

/// Errors raised by the reservation store, admission gate and retry driver.
///
/// Denial for lack of capacity is not an error; see [`crate::Decision`].
#[derive(Debug, Error)]
pub enum AdmissionError {
	/// Configuration could not be loaded.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// A single request exceeds the total ceiling and can never be admitted.
	#[error("requested {requested} exceeds host capacity {limits}")]
	ExceedsCapacity {
		/// The rejected request.
		requested: Resources,
		/// The configured ceiling.
		limits: Resources,
	},

	/// The shared lock was not acquired within the configured timeout.
	#[error("timed out after {waited:?} waiting for lock {lock}")]
	LockTimeout {
		/// Description of the lock (usually its path).
		lock: String,
		/// How long the caller waited.
		waited: Duration,
	},

	/// Lock acquisition timed out on too many consecutive attempts.
	#[error("lock unavailable after {attempts} consecutive timeouts")]
	LockUnavailable {
		/// Number of consecutive timed-out attempts.
		attempts: u32,
	},

	/// Filesystem error inside the shared directory.
	#[error("I/O error on {path}: {source}")]
	Io {
		/// Path that failed.
		path: PathBuf,
		/// The underlying I/O error.
		#[source]
		source: std::io::Error,
	},

	/// A listed record was gone by the time it was read.
	///
	/// Owners release without the lock, so this is expected during
	/// aggregation.
	#[error("reservation record for pid {pid} is gone")]
	MissingRecord {
		/// Owner the record belonged to.
		pid: u32,
	},

	/// A reservation record could not be decoded.
	#[error("corrupt reservation record for pid {pid}: {reason}")]
	CorruptRecord {
		/// Owner encoded in the record key.
		pid: u32,
		/// Decoder diagnostic.
		reason: String,
	},

	/// A reservation record could not be encoded.
	#[error("failed to encode reservation record: {0}")]
	Encode(#[from] serde_json::Error),
}

impl AdmissionError {
	pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
		let path = path.into();
		move |source| Self::Io { path, source }
	}

	/// Whether this error is a lock-acquisition timeout.
	pub fn is_lock_timeout(&self) -> bool {
		matches!(self, Self::LockTimeout { .. })
	}
}

/// Result type for admission operations.
pub type Result<T> = std::result::Result<T, AdmissionError>;

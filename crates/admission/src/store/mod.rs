//! Reservation record storage.
//!
//! A store holds one record per admitted process, keyed by the owner's pid,
//! and provides the single exclusive lock that serializes admission
//! decisions. [`DirStore`] is the shared-directory backend used between
//! processes; [`MemoryStore`] keeps everything in process memory.

mod dir;
mod memory;


pub use dir::{DirLock, DirStore, LOCK_FILE_NAME, RECORD_EXTENSION};
pub use memory::{MemoryLock, MemoryStore};

use crate::config::LockConfig;
use crate::error::Result;
use crate::resources::Resources;

/// Backend for reservation records and the admission lock.
///
/// Records must only be read or written for an admission decision while the
/// guard returned by [`ReservationStore::lock`] is alive.
pub trait ReservationStore {
	/// Guard holding the exclusive admission lock until dropped.
	type Lock<'a>
	where
		Self: 'a;

	/// Acquires the exclusive admission lock within `config.timeout`.
	///
	/// [`DirStore`] also deletes writes that a crashed writer left behind.
	///
	/// # Errors
	/// Returns [`crate::AdmissionError::LockTimeout`] when the lock stays
	/// contended for the whole timeout.
	fn lock(&self, config: &LockConfig) -> Result<Self::Lock<'_>>;

	/// Owners of every stored record, in no particular order.
	///
	/// # Errors
	/// Returns an error if the backend cannot be enumerated.
	fn list(&self) -> Result<Vec<u32>>;

	/// Reads the record owned by `pid`.
	///
	/// # Errors
	/// Returns [`crate::AdmissionError::MissingRecord`] if the record is gone
	/// and an error for unreadable or malformed records.
	fn read(&self, pid: u32) -> Result<Resources>;

	/// Creates or replaces the record owned by `pid`. Readers never observe a
	/// partially written record.
	///
	/// # Errors
	/// Returns an error if the record cannot be persisted.
	fn write(&self, pid: u32, amount: &Resources) -> Result<()>;

	/// Deletes the record owned by `pid`. Missing records are not an error.
	///
	/// # Errors
	/// Returns an error if an existing record cannot be removed.
	fn remove(&self, pid: u32) -> Result<()>;
}

use std::collections::BTreeMap;

use parking_lot::{Mutex, MutexGuard};

use super::ReservationStore;
use crate::config::LockConfig;
use crate::error::{AdmissionError, Result};
use crate::resources::Resources;

/// In-process reservation store.
///
/// Records are kept as raw encoded bytes so callers can plant corrupt
/// entries with [`MemoryStore::insert_raw`].
#[derive(Debug, Default)]
pub struct MemoryStore {
	records: Mutex<BTreeMap<u32, Vec<u8>>>,
	lock: Mutex<()>,
}

/// Exclusive hold on a [`MemoryStore`]'s admission lock.
#[derive(Debug)]
pub struct MemoryLock<'a> {
	_guard: MutexGuard<'a, ()>,
}

impl MemoryStore {
	/// Empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores `bytes` verbatim as the record owned by `pid`.
	pub fn insert_raw(&self, pid: u32, bytes: impl Into<Vec<u8>>) {
		self.records.lock().insert(pid, bytes.into());
	}

	/// Whether a record owned by `pid` exists.
	pub fn contains(&self, pid: u32) -> bool {
		self.records.lock().contains_key(&pid)
	}

	/// Number of stored records.
	pub fn len(&self) -> usize {
		self.records.lock().len()
	}

	/// Whether the store holds no records.
	pub fn is_empty(&self) -> bool {
		self.records.lock().is_empty()
	}
}

impl ReservationStore for MemoryStore {
	type Lock<'a> = MemoryLock<'a>;

	fn lock(&self, config: &LockConfig) -> Result<MemoryLock<'_>> {
		self.lock
			.try_lock_for(config.timeout)
			.map(|guard| MemoryLock { _guard: guard })
			.ok_or(AdmissionError::LockTimeout {
				lock: "memory store".to_owned(),
				waited: config.timeout,
			})
	}

	fn list(&self) -> Result<Vec<u32>> {
		Ok(self.records.lock().keys().copied().collect())
	}

	fn read(&self, pid: u32) -> Result<Resources> {
		let records = self.records.lock();
		let bytes = records.get(&pid).ok_or(AdmissionError::MissingRecord { pid })?;
		serde_json::from_slice(bytes).map_err(|err| AdmissionError::CorruptRecord {
			pid,
			reason: err.to_string(),
		})
	}

	fn write(&self, pid: u32, amount: &Resources) -> Result<()> {
		let bytes = serde_json::to_vec(amount)?;
		self.records.lock().insert(pid, bytes);
		Ok(())
	}

	fn remove(&self, pid: u32) -> Result<()> {
		self.records.lock().remove(&pid);
		Ok(())
	}
}

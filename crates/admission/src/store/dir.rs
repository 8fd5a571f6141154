use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use fs2::FileExt;

use super::ReservationStore;
use crate::config::LockConfig;
use crate::error::{AdmissionError, Result};
use crate::resources::Resources;

/// File name of the admission lock inside the shared directory.
pub const LOCK_FILE_NAME: &str = "lockfile";

/// Extension of reservation record files (`<pid>.req`).
pub const RECORD_EXTENSION: &str = "req";

const PENDING_PREFIX: &str = ".pending-";
const PENDING_SUFFIX: &str = ".tmp";

/// Reservation store backed by a shared directory.
///
/// Each record is a `<pid>.req` file containing a JSON [`Resources`]; the
/// admission lock is an advisory exclusive lock on [`LOCK_FILE_NAME`].
#[derive(Debug, Clone)]
pub struct DirStore {
	dir: PathBuf,
}

impl DirStore {
	/// Wraps an existing directory without touching the filesystem.
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	/// Wraps `dir`, creating it (owner-only on unix) if absent.
	///
	/// # Errors
	/// Returns [`AdmissionError::Io`] if the directory cannot be created.
	pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
		let dir = dir.into();
		if !dir.is_dir() {
			let mut builder = std::fs::DirBuilder::new();
			builder.recursive(true);
			#[cfg(unix)]
			{
				use std::os::unix::fs::DirBuilderExt;
				builder.mode(0o700);
			}
			builder.create(&dir).map_err(AdmissionError::io(&dir))?;
			tracing::debug!(dir = %dir.display(), "created reservation directory");
		}
		Ok(Self { dir })
	}

	/// The shared directory.
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Path of the record owned by `pid`.
	pub fn record_path(&self, pid: u32) -> PathBuf {
		self.dir.join(format!("{pid}.{RECORD_EXTENSION}"))
	}

	/// Path of the admission lock file.
	pub fn lock_path(&self) -> PathBuf {
		self.dir.join(LOCK_FILE_NAME)
	}

	/// Deletes half-written records left by writers that died before the
	/// rename. Must only run under the lock: every write happens there.
	fn sweep_pending(&self) {
		let Ok(entries) = std::fs::read_dir(&self.dir) else {
			return;
		};
		for entry in entries.flatten() {
			let name = entry.file_name();
			let is_pending = name
				.to_str()
				.is_some_and(|n| n.starts_with(PENDING_PREFIX) && n.ends_with(PENDING_SUFFIX));
			if !is_pending {
				continue;
			}
			match std::fs::remove_file(entry.path()) {
				Ok(()) => tracing::info!(file = %entry.path().display(), "removed abandoned record write"),
				Err(err) if err.kind() == ErrorKind::NotFound => {}
				Err(err) => tracing::warn!(file = %entry.path().display(), error = %err, "failed to remove abandoned record write"),
			}
		}
	}
}

/// Parses `<pid>.req`, rejecting anything that would not round-trip through
/// [`DirStore::record_path`].
fn parse_record_name(name: &OsStr) -> Option<u32> {
	let stem = name.to_str()?.strip_suffix(RECORD_EXTENSION)?.strip_suffix('.')?;
	if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	let pid: u32 = stem.parse().ok()?;
	(pid.to_string() == stem).then_some(pid)
}

/// Exclusive hold on the directory's lock file, released on drop.
#[derive(Debug)]
pub struct DirLock {
	file: File,
	path: PathBuf,
}

impl Drop for DirLock {
	fn drop(&mut self) {
		if let Err(err) = FileExt::unlock(&self.file) {
			tracing::warn!(path = %self.path.display(), error = %err, "failed to unlock reservation lock");
		}
	}
}

impl ReservationStore for DirStore {
	type Lock<'a> = DirLock;

	fn lock(&self, config: &LockConfig) -> Result<DirLock> {
		let path = self.lock_path();
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.truncate(false)
			.open(&path)
			.map_err(AdmissionError::io(&path))?;

		let started = Instant::now();
		loop {
			match FileExt::try_lock_exclusive(&file) {
				Ok(()) => {
					self.sweep_pending();
					return Ok(DirLock { file, path });
				}
				Err(err) if err.kind() == fs2::lock_contended_error().kind() => {}
				Err(err) => return Err(AdmissionError::io(&path)(err)),
			}

			let waited = started.elapsed();
			if waited >= config.timeout {
				return Err(AdmissionError::LockTimeout {
					lock: path.display().to_string(),
					waited,
				});
			}
			std::thread::sleep(config.retry_interval.min(config.timeout - waited));
		}
	}

	fn list(&self) -> Result<Vec<u32>> {
		let entries = std::fs::read_dir(&self.dir).map_err(AdmissionError::io(&self.dir))?;
		let mut pids = Vec::new();
		for entry in entries {
			let entry = entry.map_err(AdmissionError::io(&self.dir))?;
			if let Some(pid) = parse_record_name(&entry.file_name()) {
				pids.push(pid);
			}
		}
		Ok(pids)
	}

	fn read(&self, pid: u32) -> Result<Resources> {
		let path = self.record_path(pid);
		let bytes = match std::fs::read(&path) {
			Ok(bytes) => bytes,
			Err(err) if err.kind() == ErrorKind::NotFound => return Err(AdmissionError::MissingRecord { pid }),
			Err(err) => return Err(AdmissionError::io(&path)(err)),
		};
		serde_json::from_slice(&bytes).map_err(|err| AdmissionError::CorruptRecord {
			pid,
			reason: err.to_string(),
		})
	}

	fn write(&self, pid: u32, amount: &Resources) -> Result<()> {
		let path = self.record_path(pid);
		let json = serde_json::to_vec(amount)?;

		let mut tmp = tempfile::Builder::new()
			.prefix(PENDING_PREFIX)
			.suffix(PENDING_SUFFIX)
			.tempfile_in(&self.dir)
			.map_err(AdmissionError::io(&self.dir))?;
		tmp.write_all(&json).map_err(AdmissionError::io(tmp.path()))?;
		tmp.as_file().sync_all().map_err(AdmissionError::io(tmp.path()))?;
		tmp.persist(&path).map_err(|err| AdmissionError::io(&path)(err.error))?;
		Ok(())
	}

	fn remove(&self, pid: u32) -> Result<()> {
		let path = self.record_path(pid);
		match std::fs::remove_file(&path) {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
			Err(err) => Err(AdmissionError::io(&path)(err)),
		}
	}
}

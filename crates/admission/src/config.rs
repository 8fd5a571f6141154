//! Admission settings and the persisted capacity limits file.
//!
//! Nothing here is process-global: callers build an [`AdmissionConfig`] and
//! pass the pieces they need into the gate and the retry driver.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::liveness::ReclaimPolicy;
use crate::resources::Resources;

/// Timing of the shared directory lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
	/// Overall bound on one acquisition.
	pub timeout: Duration,
	/// Delay between non-blocking lock attempts.
	pub retry_interval: Duration,
}

impl Default for LockConfig {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(30),
			retry_interval: Duration::from_millis(678),
		}
	}
}

/// Behaviour of the retry driver across denied or failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
	/// First backoff delay.
	pub initial: Duration,
	/// Added to the delay after every unsuccessful attempt.
	pub step: Duration,
	/// Upper bound on the delay.
	pub max: Duration,
	/// Consecutive lock timeouts tolerated before giving up. `None` retries
	/// forever.
	pub max_lock_failures: Option<u32>,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			initial: Duration::from_secs(1),
			step: Duration::from_secs(1),
			max: Duration::from_secs(10),
			max_lock_failures: Some(3),
		}
	}
}

/// Everything a participant needs to take part in admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionConfig {
	/// Shared rendezvous directory holding the lock file and records.
	pub dir: PathBuf,
	/// Lock timing.
	pub lock: LockConfig,
	/// Retry and backoff behaviour.
	pub retry: RetryConfig,
	/// Treatment of records whose owner cannot be signalled.
	pub reclaim: ReclaimPolicy,
}

impl AdmissionConfig {
	/// Default settings over `dir`.
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self {
			dir: dir.into(),
			lock: LockConfig::default(),
			retry: RetryConfig::default(),
			reclaim: ReclaimPolicy::default(),
		}
	}
}

/// Reads capacity limits from `path`.
///
/// # Errors
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Parse`] if it is not a limits record.
pub fn load_limits(path: &Path) -> Result<Resources, ConfigError> {
	let bytes = std::fs::read(path).map_err(|error| ConfigError::Io {
		path: path.to_path_buf(),
		error,
	})?;
	serde_json::from_slice(&bytes).map_err(|error| ConfigError::Parse {
		path: path.to_path_buf(),
		error,
	})
}

/// Writes capacity limits to `path`, replacing any previous file atomically.
///
/// The file is created with owner-only permissions.
///
/// # Errors
/// Returns [`ConfigError::Io`] if the file cannot be written.
pub fn write_limits(path: &Path, limits: &Resources) -> Result<(), ConfigError> {
	let io = |error| ConfigError::Io {
		path: path.to_path_buf(),
		error,
	};
	let parent = match path.parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent,
		_ => Path::new("."),
	};
	let json = serde_json::to_vec(limits).map_err(std::io::Error::other).map_err(io)?;
	let mut tmp = tempfile::Builder::new().prefix(".resourcer").suffix(".tmp").tempfile_in(parent).map_err(io)?;
	tmp.write_all(&json).map_err(io)?;
	tmp.as_file().sync_all().map_err(io)?;
	tmp.persist(path).map_err(|e| io(e.error))?;
	Ok(())
}

/// Loads limits from `path`, first writing `defaults()` there if the file is
/// absent.
///
/// # Errors
/// Propagates read, parse and write failures.
pub fn load_or_init_limits(path: &Path, defaults: impl FnOnce() -> Resources) -> Result<Resources, ConfigError> {
	if !path.exists() {
		let limits = defaults();
		tracing::info!(path = %path.display(), %limits, "writing default capacity limits");
		write_limits(path, &limits)?;
	}
	load_limits(path)
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn write_then_load_limits() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("resourcer.conf");
		write_limits(&path, &Resources::new(1000, 2)).unwrap();

		assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"memory":1000,"cores":2}"#);
		assert_eq!(load_limits(&path).unwrap(), Resources::new(1000, 2));
	}

	#[cfg(unix)]
	#[test]
	fn limits_file_is_owner_only() {
		use std::os::unix::fs::PermissionsExt;

		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("resourcer.conf");
		write_limits(&path, &Resources::new(1, 1)).unwrap();
		let mode = std::fs::metadata(&path).unwrap().permissions().mode();
		assert_eq!(mode & 0o777, 0o600);
	}

	#[test]
	fn missing_config_is_io_error() {
		let dir = tempfile::tempdir().unwrap();
		let err = load_limits(&dir.path().join("absent.conf")).unwrap_err();
		assert!(matches!(err, ConfigError::Io { .. }));
	}

	#[test]
	fn malformed_config_is_parse_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("resourcer.conf");
		std::fs::write(&path, b"memory = 12").unwrap();
		assert!(matches!(load_limits(&path), Err(ConfigError::Parse { .. })));

		std::fs::write(&path, br#"{"memory":12}"#).unwrap();
		assert!(matches!(load_limits(&path), Err(ConfigError::Parse { .. })));
	}

	#[test]
	fn bootstrap_only_when_absent() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("resourcer.conf");

		let first = load_or_init_limits(&path, || Resources::new(10, 1)).unwrap();
		assert_eq!(first, Resources::new(10, 1));

		let second = load_or_init_limits(&path, || panic!("defaults must not be recomputed")).unwrap();
		assert_eq!(second, Resources::new(10, 1));
	}

	#[test]
	fn default_timings() {
		let config = AdmissionConfig::new("/tmp/resourcer");
		assert_eq!(config.lock.timeout, Duration::from_secs(30));
		assert_eq!(config.lock.retry_interval, Duration::from_millis(678));
		assert_eq!(config.retry.initial, Duration::from_secs(1));
		assert_eq!(config.retry.max, Duration::from_secs(10));
		assert!(config.reclaim.reclaim_inaccessible);
	}
}

//! Host-local admission control for cooperating processes.
//!
//! Independent processes reserve memory and CPU cores out of a fixed host
//! ceiling before they start. There is no daemon: every participant meets in
//! a shared directory that holds one reservation record per admitted process
//! and a lock file that serializes admission decisions.
//!
//! * [`liveness`]: probes whether a record's owning process still exists.
//! * [`store`]: the reservation record backends ([`DirStore`], [`MemoryStore`]).
//! * [`usage`]: sums live records and reclaims records of dead owners.
//! * [`gate`]: the locked admit-or-deny decision.
//! * [`retry`]: blocking retry loop with linear backoff and the scoped
//!   [`Reservation`] guard.
//!
//! ```no_run
//! use resourcer_admission::{AdmissionConfig, AdmissionGate, DirStore, OsProbe, Resources, admit_with_retry};
//!
//! # fn main() -> resourcer_admission::Result<()> {
//! let config = AdmissionConfig::new("/tmp/resourcer");
//! let store = DirStore::open(&config.dir)?;
//! let limits = Resources::new(8 << 30, 4);
//! let gate = AdmissionGate::new(store, OsProbe, limits).lock_config(config.lock);
//!
//! let reservation = admit_with_retry(&gate, std::process::id(), Resources::new(1 << 30, 1), &config.retry, std::thread::sleep)?;
//! // ... run the workload ...
//! reservation.release()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod gate;
pub mod liveness;
pub mod resources;
pub mod retry;
pub mod store;
pub mod usage;

#[cfg(test)]
mod test_support;

pub use config::{AdmissionConfig, LockConfig, RetryConfig};
pub use error::{AdmissionError, ConfigError, Result};
pub use gate::{AdmissionGate, Decision};
pub use liveness::{Liveness, OsProbe, ProcessProbe, ReclaimPolicy};
pub use resources::Resources;
pub use retry::{Backoff, Reservation, admit_with_retry};
pub use store::{DirStore, MemoryStore, ReservationStore};
pub use usage::UsageSnapshot;

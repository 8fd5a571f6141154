//! The locked admit-or-deny decision.

use crate::config::LockConfig;
use crate::error::Result;
use crate::liveness::{ProcessProbe, ReclaimPolicy};
use crate::resources::Resources;
use crate::store::ReservationStore;
use crate::usage::{UsageSnapshot, aggregate};


/// Outcome of one admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
	/// The request fit and its record has been written.
	Admitted {
		/// Live usage observed before this admission.
		usage: Resources,
		/// Capacity left after this admission.
		headroom: Resources,
	},
	/// The request did not fit; nothing was written.
	Denied {
		/// Live usage that blocked the request.
		usage: Resources,
	},
}

impl Decision {
	/// Whether the request was admitted.
	pub fn is_admitted(&self) -> bool {
		matches!(self, Self::Admitted { .. })
	}
}

/// Serializes admission decisions against a capacity ceiling.
///
/// Every decision runs under the store's exclusive lock: usage is aggregated,
/// the request is checked against `limits` on both dimensions and, only if it
/// fits, the caller's record is written before the lock is released.
#[derive(Debug)]
pub struct AdmissionGate<S, P> {
	store: S,
	probe: P,
	limits: Resources,
	lock: LockConfig,
	reclaim: ReclaimPolicy,
}

impl<S, P> AdmissionGate<S, P>
where
	S: ReservationStore,
	P: ProcessProbe,
{
	/// Creates a gate with default lock timing and reclaim policy.
	pub fn new(store: S, probe: P, limits: Resources) -> Self {
		Self {
			store,
			probe,
			limits,
			lock: LockConfig::default(),
			reclaim: ReclaimPolicy::default(),
		}
	}

	/// Sets the lock timing.
	#[must_use]
	pub fn lock_config(mut self, lock: LockConfig) -> Self {
		self.lock = lock;
		self
	}

	/// Sets the policy for owners that cannot be signalled.
	#[must_use]
	pub fn reclaim_policy(mut self, reclaim: ReclaimPolicy) -> Self {
		self.reclaim = reclaim;
		self
	}

	/// The underlying store.
	pub fn store(&self) -> &S {
		&self.store
	}

	/// The configured ceiling.
	pub fn limits(&self) -> Resources {
		self.limits
	}

	/// Attempts to admit `request` on behalf of `owner`.
	///
	/// Partial fits are denials. A denial writes nothing.
	///
	/// # Errors
	/// Returns [`crate::AdmissionError::LockTimeout`] if the lock cannot be
	/// acquired, or a store error if enumeration or the record write fails.
	pub fn try_admit(&self, owner: u32, request: Resources) -> Result<Decision> {
		let held = self.store.lock(&self.lock)?;
		let usage = aggregate(&self.store, &held, &self.probe, self.reclaim)?.total;

		if !self.limits.admits(&usage, &request) {
			tracing::debug!(owner, %usage, %request, limits = %self.limits, "request denied");
			return Ok(Decision::Denied { usage });
		}

		self.store.write(owner, &request)?;
		drop(held);

		let headroom = self.limits.saturating_sub(usage.saturating_add(request));
		tracing::info!(
			owner,
			cores_left = headroom.cores,
			memory_left = headroom.memory,
			"allocating with {} cores and {} bytes left",
			headroom.cores,
			headroom.memory
		);
		Ok(Decision::Admitted { usage, headroom })
	}

	/// Runs a locked aggregation pass without requesting anything.
	///
	/// # Errors
	/// Same as [`AdmissionGate::try_admit`], minus the write.
	pub fn usage(&self) -> Result<UsageSnapshot> {
		let held = self.store.lock(&self.lock)?;
		aggregate(&self.store, &held, &self.probe, self.reclaim)
	}

	/// Deletes `owner`'s record.
	///
	/// Removal only frees capacity, so it does not wait for the lock.
	///
	/// # Errors
	/// Returns a store error if an existing record cannot be removed.
	pub fn release(&self, owner: u32) -> Result<()> {
		self.store.remove(owner)?;
		tracing::debug!(owner, "released reservation");
		Ok(())
	}
}

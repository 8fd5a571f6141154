//! Usage aggregation with opportunistic reclamation.

use crate::error::{AdmissionError, Result};
use crate::liveness::{ProcessProbe, ReclaimPolicy};
use crate::resources::Resources;
use crate::store::ReservationStore;

/// Outcome of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageSnapshot {
	/// Sum over live records.
	pub total: Resources,
	/// Number of live records counted.
	pub live: usize,
	/// Owners whose records were reclaimed during this pass.
	pub reclaimed: Vec<u32>,
}

/// Sums every live reservation in `store`.
///
/// Records whose owner is reclaimable under `policy` are deleted and
/// excluded. Records released between listing and reading are skipped;
/// unreadable or malformed ones count as zero. The `_held`
/// guard ties the pass to the admission lock.
///
/// # Errors
/// Fails only when the store cannot be enumerated.
pub fn aggregate<'s, S, P>(store: &'s S, _held: &S::Lock<'s>, probe: &P, policy: ReclaimPolicy) -> Result<UsageSnapshot>
where
	S: ReservationStore,
	P: ProcessProbe + ?Sized,
{
	let mut snapshot = UsageSnapshot::default();

	for pid in store.list()? {
		let liveness = probe.probe(pid);
		if policy.is_reclaimable(liveness) {
			match store.remove(pid) {
				Ok(()) => tracing::info!(pid, ?liveness, "reclaimed reservation of dead process"),
				Err(err) => tracing::warn!(pid, error = %err, "failed to reclaim reservation"),
			}
			snapshot.reclaimed.push(pid);
			continue;
		}

		match store.read(pid) {
			Ok(amount) => {
				snapshot.total = snapshot.total.saturating_add(amount);
				snapshot.live += 1;
			}
			Err(AdmissionError::MissingRecord { .. }) => tracing::debug!(pid, "reservation released during aggregation"),
			Err(err) => tracing::warn!(pid, error = %err, "ignoring unreadable reservation"),
		}
	}

	tracing::debug!(
		memory = snapshot.total.memory,
		cores = snapshot.total.cores,
		live = snapshot.live,
		reclaimed = snapshot.reclaimed.len(),
		"aggregated reservations"
	);
	Ok(snapshot)
}

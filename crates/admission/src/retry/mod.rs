//! Blocking admission with linear backoff.
//!
//! The driver starts out waiting and loops until the gate admits the request
//! (success) or returns an error it will not retry (failure). Denials sleep
//! for the current backoff delay and try again. Lock timeouts are retried the
//! same way until [`RetryConfig::max_lock_failures`] consecutive timeouts.

use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{AdmissionError, Result};
use crate::gate::{AdmissionGate, Decision};
use crate::liveness::ProcessProbe;
use crate::resources::Resources;
use crate::store::ReservationStore;


/// Linearly growing delays: `initial`, `initial + step`, ... capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
	next: Duration,
	step: Duration,
	max: Duration,
}

impl Backoff {
	/// Backoff sequence described by `config`.
	pub fn new(config: &RetryConfig) -> Self {
		Self {
			next: config.initial.min(config.max),
			step: config.step,
			max: config.max,
		}
	}

	/// Returns the current delay and advances the sequence.
	pub fn next_delay(&mut self) -> Duration {
		let delay = self.next;
		self.next = delay.saturating_add(self.step).min(self.max);
		delay
	}
}

impl Iterator for Backoff {
	type Item = Duration;

	fn next(&mut self) -> Option<Duration> {
		Some(self.next_delay())
	}
}

/// A held reservation.
///
/// The record is removed by [`Reservation::release`] or, failing that, when
/// the guard is dropped, on every exit path short of the process dying.
#[must_use = "dropping a reservation releases it immediately"]
#[derive(Debug)]
pub struct Reservation<'g, S, P>
where
	S: ReservationStore,
	P: ProcessProbe,
{
	gate: &'g AdmissionGate<S, P>,
	owner: u32,
	amount: Resources,
	attempts: u32,
	released: bool,
}

impl<S, P> Reservation<'_, S, P>
where
	S: ReservationStore,
	P: ProcessProbe,
{
	/// Process that owns the record.
	pub fn owner(&self) -> u32 {
		self.owner
	}

	/// Reserved amount.
	pub fn amount(&self) -> Resources {
		self.amount
	}

	/// Number of gate attempts it took to be admitted.
	pub fn attempts(&self) -> u32 {
		self.attempts
	}

	/// Removes the record now.
	///
	/// # Errors
	/// Returns a store error if the record cannot be removed.
	pub fn release(mut self) -> Result<()> {
		self.released = true;
		self.gate.release(self.owner)
	}
}

impl<S, P> Drop for Reservation<'_, S, P>
where
	S: ReservationStore,
	P: ProcessProbe,
{
	fn drop(&mut self) {
		if self.released {
			return;
		}
		if let Err(err) = self.gate.release(self.owner) {
			tracing::warn!(owner = self.owner, error = %err, "failed to release reservation");
		}
	}
}

/// Blocks until `gate` admits `request` for `owner`.
///
/// `sleep` is called with each backoff delay; pass [`std::thread::sleep`]
/// outside of tests.
///
/// # Errors
/// Returns [`AdmissionError::ExceedsCapacity`] without trying the gate when
/// `request` alone exceeds the gate's limits,
/// [`AdmissionError::LockUnavailable`] after too many consecutive lock
/// timeouts, or any other gate error immediately.
pub fn admit_with_retry<'g, S, P>(
	gate: &'g AdmissionGate<S, P>,
	owner: u32,
	request: Resources,
	config: &RetryConfig,
	mut sleep: impl FnMut(Duration),
) -> Result<Reservation<'g, S, P>>
where
	S: ReservationStore,
	P: ProcessProbe,
{
	gate.limits().ensure_fits(&request)?;

	let mut backoff = Backoff::new(config);
	let mut lock_failures = 0u32;
	let mut attempts = 0u32;

	loop {
		attempts = attempts.saturating_add(1);
		match gate.try_admit(owner, request) {
			Ok(Decision::Admitted { .. }) => {
				return Ok(Reservation {
					gate,
					owner,
					amount: request,
					attempts,
					released: false,
				});
			}
			Ok(Decision::Denied { usage }) => {
				lock_failures = 0;
				let delay = backoff.next_delay();
				tracing::info!(attempt = attempts, retry_in = ?delay, %usage, %request, "waiting for resources");
				sleep(delay);
			}
			Err(err) if err.is_lock_timeout() => {
				lock_failures = lock_failures.saturating_add(1);
				if config.max_lock_failures.is_some_and(|max| lock_failures >= max) {
					return Err(AdmissionError::LockUnavailable { attempts: lock_failures });
				}
				let delay = backoff.next_delay();
				tracing::warn!(attempt = attempts, retry_in = ?delay, error = %err, "lock acquisition failed");
				sleep(delay);
			}
			Err(err) => return Err(err),
		}
	}
}

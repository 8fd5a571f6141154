//! Process liveness probing.
//!
//! A record is tied to its owner only through the pid in its key, so the probe
//! decides whether the record still represents a running reservation.

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Result of probing one pid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
	/// The process exists and accepted the null signal.
	Alive,
	/// No such process.
	Gone,
	/// The process exists but this caller may not signal it.
	Inaccessible,
}

/// Reports whether a process exists.
pub trait ProcessProbe {
	/// Probes `pid` without side effects beyond a null signal.
	fn probe(&self, pid: u32) -> Liveness;
}

impl<P: ProcessProbe + ?Sized> ProcessProbe for &P {
	fn probe(&self, pid: u32) -> Liveness {
		(**self).probe(pid)
	}
}

/// Probes real processes with `kill(pid, 0)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProbe;

impl ProcessProbe for OsProbe {
	fn probe(&self, pid: u32) -> Liveness {
		// pid 0 and negative pids address process groups.
		let raw = match i32::try_from(pid) {
			Ok(raw) if raw > 0 => raw,
			_ => return Liveness::Gone,
		};
		match kill(Pid::from_raw(raw), None) {
			Ok(()) => Liveness::Alive,
			Err(Errno::EPERM) => Liveness::Inaccessible,
			Err(_) => Liveness::Gone,
		}
	}
}

/// Decides which probe results make a record reclaimable.
///
/// An [`Liveness::Inaccessible`] owner may be a live process running under
/// another user. Reclaiming it frees capacity that is still in use, so the
/// choice is explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimPolicy {
	/// Treat owners that cannot be signalled as dead.
	pub reclaim_inaccessible: bool,
}

impl Default for ReclaimPolicy {
	fn default() -> Self {
		Self {
			reclaim_inaccessible: true,
		}
	}
}

impl ReclaimPolicy {
	/// Whether a record whose owner probed as `liveness` should be reclaimed.
	pub fn is_reclaimable(&self, liveness: Liveness) -> bool {
		match liveness {
			Liveness::Alive => false,
			Liveness::Gone => true,
			Liveness::Inaccessible => self.reclaim_inaccessible,
		}
	}
}

/// Whether `pid` counts as alive under `policy`.
pub fn is_alive(probe: &impl ProcessProbe, policy: ReclaimPolicy, pid: u32) -> bool {
	!policy.is_reclaimable(probe.probe(pid))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn own_process_is_alive() {
		assert_eq!(OsProbe.probe(std::process::id()), Liveness::Alive);
	}

	#[test]
	fn group_addressing_pids_are_gone() {
		assert_eq!(OsProbe.probe(0), Liveness::Gone);
		assert_eq!(OsProbe.probe(u32::MAX), Liveness::Gone);
		assert_eq!(OsProbe.probe(i32::MAX as u32 + 1), Liveness::Gone);
	}

	#[test]
	fn reaped_child_is_gone() {
		let mut child = std::process::Command::new("true").spawn().unwrap();
		let pid = child.id();
		child.wait().unwrap();
		assert_eq!(OsProbe.probe(pid), Liveness::Gone);
	}

	#[test]
	fn policy_controls_inaccessible_owners() {
		let strict = ReclaimPolicy::default();
		let lenient = ReclaimPolicy {
			reclaim_inaccessible: false,
		};
		assert!(strict.is_reclaimable(Liveness::Inaccessible));
		assert!(!lenient.is_reclaimable(Liveness::Inaccessible));
		for policy in [strict, lenient] {
			assert!(policy.is_reclaimable(Liveness::Gone));
			assert!(!policy.is_reclaimable(Liveness::Alive));
		}
	}

	#[test]
	fn is_alive_follows_policy() {
		struct Locked;
		impl ProcessProbe for Locked {
			fn probe(&self, _pid: u32) -> Liveness {
				Liveness::Inaccessible
			}
		}
		assert!(!is_alive(&Locked, ReclaimPolicy::default(), 42));
		assert!(is_alive(
			&Locked,
			ReclaimPolicy {
				reclaim_inaccessible: false
			},
			42
		));
	}
}

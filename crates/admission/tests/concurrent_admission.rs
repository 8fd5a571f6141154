//! Many participants racing for a small ceiling through one shared directory.

use std::sync::Barrier;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use resourcer_admission::{
	AdmissionGate, DirStore, Liveness, LockConfig, ProcessProbe, ReservationStore, Resources, RetryConfig, admit_with_retry,
};

/// Every participant in these tests is a thread with a synthetic pid.
struct AllAlive;

impl ProcessProbe for AllAlive {
	fn probe(&self, _pid: u32) -> Liveness {
		Liveness::Alive
	}
}

const LIMITS: Resources = Resources::new(1000, 2);

fn lock_config() -> LockConfig {
	LockConfig {
		timeout: Duration::from_secs(20),
		retry_interval: Duration::from_millis(2),
	}
}

fn participant(dir: &std::path::Path) -> AdmissionGate<DirStore, AllAlive> {
	AdmissionGate::new(DirStore::new(dir), AllAlive, LIMITS).lock_config(lock_config())
}

#[test]
fn concurrent_attempts_never_overcommit() {
	const THREADS: u32 = 12;
	const ROUNDS: usize = 15;

	let tmp = tempfile::tempdir().unwrap();
	DirStore::open(tmp.path()).unwrap();
	let barrier = Barrier::new(THREADS as usize);
	let admitted = AtomicUsize::new(0);

	std::thread::scope(|scope| {
		for i in 0..THREADS {
			let owner = 1_000_000 + i;
			let (barrier, admitted, dir) = (&barrier, &admitted, tmp.path());
			scope.spawn(move || {
				let gate = participant(dir);
				barrier.wait();
				for _ in 0..ROUNDS {
					if gate.try_admit(owner, Resources::new(400, 1)).unwrap().is_admitted() {
						admitted.fetch_add(1, Ordering::Relaxed);
						let live = gate.usage().unwrap().total;
						assert!(live.fits_within(&LIMITS), "overcommitted: {live}");
						std::thread::sleep(Duration::from_millis(1));
						gate.release(owner).unwrap();
					} else {
						std::thread::yield_now();
					}
				}
			});
		}
	});

	assert!(admitted.load(Ordering::Relaxed) > 0);
	assert!(DirStore::new(tmp.path()).list().unwrap().is_empty());
}

#[test]
fn two_oversized_requests_admit_at_most_one() {
	let tmp = tempfile::tempdir().unwrap();
	DirStore::open(tmp.path()).unwrap();
	let barrier = Barrier::new(2);

	let results: Vec<bool> = std::thread::scope(|scope| {
		let handles: Vec<_> = [1u32, 2]
			.into_iter()
			.map(|owner| {
				let (barrier, dir) = (&barrier, tmp.path());
				scope.spawn(move || {
					let gate = participant(dir);
					barrier.wait();
					gate.try_admit(owner, Resources::new(600, 1)).unwrap().is_admitted()
				})
			})
			.collect();
		handles.into_iter().map(|h| h.join().unwrap()).collect()
	});

	assert_eq!(results.iter().filter(|admitted| **admitted).count(), 1);
	assert_eq!(DirStore::new(tmp.path()).list().unwrap().len(), 1);
}

#[test]
fn waiters_all_finish_through_retry_driver() {
	let tmp = tempfile::tempdir().unwrap();
	DirStore::open(tmp.path()).unwrap();
	let retry = RetryConfig {
		initial: Duration::from_millis(1),
		step: Duration::from_millis(1),
		max: Duration::from_millis(5),
		max_lock_failures: None,
	};
	let finished = AtomicUsize::new(0);

	std::thread::scope(|scope| {
		for i in 0..6u32 {
			let (finished, dir, retry) = (&finished, tmp.path(), &retry);
			scope.spawn(move || {
				let gate = participant(dir);
				let reservation = admit_with_retry(&gate, 2_000_000 + i, Resources::new(500, 1), retry, std::thread::sleep).unwrap();
				let live = gate.usage().unwrap().total;
				assert!(live.fits_within(&LIMITS), "overcommitted: {live}");
				std::thread::sleep(Duration::from_millis(3));
				reservation.release().unwrap();
				finished.fetch_add(1, Ordering::Relaxed);
			});
		}
	});

	assert_eq!(finished.load(Ordering::Relaxed), 6);
	assert!(DirStore::new(tmp.path()).list().unwrap().is_empty());
}

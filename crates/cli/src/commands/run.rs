use std::process::ExitCode;

use anyhow::{Context, Result};
use resourcer_admission::config::load_or_init_limits;
use resourcer_admission::resources::host_limits;
use resourcer_admission::{AdmissionConfig, AdmissionGate, DirStore, OsProbe, Resources, admit_with_retry};

use crate::cli::RunArgs;
use crate::supervisor;

/// Reserves the requested amount, runs the command, and releases.
pub fn execute(args: &RunArgs) -> Result<ExitCode> {
	run(args).map(ExitCode::from)
}

fn run(args: &RunArgs) -> Result<u8> {
	let limits = load_or_init_limits(&args.config, host_limits).context("failed to load capacity limits")?;
	let request = Resources::new(args.mem, args.cores);
	limits.ensure_fits(&request)?;

	let settings = settings(args);
	let store = DirStore::open(&settings.dir)?;
	let gate = AdmissionGate::new(store, OsProbe, limits)
		.lock_config(settings.lock)
		.reclaim_policy(settings.reclaim);

	let reservation = admit_with_retry(&gate, std::process::id(), request, &settings.retry, std::thread::sleep)
		.context("admission failed")?;
	tracing::debug!(attempts = reservation.attempts(), amount = %reservation.amount(), "admitted");

	let outcome = supervisor::run(&args.command);
	if let Err(err) = reservation.release() {
		tracing::warn!(error = %err, "failed to release reservation");
	}
	outcome
}

fn settings(args: &RunArgs) -> AdmissionConfig {
	let mut settings = AdmissionConfig::new(&args.dir);
	settings.retry.max_lock_failures = (args.max_lock_failures > 0).then_some(args.max_lock_failures);
	settings.reclaim.reclaim_inaccessible = !args.keep_inaccessible;
	settings
}

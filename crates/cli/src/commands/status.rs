use std::process::ExitCode;

use anyhow::{Context, Result};
use resourcer_admission::config::load_limits;
use resourcer_admission::{AdmissionGate, DirStore, OsProbe, ReclaimPolicy, Resources, UsageSnapshot};

use crate::cli::StatusArgs;

/// Prints live usage against the configured limits.
///
/// Runs the same locked aggregation pass as admission, so records of dead
/// processes are reclaimed as a side effect.
pub fn execute(args: &StatusArgs) -> Result<ExitCode> {
	let limits = load_limits(&args.config)
		.with_context(|| format!("no usable limits at {}; run `resourcer init` first", args.config.display()))?;
	let snapshot = snapshot(args, limits)?;
	print!("{}", render(&limits, &snapshot));
	Ok(ExitCode::SUCCESS)
}

/// An absent directory means nobody has reserved anything yet; it is left
/// for `run` to create.
fn snapshot(args: &StatusArgs, limits: Resources) -> Result<UsageSnapshot> {
	if !args.dir.is_dir() {
		tracing::debug!(dir = %args.dir.display(), "no reservation directory yet");
		return Ok(UsageSnapshot::default());
	}
	let policy = ReclaimPolicy {
		reclaim_inaccessible: !args.keep_inaccessible,
	};
	let gate = AdmissionGate::new(DirStore::new(&args.dir), OsProbe, limits).reclaim_policy(policy);
	Ok(gate.usage()?)
}

fn render(limits: &Resources, snapshot: &UsageSnapshot) -> String {
	let free = limits.saturating_sub(snapshot.total);
	format!(
		"limits:    {limits}\nin use:    {}\nfree:      {free}\nlive:      {}\nreclaimed: {}\n",
		snapshot.total,
		snapshot.live,
		snapshot.reclaimed.len()
	)
}

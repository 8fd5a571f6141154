use std::process::ExitCode;

use anyhow::{Context, Result};
use resourcer_admission::Resources;
use resourcer_admission::config::write_limits;
use resourcer_admission::resources::host_limits;

use crate::cli::InitArgs;

/// Writes the capacity limits, filling unset or zero values from the host.
pub fn execute(args: &InitArgs) -> Result<ExitCode> {
	let limits = resolve(args, host_limits);
	write_limits(&args.config, &limits).with_context(|| format!("failed to write {}", args.config.display()))?;
	tracing::info!(path = %args.config.display(), %limits, "wrote capacity limits");
	Ok(ExitCode::SUCCESS)
}

fn resolve(args: &InitArgs, defaults: impl FnOnce() -> Resources) -> Resources {
	let defaults = defaults();
	Resources {
		memory: args.mem.filter(|m| *m > 0).unwrap_or(defaults.memory),
		cores: args.cores.filter(|c| *c > 0).unwrap_or(defaults.cores),
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use resourcer_admission::config::load_limits;

	use super::*;

	fn args(config: std::path::PathBuf, mem: Option<u64>, cores: Option<u32>) -> InitArgs {
		InitArgs { config, mem, cores }
	}

	#[test]
	fn explicit_values_win() {
		let host = || Resources::new(64, 8);
		assert_eq!(resolve(&args("c".into(), Some(10), Some(2)), host), Resources::new(10, 2));
	}

	#[test]
	fn missing_or_zero_values_use_host() {
		let host = || Resources::new(64, 8);
		assert_eq!(resolve(&args("c".into(), None, Some(0)), host), Resources::new(64, 8));
		assert_eq!(resolve(&args("c".into(), Some(0), Some(3)), host), Resources::new(64, 3));
	}

	#[test]
	fn writes_config_file() {
		let tmp = tempfile::tempdir().unwrap();
		let path = tmp.path().join("resourcer.conf");
		execute(&args(path.clone(), Some(4096), Some(3))).unwrap();
		assert_eq!(load_limits(&path).unwrap(), Resources::new(4096, 3));
	}
}

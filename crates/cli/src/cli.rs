use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use resourcer_admission::config::RetryConfig;
use resourcer_admission::resources::parse_size;


/// Environment variable overriding the config file path.
pub const CONFIG_ENV: &str = "RESOURCER_CONFIG";
/// Environment variable overriding the shared directory.
pub const DIR_ENV: &str = "RESOURCER_DIR";

#[derive(Parser, Debug)]
#[command(name = "resourcer")]
#[command(about = "Reserve host memory and cores before running a command")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Write the host capacity limits to the config file
	Init(InitArgs),
	/// Wait for capacity, then run a command while holding it
	Run(RunArgs),
	/// Show live reservations against the configured limits
	Status(StatusArgs),
}

/// Arguments of `resourcer init`.
#[derive(Args, Debug)]
pub struct InitArgs {
	/// Config file path
	#[arg(short, long, env = CONFIG_ENV, default_value_os_t = default_config_path())]
	pub config: PathBuf,

	/// Memory available (e.g. 64GiB); defaults to 90% of physical memory
	#[arg(short, long, value_parser = parse_size)]
	pub mem: Option<u64>,

	/// Cores available; defaults to the logical core count
	#[arg(short = 'n', long)]
	pub cores: Option<u32>,
}

/// Arguments of `resourcer run`.
#[derive(Args, Debug)]
pub struct RunArgs {
	/// Config file path (written with host defaults if missing)
	#[arg(short, long, env = CONFIG_ENV, default_value_os_t = default_config_path())]
	pub config: PathBuf,

	/// Shared reservation directory
	#[arg(short, long, env = DIR_ENV, default_value_os_t = default_dir())]
	pub dir: PathBuf,

	/// Memory requested (e.g. 512MiB)
	#[arg(short, long, default_value = "1GB", value_parser = parse_size)]
	pub mem: u64,

	/// Cores requested
	#[arg(short = 'n', long, default_value_t = 1)]
	pub cores: u32,

	/// Consecutive lock timeouts tolerated before giving up (0 retries forever)
	#[arg(long, default_value_t = RetryConfig::default().max_lock_failures.unwrap_or(0))]
	pub max_lock_failures: u32,

	/// Never reclaim records whose owner exists but cannot be signalled
	#[arg(long)]
	pub keep_inaccessible: bool,

	/// Command to run once admitted
	#[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
	pub command: Vec<OsString>,
}

/// Arguments of `resourcer status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
	/// Config file path
	#[arg(short, long, env = CONFIG_ENV, default_value_os_t = default_config_path())]
	pub config: PathBuf,

	/// Shared reservation directory
	#[arg(short, long, env = DIR_ENV, default_value_os_t = default_dir())]
	pub dir: PathBuf,

	/// Never reclaim records whose owner exists but cannot be signalled
	#[arg(long)]
	pub keep_inaccessible: bool,
}

/// `$TMPDIR/resourcer.conf`.
pub fn default_config_path() -> PathBuf {
	std::env::temp_dir().join("resourcer.conf")
}

/// `$TMPDIR/resourcer`.
pub fn default_dir() -> PathBuf {
	std::env::temp_dir().join("resourcer")
}

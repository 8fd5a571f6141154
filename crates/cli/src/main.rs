//! `resourcer`: run commands under a host-wide memory and core budget.

mod cli;
mod commands;
mod logging;
mod supervisor;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};

fn main() -> anyhow::Result<ExitCode> {
	let cli = Cli::parse();
	logging::init(cli.verbose);

	match cli.command {
		Command::Init(args) => commands::init::execute(&args),
		Command::Run(args) => commands::run::execute(&args),
		Command::Status(args) => commands::status::execute(&args),
	}
}

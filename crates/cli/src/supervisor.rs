//! Launches the admitted workload and waits for it.
//!
//! The workload inherits stdio. SIGINT reaches it through the terminal's
//! process group; SIGTERM sent to `resourcer` is forwarded. Either way the
//! supervisor keeps waiting so the caller can release the reservation.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::process::ExitStatus;

use anyhow::{Context, Result};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::process::Command;
use tokio::signal::unix::{SignalKind, signal};

/// Exit code when the program does not exist.
pub const NOT_FOUND: u8 = 127;
/// Exit code when the program exists but cannot be started.
pub const NOT_EXECUTABLE: u8 = 126;

/// Runs `command` to completion and returns the exit code to propagate.
pub fn run(command: &[OsString]) -> Result<u8> {
	let runtime = tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.context("failed to start async runtime")?;
	runtime.block_on(supervise(command))
}

async fn supervise(command: &[OsString]) -> Result<u8> {
	let (program, args) = command.split_first().context("no command given")?;

	// Both handlers must exist before the workload does.
	let mut interrupt = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
	let mut terminate = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

	let mut child = match Command::new(program).args(args).spawn() {
		Ok(child) => child,
		Err(err) => {
			tracing::error!(program = %program.to_string_lossy(), error = %err, "failed to launch command");
			return Ok(launch_failure_code(&err));
		}
	};
	let pid = child.id();
	tracing::debug!(?pid, program = %program.to_string_lossy(), "command started");

	let status = loop {
		tokio::select! {
			status = child.wait() => break status.context("failed to wait for command")?,
			_ = interrupt.recv() => {
				tracing::info!("interrupted; waiting for command to exit");
			}
			_ = terminate.recv() => {
				tracing::info!("terminated; forwarding to command");
				forward(pid, Signal::SIGTERM);
			}
		}
	};

	tracing::debug!(%status, "command finished");
	Ok(exit_code(status))
}

fn forward(pid: Option<u32>, sig: Signal) {
	let Some(raw) = pid.and_then(|p| i32::try_from(p).ok()) else {
		return;
	};
	if let Err(err) = kill(Pid::from_raw(raw), sig) {
		tracing::warn!(pid = raw, error = %err, "failed to forward signal");
	}
}

fn launch_failure_code(err: &std::io::Error) -> u8 {
	if err.kind() == ErrorKind::NotFound {
		NOT_FOUND
	} else {
		NOT_EXECUTABLE
	}
}

/// The workload's own code, or `128 + signal` if it was killed.
fn exit_code(status: ExitStatus) -> u8 {
	use std::os::unix::process::ExitStatusExt;

	if let Some(code) = status.code() {
		return u8::try_from(code).unwrap_or(1);
	}
	match status.signal() {
		Some(sig) => u8::try_from(128 + sig).unwrap_or(u8::MAX),
		None => 1,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cmd(parts: &[&str]) -> Vec<OsString> {
		parts.iter().map(OsString::from).collect()
	}

	#[test]
	fn propagates_exit_codes() {
		assert_eq!(run(&cmd(&["true"])).unwrap(), 0);
		assert_eq!(run(&cmd(&["sh", "-c", "exit 7"])).unwrap(), 7);
	}

	#[test]
	fn killed_workload_reports_signal() {
		assert_eq!(run(&cmd(&["sh", "-c", "kill -9 $$"])).unwrap(), 128 + 9);
	}

	#[test]
	fn missing_program_is_not_found() {
		assert_eq!(run(&cmd(&["resourcer-definitely-missing-binary"])).unwrap(), NOT_FOUND);
	}

	#[test]
	fn interrupt_is_ridden_out_until_workload_exits() {
		let script = "kill -INT $PPID; sleep 0.2; exit 3";
		assert_eq!(run(&cmd(&["sh", "-c", script])).unwrap(), 3);
	}

	#[test]
	fn empty_command_is_an_error() {
		assert!(run(&[]).is_err());
	}
}

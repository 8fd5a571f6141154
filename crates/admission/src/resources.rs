//! The two-counter resource vector shared by limits, requests and usage.

use std::fmt;

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};
use sysinfo::System;

use crate::error::{AdmissionError, ConfigError};

/// Memory and CPU-core amounts.
///
/// The same shape describes the host ceiling (capacity limits), a single
/// reservation request, and an aggregated usage total. Serialized as a flat
/// `{"memory": .., "cores": ..}` record; unknown fields are ignored on read so
/// newer writers stay readable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resources {
	/// Memory in bytes.
	pub memory: u64,
	/// Logical CPU cores.
	pub cores: u32,
}

impl Resources {
	/// Zero memory and zero cores.
	pub const ZERO: Self = Self { memory: 0, cores: 0 };

	/// Creates a resource vector.
	pub const fn new(memory: u64, cores: u32) -> Self {
		Self { memory, cores }
	}

	/// Component-wise sum, saturating at the numeric bounds.
	#[must_use]
	pub const fn saturating_add(self, other: Self) -> Self {
		Self {
			memory: self.memory.saturating_add(other.memory),
			cores: self.cores.saturating_add(other.cores),
		}
	}

	/// Component-wise difference, saturating at zero.
	#[must_use]
	pub const fn saturating_sub(self, other: Self) -> Self {
		Self {
			memory: self.memory.saturating_sub(other.memory),
			cores: self.cores.saturating_sub(other.cores),
		}
	}

	/// Whether `self` fits within `limits` on both dimensions.
	pub const fn fits_within(&self, limits: &Self) -> bool {
		self.memory <= limits.memory && self.cores <= limits.cores
	}

	/// Whether `request` can be added on top of `usage` without exceeding
	/// `self` on either dimension. Overflowing sums never fit.
	pub fn admits(&self, usage: &Self, request: &Self) -> bool {
		let memory = usage.memory.checked_add(request.memory);
		let cores = usage.cores.checked_add(request.cores);
		memory.is_some_and(|m| m <= self.memory) && cores.is_some_and(|c| c <= self.cores)
	}

	/// Rejects a request that alone exceeds these limits.
	///
	/// # Errors
	/// Returns [`AdmissionError::ExceedsCapacity`] when no amount of waiting
	/// could admit `request`.
	pub fn ensure_fits(&self, request: &Self) -> Result<(), AdmissionError> {
		if request.fits_within(self) {
			Ok(())
		} else {
			Err(AdmissionError::ExceedsCapacity {
				requested: *request,
				limits: *self,
			})
		}
	}
}

impl fmt::Display for Resources {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} memory, {} cores", ByteSize(self.memory), self.cores)
	}
}

/// Parses a human-readable size such as `512MiB`, `1GB` or `4096`.
///
/// Decimal suffixes (`KB`, `MB`, `GB`) are powers of 1000, binary suffixes
/// (`KiB`, `MiB`, `GiB`) powers of 1024.
///
/// # Errors
/// Returns [`ConfigError::InvalidSize`] for empty or malformed input.
pub fn parse_size(input: &str) -> Result<u64, ConfigError> {
	input
		.trim()
		.parse::<ByteSize>()
		.map(|size| size.as_u64())
		.map_err(|reason| ConfigError::InvalidSize {
			input: input.to_owned(),
			reason,
		})
}

/// Default ceiling derived from the host: 90% of physical memory and every
/// logical core available to this process.
pub fn host_limits() -> Resources {
	let mut system = System::new();
	system.refresh_memory();
	let total = system.total_memory();
	let memory = u64::try_from(u128::from(total) * 9 / 10).unwrap_or(total);
	let cores = std::thread::available_parallelism().map_or(1, |n| u32::try_from(n.get()).unwrap_or(u32::MAX));
	Resources { memory, cores }
}

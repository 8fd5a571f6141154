use std::collections::HashMap;

use parking_lot::Mutex;

use crate::liveness::{Liveness, ProcessProbe};

/// Probe with a scripted process table. Unknown pids are gone.
#[derive(Debug, Default)]
pub(crate) struct ScriptedProbe {
	table: Mutex<HashMap<u32, Liveness>>,
}

impl ScriptedProbe {
	pub(crate) fn alive(pids: impl IntoIterator<Item = u32>) -> Self {
		let probe = Self::default();
		for pid in pids {
			probe.set(pid, Liveness::Alive);
		}
		probe
	}

	pub(crate) fn set(&self, pid: u32, liveness: Liveness) {
		self.table.lock().insert(pid, liveness);
	}

	pub(crate) fn kill(&self, pid: u32) {
		self.table.lock().remove(&pid);
	}
}

impl ProcessProbe for ScriptedProbe {
	fn probe(&self, pid: u32) -> Liveness {
		self.table.lock().get(&pid).copied().unwrap_or(Liveness::Gone)
	}
}

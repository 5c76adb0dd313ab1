//! Running counters carried by lifecycle events.

use serde::{Deserialize, Serialize};

use crate::test::TestState;

/// Lifecycle status of a single browser's run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserStatus {
	#[default]
	Initializing,
	Running,
	Complete,
	Error,
}

impl BrowserStatus {
	/// Returns true once the browser has finished, successfully or not.
	pub fn is_finished(self) -> bool {
		matches!(self, BrowserStatus::Complete | BrowserStatus::Error)
	}
}

/// Per-browser counters, included in every browser-scoped event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserStats {
	pub status: BrowserStatus,
	pub passing: u64,
	pub pending: u64,
	pub failing: u64,
}

impl BrowserStats {
	/// Counts a finished test.
	pub fn record(&mut self, state: TestState) {
		match state {
			TestState::Passing => self.passing += 1,
			TestState::Pending => self.pending += 1,
			TestState::Failing => self.failing += 1,
		}
	}

	/// Total finished tests.
	pub fn total(&self) -> u64 {
		self.passing + self.pending + self.failing
	}
}

/// Session-wide counters for one run.
///
/// Every field only grows within a run; the session resets them at `run-start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
	pub browsers_started: u64,
	pub tests_started: u64,
	pub tests_ended: u64,
	pub passing: u64,
	pub pending: u64,
	pub failing: u64,
}

impl RunStats {
	/// Counts a finished test.
	pub fn record(&mut self, state: TestState) {
		self.tests_ended += 1;
		match state {
			TestState::Passing => self.passing += 1,
			TestState::Pending => self.pending += 1,
			TestState::Failing => self.failing += 1,
		}
	}
}

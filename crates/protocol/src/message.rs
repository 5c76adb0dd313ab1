//! NDJSON messages written by browser launchers.
//!
//! A launcher started by the command driver writes one JSON object per line
//! to stdout. Lines are tagged by `type` and mirror the session's
//! browser-scoped lifecycle events:
//!
//! 1. [`DriverMessage::BrowserStart`] once the page has loaded
//! 2. [`DriverMessage::SubSuiteStart`] / [`DriverMessage::SubSuiteEnd`] per test file
//! 3. [`DriverMessage::TestStart`] / [`DriverMessage::TestEnd`] per test
//! 4. [`DriverMessage::Done`] when every file has run

use serde::{Deserialize, Serialize};

use crate::browser::BrowserMetadata;
use crate::test::{SubSuite, TestInfo};

/// Severity of a launcher log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	Debug,
	#[default]
	Info,
	Warn,
	Error,
}

impl LogLevel {
	pub fn as_str(self) -> &'static str {
		match self {
			LogLevel::Debug => "debug",
			LogLevel::Info => "info",
			LogLevel::Warn => "warn",
			LogLevel::Error => "error",
		}
	}
}

/// One line of launcher output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DriverMessage {
	BrowserStart {
		#[serde(default)]
		metadata: BrowserMetadata,
	},
	SubSuiteStart {
		#[serde(flatten)]
		suite: SubSuite,
	},
	SubSuiteEnd {
		#[serde(flatten)]
		suite: SubSuite,
	},
	TestStart {
		#[serde(flatten)]
		test: TestInfo,
	},
	TestEnd {
		#[serde(flatten)]
		test: TestInfo,
	},
	Log {
		#[serde(default)]
		level: LogLevel,
		message: String,
	},
	/// Final line; `error` set when the browser itself failed.
	Done {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		error: Option<String>,
	},
}

impl DriverMessage {
	/// Parses a single NDJSON line.
	pub fn parse_line(line: &str) -> serde_json::Result<Self> {
		serde_json::from_str(line.trim())
	}
}

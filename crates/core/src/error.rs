//! Error types for test sessions.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by stages, browsers, and cleanup.
#[derive(Debug, Error)]
pub enum Error {
	/// Configuration is missing or invalid.
	#[error("{0}")]
	Config(String),

	/// Failed to read or parse a configuration file.
	#[error("failed to load config {path}: {source}")]
	ConfigFile {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	/// A plugin could not be found or failed to activate.
	#[error("plugin `{name}` failed: {message}")]
	Plugin { name: String, message: String },

	/// The browser launcher could not be started.
	#[error("failed to launch {browser}: {message}")]
	BrowserLaunch { browser: String, message: String },

	/// The browser stopped before finishing its tests.
	#[error("{browser} failed: {message}")]
	Browser { browser: String, message: String },

	/// The browser finished, but with failing tests.
	#[error("{failing} failed tests in {browser}")]
	TestsFailed { browser: String, failing: u64 },

	/// Timed out waiting on a stage-local operation.
	#[error("timeout after {ms}ms waiting for: {condition}")]
	Timeout { ms: u64, condition: String },

	/// A stage panicked instead of returning an error.
	#[error("stage `{stage}` panicked: {message}")]
	StagePanicked { stage: String, message: String },

	/// One or more resources could not be released during cleanup.
	#[error("cleanup failed for: {}", .failures.join(", "))]
	Cleanup { failures: Vec<String> },

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Shorthand for [`Error::Config`].
	pub fn config(message: impl Into<String>) -> Self {
		Error::Config(message.into())
	}

	/// Shorthand for [`Error::Plugin`].
	pub fn plugin(name: impl Into<String>, message: impl Into<String>) -> Self {
		Error::Plugin {
			name: name.into(),
			message: message.into(),
		}
	}

	/// Returns true if this error was raised while releasing resources.
	pub fn is_cleanup(&self) -> bool {
		matches!(self, Error::Cleanup { .. })
	}

	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout { .. })
	}
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic".to_string()
	}
}

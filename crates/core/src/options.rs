//! Session configuration: [`Options`] and [`OutputTarget`].

use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wct_protocol::BrowserDef;

use crate::error::{Error, Result};

/// File name looked up in the user's home directory and the project root.
pub const CONFIG_FILE: &str = "wct.conf.json";

/// Default idle timeout for a browser launcher, in milliseconds.
pub const DEFAULT_TEST_TIMEOUT_MS: u64 = 90_000;

/// Destination for the built-in console reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputTarget {
	Stdout,
	Stderr,
	File(PathBuf),
}

impl From<String> for OutputTarget {
	fn from(value: String) -> Self {
		match value.as_str() {
			"stdout" | "console" | "-" => OutputTarget::Stdout,
			"stderr" => OutputTarget::Stderr,
			_ => OutputTarget::File(PathBuf::from(value)),
		}
	}
}

impl From<OutputTarget> for String {
	fn from(target: OutputTarget) -> Self {
		target.to_string()
	}
}

impl FromStr for OutputTarget {
	type Err = Infallible;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(OutputTarget::from(s.to_string()))
	}
}

impl fmt::Display for OutputTarget {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OutputTarget::Stdout => f.write_str("stdout"),
			OutputTarget::Stderr => f.write_str("stderr"),
			OutputTarget::File(path) => write!(f, "{}", path.display()),
		}
	}
}

/// Configuration for one test run.
///
/// Known fields are typed; everything else a plugin or stage may want lands
/// in [`extra`](Self::extra) untouched. Fields equal to their default are
/// skipped on serialization so that [`merged_over`](Self::merged_over) only
/// lets explicitly set values win.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
	/// Attach the console reporter writing here.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub output: Option<OutputTarget>,
	/// Leave process-wide resources running after the run.
	#[serde(default, skip_serializing_if = "is_false")]
	pub skip_cleanup: bool,
	/// Report passing tests and debug/info logs too.
	#[serde(default, skip_serializing_if = "is_false")]
	pub verbose: bool,
	/// Keep browsers open after their tests finish; cleanup closes them.
	#[serde(default, skip_serializing_if = "is_false")]
	pub persistent: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub root: Option<PathBuf>,
	/// Test files, directories, or globs relative to `root`.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub suites: Vec<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub active_browsers: Vec<BrowserDef>,
	/// Plugin name to plugin config; `false` disables a plugin.
	#[serde(default, skip_serializing_if = "IndexMap::is_empty")]
	pub plugins: IndexMap<String, Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub test_timeout_ms: Option<u64>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
	!*value
}

impl Options {
	/// Builds options from a JSON object.
	pub fn from_json(value: Value) -> Result<Self> {
		Ok(serde_json::from_value(value)?)
	}

	/// Returns these options layered on top of `base`.
	///
	/// Objects merge key by key; any other value set here replaces the one in
	/// `base`.
	pub fn merged_over(&self, mut base: Value) -> Result<Self> {
		let overlay = serde_json::to_value(self)?;
		merge_json(&mut base, overlay);
		Self::from_json(base)
	}

	/// Effective root directory.
	pub fn root_dir(&self) -> PathBuf {
		self.root.clone().unwrap_or_else(|| PathBuf::from("."))
	}

	/// Idle timeout for browser launchers.
	pub fn test_timeout(&self) -> Duration {
		Duration::from_millis(self.test_timeout_ms.unwrap_or(DEFAULT_TEST_TIMEOUT_MS))
	}

	/// Enables a plugin, keeping any config it already had.
	pub fn enable_plugin(&mut self, name: &str, config: Value) {
		match self.plugins.get_mut(name) {
			Some(existing) if matches!(existing, Value::Bool(_) | Value::Null) => *existing = config,
			Some(existing) => merge_json(existing, config),
			None => {
				self.plugins.insert(name.to_string(), config);
			}
		}
	}

	/// Returns true if `name` is listed and not disabled.
	pub fn plugin_enabled(&self, name: &str) -> bool {
		self.plugins.get(name).is_some_and(|config| !matches!(config, Value::Bool(false)))
	}
}

/// Deep-merges `overlay` into `base`.
pub fn merge_json(base: &mut Value, overlay: Value) {
	match (base, overlay) {
		(Value::Object(base), Value::Object(overlay)) => {
			for (key, value) in overlay {
				match base.get_mut(&key) {
					Some(existing) => merge_json(existing, value),
					None => {
						base.insert(key, value);
					}
				}
			}
		}
		(base, overlay) => *base = overlay,
	}
}

/// Reads a JSON config file, returning `None` when it does not exist.
pub fn read_config_file(path: &Path) -> Result<Option<Value>> {
	let content = match std::fs::read_to_string(path) {
		Ok(content) => content,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(e) => return Err(e.into()),
	};
	let value = serde_json::from_str(&content).map_err(|source| Error::ConfigFile {
		path: path.to_path_buf(),
		source,
	})?;
	Ok(Some(value))
}

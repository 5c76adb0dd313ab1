//! Browser identity types.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A browser the run-tests stage should drive.
///
/// Plugins add these to `activeBrowsers` during the `configure` hook; users
/// may also list them directly in `wct.conf.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserDef {
	/// Display name, e.g. `chrome`.
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub platform: Option<String>,
	/// Launcher executable for the command driver.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub command: Option<PathBuf>,
	/// Arguments passed to the launcher before the test files.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub args: Vec<String>,
}

impl BrowserDef {
	/// Creates a browser definition with only a name.
	pub fn named(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Default::default()
		}
	}

	/// Sets the launcher executable.
	pub fn with_command(mut self, command: impl Into<PathBuf>) -> Self {
		self.command = Some(command.into());
		self
	}

	/// Appends launcher arguments.
	pub fn with_args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}
}

impl fmt::Display for BrowserDef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name)?;
		if let Some(version) = &self.version {
			write!(f, " {version}")?;
		}
		if let Some(platform) = &self.platform {
			write!(f, " ({platform})")?;
		}
		Ok(())
	}
}

/// Details reported by a browser once it has begun running tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserMetadata {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_agent: Option<String>,
	/// Page URL the tests were loaded from.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

//! Runs tests in browsers installed on this machine.
//!
//! Each browser name `NAME` in the plugin config maps to a launcher
//! executable `wct-NAME` on `PATH`, which the command driver starts once per
//! run. The launcher owns the actual browser and speaks the NDJSON driver
//! protocol on stdout.

use std::ffi::OsString;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use wct::hooks::CONFIGURE;
use wct::{BrowserDef, Error, Plugin, Result, Session};

pub const LOCAL_PLUGIN: &str = "local";

/// Prefix of launcher executables.
const LAUNCHER_PREFIX: &str = "wct-";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LocalConfig {
	browsers: Vec<String>,
	/// Extra arguments passed to every launcher.
	launcher_args: Vec<String>,
}

/// The `local` plugin.
#[derive(Debug, Clone, Default)]
pub struct LocalPlugin {
	search_path: Option<OsString>,
}

impl LocalPlugin {
	/// Resolves launchers on `PATH`.
	pub fn new() -> Self {
		Self::default()
	}

	/// Resolves launchers in `path` instead of `PATH`.
	pub fn with_search_path(path: impl Into<OsString>) -> Self {
		Self {
			search_path: Some(path.into()),
		}
	}

	fn resolve(&self, name: &str) -> Result<PathBuf> {
		let binary = format!("{LAUNCHER_PREFIX}{name}");
		let search_path = self.search_path.clone().or_else(|| std::env::var_os("PATH"));
		let cwd = std::env::current_dir()?;
		which::which_in(&binary, search_path, cwd)
			.map_err(|e| Error::plugin(LOCAL_PLUGIN, format!("no launcher `{binary}` for {name}: {e}")))
	}

	fn browsers(&self, config: &LocalConfig) -> Result<Vec<BrowserDef>> {
		config
			.browsers
			.iter()
			.map(|name| {
				let launcher = self.resolve(name)?;
				debug!(target = "wct", browser = %name, launcher = %launcher.display(), "resolved local browser");
				Ok(BrowserDef::named(name.as_str())
					.with_command(launcher)
					.with_args(config.launcher_args.iter().cloned()))
			})
			.collect()
	}
}

#[async_trait]
impl Plugin for LocalPlugin {
	fn name(&self) -> &str {
		LOCAL_PLUGIN
	}

	async fn activate(&self, session: &Session, config: &Value) -> Result<()> {
		let config: LocalConfig = serde_json::from_value(config.clone())
			.map_err(|e| Error::plugin(LOCAL_PLUGIN, format!("invalid config: {e}")))?;
		if config.browsers.is_empty() {
			return Err(Error::plugin(LOCAL_PLUGIN, "no browsers requested"));
		}

		let plugin = self.clone();
		session
			.hook(CONFIGURE, move |session| {
				let added = plugin.browsers(&config).map(|browsers| {
					let mut options = session.options_mut();
					for browser in browsers {
						if !options.active_browsers.iter().any(|active| active.name == browser.name) {
							options.active_browsers.push(browser);
						}
					}
				});
				Box::pin(async move { added })
			})
			.detach();
		Ok(())
	}
}

#[cfg(all(test, unix))]
mod tests {
	use std::os::unix::fs::PermissionsExt;
	use std::path::Path;

	use serde_json::json;

	use super::*;

	fn install_launcher(dir: &Path, name: &str) -> PathBuf {
		let path = dir.join(format!("{LAUNCHER_PREFIX}{name}"));
		std::fs::write(&path, "#!/bin/sh\n").unwrap();
		std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
		path
	}

	#[tokio::test]
	async fn configure_hook_adds_resolved_browsers() {
		let bin = tempfile::tempdir().unwrap();
		let chrome = install_launcher(bin.path(), "chrome");
		let plugin = LocalPlugin::with_search_path(bin.path());
		let session = Session::default();

		plugin
			.activate(&session, &json!({ "browsers": ["chrome", "chrome"], "launcherArgs": ["--headless"] }))
			.await
			.unwrap();
		assert!(session.options().active_browsers.is_empty());
		session.emit_hook(CONFIGURE).await.unwrap();

		let browsers = session.options().active_browsers.clone();
		assert_eq!(browsers.len(), 1);
		assert_eq!(browsers[0].command.as_deref(), Some(chrome.as_path()));
		assert_eq!(browsers[0].args, vec!["--headless"]);
	}

	#[tokio::test]
	async fn missing_launcher_fails_configure() {
		let bin = tempfile::tempdir().unwrap();
		let plugin = LocalPlugin::with_search_path(bin.path());
		let session = Session::default();

		plugin.activate(&session, &json!({ "browsers": ["safari"] })).await.unwrap();
		let err = session.emit_hook(CONFIGURE).await.unwrap_err();
		assert!(err.to_string().starts_with("plugin `local` failed: no launcher `wct-safari`"), "{err}");
	}

	#[tokio::test]
	async fn empty_browser_list_is_rejected() {
		let session = Session::default();
		let err = LocalPlugin::new().activate(&session, &json!({})).await.unwrap_err();
		assert_eq!(err.to_string(), "plugin `local` failed: no browsers requested");
	}
}

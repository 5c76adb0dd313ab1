use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};
use wct_protocol::LogLevel;

use crate::error::Result;
use crate::options::{CONFIG_FILE, merge_json, read_config_file};
use crate::pipeline::Stage;
use crate::session::Session;

/// Layers the user and project `wct.conf.json` beneath the explicit options.
///
/// Precedence, lowest first: `~/wct.conf.json`, `<root>/wct.conf.json`, the
/// options the session was created with.
#[derive(Debug, Clone)]
pub struct SetupOverrides {
	user_config: Option<PathBuf>,
}

impl SetupOverrides {
	/// Uses `user_config` instead of the file in the home directory.
	pub fn new(user_config: Option<PathBuf>) -> Self {
		Self { user_config }
	}
}

impl Default for SetupOverrides {
	fn default() -> Self {
		Self::new(dirs::home_dir().map(|home| home.join(CONFIG_FILE)))
	}
}

#[async_trait]
impl Stage for SetupOverrides {
	fn name(&self) -> &str {
		"setup-overrides"
	}

	async fn run(&self, session: &Session) -> Result<()> {
		let project_config = session.options().root_dir().join(CONFIG_FILE);

		let mut base = Value::Object(Map::new());
		let mut loaded = Vec::new();
		for path in self.user_config.iter().cloned().chain([project_config]) {
			if let Some(value) = read_config_file(&path)? {
				merge_json(&mut base, value);
				loaded.push(path);
			}
		}
		if loaded.is_empty() {
			return Ok(());
		}

		let merged = session.options().merged_over(base)?;
		*session.options_mut() = merged;
		for path in loaded {
			session.log(LogLevel::Debug, format!("loaded overrides from {}", path.display()));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::options::Options;

	#[tokio::test]
	async fn project_config_is_layered_under_explicit_options() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(
			dir.path().join(CONFIG_FILE),
			r#"{ "suites": ["test/unit"], "skipCleanup": true, "verbose": false, "custom": 1 }"#,
		)
		.unwrap();

		let session = Session::new(Options {
			root: Some(dir.path().to_path_buf()),
			verbose: true,
			..Default::default()
		});
		SetupOverrides::new(None).run(&session).await.unwrap();

		let options = session.options();
		assert_eq!(options.suites, vec!["test/unit"]);
		assert!(options.skip_cleanup);
		assert!(options.verbose);
		assert_eq!(options.extra["custom"], 1);
		assert_eq!(options.root.as_deref(), Some(dir.path()));
	}

	#[tokio::test]
	async fn project_config_wins_over_user_config() {
		let home = tempfile::tempdir().unwrap();
		let project = tempfile::tempdir().unwrap();
		let user_file = home.path().join(CONFIG_FILE);
		std::fs::write(&user_file, r#"{ "testTimeoutMs": 1000, "suites": ["home"] }"#).unwrap();
		std::fs::write(project.path().join(CONFIG_FILE), r#"{ "suites": ["project"] }"#).unwrap();

		let session = Session::new(Options {
			root: Some(project.path().to_path_buf()),
			..Default::default()
		});
		SetupOverrides::new(Some(user_file)).run(&session).await.unwrap();

		let options = session.options();
		assert_eq!(options.suites, vec!["project"]);
		assert_eq!(options.test_timeout_ms, Some(1000));
	}

	#[tokio::test]
	async fn missing_files_leave_options_untouched() {
		let dir = tempfile::tempdir().unwrap();
		let original = Options {
			root: Some(dir.path().to_path_buf()),
			suites: vec!["x".into()],
			..Default::default()
		};
		let session = Session::new(original.clone());
		SetupOverrides::new(Some(dir.path().join("nope.json"))).run(&session).await.unwrap();
		assert_eq!(*session.options(), original);
	}

	#[tokio::test]
	async fn malformed_config_fails() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join(CONFIG_FILE), "{").unwrap();
		let session = Session::new(Options {
			root: Some(dir.path().to_path_buf()),
			..Default::default()
		});
		assert!(SetupOverrides::new(None).run(&session).await.is_err());
	}
}

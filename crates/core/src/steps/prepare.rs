use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;
use wct_protocol::LogLevel;

use crate::error::{Error, Result};
use crate::hooks::PREPARE;
use crate::pipeline::Stage;
use crate::session::Session;

/// File extensions collected from suite directories.
const SUITE_EXTENSIONS: [&str; 2] = ["html", "js"];

/// Runs the `prepare` hook and resolves suites into test files.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prepare;

#[async_trait]
impl Stage for Prepare {
	fn name(&self) -> &str {
		"prepare"
	}

	async fn run(&self, session: &Session) -> Result<()> {
		session.emit_hook(PREPARE).await?;

		let (root, suites) = {
			let options = session.options();
			(options.root_dir(), options.suites.clone())
		};
		let files = expand_suites(&root, &suites)?;
		if files.is_empty() {
			return Err(Error::config(format!(
				"No test suites were found matching your configuration ({})",
				suites.join(", ")
			)));
		}

		session.log(LogLevel::Debug, format!("found {} test files", files.len()));
		session.set_test_files(files);
		Ok(())
	}
}

/// Expands suites relative to `root` into a sorted, de-duplicated file list.
///
/// A directory contributes every `.html` and `.js` file below it; an existing
/// file contributes itself; anything else is treated as a glob.
pub fn expand_suites(root: &Path, suites: &[String]) -> Result<Vec<PathBuf>> {
	let mut files = BTreeSet::new();
	for suite in suites {
		let path = root.join(suite);
		if path.is_dir() {
			for ext in SUITE_EXTENSIONS {
				collect_glob(&path.join("**").join(format!("*.{ext}")), &mut files)?;
			}
		} else if path.is_file() {
			files.insert(path);
		} else {
			collect_glob(&path, &mut files)?;
		}
	}
	Ok(files.into_iter().collect())
}

fn collect_glob(pattern: &Path, files: &mut BTreeSet<PathBuf>) -> Result<()> {
	let pattern = pattern.to_string_lossy();
	let entries = glob::glob(&pattern).map_err(|e| Error::config(format!("invalid suite pattern {pattern}: {e}")))?;
	for entry in entries {
		match entry {
			Ok(path) if path.is_file() => {
				files.insert(path);
			}
			Ok(_) => {}
			Err(e) => warn!(target = "wct", error = %e, "unreadable path while expanding suites"),
		}
	}
	Ok(())
}

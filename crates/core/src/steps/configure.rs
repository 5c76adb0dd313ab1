use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};
use crate::hooks::CONFIGURE;
use crate::pipeline::Stage;
use crate::session::Session;

/// Suite used when none is configured.
pub const DEFAULT_SUITE: &str = "test";

/// Settles defaults, runs the `configure` hook, and validates the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct Configure;

#[async_trait]
impl Stage for Configure {
	fn name(&self) -> &str {
		"configure"
	}

	async fn run(&self, session: &Session) -> Result<()> {
		{
			let mut options = session.options_mut();
			let root = match options.root.clone() {
				Some(root) => root,
				None => std::env::current_dir()?,
			};
			if !root.is_dir() {
				return Err(Error::config(format!("root {} is not a directory", root.display())));
			}
			options.root = Some(root);
			if options.suites.is_empty() {
				options.suites.push(DEFAULT_SUITE.to_string());
			}
		}

		session.emit_hook(CONFIGURE).await?;

		let options = session.options();
		if options.active_browsers.is_empty() {
			return Err(Error::config("No browsers configured to run"));
		}
		debug!(
			target = "wct",
			browsers = options.active_browsers.len(),
			suites = ?options.suites,
			"configuration finalized"
		);
		Ok(())
	}
}

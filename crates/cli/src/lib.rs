//! The `wct` command-line runner.

pub mod cli;
pub mod config;
pub mod logging;
pub mod plugins;

use std::sync::Arc;

use wct::Runner;

use crate::cli::Cli;

/// Runs the test session described by `cli`.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
	let options = config::build_options(&cli)?;
	let runner = Runner::standard(Arc::new(plugins::builtin()));
	runner.run(options).await?;
	Ok(())
}

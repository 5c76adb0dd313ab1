//! Turns command-line flags into session [`Options`].

use anyhow::{Context, Result};
use serde_json::json;
use wct::options::read_config_file;
use wct::{Options, OutputTarget};

use crate::cli::Cli;
use crate::plugins::LOCAL_PLUGIN;

/// Builds the explicit options for a run.
///
/// `--config` is loaded first; flags that were given override it. The
/// user and project `wct.conf.json` files are layered underneath later, by
/// the setup-overrides stage.
pub fn build_options(cli: &Cli) -> Result<Options> {
	let mut options = match &cli.config {
		Some(path) => {
			let value = read_config_file(path)?.with_context(|| format!("config file {} not found", path.display()))?;
			Options::from_json(value).with_context(|| format!("invalid options in {}", path.display()))?
		}
		None => Options::default(),
	};

	if let Some(root) = &cli.root {
		options.root = Some(root.clone());
	}
	if !cli.suites.is_empty() {
		options.suites = cli.suites.clone();
	}
	if !cli.browsers.is_empty() {
		options.enable_plugin(LOCAL_PLUGIN, json!({ "browsers": cli.browsers }));
	}

	options.output = if cli.no_output {
		None
	} else {
		cli.output.clone().or(options.output).or(Some(OutputTarget::Stdout))
	};
	options.verbose |= cli.verbose > 0;
	options.skip_cleanup |= cli.skip_cleanup;
	options.persistent |= cli.persistent;
	if cli.timeout.is_some() {
		options.test_timeout_ms = cli.timeout;
	}
	Ok(options)
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use clap::Parser;

	use super::*;

	fn parse(args: &[&str]) -> Options {
		let cli = Cli::parse_from(std::iter::once("wct").chain(args.iter().copied()));
		build_options(&cli).unwrap()
	}

	#[test]
	fn defaults_to_stdout_reporter() {
		let options = parse(&[]);
		assert_eq!(options.output, Some(OutputTarget::Stdout));
		assert!(options.suites.is_empty());
		assert!(options.plugins.is_empty());
	}

	#[test]
	fn flags_fill_options() {
		let options = parse(&[
			"-v",
			"--root",
			"web",
			"-b",
			"chrome",
			"--no-output",
			"--skip-cleanup",
			"--persistent",
			"--timeout",
			"5000",
			"test/unit",
		]);
		assert!(options.verbose);
		assert!(options.skip_cleanup);
		assert!(options.persistent);
		assert_eq!(options.output, None);
		assert_eq!(options.root, Some(PathBuf::from("web")));
		assert_eq!(options.suites, vec!["test/unit"]);
		assert_eq!(options.test_timeout_ms, Some(5000));
		assert_eq!(options.plugins[LOCAL_PLUGIN], json!({ "browsers": ["chrome"] }));
	}

	#[test]
	fn flags_override_config_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("ci.json");
		std::fs::write(
			&path,
			r#"{ "suites": ["specs"], "output": "stderr", "plugins": { "local": { "browsers": ["firefox"] } } }"#,
		)
		.unwrap();
		let config = path.to_string_lossy().into_owned();

		let options = parse(&["--config", &config]);
		assert_eq!(options.suites, vec!["specs"]);
		assert_eq!(options.output, Some(OutputTarget::Stderr));

		let options = parse(&["--config", &config, "-b", "chrome", "test"]);
		assert_eq!(options.suites, vec!["test"]);
		assert_eq!(options.plugins[LOCAL_PLUGIN]["browsers"], json!(["chrome"]));
	}

	#[test]
	fn missing_config_file_is_an_error() {
		let cli = Cli::parse_from(["wct", "--config", "/nonexistent/wct.json"]);
		let err = build_options(&cli).unwrap_err();
		assert!(err.to_string().contains("not found"), "{err}");
	}
}

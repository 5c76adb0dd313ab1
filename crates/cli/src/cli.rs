use std::path::PathBuf;

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use wct::OutputTarget;

/// Help colors in cargo's palette.
fn cli_styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Green.on_default().bold())
		.usage(AnsiColor::Green.on_default().bold())
		.literal(AnsiColor::Cyan.on_default())
		.placeholder(AnsiColor::Cyan.on_default())
		.valid(AnsiColor::Cyan.on_default())
}

#[derive(Parser, Debug)]
#[command(name = "wct")]
#[command(about = "Run browser component tests")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Test files, directories, or globs relative to the root (default: test)
	#[arg(value_name = "SUITES")]
	pub suites: Vec<String>,

	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Load options from this JSON file before applying flags
	#[arg(long, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Directory test suites are resolved against (default: current directory)
	#[arg(long, value_name = "DIR")]
	pub root: Option<PathBuf>,

	/// Run in this local browser (repeatable); enables the `local` plugin
	#[arg(short, long = "browser", value_name = "NAME", action = clap::ArgAction::Append)]
	pub browsers: Vec<String>,

	/// Where the reporter writes: stdout, stderr, or a file path
	#[arg(long, value_name = "TARGET", conflicts_with = "no_output")]
	pub output: Option<OutputTarget>,

	/// Do not attach the console reporter
	#[arg(long)]
	pub no_output: bool,

	/// Leave launched browsers and servers running after the run
	#[arg(long)]
	pub skip_cleanup: bool,

	/// Keep browsers open after their tests finish
	#[arg(long)]
	pub persistent: bool,

	/// Fail a browser that prints nothing for this long
	#[arg(long, value_name = "MS")]
	pub timeout: Option<u64>,
}

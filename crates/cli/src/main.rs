use clap::Parser;
use colored::Colorize;
use wct_cli::cli::Cli;
use wct_cli::logging;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = wct_cli::run(cli).await {
		eprintln!("{} {err:#}", "error:".red().bold());
		std::process::exit(1);
	}
}

//! Plain line-oriented console reporter.

use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use colored::{Color, Colorize};
use parking_lot::Mutex;
use wct_protocol::{BrowserDef, BrowserStats, LogLevel, RunStats, TestInfo, TestState};

use crate::error::{Error, Result};
use crate::events::{Event, EventName, ListenerResult};
use crate::handlers::Subscription;
use crate::options::OutputTarget;
use crate::session::Session;

type Writer = Box<dyn Write + Send>;

struct ReporterState {
	out: Mutex<Writer>,
	color: bool,
	verbose: bool,
}

impl ReporterState {
	fn paint(&self, text: &str, color: Color) -> String {
		if self.color {
			text.color(color).to_string()
		} else {
			text.to_string()
		}
	}

	fn line(&self, line: &str) -> ListenerResult {
		let mut out = self.out.lock();
		writeln!(out, "{line}")?;
		out.flush()?;
		Ok(())
	}

	fn render(&self, event: &Event<'_>) -> ListenerResult {
		match *event {
			Event::RunStart { options } => {
				if self.verbose {
					let suites = options.suites.join(", ");
					self.line(&format!("Starting test run ({suites})"))?;
				}
			}
			Event::BrowserInit { browser, .. } => {
				if self.verbose {
					self.line(&format!("{browser}: initializing"))?;
				}
			}
			Event::BrowserStart { browser, metadata, .. } => {
				if self.verbose {
					match &metadata.user_agent {
						Some(agent) => self.line(&format!("{browser}: started ({agent})"))?,
						None => self.line(&format!("{browser}: started"))?,
					}
				}
			}
			Event::TestEnd { browser, test, .. } => self.test_end(browser, test)?,
			Event::BrowserEnd { browser, error, stats } => self.browser_end(browser, error, stats)?,
			Event::RunEnd { error, stats } => self.run_end(error, stats)?,
			Event::Log { level, message } => self.log(level, message)?,
			Event::SubSuiteStart { .. } | Event::SubSuiteEnd { .. } | Event::TestStart { .. } => {}
		}
		Ok(())
	}

	fn test_end(&self, browser: &BrowserDef, test: &TestInfo) -> ListenerResult {
		let title = test.title();
		match test.outcome() {
			TestState::Failing => {
				self.line(&format!("{} {browser} » {title}", self.paint("✖", Color::Red)))?;
				if let Some(error) = &test.error {
					for line in error.lines() {
						self.line(&format!("    {}", self.paint(line, Color::Red)))?;
					}
				}
			}
			TestState::Pending if self.verbose => {
				self.line(&format!("{} {browser} » {title}", self.paint("-", Color::Yellow)))?;
			}
			TestState::Passing if self.verbose => {
				self.line(&format!("{} {browser} » {title}", self.paint("✓", Color::Green)))?;
			}
			_ => {}
		}
		Ok(())
	}

	fn browser_end(&self, browser: &BrowserDef, error: Option<&Error>, stats: &BrowserStats) -> ListenerResult {
		self.line(&format!(
			"{browser}: {} passing, {} pending, {} failing",
			stats.passing, stats.pending, stats.failing
		))?;
		if let Some(error) = error {
			self.line(&format!("{browser}: {}", self.paint(&error.to_string(), Color::Red)))?;
		}
		Ok(())
	}

	fn run_end(&self, error: Option<&Error>, stats: &RunStats) -> ListenerResult {
		self.line(&format!(
			"{} tests: {} passing, {} pending, {} failing",
			stats.tests_ended, stats.passing, stats.pending, stats.failing
		))?;
		match error {
			Some(error) => self.line(&self.paint(&format!("Test run ended with errors: {error}"), Color::Red)),
			None => self.line(&self.paint("Test run ended successfully", Color::Green)),
		}
	}

	fn log(&self, level: LogLevel, message: &str) -> ListenerResult {
		let tag = match level {
			LogLevel::Error => self.paint("error", Color::Red),
			LogLevel::Warn => self.paint("warn", Color::Yellow),
			LogLevel::Info | LogLevel::Debug if self.verbose => level.as_str().to_string(),
			LogLevel::Info | LogLevel::Debug => return Ok(()),
		};
		self.line(&format!("[{tag}] {message}"))
	}
}

/// Writes run progress to stdout, stderr, or a file.
///
/// Failing tests, browser summaries, warnings, and the run result are always
/// printed; passing tests and debug/info logs only when `verbose` is set.
/// Dropping the reporter unsubscribes it.
pub struct CliReporter {
	_subscriptions: Vec<Subscription>,
}

impl CliReporter {
	/// Subscribes a reporter writing to `target`.
	///
	/// Colors are used only for terminal stdout/stderr. Fails if a file
	/// target cannot be created.
	pub fn attach(session: &Session, target: &OutputTarget) -> Result<Self> {
		let (out, color): (Writer, bool) = match target {
			OutputTarget::Stdout => (Box::new(io::stdout()), io::stdout().is_terminal()),
			OutputTarget::Stderr => (Box::new(io::stderr()), io::stderr().is_terminal()),
			OutputTarget::File(path) => {
				if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
					std::fs::create_dir_all(parent)?;
				}
				(Box::new(File::create(path)?), false)
			}
		};
		let verbose = session.options().verbose;
		Ok(Self::with_writer(session, out, color, verbose))
	}

	/// Subscribes a reporter writing to an arbitrary sink.
	pub fn with_writer(session: &Session, out: Box<dyn Write + Send>, color: bool, verbose: bool) -> Self {
		let state = Arc::new(ReporterState {
			out: Mutex::new(out),
			color,
			verbose,
		});
		let subscriptions = EventName::LIFECYCLE
			.into_iter()
			.chain(
				[LogLevel::Debug, LogLevel::Info, LogLevel::Warn, LogLevel::Error]
					.into_iter()
					.map(EventName::Log),
			)
			.map(|name| {
				let state = Arc::clone(&state);
				session.on(name, move |event| state.render(event))
			})
			.collect();
		Self {
			_subscriptions: subscriptions,
		}
	}
}

impl std::fmt::Debug for CliReporter {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CliReporter")
			.field("subscriptions", &self._subscriptions.len())
			.finish()
	}
}

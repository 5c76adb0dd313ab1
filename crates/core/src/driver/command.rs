//! Driver that runs each browser through an external launcher process.
//!
//! The launcher is `browser.command`, started with `browser.args` followed by
//! the test files, `WCT_BROWSER` and `WCT_ROOT` in its environment, and the
//! session root as its working directory. It reports progress as NDJSON
//! [`DriverMessage`] lines on stdout; anything else it prints is forwarded
//! as `log:debug`.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;
use wct_protocol::{DriverMessage, LogLevel};

use super::{BrowserDriver, BrowserRun};
use crate::cleanup::CleanupRegistry;
use crate::error::{Error, Result};

/// Grace period for a launcher to exit after its `done` line.
const EXIT_GRACE: Duration = Duration::from_secs(5);

/// Spawns one launcher process per browser.
///
/// Every child is registered with the [`CleanupRegistry`] while it runs. On
/// normal completion the child is reaped and unregistered; with
/// `persistent` set it is left running for cleanup to close.
#[derive(Debug, Clone)]
pub struct CommandDriver {
	cleanup: Arc<CleanupRegistry>,
}

impl CommandDriver {
	pub fn new(cleanup: Arc<CleanupRegistry>) -> Self {
		Self { cleanup }
	}
}

impl Default for CommandDriver {
	fn default() -> Self {
		Self::new(CleanupRegistry::global())
	}
}

#[async_trait]
impl BrowserDriver for CommandDriver {
	async fn run(&self, run: &BrowserRun<'_>, files: &[PathBuf]) -> Result<()> {
		let browser = run.browser();
		let (root, idle_timeout, persistent) = {
			let options = run.session().options();
			(options.root_dir(), options.test_timeout(), options.persistent)
		};
		let launch_error = |message: String| Error::BrowserLaunch {
			browser: browser.to_string(),
			message,
		};

		let program = browser
			.command
			.as_ref()
			.ok_or_else(|| launch_error("no launcher command configured".to_string()))?;

		debug!(target = "wct", browser = %browser, program = %program.display(), files = files.len(), "spawning launcher");
		let mut child = Command::new(program)
			.args(&browser.args)
			.args(files)
			.env("WCT_BROWSER", &browser.name)
			.env("WCT_ROOT", &root)
			.current_dir(&root)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| launch_error(e.to_string()))?;
		let stdout = child
			.stdout
			.take()
			.ok_or_else(|| launch_error("launcher stdout unavailable".to_string()))?;

		let slot = Arc::new(Mutex::new(Some(child)));
		let registration = {
			let slot = Arc::clone(&slot);
			self.cleanup.register(format!("browser {browser}"), move || async move {
				let child = slot.lock().take();
				if let Some(mut child) = child {
					child.kill().await?;
				}
				Ok(())
			})
		};

		let outcome = read_messages(run, stdout, idle_timeout).await;

		if persistent && outcome.is_ok() {
			debug!(target = "wct", browser = %browser, "leaving persistent browser for cleanup");
			return finished(run, outcome, None);
		}

		let child = slot.lock().take();
		self.cleanup.unregister(registration);
		let reaped = match child {
			Some(child) => Some(reap(child, outcome.is_err()).await),
			None => None,
		};
		if let error @ Some(_) = outcome? {
			return finished(run, Ok(error), None);
		}
		finished(run, Ok(None), reaped.transpose()?)
	}
}

/// Reads launcher output until `done` or EOF, returning the `done` error.
///
/// Lines are decoded lossily so stray binary output from the browser cannot
/// abort the run.
async fn read_messages(run: &BrowserRun<'_>, stdout: ChildStdout, idle_timeout: Duration) -> Result<Option<String>> {
	let mut reader = BufReader::new(stdout);
	let mut buf = Vec::new();
	loop {
		buf.clear();
		let read = match tokio::time::timeout(idle_timeout, reader.read_until(b'\n', &mut buf)).await {
			Ok(read) => read.map_err(|e| Error::Browser {
				browser: run.browser().to_string(),
				message: format!("reading launcher output: {e}"),
			})?,
			Err(_) => {
				return Err(Error::Timeout {
					ms: u64::try_from(idle_timeout.as_millis()).unwrap_or(u64::MAX),
					condition: format!("output from {}", run.browser()),
				});
			}
		};
		if read == 0 {
			return Ok(None);
		}
		let line = String::from_utf8_lossy(&buf);
		let line = line.trim_end();
		if line.trim().is_empty() {
			continue;
		}

		match DriverMessage::parse_line(line) {
			Ok(DriverMessage::Done { error }) => return Ok(error),
			Ok(message) => run.apply(&message),
			Err(_) => run.log(LogLevel::Debug, line),
		}
	}
}

/// Waits for the launcher to exit, killing it first if `kill` is set or it
/// outstays the grace period.
async fn reap(mut child: Child, kill: bool) -> Result<ExitStatus> {
	if kill {
		child.start_kill()?;
	}
	match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
		Ok(status) => Ok(status?),
		Err(_) => {
			child.kill().await?;
			Ok(child.wait().await?)
		}
	}
}

fn finished(run: &BrowserRun<'_>, outcome: Result<Option<String>>, status: Option<ExitStatus>) -> Result<()> {
	let browser = run.browser().to_string();
	if let Some(message) = outcome? {
		return Err(Error::Browser { browser, message });
	}
	match status {
		Some(status) if !status.success() => Err(Error::Browser {
			browser,
			message: format!("launcher exited with {status}"),
		}),
		_ => Ok(()),
	}
}

//! Session entry point.
//!
//! [`Runner::run`] wraps the pipeline in the single-run cleanup guarantee:
//! whatever the pipeline does, the cleanup coordinator is closed exactly once
//! (unless `skipCleanup` is set) before `run-end` is emitted and the outcome
//! returned.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::cleanup::{Cleanup, CleanupRegistry};
use crate::driver::CommandDriver;
use crate::error::Result;
use crate::events::Event;
use crate::options::Options;
use crate::pipeline::Pipeline;
use crate::plugin::{PluginLoader, PluginRegistry};
use crate::reporter::CliReporter;
use crate::session::Session;
use crate::steps::standard_pipeline;

/// What a run starts from: fresh options, or a session the caller built
/// and may reuse across runs.
#[derive(Debug)]
pub enum SessionInput {
	Config(Options),
	Session(Arc<Session>),
}

impl SessionInput {
	pub fn into_session(self) -> Arc<Session> {
		match self {
			SessionInput::Config(options) => Arc::new(Session::new(options)),
			SessionInput::Session(session) => session,
		}
	}
}

impl From<Options> for SessionInput {
	fn from(options: Options) -> Self {
		SessionInput::Config(options)
	}
}

impl From<Arc<Session>> for SessionInput {
	fn from(session: Arc<Session>) -> Self {
		SessionInput::Session(session)
	}
}

impl From<Session> for SessionInput {
	fn from(session: Session) -> Self {
		SessionInput::Session(Arc::new(session))
	}
}

/// Runs a pipeline against a session and owns its teardown.
pub struct Runner {
	pipeline: Pipeline,
	cleanup: Arc<dyn Cleanup>,
}

impl Runner {
	pub fn new(pipeline: Pipeline, cleanup: Arc<dyn Cleanup>) -> Self {
		Self { pipeline, cleanup }
	}

	/// The standard five stages, the command driver, and the process-wide
	/// cleanup registry.
	pub fn standard(plugins: Arc<dyn PluginLoader>) -> Self {
		let registry = CleanupRegistry::global();
		let driver = Arc::new(CommandDriver::new(Arc::clone(&registry)));
		Self::new(standard_pipeline(plugins, driver), registry)
	}

	pub fn pipeline(&self) -> &Pipeline {
		&self.pipeline
	}

	/// Runs one session to completion.
	///
	/// Emits `run-start` first and `run-end` last. The pipeline error wins
	/// over a cleanup error; `run-end` carries the same error that is
	/// returned. Dropping the returned future mid-run still releases
	/// resources on the current tokio runtime.
	pub async fn run(&self, input: impl Into<SessionInput>) -> Result<()> {
		let session = input.into().into_session();

		let output = session.options().output.clone();
		let _reporter = match output {
			Some(target) => Some(CliReporter::attach(&session, &target)?),
			None => None,
		};

		session.reset_stats();
		let options = session.options().clone();
		info!(target = "wct", stages = self.pipeline.len(), "test run starting");
		session.emit(&Event::RunStart { options: &options });

		let mut teardown = TeardownGuard::new(Arc::clone(&session), Arc::clone(&self.cleanup));
		let outcome = self.pipeline.run(&session).await;
		let cleanup = teardown.settle().await;

		let result = match (outcome, cleanup) {
			(Err(e), Err(cleanup_err)) => {
				warn!(target = "wct", error = %cleanup_err, "cleanup failed after run failure");
				Err(e)
			}
			(Err(e), Ok(())) => Err(e),
			(Ok(()), cleanup) => cleanup,
		};

		let stats = session.stats();
		match &result {
			Ok(()) => info!(target = "wct", passing = stats.passing, "test run finished"),
			Err(e) => warn!(target = "wct", error = %e, "test run failed"),
		}
		session.emit(&Event::RunEnd {
			error: result.as_ref().err(),
			stats: &stats,
		});
		result
	}
}

impl std::fmt::Debug for Runner {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Runner").field("pipeline", &self.pipeline).finish_non_exhaustive()
	}
}

/// Runs `input` through the standard pipeline with no plugins registered.
pub async fn run_session(input: impl Into<SessionInput>) -> Result<()> {
	Runner::standard(Arc::new(PluginRegistry::new())).run(input).await
}

/// Closes the cleanup coordinator at most once, on drop if never settled.
struct TeardownGuard {
	session: Arc<Session>,
	cleanup: Option<Arc<dyn Cleanup>>,
}

impl TeardownGuard {
	fn new(session: Arc<Session>, cleanup: Arc<dyn Cleanup>) -> Self {
		Self {
			session,
			cleanup: Some(cleanup),
		}
	}

	async fn settle(&mut self) -> Result<()> {
		match self.cleanup.take() {
			Some(cleanup) => teardown(&self.session, cleanup.as_ref()).await,
			None => Ok(()),
		}
	}
}

impl Drop for TeardownGuard {
	fn drop(&mut self) {
		let Some(cleanup) = self.cleanup.take() else {
			return;
		};
		let session = Arc::clone(&self.session);
		match Handle::try_current() {
			Ok(handle) => {
				warn!(target = "wct", "test run cancelled, releasing resources");
				handle.spawn(async move {
					if let Err(e) = teardown(&session, cleanup.as_ref()).await {
						warn!(target = "wct", error = %e, "cleanup after cancellation failed");
					}
				});
			}
			Err(_) => warn!(target = "wct", "test run cancelled outside a runtime, cleanup skipped"),
		}
	}
}

/// Reads `skipCleanup` as the stages left it and closes the coordinator.
async fn teardown(session: &Session, cleanup: &dyn Cleanup) -> Result<()> {
	let skip = session.options().skip_cleanup;
	if skip {
		debug!(target = "wct", "skipping cleanup");
		return Ok(());
	}
	cleanup.close_all().await
}

//! Sequential, fail-fast stage execution.
//!
//! A [`Pipeline`] runs its stages one at a time, in order, against a shared
//! [`Session`]. The first stage that fails (or panics) ends the run: later
//! stages are never invoked and the failure is returned unchanged. There are
//! no retries; a stage that knows its failures are transient retries itself.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use crate::error::{Error, Result, panic_message};
use crate::session::Session;

/// One ordered unit of pipeline work.
#[async_trait]
pub trait Stage: Send + Sync {
	/// Name used in logs and panic reports.
	fn name(&self) -> &str;

	async fn run(&self, session: &Session) -> Result<()>;
}

/// Boxed future returned by closure stages.
pub type StageFuture<'a> = BoxFuture<'a, Result<()>>;

/// A [`Stage`] backed by a closure.
pub struct FnStage<F> {
	name: String,
	f: F,
}

/// Wraps a closure as a named stage.
///
/// ```ignore
/// let stage = stage_fn("warm-cache", |session| Box::pin(async move {
///     session.log(LogLevel::Info, "warming");
///     Ok(())
/// }));
/// ```
pub fn stage_fn<F>(name: impl Into<String>, f: F) -> FnStage<F>
where
	F: for<'a> Fn(&'a Session) -> StageFuture<'a> + Send + Sync,
{
	FnStage { name: name.into(), f }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
	F: for<'a> Fn(&'a Session) -> StageFuture<'a> + Send + Sync,
{
	fn name(&self) -> &str {
		&self.name
	}

	async fn run(&self, session: &Session) -> Result<()> {
		(self.f)(session).await
	}
}

/// Ordered list of stages.
#[derive(Default)]
pub struct Pipeline {
	stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a stage.
	pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
		self.stages.push(Box::new(stage));
		self
	}

	/// Appends an already boxed stage.
	pub fn push(&mut self, stage: Box<dyn Stage>) {
		self.stages.push(stage);
	}

	pub fn len(&self) -> usize {
		self.stages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.stages.is_empty()
	}

	pub fn stage_names(&self) -> Vec<&str> {
		self.stages.iter().map(|stage| stage.name()).collect()
	}

	/// Runs every stage in order, stopping at the first failure.
	pub async fn run(&self, session: &Session) -> Result<()> {
		for (index, stage) in self.stages.iter().enumerate() {
			let name = stage.name();
			debug!(target = "wct", stage = name, index, "stage starting");
			let started = Instant::now();

			let error = match AssertUnwindSafe(stage.run(session)).catch_unwind().await {
				Ok(Ok(())) => {
					debug!(
						target = "wct",
						stage = name,
						elapsed_ms = started.elapsed().as_millis() as u64,
						"stage complete"
					);
					continue;
				}
				Ok(Err(e)) => e,
				Err(payload) => Error::StagePanicked {
					stage: name.to_string(),
					message: panic_message(payload.as_ref()),
				},
			};

			warn!(
				target = "wct",
				stage = name,
				skipped = self.stages.len() - index - 1,
				error = %error,
				"stage failed"
			);
			return Err(error);
		}
		Ok(())
	}
}

impl fmt::Debug for Pipeline {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Pipeline").field("stages", &self.stage_names()).finish()
	}
}

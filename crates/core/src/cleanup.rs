//! Process-wide release of external resources.
//!
//! Anything that outlives a single stage (launched browser processes, open
//! servers) registers a release closure with a [`CleanupRegistry`]. At the
//! end of a run the entry point calls [`Cleanup::close_all`] once, which
//! releases every registered resource concurrently. Each release is bounded
//! by a timeout so teardown always settles, even when a resource hangs.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result, panic_message};
use crate::handlers::{HandlerId, next_handler_id};

/// Default upper bound for releasing a single resource.
pub const DEFAULT_CLEANUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Teardown contract the entry point depends on.
#[async_trait]
pub trait Cleanup: Send + Sync {
	/// Releases everything currently registered.
	///
	/// Must always resolve. Fails if any resource could not be released.
	async fn close_all(&self) -> Result<()>;
}

/// Boxed release future.
pub type CleanupFuture = BoxFuture<'static, Result<()>>;

type ReleaseFn = Box<dyn FnOnce() -> CleanupFuture + Send>;

struct CleanupEntry {
	label: String,
	release: ReleaseFn,
}

/// Registry of resources to release at the end of a run.
pub struct CleanupRegistry {
	entries: Mutex<IndexMap<HandlerId, CleanupEntry>>,
	timeout: Duration,
}

impl CleanupRegistry {
	pub fn new() -> Self {
		Self::with_timeout(DEFAULT_CLEANUP_TIMEOUT)
	}

	/// Creates a registry with a custom per-resource timeout.
	pub fn with_timeout(timeout: Duration) -> Self {
		Self {
			entries: Mutex::new(IndexMap::new()),
			timeout,
		}
	}

	/// The process-wide registry.
	pub fn global() -> Arc<CleanupRegistry> {
		static GLOBAL: OnceLock<Arc<CleanupRegistry>> = OnceLock::new();
		Arc::clone(GLOBAL.get_or_init(|| Arc::new(CleanupRegistry::new())))
	}

	/// Registers a resource; `release` runs at most once.
	pub fn register<F, Fut>(&self, label: impl Into<String>, release: F) -> HandlerId
	where
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = Result<()>> + Send + 'static,
	{
		let id = next_handler_id();
		let label = label.into();
		debug!(target = "wct", resource = %label, id, "registered for cleanup");
		self.entries.lock().insert(
			id,
			CleanupEntry {
				label,
				release: Box::new(move || -> CleanupFuture { Box::pin(release()) }),
			},
		);
		id
	}

	/// Removes a resource that was released by its owner.
	pub fn unregister(&self, id: HandlerId) -> bool {
		self.entries.lock().shift_remove(&id).is_some()
	}

	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	async fn release(entry: CleanupEntry, timeout: Duration) -> Option<String> {
		let CleanupEntry { label, release } = entry;
		let outcome = AssertUnwindSafe(async move { tokio::time::timeout(timeout, release()).await })
			.catch_unwind()
			.await;

		let reason = match outcome {
			Ok(Ok(Ok(()))) => return None,
			Ok(Ok(Err(e))) => e.to_string(),
			Ok(Err(_)) => format!("timed out after {}ms", timeout.as_millis()),
			Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
		};
		warn!(target = "wct", resource = %label, reason = %reason, "failed to release resource");
		Some(format!("{label} ({reason})"))
	}
}

#[async_trait]
impl Cleanup for CleanupRegistry {
	async fn close_all(&self) -> Result<()> {
		let entries: Vec<CleanupEntry> = self.entries.lock().drain(..).map(|(_, entry)| entry).collect();
		if entries.is_empty() {
			return Ok(());
		}

		debug!(target = "wct", count = entries.len(), "releasing resources");
		let timeout = self.timeout;
		let failures: Vec<String> = join_all(entries.into_iter().map(|entry| Self::release(entry, timeout)))
			.await
			.into_iter()
			.flatten()
			.collect();

		if failures.is_empty() {
			Ok(())
		} else {
			Err(Error::Cleanup { failures })
		}
	}
}

impl Default for CleanupRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for CleanupRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let labels: Vec<String> = self.entries.lock().values().map(|entry| entry.label.clone()).collect();
		f.debug_struct("CleanupRegistry")
			.field("resources", &labels)
			.field("timeout", &self.timeout)
			.finish()
	}
}

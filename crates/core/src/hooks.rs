//! Named async extension points.
//!
//! Plugins register hooks (`configure`, `prepare`, ...) during activation;
//! the stage that owns the extension point runs them with
//! [`Session::emit_hook`]. Hooks for one name run sequentially in
//! registration order and the first failure stops the rest.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::Result;
use crate::handlers::{HandlerMap, Subscription, handler_map, next_handler_id};
use crate::session::Session;

/// Hook run by the configure stage before browsers are validated.
pub const CONFIGURE: &str = "configure";
/// Hook run by the prepare stage before test files are expanded.
pub const PREPARE: &str = "prepare";

/// Boxed hook future.
pub type HookFuture<'a> = BoxFuture<'a, Result<()>>;

/// Hook function: `&Session` → async `Result<()>`.
pub type HookFn = Arc<dyn for<'a> Fn(&'a Session) -> HookFuture<'a> + Send + Sync>;

struct HookEntry {
	name: String,
	hook: HookFn,
}

/// Insertion-ordered hook storage.
pub struct HookRegistry {
	hooks: HandlerMap<HookEntry>,
}

impl HookRegistry {
	pub fn new() -> Self {
		Self { hooks: handler_map() }
	}

	/// Registers `hook` under `name`.
	pub fn register<F>(&self, name: &str, hook: F) -> Subscription
	where
		F: for<'a> Fn(&'a Session) -> HookFuture<'a> + Send + Sync + 'static,
	{
		let id = next_handler_id();
		self.hooks.lock().insert(
			id,
			HookEntry {
				name: name.to_string(),
				hook: Arc::new(hook),
			},
		);
		Subscription::from_handler_map(id, &self.hooks)
	}

	/// Snapshot of the hooks registered for `name`, in order.
	pub(crate) fn handlers(&self, name: &str) -> Vec<HookFn> {
		self.hooks
			.lock()
			.values()
			.filter(|entry| entry.name == name)
			.map(|entry| Arc::clone(&entry.hook))
			.collect()
	}

	pub fn count(&self, name: &str) -> usize {
		self.hooks.lock().values().filter(|entry| entry.name == name).count()
	}
}

impl Default for HookRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for HookRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HookRegistry").field("hooks", &self.hooks.lock().len()).finish()
	}
}

//! The shared, mutable state of one test run.

use std::path::PathBuf;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info, warn};
use wct_protocol::{LogLevel, RunStats};

use crate::error::Result;
use crate::events::{Event, EventBus, EventName, ListenerResult};
use crate::handlers::Subscription;
use crate::hooks::{HookFuture, HookRegistry};
use crate::options::Options;

/// Configuration, running counters, event bus, and hooks for one test run.
///
/// A session is passed by reference to every stage. Callers that want to
/// drive several runs with the same listeners build one themselves, keep an
/// `Arc` to it, and hand it to [`Runner::run`] each time.
///
/// Never hold the guard from [`options`](Self::options) across an
/// [`emit`](Self::emit): listeners may need to lock the options themselves.
///
/// [`Runner::run`]: crate::Runner::run
#[derive(Debug)]
pub struct Session {
	options: RwLock<Options>,
	stats: Mutex<RunStats>,
	events: EventBus,
	hooks: HookRegistry,
	test_files: RwLock<Vec<PathBuf>>,
}

impl Session {
	pub fn new(options: Options) -> Self {
		Self {
			options: RwLock::new(options),
			stats: Mutex::new(RunStats::default()),
			events: EventBus::new(),
			hooks: HookRegistry::new(),
			test_files: RwLock::new(Vec::new()),
		}
	}

	pub fn options(&self) -> RwLockReadGuard<'_, Options> {
		self.options.read()
	}

	pub fn options_mut(&self) -> RwLockWriteGuard<'_, Options> {
		self.options.write()
	}

	/// Snapshot of the run counters.
	pub fn stats(&self) -> RunStats {
		*self.stats.lock()
	}

	pub(crate) fn update_stats(&self, update: impl FnOnce(&mut RunStats)) {
		update(&mut self.stats.lock());
	}

	pub(crate) fn reset_stats(&self) {
		*self.stats.lock() = RunStats::default();
	}

	pub fn events(&self) -> &EventBus {
		&self.events
	}

	/// Registers a listener; see [`EventBus::on`].
	pub fn on<F>(&self, name: EventName, listener: F) -> Subscription
	where
		F: Fn(&Event<'_>) -> ListenerResult + Send + Sync + 'static,
	{
		self.events.on(name, listener)
	}

	pub fn emit(&self, event: &Event<'_>) {
		self.events.emit(event);
	}

	/// Emits a `log:*` event and mirrors it to `tracing`.
	pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
		let message = message.as_ref();
		match level {
			LogLevel::Debug => debug!(target = "wct", "{message}"),
			LogLevel::Info => info!(target = "wct", "{message}"),
			LogLevel::Warn => warn!(target = "wct", "{message}"),
			LogLevel::Error => error!(target = "wct", "{message}"),
		}
		self.events.emit(&Event::Log { level, message });
	}

	pub fn hooks(&self) -> &HookRegistry {
		&self.hooks
	}

	/// Registers a hook; see [`HookRegistry::register`].
	pub fn hook<F>(&self, name: &str, hook: F) -> Subscription
	where
		F: for<'a> Fn(&'a Session) -> HookFuture<'a> + Send + Sync + 'static,
	{
		self.hooks.register(name, hook)
	}

	/// Runs every hook registered for `name`, stopping at the first failure.
	pub async fn emit_hook(&self, name: &str) -> Result<()> {
		let hooks = self.hooks.handlers(name);
		debug!(target = "wct", hook = name, count = hooks.len(), "running hooks");
		for hook in hooks {
			if let Err(e) = hook(self).await {
				warn!(target = "wct", hook = name, error = %e, "hook failed");
				return Err(e);
			}
		}
		Ok(())
	}

	/// Test files found by the prepare stage.
	pub fn test_files(&self) -> Vec<PathBuf> {
		self.test_files.read().clone()
	}

	pub fn set_test_files(&self, files: Vec<PathBuf>) {
		*self.test_files.write() = files;
	}
}

impl Default for Session {
	fn default() -> Self {
		Self::new(Options::default())
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use parking_lot::Mutex;

	use super::*;
	use crate::error::Error;

	#[test]
	fn log_emits_matching_event() {
		let session = Session::default();
		let seen = Arc::new(Mutex::new(Vec::new()));
		let seen_clone = Arc::clone(&seen);
		let _sub = session.on(EventName::Log(LogLevel::Warn), move |event| {
			if let Event::Log { message, .. } = event {
				seen_clone.lock().push(message.to_string());
			}
			Ok(())
		});

		session.log(LogLevel::Warn, "careful");
		session.log(LogLevel::Info, "ignored");
		assert_eq!(*seen.lock(), vec!["careful"]);
	}

	#[test]
	fn stats_reset_clears_counters() {
		let session = Session::default();
		session.update_stats(|stats| stats.tests_started += 2);
		assert_eq!(session.stats().tests_started, 2);

		session.reset_stats();
		assert_eq!(session.stats(), RunStats::default());
	}

	#[tokio::test]
	async fn hooks_run_in_order_and_stop_at_failure() {
		let session = Session::default();
		let calls = Arc::new(Mutex::new(Vec::new()));

		let c = Arc::clone(&calls);
		session
			.hook("prepare", move |_| {
				let c = Arc::clone(&c);
				Box::pin(async move {
					c.lock().push("first");
					Ok(())
				})
			})
			.detach();
		let c = Arc::clone(&calls);
		session
			.hook("prepare", move |_| {
				let c = Arc::clone(&c);
				Box::pin(async move {
					c.lock().push("second");
					Err(Error::config("webserver port in use"))
				})
			})
			.detach();
		let c = Arc::clone(&calls);
		session
			.hook("prepare", move |_| {
				let c = Arc::clone(&c);
				Box::pin(async move {
					c.lock().push("third");
					Ok(())
				})
			})
			.detach();

		let err = session.emit_hook("prepare").await.unwrap_err();
		assert!(matches!(err, Error::Config(ref m) if m == "webserver port in use"));
		assert_eq!(*calls.lock(), vec!["first", "second"]);
	}

	#[tokio::test]
	async fn hook_can_mutate_options() {
		let session = Session::default();
		session
			.hook("configure", |session| {
				Box::pin(async move {
					session.options_mut().suites.push("test/extra".into());
					Ok(())
				})
			})
			.detach();

		session.emit_hook("configure").await.unwrap();
		session.emit_hook("unknown").await.unwrap();
		assert_eq!(session.options().suites, vec!["test/extra"]);
	}

	#[tokio::test]
	async fn dropped_hook_subscription_unregisters() {
		let session = Session::default();
		let count = Arc::new(AtomicUsize::new(0));
		let c = Arc::clone(&count);
		let sub = session.hook("configure", move |_| {
			c.fetch_add(1, Ordering::SeqCst);
			Box::pin(async { Ok(()) })
		});
		assert_eq!(session.hooks().count("configure"), 1);

		drop(sub);
		session.emit_hook("configure").await.unwrap();
		assert_eq!(count.load(Ordering::SeqCst), 0);
	}
}

//! Typed lifecycle events and the per-session [`EventBus`].
//!
//! Events are emitted synchronously: [`EventBus::emit`] calls every listener
//! registered for the event's [`EventName`], in registration order, before
//! returning. Payloads borrow from the emitter, so listeners see the live
//! error objects and stats snapshots without cloning.
//!
//! A listener that returns an error or panics never reaches the emitter. The
//! failure is re-emitted as a `log:error` event; failures inside `log:error`
//! listeners go to `tracing` only.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;

use wct_protocol::{BrowserDef, BrowserMetadata, BrowserStats, LogLevel, RunStats, SubSuite, TestInfo};

use crate::error::{Error, panic_message};
use crate::handlers::{HandlerMap, Subscription, handler_map, next_handler_id};
use crate::options::Options;

/// Name a listener subscribes to.
///
/// The set is additive-only: reporters outside this crate match on these
/// names, so existing names never change meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
	RunStart,
	BrowserInit,
	BrowserStart,
	SubSuiteStart,
	SubSuiteEnd,
	TestStart,
	TestEnd,
	BrowserEnd,
	RunEnd,
	Log(LogLevel),
}

impl EventName {
	/// Lifecycle events in run order.
	pub const LIFECYCLE: [EventName; 9] = [
		EventName::RunStart,
		EventName::BrowserInit,
		EventName::BrowserStart,
		EventName::SubSuiteStart,
		EventName::SubSuiteEnd,
		EventName::TestStart,
		EventName::TestEnd,
		EventName::BrowserEnd,
		EventName::RunEnd,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			EventName::RunStart => "run-start",
			EventName::BrowserInit => "browser-init",
			EventName::BrowserStart => "browser-start",
			EventName::SubSuiteStart => "sub-suite-start",
			EventName::SubSuiteEnd => "sub-suite-end",
			EventName::TestStart => "test-start",
			EventName::TestEnd => "test-end",
			EventName::BrowserEnd => "browser-end",
			EventName::RunEnd => "run-end",
			EventName::Log(LogLevel::Debug) => "log:debug",
			EventName::Log(LogLevel::Info) => "log:info",
			EventName::Log(LogLevel::Warn) => "log:warn",
			EventName::Log(LogLevel::Error) => "log:error",
		}
	}

	/// Returns true for browser-scoped events.
	pub fn is_browser_event(self) -> bool {
		matches!(
			self,
			EventName::BrowserInit
				| EventName::BrowserStart
				| EventName::SubSuiteStart
				| EventName::SubSuiteEnd
				| EventName::TestStart
				| EventName::TestEnd
				| EventName::BrowserEnd
		)
	}
}

impl fmt::Display for EventName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for EventName {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let name = match s {
			"run-start" => EventName::RunStart,
			"browser-init" => EventName::BrowserInit,
			"browser-start" => EventName::BrowserStart,
			"sub-suite-start" => EventName::SubSuiteStart,
			"sub-suite-end" => EventName::SubSuiteEnd,
			"test-start" => EventName::TestStart,
			"test-end" => EventName::TestEnd,
			"browser-end" => EventName::BrowserEnd,
			"run-end" => EventName::RunEnd,
			"log:debug" => EventName::Log(LogLevel::Debug),
			"log:info" => EventName::Log(LogLevel::Info),
			"log:warn" => EventName::Log(LogLevel::Warn),
			"log:error" => EventName::Log(LogLevel::Error),
			other => return Err(Error::config(format!("unknown event `{other}`"))),
		};
		Ok(name)
	}
}

/// An emitted event with its payload.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
	/// The session is about to run its first stage.
	RunStart { options: &'a Options },
	/// A browser is being provisioned.
	BrowserInit { browser: &'a BrowserDef, stats: &'a BrowserStats },
	/// The browser has begun running tests. May repeat if the run restarts.
	BrowserStart {
		browser: &'a BrowserDef,
		metadata: &'a BrowserMetadata,
		stats: &'a BrowserStats,
	},
	SubSuiteStart {
		browser: &'a BrowserDef,
		suite: &'a SubSuite,
		stats: &'a BrowserStats,
	},
	SubSuiteEnd {
		browser: &'a BrowserDef,
		suite: &'a SubSuite,
		stats: &'a BrowserStats,
	},
	TestStart {
		browser: &'a BrowserDef,
		test: &'a TestInfo,
		stats: &'a BrowserStats,
	},
	TestEnd {
		browser: &'a BrowserDef,
		test: &'a TestInfo,
		stats: &'a BrowserStats,
	},
	/// The browser has finished; `error` is set if its run failed.
	BrowserEnd {
		browser: &'a BrowserDef,
		error: Option<&'a Error>,
		stats: &'a BrowserStats,
	},
	/// The run is over; always the last lifecycle event.
	RunEnd { error: Option<&'a Error>, stats: &'a RunStats },
	Log { level: LogLevel, message: &'a str },
}

impl Event<'_> {
	pub fn name(&self) -> EventName {
		match self {
			Event::RunStart { .. } => EventName::RunStart,
			Event::BrowserInit { .. } => EventName::BrowserInit,
			Event::BrowserStart { .. } => EventName::BrowserStart,
			Event::SubSuiteStart { .. } => EventName::SubSuiteStart,
			Event::SubSuiteEnd { .. } => EventName::SubSuiteEnd,
			Event::TestStart { .. } => EventName::TestStart,
			Event::TestEnd { .. } => EventName::TestEnd,
			Event::BrowserEnd { .. } => EventName::BrowserEnd,
			Event::RunEnd { .. } => EventName::RunEnd,
			Event::Log { level, .. } => EventName::Log(*level),
		}
	}

	/// Browser the event is scoped to, if any.
	pub fn browser(&self) -> Option<&BrowserDef> {
		match self {
			Event::BrowserInit { browser, .. }
			| Event::BrowserStart { browser, .. }
			| Event::SubSuiteStart { browser, .. }
			| Event::SubSuiteEnd { browser, .. }
			| Event::TestStart { browser, .. }
			| Event::TestEnd { browser, .. }
			| Event::BrowserEnd { browser, .. } => Some(*browser),
			_ => None,
		}
	}

	/// Error carried by `browser-end` or `run-end`.
	pub fn error(&self) -> Option<&Error> {
		match self {
			Event::BrowserEnd { error, .. } | Event::RunEnd { error, .. } => *error,
			_ => None,
		}
	}
}

/// Outcome of a listener call. Errors are logged, never propagated.
pub type ListenerResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Listener callback.
pub type Listener = Arc<dyn Fn(&Event<'_>) -> ListenerResult + Send + Sync>;

struct ListenerEntry {
	name: EventName,
	listener: Listener,
}

/// Typed publish/subscribe channel owned by one session.
pub struct EventBus {
	listeners: HandlerMap<ListenerEntry>,
}

impl EventBus {
	pub fn new() -> Self {
		Self { listeners: handler_map() }
	}

	/// Registers `listener` for `name`.
	///
	/// The returned [`Subscription`] removes the listener when dropped.
	pub fn on<F>(&self, name: EventName, listener: F) -> Subscription
	where
		F: Fn(&Event<'_>) -> ListenerResult + Send + Sync + 'static,
	{
		let id = next_handler_id();
		self.listeners.lock().insert(
			id,
			ListenerEntry {
				name,
				listener: Arc::new(listener),
			},
		);
		Subscription::from_handler_map(id, &self.listeners)
	}

	/// Calls every listener registered for the event's name, in order.
	///
	/// The listener list is snapshotted first, so listeners may subscribe or
	/// unsubscribe while being called; changes apply from the next emission.
	pub fn emit(&self, event: &Event<'_>) {
		let name = event.name();
		let listeners: Vec<Listener> = self
			.listeners
			.lock()
			.values()
			.filter(|entry| entry.name == name)
			.map(|entry| Arc::clone(&entry.listener))
			.collect();

		for listener in listeners {
			let message = match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
				Ok(Ok(())) => continue,
				Ok(Err(e)) => e.to_string(),
				Err(payload) => panic_message(payload.as_ref()),
			};
			self.listener_failed(name, &message);
		}
	}

	fn listener_failed(&self, name: EventName, message: &str) {
		tracing::warn!(target = "wct", event = %name, error = %message, "event listener failed");
		if name == EventName::Log(LogLevel::Error) {
			return;
		}
		let message = format!("listener for `{name}` failed: {message}");
		self.emit(&Event::Log {
			level: LogLevel::Error,
			message: &message,
		});
	}

	/// Number of listeners currently registered for `name`.
	pub fn listener_count(&self, name: EventName) -> usize {
		self.listeners.lock().values().filter(|entry| entry.name == name).count()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for EventBus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventBus").field("listeners", &self.listeners.lock().len()).finish()
	}
}

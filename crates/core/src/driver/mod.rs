//! Browser drivers and the per-browser run handle.
//!
//! The run-tests stage hands every active browser to a [`BrowserDriver`]
//! together with a [`BrowserRun`]. The driver reports progress through the
//! run handle, which keeps the per-browser and session counters current and
//! emits the browser-scoped events in the order it is called.

mod command;

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use wct_protocol::{BrowserDef, BrowserMetadata, BrowserStats, BrowserStatus, DriverMessage, LogLevel, SubSuite, TestInfo};

pub use command::CommandDriver;

use crate::error::{Error, Result};
use crate::events::Event;
use crate::session::Session;

/// Runs the test files in one browser.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
	/// Drives `run.browser()` through `files`, reporting progress on `run`.
	///
	/// Returning `Ok` with failing tests recorded still fails the browser.
	async fn run(&self, run: &BrowserRun<'_>, files: &[PathBuf]) -> Result<()>;
}

/// Progress handle for one browser's run.
pub struct BrowserRun<'a> {
	session: &'a Session,
	browser: BrowserDef,
	stats: Mutex<BrowserStats>,
}

impl<'a> BrowserRun<'a> {
	pub fn new(session: &'a Session, browser: BrowserDef) -> Self {
		Self {
			session,
			browser,
			stats: Mutex::new(BrowserStats::default()),
		}
	}

	pub fn session(&self) -> &'a Session {
		self.session
	}

	pub fn browser(&self) -> &BrowserDef {
		&self.browser
	}

	pub fn stats(&self) -> BrowserStats {
		*self.stats.lock()
	}

	fn update(&self, update: impl FnOnce(&mut BrowserStats)) -> BrowserStats {
		let mut stats = self.stats.lock();
		update(&mut stats);
		*stats
	}

	pub(crate) fn init(&self) {
		let stats = self.stats();
		self.session.emit(&Event::BrowserInit {
			browser: &self.browser,
			stats: &stats,
		});
	}

	/// The browser has loaded and begun running tests.
	pub fn start(&self, metadata: &BrowserMetadata) {
		let stats = self.update(|stats| stats.status = BrowserStatus::Running);
		self.session.update_stats(|run| run.browsers_started += 1);
		self.session.emit(&Event::BrowserStart {
			browser: &self.browser,
			metadata,
			stats: &stats,
		});
	}

	pub fn sub_suite_start(&self, suite: &SubSuite) {
		let stats = self.stats();
		self.session.emit(&Event::SubSuiteStart {
			browser: &self.browser,
			suite,
			stats: &stats,
		});
	}

	pub fn sub_suite_end(&self, suite: &SubSuite) {
		let stats = self.stats();
		self.session.emit(&Event::SubSuiteEnd {
			browser: &self.browser,
			suite,
			stats: &stats,
		});
	}

	pub fn test_start(&self, test: &TestInfo) {
		let stats = self.stats();
		self.session.update_stats(|run| run.tests_started += 1);
		self.session.emit(&Event::TestStart {
			browser: &self.browser,
			test,
			stats: &stats,
		});
	}

	/// Records a finished test. A missing state counts as failing when the
	/// test carries an error, passing otherwise.
	pub fn test_end(&self, test: &TestInfo) {
		let state = test.outcome();
		let stats = self.update(|stats| stats.record(state));
		self.session.update_stats(|run| run.record(state));
		self.session.emit(&Event::TestEnd {
			browser: &self.browser,
			test,
			stats: &stats,
		});
	}

	/// Emits a `log:*` event prefixed with the browser name.
	pub fn log(&self, level: LogLevel, message: &str) {
		self.session.log(level, format!("{}: {message}", self.browser.name));
	}

	/// Applies one launcher message. `Done` is left to the caller.
	pub fn apply(&self, message: &DriverMessage) {
		match message {
			DriverMessage::BrowserStart { metadata } => self.start(metadata),
			DriverMessage::SubSuiteStart { suite } => self.sub_suite_start(suite),
			DriverMessage::SubSuiteEnd { suite } => self.sub_suite_end(suite),
			DriverMessage::TestStart { test } => self.test_start(test),
			DriverMessage::TestEnd { test } => self.test_end(test),
			DriverMessage::Log { level, message } => self.log(*level, message),
			DriverMessage::Done { .. } => {}
		}
	}

	/// Settles the browser's outcome and emits `browser-end`.
	pub(crate) fn finish(&self, outcome: Result<()>) -> Result<()> {
		let outcome = outcome.and_then(|()| {
			let failing = self.stats().failing;
			if failing > 0 {
				Err(Error::TestsFailed {
					browser: self.browser.to_string(),
					failing,
				})
			} else {
				Ok(())
			}
		});

		let status = if outcome.is_ok() {
			BrowserStatus::Complete
		} else {
			BrowserStatus::Error
		};
		let stats = self.update(|stats| stats.status = status);
		self.session.emit(&Event::BrowserEnd {
			browser: &self.browser,
			error: outcome.as_ref().err(),
			stats: &stats,
		});
		outcome
	}
}

impl std::fmt::Debug for BrowserRun<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BrowserRun")
			.field("browser", &self.browser.name)
			.field("stats", &self.stats())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use wct_protocol::TestState;

	use super::*;
	use crate::events::EventName;

	#[test]
	fn test_end_updates_browser_and_session_counters() {
		let session = Session::default();
		let run = BrowserRun::new(&session, BrowserDef::named("chrome"));

		run.start(&BrowserMetadata::default());
		run.test_start(&TestInfo::new(["a"]));
		run.test_end(&TestInfo::new(["a"]).finished(TestState::Passing));
		run.test_start(&TestInfo::new(["b"]));
		run.test_end(&TestInfo {
			error: Some("expected true".into()),
			..TestInfo::new(["b"])
		});

		let stats = run.stats();
		assert_eq!(stats.status, BrowserStatus::Running);
		assert_eq!((stats.passing, stats.failing), (1, 1));

		let run_stats = session.stats();
		assert_eq!(run_stats.browsers_started, 1);
		assert_eq!(run_stats.tests_started, 2);
		assert_eq!(run_stats.tests_ended, 2);
		assert_eq!(run_stats.failing, 1);
	}

	#[test]
	fn finish_fails_when_tests_failed() {
		let session = Session::default();
		let ended = Arc::new(Mutex::new(Vec::new()));
		let ended_clone = Arc::clone(&ended);
		let _sub = session.on(EventName::BrowserEnd, move |event| {
			if let Event::BrowserEnd { error, stats, .. } = event {
				ended_clone.lock().push((error.map(ToString::to_string), stats.status));
			}
			Ok(())
		});

		let run = BrowserRun::new(&session, BrowserDef::named("firefox"));
		run.test_end(&TestInfo::new(["x"]).finished(TestState::Failing));
		let err = run.finish(Ok(())).unwrap_err();

		assert!(matches!(err, Error::TestsFailed { failing: 1, .. }));
		assert_eq!(
			*ended.lock(),
			vec![(Some("1 failed tests in firefox".to_string()), BrowserStatus::Error)]
		);
	}

	#[test]
	fn finish_keeps_driver_error() {
		let session = Session::default();
		let run = BrowserRun::new(&session, BrowserDef::named("safari"));
		let err = run
			.finish(Err(Error::Browser {
				browser: "safari".into(),
				message: "crashed".into(),
			}))
			.unwrap_err();
		assert_eq!(err.to_string(), "safari failed: crashed");
		assert_eq!(run.stats().status, BrowserStatus::Error);
	}

	#[test]
	fn apply_routes_messages_to_events() {
		let session = Session::default();
		let seen = Arc::new(Mutex::new(Vec::new()));
		let mut subs = Vec::new();
		for name in [
			EventName::BrowserStart,
			EventName::SubSuiteStart,
			EventName::TestStart,
			EventName::TestEnd,
			EventName::SubSuiteEnd,
			EventName::Log(LogLevel::Info),
		] {
			let seen = Arc::clone(&seen);
			subs.push(session.on(name, move |event| {
				seen.lock().push(event.name().as_str());
				Ok(())
			}));
		}

		let run = BrowserRun::new(&session, BrowserDef::named("chrome"));
		for line in [
			r#"{"type":"browser-start","metadata":{"userAgent":"HeadlessChrome"}}"#,
			r#"{"type":"sub-suite-start","file":"test/a.html"}"#,
			r#"{"type":"test-start","test":["a","works"]}"#,
			r#"{"type":"test-end","test":["a","works"],"state":"passing"}"#,
			r#"{"type":"sub-suite-end","file":"test/a.html"}"#,
			r#"{"type":"log","level":"info","message":"done loading"}"#,
		] {
			run.apply(&DriverMessage::parse_line(line).unwrap());
		}

		assert_eq!(
			*seen.lock(),
			vec!["browser-start", "sub-suite-start", "test-start", "test-end", "sub-suite-end", "log:info"]
		);
	}
}

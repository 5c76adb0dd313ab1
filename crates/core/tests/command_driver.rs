//! `CommandDriver` against small `sh` launchers speaking the NDJSON protocol.
#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use wct::{
	BrowserDef, BrowserDriver, BrowserRun, BrowserStatus, Cleanup, CleanupRegistry, CommandDriver, Error, Event,
	EventName, LogLevel, Options, Session,
};

fn launcher(dir: &Path, body: &str) -> BrowserDef {
	let script = dir.join("launcher.sh");
	std::fs::write(&script, body).unwrap();
	BrowserDef::named("chrome")
		.with_command("/bin/sh")
		.with_args([script.to_string_lossy().into_owned()])
}

fn session_in(dir: &Path, tweak: impl FnOnce(&mut Options)) -> Session {
	let mut options = Options {
		root: Some(dir.to_path_buf()),
		..Default::default()
	};
	tweak(&mut options);
	Session::new(options)
}

fn capture_logs(session: &Session, level: LogLevel) -> Arc<Mutex<Vec<String>>> {
	let logs = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&logs);
	session
		.on(EventName::Log(level), move |event| {
			if let Event::Log { message, .. } = event {
				sink.lock().push(message.to_string());
			}
			Ok(())
		})
		.detach();
	logs
}

const REPORTING_LAUNCHER: &str = r#"
echo '{"type":"browser-start","metadata":{"userAgent":"FakeBrowser/1.0"}}'
printf '{"type":"log","level":"info","message":"browser=%s"}\n' "$WCT_BROWSER"
for f in "$@"; do
	printf '{"type":"sub-suite-start","file":"%s"}\n' "$f"
	printf '{"type":"test-start","test":["%s","renders"]}\n' "$f"
	printf '{"type":"test-end","test":["%s","renders"],"state":"passing","durationMs":3}\n' "$f"
	printf '{"type":"sub-suite-end","file":"%s"}\n' "$f"
done
echo 'plain output'
echo '{"type":"done"}'
"#;

fn files() -> Vec<PathBuf> {
	vec![PathBuf::from("test/a.html"), PathBuf::from("test/b.html")]
}

#[tokio::test]
async fn reports_progress_and_reaps_the_launcher() {
	let dir = tempfile::tempdir().unwrap();
	let registry = Arc::new(CleanupRegistry::new());
	let driver = CommandDriver::new(Arc::clone(&registry));
	let session = session_in(dir.path(), |_| {});
	let info = capture_logs(&session, LogLevel::Info);
	let debug = capture_logs(&session, LogLevel::Debug);
	let run = BrowserRun::new(&session, launcher(dir.path(), REPORTING_LAUNCHER));

	driver.run(&run, &files()).await.unwrap();

	let stats = run.stats();
	assert_eq!(stats.status, BrowserStatus::Running);
	assert_eq!(stats.passing, 2);
	assert_eq!(stats.failing, 0);

	let totals = session.stats();
	assert_eq!(totals.browsers_started, 1);
	assert_eq!(totals.tests_started, 2);
	assert_eq!(totals.tests_ended, 2);

	assert_eq!(*info.lock(), vec!["chrome: browser=chrome"]);
	assert!(debug.lock().iter().any(|line| line == "chrome: plain output"), "{:?}", debug.lock());
	assert!(registry.is_empty());
}

#[tokio::test]
async fn undecodable_output_is_forwarded_as_debug_log() {
	let dir = tempfile::tempdir().unwrap();
	let driver = CommandDriver::new(Arc::new(CleanupRegistry::new()));
	let session = session_in(dir.path(), |_| {});
	let debug = capture_logs(&session, LogLevel::Debug);
	let run = BrowserRun::new(
		&session,
		launcher(dir.path(), "printf '\\377\\376 console noise\\n'\necho '{\"type\":\"done\"}'"),
	);

	driver.run(&run, &files()).await.unwrap();

	let debug = debug.lock();
	assert!(
		debug
			.iter()
			.any(|line| line.starts_with("chrome: ") && line.ends_with(" console noise")),
		"{debug:?}"
	);
}

#[tokio::test]
async fn done_with_error_fails_the_browser() {
	let dir = tempfile::tempdir().unwrap();
	let driver = CommandDriver::new(Arc::new(CleanupRegistry::new()));
	let session = session_in(dir.path(), |_| {});
	let run = BrowserRun::new(
		&session,
		launcher(dir.path(), r#"echo '{"type":"done","error":"page crashed"}'"#),
	);

	let err = driver.run(&run, &files()).await.unwrap_err();
	assert_eq!(err.to_string(), "chrome failed: page crashed");
}

#[tokio::test]
async fn done_error_wins_over_exit_status() {
	let dir = tempfile::tempdir().unwrap();
	let driver = CommandDriver::new(Arc::new(CleanupRegistry::new()));
	let session = session_in(dir.path(), |_| {});
	let run = BrowserRun::new(
		&session,
		launcher(dir.path(), "echo '{\"type\":\"done\",\"error\":\"page crashed\"}'\nexit 3"),
	);

	let err = driver.run(&run, &files()).await.unwrap_err();
	assert_eq!(err.to_string(), "chrome failed: page crashed");
}

#[tokio::test]
async fn non_zero_exit_fails_the_browser() {
	let dir = tempfile::tempdir().unwrap();
	let driver = CommandDriver::new(Arc::new(CleanupRegistry::new()));
	let session = session_in(dir.path(), |_| {});
	let run = BrowserRun::new(&session, launcher(dir.path(), "echo '{\"type\":\"done\"}'\nexit 3"));

	let err = driver.run(&run, &files()).await.unwrap_err();
	match err {
		Error::Browser { browser, message } => {
			assert_eq!(browser, "chrome");
			assert!(message.contains('3'), "{message}");
		}
		other => panic!("unexpected error: {other:?}"),
	}
}

#[tokio::test]
async fn silent_launcher_times_out() {
	let dir = tempfile::tempdir().unwrap();
	let registry = Arc::new(CleanupRegistry::new());
	let driver = CommandDriver::new(Arc::clone(&registry));
	let session = session_in(dir.path(), |options| options.test_timeout_ms = Some(200));
	let run = BrowserRun::new(&session, launcher(dir.path(), "exec sleep 30"));

	let err = driver.run(&run, &files()).await.unwrap_err();
	assert!(err.is_timeout(), "{err:?}");
	assert!(registry.is_empty());
}

#[tokio::test]
async fn persistent_launcher_is_left_for_cleanup() {
	let dir = tempfile::tempdir().unwrap();
	let registry = Arc::new(CleanupRegistry::new());
	let driver = CommandDriver::new(Arc::clone(&registry));
	let session = session_in(dir.path(), |options| options.persistent = true);
	let run = BrowserRun::new(
		&session,
		launcher(dir.path(), "echo '{\"type\":\"done\"}'\nexec sleep 30"),
	);

	driver.run(&run, &files()).await.unwrap();
	assert_eq!(registry.len(), 1);

	registry.close_all().await.unwrap();
	assert!(registry.is_empty());
}

#[tokio::test]
async fn missing_command_is_a_launch_error() {
	let session = Session::default();
	let driver = CommandDriver::new(Arc::new(CleanupRegistry::new()));
	let run = BrowserRun::new(&session, BrowserDef::named("chrome"));

	let err = driver.run(&run, &files()).await.unwrap_err();
	assert!(matches!(err, Error::BrowserLaunch { .. }), "{err:?}");
}

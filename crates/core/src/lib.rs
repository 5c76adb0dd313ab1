//! wct: session orchestrator for browser component test runs
//!
//! A run is a [`Pipeline`] of named async [`Stage`]s executed against a shared
//! [`Session`]. The session carries the options, running statistics, hooks,
//! and an [`EventBus`] that reporters subscribe to. [`Runner::run`] wraps the
//! pipeline so that process-wide resources are released exactly once however
//! the run ends.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wct::{EventName, Options, PluginRegistry, Runner, Session};
//!
//! #[tokio::main]
//! async fn main() -> wct::Result<()> {
//!     let session = Arc::new(Session::new(Options::default()));
//!     session
//!         .on(EventName::TestEnd, |event| {
//!             println!("{:?}", event);
//!             Ok(())
//!         })
//!         .detach();
//!
//!     Runner::standard(Arc::new(PluginRegistry::new())).run(session).await
//! }
//! ```

mod handlers;

pub mod cleanup;
pub mod driver;
pub mod error;
pub mod events;
pub mod hooks;
pub mod options;
pub mod pipeline;
pub mod plugin;
pub mod reporter;
pub mod runner;
pub mod session;
pub mod steps;

pub use cleanup::{Cleanup, CleanupRegistry};
pub use driver::{BrowserDriver, BrowserRun, CommandDriver};
pub use error::{Error, Result};
pub use events::{Event, EventBus, EventName, Listener, ListenerResult};
pub use handlers::{HandlerId, Subscription};
pub use options::{Options, OutputTarget};
pub use pipeline::{Pipeline, Stage, stage_fn};
pub use plugin::{Plugin, PluginLoader, PluginRegistry};
pub use reporter::CliReporter;
pub use runner::{Runner, SessionInput, run_session};
pub use session::Session;

// Re-export payload types
pub use wct_protocol as protocol;
pub use wct_protocol::{
	BrowserDef, BrowserMetadata, BrowserStats, BrowserStatus, LogLevel, RunStats, SubSuite, TestInfo, TestState,
};

//! Payload and wire types for the wct test runner.
//!
//! This crate contains the serde-serializable types shared between the
//! session orchestrator, reporters, and browser launchers:
//!
//! - [`BrowserDef`] / [`BrowserMetadata`] - browser identity carried by browser events
//! - [`BrowserStats`] / [`RunStats`] - running counters
//! - [`TestInfo`] / [`SubSuite`] - per-test and per-file payloads
//! - [`DriverMessage`] - NDJSON lines a browser launcher writes to stdout
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! - **Pure data**: No behavior beyond serialization and small accessors
//! - **Additive**: Reporters outside this workspace deserialize these shapes,
//!   so fields are only ever added, never renamed or removed

pub mod browser;
pub mod message;
pub mod stats;

pub use browser::*;
pub use message::*;
pub use stats::*;
pub use test::*;

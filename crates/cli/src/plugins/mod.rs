//! Plugins compiled into the `wct` binary.

mod local;

pub use local::{LOCAL_PLUGIN, LocalPlugin};

use wct::PluginRegistry;

/// Every built-in plugin, keyed by name.
pub fn builtin() -> PluginRegistry {
	PluginRegistry::new().with(LocalPlugin::new())
}

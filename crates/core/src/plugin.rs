//! Plugin contract and the in-process plugin registry.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::Result;
use crate::session::Session;

/// Extension activated by the load-plugins stage.
///
/// Plugins usually register hooks ([`Session::hook`]) and listeners
/// ([`Session::on`]) from [`activate`](Self::activate); work that needs the
/// final configuration belongs in the `configure` or `prepare` hook.
#[async_trait]
pub trait Plugin: Send + Sync {
	fn name(&self) -> &str;

	/// Called once per run with the plugin's entry from `options.plugins`.
	async fn activate(&self, session: &Session, config: &Value) -> Result<()>;
}

/// Resolves plugin names to implementations.
pub trait PluginLoader: Send + Sync {
	fn load(&self, name: &str) -> Option<Arc<dyn Plugin>>;
}

/// Name-keyed plugin table.
#[derive(Clone, Default)]
pub struct PluginRegistry {
	plugins: IndexMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a plugin under its own name, replacing any previous one.
	pub fn with(mut self, plugin: impl Plugin + 'static) -> Self {
		self.register(Arc::new(plugin));
		self
	}

	pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
		self.plugins.insert(plugin.name().to_string(), plugin);
	}

	pub fn names(&self) -> Vec<&str> {
		self.plugins.keys().map(String::as_str).collect()
	}
}

impl PluginLoader for PluginRegistry {
	fn load(&self, name: &str) -> Option<Arc<dyn Plugin>> {
		self.plugins.get(name).cloned()
	}
}

impl fmt::Debug for PluginRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PluginRegistry").field("plugins", &self.names()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Named(&'static str);

	#[async_trait]
	impl Plugin for Named {
		fn name(&self) -> &str {
			self.0
		}

		async fn activate(&self, _session: &Session, _config: &Value) -> Result<()> {
			Ok(())
		}
	}

	#[test]
	fn registry_loads_by_name() {
		let registry = PluginRegistry::new().with(Named("local")).with(Named("sauce"));
		assert_eq!(registry.names(), vec!["local", "sauce"]);
		assert_eq!(registry.load("sauce").map(|p| p.name().to_string()).as_deref(), Some("sauce"));
		assert!(registry.load("missing").is_none());
	}
}

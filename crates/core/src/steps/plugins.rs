use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;
use wct_protocol::LogLevel;

use crate::error::{Error, Result};
use crate::pipeline::Stage;
use crate::plugin::PluginLoader;
use crate::session::Session;

/// Activates each plugin listed in `options.plugins`, in listed order.
///
/// `false` disables an entry; `true` or `null` activate it with an empty
/// config object.
pub struct LoadPlugins {
	loader: Arc<dyn PluginLoader>,
}

impl LoadPlugins {
	pub fn new(loader: Arc<dyn PluginLoader>) -> Self {
		Self { loader }
	}
}

#[async_trait]
impl Stage for LoadPlugins {
	fn name(&self) -> &str {
		"load-plugins"
	}

	async fn run(&self, session: &Session) -> Result<()> {
		let plugins: Vec<(String, Value)> = session
			.options()
			.plugins
			.iter()
			.map(|(name, config)| (name.clone(), config.clone()))
			.collect();

		for (name, config) in plugins {
			let config = match config {
				Value::Bool(false) => {
					debug!(target = "wct", plugin = %name, "plugin disabled");
					continue;
				}
				Value::Bool(true) | Value::Null => Value::Object(Map::new()),
				config => config,
			};

			let plugin = self.loader.load(&name).ok_or_else(|| Error::plugin(&name, "plugin not found"))?;
			session.log(LogLevel::Debug, format!("activating plugin {name}"));
			plugin.activate(session, &config).await?;
		}
		Ok(())
	}
}

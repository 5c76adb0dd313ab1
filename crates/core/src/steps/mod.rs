//! The standard stages of a test run, in order:
//!
//! 1. [`SetupOverrides`] - layer `wct.conf.json` files under the explicit options
//! 2. [`LoadPlugins`] - activate every enabled plugin
//! 3. [`Configure`] - settle defaults, run the `configure` hook, validate
//! 4. [`Prepare`] - run the `prepare` hook, expand suites into test files
//! 5. [`RunTests`] - drive every active browser through the test files

mod configure;
mod overrides;
mod plugins;
mod prepare;

use std::sync::Arc;

pub use configure::Configure;
pub use overrides::SetupOverrides;
pub use plugins::LoadPlugins;
pub use prepare::{Prepare, expand_suites};
pub use run_tests::RunTests;

use crate::driver::BrowserDriver;
use crate::pipeline::Pipeline;
use crate::plugin::PluginLoader;

/// Builds the standard five-stage pipeline.
pub fn standard_pipeline(plugins: Arc<dyn PluginLoader>, driver: Arc<dyn BrowserDriver>) -> Pipeline {
	Pipeline::new()
		.stage(SetupOverrides::default())
		.stage(LoadPlugins::new(plugins))
		.stage(Configure)
		.stage(Prepare)
		.stage(RunTests::new(driver))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::driver::CommandDriver;
	use crate::plugin::PluginRegistry;

	#[test]
	fn standard_pipeline_order() {
		let pipeline = standard_pipeline(Arc::new(PluginRegistry::new()), Arc::new(CommandDriver::default()));
		assert_eq!(
			pipeline.stage_names(),
			vec!["setup-overrides", "load-plugins", "configure", "prepare", "run-tests"]
		);
	}
}

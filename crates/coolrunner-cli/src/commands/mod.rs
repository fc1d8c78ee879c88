pub mod test;
pub mod watch;

use anyhow::{bail, Context, Result};
use coolrunner_config::{Config, ConfigLoader};
use coolrunner_core::{RunConfig, RunController, ScriptLoader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::reporter::ConsoleReporter;

/// Options shared by `test` and `watch`
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// Test directory (overrides coolrunner.toml)
    pub test_dir: Option<PathBuf>,
    /// Default timeout in milliseconds (overrides coolrunner.toml)
    pub timeout_ms: Option<u64>,
    /// Show every test instead of dots
    pub verbose: bool,
}

/// The run controller used by the CLI commands
pub type Controller = RunController<ScriptLoader, ConsoleReporter>;

/// Load coolrunner.toml (if any) starting from `cwd`
pub fn load_config(cwd: &Path) -> Result<Config> {
    ConfigLoader::new()
        .load_from_directory(cwd)
        .context("Failed to load coolrunner.toml")
}

/// Merge command-line options over the loaded configuration
pub fn run_config(config: &Config, args: &RunArgs) -> Result<RunConfig> {
    let test_dir = args.test_dir.clone().unwrap_or_else(|| config.test_dir());
    let timeout = match args.timeout_ms {
        Some(0) => bail!("--timeout must be greater than zero"),
        Some(ms) => Duration::from_millis(ms),
        None => config.timeout(),
    };

    Ok(RunConfig::new(test_dir)
        .with_timeout(timeout)
        .with_debounce(config.debounce()))
}

/// Build a controller whose panics outside gated code land in the active run
pub fn controller(config: &Config, run_config: RunConfig, reporter: ConsoleReporter) -> Controller {
    let loader = ScriptLoader::with_extensions(config.extensions());
    let controller = RunController::new(run_config, loader, reporter);
    crate::panic_hook::attach(controller.uncaught_handle());
    controller
}

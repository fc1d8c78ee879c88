//! CLI configuration via environment variables
//!
//! Terminal settings only. Run settings (test directory, timeout, debounce)
//! come from coolrunner.toml through `coolrunner_config`.

use std::env;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Disable colored output (COOLRUNNER_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
    /// Never clear the terminal in watch mode (COOLRUNNER_NO_CLEAR=1)
    pub no_clear: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            no_color: env::var("COOLRUNNER_NO_COLOR").is_ok() || env::var("NO_COLOR").is_ok(),
            no_clear: env::var("COOLRUNNER_NO_CLEAR")
                .map(|v| {
                    let lower = v.to_lowercase();
                    !(lower == "0" || lower == "false" || lower == "off")
                })
                .unwrap_or(false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

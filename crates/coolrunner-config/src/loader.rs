//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::project::ProjectConfig;
use crate::{ConfigError, ConfigResult, CONFIG_FILE};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default directory scanned for test modules
pub const DEFAULT_TEST_DIR: &str = "tests";
/// Default source directory for watch mode
pub const DEFAULT_SRC_DIR: &str = "src";
/// Default per-hook timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;
/// Default debounce window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 2000;

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Built-in defaults - lowest priority
/// 2. Project config (./coolrunner.toml) - overrides defaults
/// 3. Environment variables (COOLRUNNER_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigLoader;

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration with environment overrides applied
    pub project: ProjectConfig,

    /// Project root directory (where coolrunner.toml was found)
    pub project_root: Option<PathBuf>,

    /// Directory relative paths are resolved against
    pub base_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find coolrunner.toml. Without one, the
    /// defaults apply and paths resolve against `start_dir`.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;
        let project_config = self.apply_env_overrides(project_config)?;

        let base_dir = project_root
            .clone()
            .unwrap_or_else(|| start_dir.to_path_buf());

        Ok(Config {
            project: project_config,
            project_root,
            base_dir,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let project_config = self.apply_env_overrides(project_config)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());
        let base_dir = project_root.clone().unwrap_or_else(|| PathBuf::from("."));

        Ok(Config {
            project: project_config,
            project_root,
            base_dir,
        })
    }

    /// Find project configuration by walking up directory tree
    ///
    /// Returns (project_root, project_config), or the default config when no
    /// file is found before the filesystem root
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Apply environment variable overrides to project config
    ///
    /// Recognised: COOLRUNNER_TEST_DIR, COOLRUNNER_SRC_DIR, COOLRUNNER_TIMEOUT_MS
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Some(test_dir) = non_empty_var("COOLRUNNER_TEST_DIR") {
            config.runner.test_dir = Some(PathBuf::from(test_dir));
        }

        if let Some(src_dir) = non_empty_var("COOLRUNNER_SRC_DIR") {
            config.watch.src_dir = Some(PathBuf::from(src_dir));
        }

        if let Some(timeout) = non_empty_var("COOLRUNNER_TIMEOUT_MS") {
            let timeout_ms = timeout.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                field: "COOLRUNNER_TIMEOUT_MS".to_string(),
                reason: format!("'{}' is not a number of milliseconds", timeout),
            })?;
            config.runner.timeout_ms = Some(timeout_ms);
        }

        config.validate()?;
        Ok(config)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

impl Config {
    /// Defaults only, resolving paths against `base_dir`
    pub fn with_defaults(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            project: ProjectConfig::default(),
            project_root: None,
            base_dir: base_dir.into(),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Directory scanned for test modules
    pub fn test_dir(&self) -> PathBuf {
        let dir = self
            .project
            .runner
            .test_dir
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_TEST_DIR));
        self.resolve(dir)
    }

    /// Source directory watched in watch mode
    pub fn src_dir(&self) -> PathBuf {
        let dir = self
            .project
            .watch
            .src_dir
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_SRC_DIR));
        self.resolve(dir)
    }

    /// Per-hook and per-test timeout for suites that do not set their own
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.project.runner.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }

    /// Minimum time between the starts of two runs
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.project.watch.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS))
    }

    /// Suite script extensions, without leading dots
    pub fn extensions(&self) -> Vec<String> {
        match &self.project.runner.extensions {
            Some(extensions) => extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect(),
            None => vec!["toml".to_string()],
        }
    }

    /// Whether watch mode clears the terminal before each run
    pub fn clear_screen(&self) -> bool {
        self.project.watch.clear_screen.unwrap_or(true)
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if this is a project (has coolrunner.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    #[test]
    #[serial]
    fn test_load_project_config() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(
            temp_dir.path(),
            r#"
[runner]
test_dir = "spec"
timeout_ms = 750
"#,
        );

        let config = ConfigLoader::new().load_from_directory(temp_dir.path()).unwrap();

        assert!(config.is_project());
        assert_eq!(config.test_dir(), temp_dir.path().join("spec"));
        assert_eq!(config.timeout(), Duration::from_millis(750));
    }

    #[test]
    #[serial]
    fn test_find_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[watch]\nsrc_dir = \"lib\"\n");

        let sub_dir = temp_dir.path().join("tests").join("unit");
        fs::create_dir_all(&sub_dir).unwrap();

        let config = ConfigLoader::new().load_from_directory(&sub_dir).unwrap();

        assert_eq!(config.project_root(), Some(temp_dir.path()));
        assert_eq!(config.src_dir(), temp_dir.path().join("lib"));
        assert_eq!(config.test_dir(), temp_dir.path().join("tests"));
    }

    #[test]
    #[serial]
    fn test_no_project_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();

        let config = ConfigLoader::new().load_from_directory(temp_dir.path()).unwrap();

        assert!(!config.is_project());
        assert_eq!(config.test_dir(), temp_dir.path().join(DEFAULT_TEST_DIR));
        assert_eq!(config.src_dir(), temp_dir.path().join(DEFAULT_SRC_DIR));
        assert_eq!(config.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(config.debounce(), Duration::from_millis(DEFAULT_DEBOUNCE_MS));
        assert_eq!(config.extensions(), vec!["toml"]);
        assert!(config.clear_screen());
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::with_defaults("/somewhere/else");
        config.project.runner.test_dir = Some(temp_dir.path().to_path_buf());

        assert_eq!(config.test_dir(), temp_dir.path());
    }

    #[test]
    fn test_extensions_drop_leading_dots() {
        let mut config = Config::with_defaults(".");
        config.project.runner.extensions = Some(vec![".suite".to_string(), "toml".to_string()]);
        assert_eq!(config.extensions(), vec!["suite", "toml"]);
    }

    #[test]
    #[serial]
    fn test_env_override_test_dir_and_timeout() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[runner]\ntest_dir = \"spec\"\ntimeout_ms = 100\n");

        env::set_var("COOLRUNNER_TEST_DIR", "integration");
        env::set_var("COOLRUNNER_TIMEOUT_MS", "900");

        let result = ConfigLoader::new().load_from_directory(temp_dir.path());

        env::remove_var("COOLRUNNER_TEST_DIR");
        env::remove_var("COOLRUNNER_TIMEOUT_MS");

        let config = result.unwrap();
        assert_eq!(config.test_dir(), temp_dir.path().join("integration"));
        assert_eq!(config.timeout(), Duration::from_millis(900));
    }

    #[test]
    #[serial]
    fn test_env_override_src_dir() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var("COOLRUNNER_SRC_DIR", "app");
        let result = ConfigLoader::new().load_from_directory(temp_dir.path());
        env::remove_var("COOLRUNNER_SRC_DIR");

        assert_eq!(result.unwrap().src_dir(), temp_dir.path().join("app"));
    }

    #[test]
    #[serial]
    fn test_env_timeout_must_be_a_number() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var("COOLRUNNER_TIMEOUT_MS", "soon");
        let result = ConfigLoader::new().load_from_directory(temp_dir.path());
        env::remove_var("COOLRUNNER_TIMEOUT_MS");

        match result.unwrap_err() {
            ConfigError::InvalidValue { field, .. } => assert_eq!(field, "COOLRUNNER_TIMEOUT_MS"),
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_env_zero_timeout_is_rejected() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var("COOLRUNNER_TIMEOUT_MS", "0");
        let result = ConfigLoader::new().load_from_directory(temp_dir.path());
        env::remove_var("COOLRUNNER_TIMEOUT_MS");

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    #[serial]
    fn test_load_from_specific_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config_file(temp_dir.path(), "[watch]\nclear_screen = false\n");

        let config = ConfigLoader::new().load_from_file(&config_path).unwrap();

        assert!(!config.clear_screen());
        assert_eq!(config.project_root(), Some(temp_dir.path()));
    }

    #[test]
    #[serial]
    fn test_invalid_project_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[runner\n");

        let err = ConfigLoader::new().load_from_directory(temp_dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseError { .. }));
    }
}

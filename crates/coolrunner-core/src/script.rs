//! TOML command suites
//!
//! The loader shipped with the runner. A suite script is a TOML document with
//! a `[suite]` table; its hooks and tests are shell commands that run as child
//! processes:
//!
//! ```toml
//! [suite]
//! name = "Math"
//! timeout = 400
//! before_all = "mkdir -p target/fixture"
//!
//! [tests]
//! test_addition = { run = "expr 1 + 1", stdout = "2" }
//! exits_nonzero_test = { run = "exit 3", status = 3 }
//! ```
//!
//! A command that cannot be spawned is an uncaught error. A command whose
//! exit status or output does not match is an expectation failure.

use crate::failure::Failure;
use crate::gate::{Done, HookResult, Pending};
use crate::loader::{LoadError, ModuleLoader};
use crate::suite::{Export, Suite, SuiteDefinition};
use anyhow::Context as _;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Environment variable holding the running suite's name.
pub const SUITE_ENV: &str = "COOLRUNNER_SUITE";
/// Environment variable holding the running test or hook name.
pub const TEST_ENV: &str = "COOLRUNNER_TEST";

/// One shell command plus what its result must look like.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    /// `"cargo build"`: must exit with status 0
    Line(String),
    /// `{ run = "...", status = 1, stdout = "...", stderr = "..." }`
    Detailed(DetailedCommand),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetailedCommand {
    pub run: String,
    #[serde(default)]
    pub status: i32,
    /// Substring expected on stdout
    pub stdout: Option<String>,
    /// Substring expected on stderr
    pub stderr: Option<String>,
}

impl CommandSpec {
    fn into_detailed(self) -> DetailedCommand {
        match self {
            CommandSpec::Line(run) => DetailedCommand {
                run,
                status: 0,
                stdout: None,
                stderr: None,
            },
            CommandSpec::Detailed(detailed) => detailed,
        }
    }
}

impl DetailedCommand {
    fn verify(&self, output: &Output) -> Result<(), Failure> {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        match output.status.code() {
            Some(code) if code == self.status => {}
            Some(code) => {
                return Err(Failure::expectation(format!(
                    "`{}` exited with status {}, expected {}{}",
                    self.run,
                    code,
                    self.status,
                    stderr_excerpt(&stderr)
                )))
            }
            None => {
                return Err(Failure::expectation(format!(
                    "`{}` was terminated by a signal, expected status {}",
                    self.run, self.status
                )))
            }
        }

        if let Some(expected) = &self.stdout {
            if !stdout.contains(expected.as_str()) {
                return Err(Failure::expectation(format!(
                    "stdout of `{}` contains {:?} (got {:?})",
                    self.run,
                    expected,
                    stdout.trim_end()
                )));
            }
        }

        if let Some(expected) = &self.stderr {
            if !stderr.contains(expected.as_str()) {
                return Err(Failure::expectation(format!(
                    "stderr of `{}` contains {:?} (got {:?})",
                    self.run,
                    expected,
                    stderr.trim_end()
                )));
            }
        }

        Ok(())
    }
}

fn stderr_excerpt(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n{}", trimmed)
    }
}

/// The `[suite]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuiteSection {
    name: Option<String>,
    /// Milliseconds
    timeout: Option<u64>,
    before_all: Option<CommandSpec>,
    before_each: Option<CommandSpec>,
    after_each: Option<CommandSpec>,
    after_all: Option<CommandSpec>,
    #[serde(default)]
    env: BTreeMap<String, String>,
}

/// A parsed suite script.
#[derive(Debug, Clone)]
struct Script {
    name: String,
    dir: PathBuf,
    section: SuiteSection,
    /// Method name to command, in declaration order
    methods: Vec<(String, DetailedCommand)>,
}

impl Script {
    fn parse(path: &Path, source: &str) -> Result<Option<Self>, LoadError> {
        let invalid = |message: String| LoadError::Invalid {
            path: path.to_path_buf(),
            message,
        };

        let mut document: toml::Table = source.parse().map_err(|e: toml::de::Error| invalid(e.to_string()))?;

        let section = match document.remove("suite") {
            Some(value) => SuiteSection::deserialize(value)
                .map_err(|e| invalid(format!("invalid [suite] table: {}", e)))?,
            None => return Ok(None),
        };

        let mut methods = Vec::new();
        if let Some(value) = document.remove("tests") {
            let table = match value {
                toml::Value::Table(table) => table,
                other => return Err(invalid(format!("[tests] must be a table, found {}", other.type_str()))),
            };
            for (name, value) in table {
                let spec = CommandSpec::deserialize(value)
                    .map_err(|e| invalid(format!("invalid command for `{}`: {}", name, e)))?;
                methods.push((name, spec.into_detailed()));
            }
        }

        if let Some(key) = document.keys().next() {
            return Err(invalid(format!("unknown top-level key `{}`", key)));
        }

        let name = section.name.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        });
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Some(Script {
            name,
            dir,
            section,
            methods,
        }))
    }
}

/// Loads `.toml` suite scripts.
#[derive(Debug, Clone)]
pub struct ScriptLoader {
    extensions: Vec<String>,
}

impl Default for ScriptLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptLoader {
    pub fn new() -> Self {
        Self {
            extensions: vec!["toml".to_string()],
        }
    }

    /// Recognise files with any of `extensions` (without the leading dot).
    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.into().trim_start_matches('.').to_string())
                .collect(),
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl ModuleLoader for ScriptLoader {
    fn is_module(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|known| known == ext))
    }

    fn load_fresh(&self, path: &Path) -> Result<Export, LoadError> {
        let source = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source: Arc::new(source),
        })?;

        match Script::parse(path, &source)? {
            Some(script) => Ok(Export::Suite(Box::new(ScriptDefinition(Arc::new(script))))),
            None => Ok(Export::Other(format!(
                "{} has no [suite] table",
                path.display()
            ))),
        }
    }
}

struct ScriptDefinition(Arc<Script>);

impl SuiteDefinition for ScriptDefinition {
    fn name(&self) -> String {
        self.0.name.clone()
    }

    fn instantiate(&self) -> Box<dyn Suite> {
        Box::new(ScriptSuite {
            script: self.0.clone(),
        })
    }
}

struct ScriptSuite {
    script: Arc<Script>,
}

impl ScriptSuite {
    fn spawn(&self, label: &str, spec: Option<&DetailedCommand>, done: Done) -> HookResult {
        let Some(spec) = spec.cloned() else {
            done.pass();
            return Ok(Pending::Callback);
        };

        let mut command = shell(&spec.run);
        command
            .current_dir(&self.script.dir)
            .envs(&self.script.section.env)
            .env(SUITE_ENV, &self.script.name)
            .env(TEST_ENV, label)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        Ok(Pending::future(async move {
            let output = command
                .output()
                .await
                .with_context(|| format!("failed to run `{}`", spec.run))?;
            spec.verify(&output)
        }))
    }

    fn hook(&self, label: &str, spec: &Option<CommandSpec>, done: Done) -> HookResult {
        let detailed = spec.clone().map(CommandSpec::into_detailed);
        self.spawn(label, detailed.as_ref(), done)
    }
}

impl Suite for ScriptSuite {
    fn timeout(&self) -> Option<Duration> {
        self.script.section.timeout.map(Duration::from_millis)
    }

    fn methods(&self) -> Vec<String> {
        self.script
            .methods
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn before_all(&self, done: Done) -> HookResult {
        self.hook("beforeAll", &self.script.section.before_all, done)
    }

    fn before_each(&self, done: Done) -> HookResult {
        self.hook("beforeEach", &self.script.section.before_each, done)
    }

    fn after_each(&self, done: Done) -> HookResult {
        self.hook("afterEach", &self.script.section.after_each, done)
    }

    fn after_all(&self, done: Done) -> HookResult {
        self.hook("afterAll", &self.script.section.after_all, done)
    }

    fn call(&self, name: &str, done: Done) -> HookResult {
        match self.script.methods.iter().find(|(method, _)| method == name) {
            Some((_, spec)) => self.spawn(name, Some(spec), done),
            None => Err(Failure::error(format!(
                "suite `{}` has no method `{}`",
                self.script.name, name
            ))),
        }
    }
}

#[cfg(unix)]
fn shell(line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(line);
    command
}

#[cfg(windows)]
fn shell(line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(line);
    command
}

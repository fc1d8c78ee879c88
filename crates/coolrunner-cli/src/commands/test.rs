//! Test command - run every suite once

use super::{controller, load_config, run_config, RunArgs};
use crate::reporter::ConsoleReporter;
use anyhow::Result;
use std::path::Path;

/// Run the test command. Returns whether the run had no failures.
pub async fn run(cwd: &Path, args: RunArgs) -> Result<bool> {
    let config = load_config(cwd)?;
    let run_config = run_config(&config, &args)?;

    if !run_config.test_dir.is_dir() {
        tracing::warn!(test_dir = %run_config.test_dir.display(), "test directory does not exist");
    }

    let mut controller = controller(&config, run_config, ConsoleReporter::new(args.verbose));

    let mut outcome = false;
    controller.run(|success| outcome = success).await;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    #[serial]
    async fn test_command_no_tests_found() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("tests")).unwrap();

        let result = run(dir.path(), RunArgs::default()).await;
        assert!(result.unwrap());
    }

    #[tokio::test]
    #[serial]
    async fn test_command_reports_failure() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("tests")).unwrap();
        fs::write(
            dir.path().join("tests").join("broken.toml"),
            "[suite\nname = ",
        )
        .unwrap();

        let result = run(dir.path(), RunArgs::default()).await;
        assert!(!result.unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_command_discovers_and_runs() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("checks")).unwrap();
        fs::write(
            dir.path().join("checks").join("shell.toml"),
            "[suite]\n[tests]\ntest_true = \"true\"\n",
        )
        .unwrap();

        let args = RunArgs {
            test_dir: Some(dir.path().join("checks")),
            verbose: true,
            ..Default::default()
        };
        assert!(run(dir.path(), args).await.unwrap());
    }
}

//! Watch mode - rerun the suites whenever sources or tests change

use super::{controller, load_config, run_config, Controller, RunArgs};
use crate::reporter::ConsoleReporter;
use anyhow::{bail, Context, Result};
use colored::*;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Arguments for the watch command
#[derive(Debug, Clone, Default)]
pub struct WatchArgs {
    pub run: RunArgs,
    /// Source directory (overrides coolrunner.toml)
    pub src_dir: Option<PathBuf>,
    /// Don't clear the terminal before each run
    pub no_clear: bool,
}

/// Directories to watch: the source directory, plus the test directory when
/// it is a different one. Returns (existing, missing).
fn watch_targets(src_dir: &Path, test_dir: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut candidates = vec![src_dir.to_path_buf()];
    if !same_dir(src_dir, test_dir) {
        candidates.push(test_dir.to_path_buf());
    }
    candidates.into_iter().partition(|dir| dir.is_dir())
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Access events (opening, reading) never change what a run would see.
fn is_relevant(event: &Event) -> bool {
    !matches!(event.kind, EventKind::Access(_))
}

/// Run the watch command until Ctrl+C
pub async fn run(cwd: &Path, args: WatchArgs) -> Result<()> {
    let config = load_config(cwd)?;
    let run_config = run_config(&config, &args.run)?;
    let src_dir = args.src_dir.clone().unwrap_or_else(|| config.src_dir());

    let (targets, missing) = watch_targets(&src_dir, &run_config.test_dir);
    for dir in &missing {
        tracing::warn!(dir = %dir.display(), "watch directory does not exist");
        eprintln!(
            "{} {} does not exist, not watching it",
            "warning:".yellow().bold(),
            dir.display()
        );
    }
    if targets.is_empty() {
        bail!("Nothing to watch: none of the watch directories exist");
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })
    .context("Failed to create file watcher")?;

    for dir in &targets {
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to start watching {}", dir.display()))?;
        tracing::info!(dir = %dir.display(), "watching");
    }

    let reporter = ConsoleReporter::new(args.run.verbose)
        .with_clear_screen(!args.no_clear && config.clear_screen());
    let mut controller = controller(&config, run_config, reporter);

    println!("{}", "CoolRunner is watching for changes ...\n".cyan());
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };
    watch_until(&mut controller, &mut rx, shutdown).await;

    Ok(())
}

/// Run once, then again on every relevant change, until `shutdown` resolves
/// or the watcher goes away. A run in progress is abandoned on shutdown.
async fn watch_until(
    controller: &mut Controller,
    rx: &mut mpsc::UnboundedReceiver<notify::Result<Event>>,
    shutdown: impl Future<Output = ()>,
) {
    let watching = async {
        controller.run(|_| {}).await;
        while let Some(received) = rx.recv().await {
            match received {
                Ok(event) if is_relevant(&event) => {
                    tracing::debug!(paths = ?event.paths, kind = ?event.kind, "change detected");
                    if controller.run(|_| {}).await {
                        println!("{}", "Watching for changes ...".cyan());
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "watch error");
                    eprintln!("{} {}", "[watch] Error:".red(), err);
                }
            }
        }
    };

    tokio::select! {
        () = watching => tracing::debug!("watcher closed"),
        () = shutdown => tracing::debug!("shutdown requested"),
    }
}

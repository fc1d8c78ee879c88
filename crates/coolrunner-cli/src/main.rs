use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

mod commands;
mod config;
mod panic_hook;
mod reporter;

/// Lightweight test runner for suites with lifecycle hooks.
///
/// Discovers suite scripts under the test directory, runs each suite's
/// beforeAll, beforeEach, test, afterEach and afterAll steps in order, and
/// prints a summary of every failure.
///
/// EXAMPLES:
///     coolrunner test                       Run all suites once
///     coolrunner test --test-dir spec       Run suites from spec/
///     coolrunner watch                      Rerun on every change
///
/// ENVIRONMENT VARIABLES:
///     COOLRUNNER_TEST_DIR    Test directory
///     COOLRUNNER_SRC_DIR     Source directory watched by `watch`
///     COOLRUNNER_TIMEOUT_MS  Default timeout per hook and test
///     COOLRUNNER_NO_CLEAR    Set to disable clearing the terminal in watch mode
///     NO_COLOR               Set to disable colored output
///     RUST_LOG               Diagnostic log filter (default: warn)
#[derive(Parser)]
#[command(name = "coolrunner")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every suite once
    ///
    /// Exits with status 1 when any test, hook, or suite script failed.
    ///
    /// EXAMPLES:
    ///     coolrunner test                     Run suites from tests/
    ///     coolrunner test --timeout 500       Fail steps running over 500ms
    ///     coolrunner test --verbose           List every test
    #[command(visible_alias = "t")]
    Test {
        /// Directory containing suite scripts (default: tests)
        #[arg(long)]
        test_dir: Option<PathBuf>,
        /// Default timeout in milliseconds for each hook and test
        #[arg(long, value_name = "MS")]
        timeout: Option<u64>,
        /// Show each test instead of progress dots
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Rerun the suites whenever sources or tests change
    ///
    /// Watches the source directory and the test directory recursively.
    /// Runs starting less than the debounce window after the previous one
    /// are skipped.
    ///
    /// EXAMPLES:
    ///     coolrunner watch                    Watch src/ and tests/
    ///     coolrunner watch --src-dir lib      Watch lib/ and tests/
    ///     coolrunner watch --no-clear         Keep previous output
    #[command(visible_alias = "w")]
    Watch {
        /// Source directory to watch (default: src)
        #[arg(long)]
        src_dir: Option<PathBuf>,
        /// Directory containing suite scripts (default: tests)
        #[arg(long)]
        test_dir: Option<PathBuf>,
        /// Default timeout in milliseconds for each hook and test
        #[arg(long, value_name = "MS")]
        timeout: Option<u64>,
        /// Don't clear the terminal before each run
        #[arg(long)]
        no_clear: bool,
        /// Show each test instead of progress dots
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Generate shell completions
    ///
    /// EXAMPLES:
    ///     coolrunner completions bash > ~/.bash_completions/coolrunner.bash
    ///     coolrunner completions zsh > ~/.zfunc/_coolrunner
    ///     coolrunner completions fish > ~/.config/fish/completions/coolrunner.fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

fn main() -> Result<()> {
    init_tracing();
    panic_hook::install();
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Test {
            test_dir,
            timeout,
            verbose,
            no_color,
        } => {
            if no_color || cli_config.no_color {
                colored::control::set_override(false);
            }
            let args = commands::RunArgs {
                test_dir,
                timeout_ms: timeout,
                verbose,
            };
            let success = runtime()?.block_on(commands::test::run(&cwd, args))?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Watch {
            src_dir,
            test_dir,
            timeout,
            no_clear,
            verbose,
            no_color,
        } => {
            if no_color || cli_config.no_color {
                colored::control::set_override(false);
            }
            let args = commands::watch::WatchArgs {
                run: commands::RunArgs {
                    test_dir,
                    timeout_ms: timeout,
                    verbose,
                },
                src_dir,
                no_clear: no_clear || cli_config.no_clear,
            };
            runtime()?.block_on(commands::watch::run(&cwd, args))?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_test_flags() {
        let cli = Cli::parse_from([
            "coolrunner",
            "test",
            "--test-dir",
            "spec",
            "--timeout",
            "500",
            "-v",
            "--no-color",
        ]);
        match cli.command {
            Commands::Test {
                test_dir,
                timeout,
                verbose,
                no_color,
            } => {
                assert_eq!(test_dir, Some(PathBuf::from("spec")));
                assert_eq!(timeout, Some(500));
                assert!(verbose);
                assert!(no_color);
            }
            _ => panic!("Expected Test command"),
        }
    }

    #[test]
    fn test_cli_watch_flags() {
        let cli = Cli::parse_from(["coolrunner", "watch", "--src-dir", "lib", "--no-clear"]);
        match cli.command {
            Commands::Watch {
                src_dir, no_clear, ..
            } => {
                assert_eq!(src_dir, Some(PathBuf::from("lib")));
                assert!(no_clear);
            }
            _ => panic!("Expected Watch command"),
        }
    }

    #[test]
    fn test_alias_t_for_test() {
        let cli = Cli::parse_from(["coolrunner", "t"]);
        assert!(matches!(cli.command, Commands::Test { .. }));
    }

    #[test]
    fn test_alias_w_for_watch() {
        let cli = Cli::parse_from(["coolrunner", "w"]);
        assert!(matches!(cli.command, Commands::Watch { .. }));
    }

    #[test]
    fn test_timeout_must_be_numeric() {
        assert!(Cli::try_parse_from(["coolrunner", "test", "--timeout", "soon"]).is_err());
    }

    #[test]
    fn test_completions_bash() {
        let cli = Cli::parse_from(["coolrunner", "completions", "bash"]);
        match cli.command {
            Commands::Completions { shell } => assert_eq!(shell, Shell::Bash),
            _ => panic!("Expected Completions command"),
        }
    }
}

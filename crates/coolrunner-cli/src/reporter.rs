//! Console reporter - progress dots and the colored final report

use colored::*;
use coolrunner_core::{ErrorRecord, Report, Reporter};
use std::io::{self, Write};
use std::path::Path;

/// Writes run progress to a terminal.
pub struct ConsoleReporter<W: Write = io::Stdout> {
    out: W,
    /// One line per test instead of dots
    verbose: bool,
    /// Clear the terminal when a run starts
    clear_screen: bool,
    /// Whether a line of progress dots is open
    dots: bool,
}

impl ConsoleReporter {
    /// Create a reporter writing to stdout
    pub fn new(verbose: bool) -> Self {
        Self::with_writer(io::stdout(), verbose)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn with_writer(out: W, verbose: bool) -> Self {
        Self {
            out,
            verbose,
            clear_screen: false,
            dots: false,
        }
    }

    /// Clear the terminal at the start of every run (watch mode)
    pub fn with_clear_screen(mut self, clear_screen: bool) -> Self {
        self.clear_screen = clear_screen;
        self
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn progress(&mut self, mark: ColoredString) {
        let _ = write!(self.out, "{}", mark);
        let _ = self.out.flush();
        self.dots = true;
    }

    fn end_dots(&mut self) {
        if self.dots {
            let _ = writeln!(self.out);
            self.dots = false;
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn on_run_start(&mut self, test_dir: &Path) {
        if self.clear_screen {
            // ANSI: clear screen, cursor home
            let _ = write!(self.out, "\x1B[2J\x1B[1;1H");
        }
        self.dots = false;
        if self.verbose {
            let _ = writeln!(self.out, "{} {}", "Running".bold(), test_dir.display());
        }
    }

    fn on_suite_start(&mut self, name: &str) {
        if self.verbose {
            let _ = writeln!(self.out, "\n{}", name.bold());
        }
    }

    fn on_pass(&mut self, _suite: &str, test: &str) {
        if self.verbose {
            let _ = writeln!(self.out, "  {} {}", "PASS".green().bold(), test);
        } else {
            self.progress(".".cyan());
        }
    }

    fn on_failure(&mut self, record: &ErrorRecord) {
        if self.verbose {
            let _ = writeln!(
                self.out,
                "  {} {}",
                "FAIL".red().bold(),
                record.test_name
            );
        } else {
            self.progress("F".red());
        }
    }

    fn on_report(&mut self, report: &Report) {
        self.end_dots();
        match report {
            Report::Failures(failures) => {
                let _ = writeln!(
                    self.out,
                    "\n{}\n",
                    format!("ERRORS: {}", failures.len()).red().bold()
                );
                for failure in failures {
                    let _ = writeln!(self.out, "{}", failure.label);
                    let _ = writeln!(self.out, "{}\n", failure.detail.red());
                }
            }
            Report::AllPassed { passed } => {
                let _ = writeln!(self.out, "\n{}", "All tests pass!".bright_green().bold());
                if self.verbose {
                    let _ = writeln!(
                        self.out,
                        "{} test{} passed",
                        passed,
                        if *passed == 1 { "" } else { "s" }
                    );
                }
                let _ = writeln!(self.out);
            }
            Report::NoTests => {
                let _ = writeln!(self.out, "\n{}\n", "No test cases found!".cyan());
            }
        }
        let _ = self.out.flush();
    }
}

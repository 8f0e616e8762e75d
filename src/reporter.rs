//! Terminal progress output for the command line

use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use mirror_sync::sync::{ProgressObserver, SyncProgress};

/// Renders sync progress as a bar, or one line per package when verbose
pub struct TerminalReporter {
    verbose: bool,
    bar: ProgressBar,
}

impl TerminalReporter {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            bar: ProgressBar::hidden(),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.dim} [{bar:20.green/dim}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("✓✓ "))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl ProgressObserver for TerminalReporter {
    fn on_event(&self, event: &SyncProgress) {
        match event {
            SyncProgress::SkippedCached { count } => {
                if self.verbose {
                    println!(
                        "{}",
                        style(format!("\nSkipping {} already synced package(s)\n", count)).dim()
                    );
                }
            }
            SyncProgress::AllCached => {
                if self.verbose {
                    println!("{}", style("All packages have been synced already!").green());
                }
            }
            SyncProgress::Starting { total, concurrency } => {
                if self.verbose {
                    println!(
                        "{}",
                        style(format!(
                            "\nSyncing {} package(s) with concurrency {}...\n",
                            total, concurrency
                        ))
                        .dim()
                    );
                } else {
                    self.bar.set_length(*total as u64);
                    self.bar.set_style(Self::bar_style());
                    self.bar.set_prefix("Progress");
                    self.bar.set_draw_target(ProgressDrawTarget::stderr());
                }
            }
            SyncProgress::PackageSynced { package, .. } => {
                if self.verbose {
                    println!("{}", style(format!("  ✓ {}", package)).green());
                } else {
                    self.bar.set_message(package.clone());
                    self.bar.inc(1);
                }
            }
            SyncProgress::PackageFailed { package, error, .. } => {
                if self.verbose {
                    println!("{}", style(format!("  ✗ {}: {}", package, error)).red());
                } else {
                    self.bar.set_message(package.clone());
                    self.bar.inc(1);
                }
            }
            SyncProgress::Finished { failures, .. } => {
                if !self.verbose {
                    self.bar.finish_and_clear();
                }
                if !failures.is_empty() {
                    println!(
                        "{}",
                        style(format!("\n{} package(s) failed to sync:", failures.len())).red()
                    );
                    for (package, error) in failures {
                        println!("{}", style(format!("  - {}: {}", package, error)).red());
                    }
                }
            }
        }
    }
}

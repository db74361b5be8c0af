//! Progress reporting for a comparison run
//!
//! Provides a live spinner using indicatif. Everything goes to stderr so the
//! report on stdout stays clean.

use crate::engine::ComparisonProgress;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Progress reporter that displays comparison status
pub struct ProgressReporter {
    /// Progress bar
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        // A static template only fails to parse if it is malformed
        if let Ok(spinner) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(spinner.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &ComparisonProgress) {
        let msg = format!(
            "Entries: {} | Size: {} | Rate: {:.0}/s",
            format_number(progress.reported),
            format_size(progress.bytes, BINARY),
            progress.entries_per_second(),
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the run
pub fn print_header(tree1: &Path, tree2: &Path, workers: usize, check_hashes: bool) {
    eprintln!();
    eprintln!(
        "{} {}",
        style("difftree").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Tree 1:").bold(), tree1.display());
    eprintln!("  {} {}", style("Tree 2:").bold(), tree2.display());
    eprintln!("  {} {}", style("Workers:").bold(), workers);
    eprintln!(
        "  {} {}",
        style("Hashes:").bold(),
        if check_hashes { "SHA-256" } else { "size only" }
    );
    eprintln!();
}

/// Print run timing after the summary table
pub fn print_timing(entries: u64, bytes: u64, duration: Duration) {
    let secs = duration.as_secs_f64();
    let rate = if secs > 0.0 { entries as f64 / secs } else { 0.0 };

    eprintln!(
        "  {} {} entries, {} in {:.1}s ({:.0} entries/sec)",
        style("Compared:").bold(),
        format_number(entries),
        format_size(bytes, BINARY),
        secs,
        rate
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }
}

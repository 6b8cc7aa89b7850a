//! Progress reporting for share log conversion
//!
//! Provides a live spinner using indicatif and a summary at the end of a run.

use crate::parquet::convert::ConvertStats;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter that displays conversion status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        if let Ok(spinner) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(spinner.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, records_read: u64, shares_written: u64) {
        let rate = match self.bar.elapsed().as_secs_f64() {
            secs if secs > 0.0 => records_read as f64 / secs,
            _ => 0.0,
        };

        self.bar.set_message(format!(
            "Read: {} | Written: {} | Rate: {:.0}/s",
            format_number(records_read),
            format_number(shares_written),
            rate,
        ));
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Print a summary of the conversion
pub fn print_summary(stats: &ConvertStats, output_path: &str) {
    let duration_secs = stats.duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        stats.records_read as f64 / duration_secs
    } else {
        0.0
    };

    let title = if stats.completed {
        style("Conversion Complete").green().bold()
    } else {
        style("Conversion Interrupted").yellow().bold()
    };

    println!();
    println!("{}", title);
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Records read:").bold(),
        format_number(stats.records_read)
    );
    println!(
        "  {} {}",
        style("Shares written:").bold(),
        format_number(stats.shares_written)
    );
    println!(
        "  {} {}",
        style("Row groups:").bold(),
        format_number(stats.row_groups)
    );
    println!(
        "  {} {:.1}s ({:.0} records/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    if stats.skipped() > 0 {
        println!(
            "  {} {} (unsupported version: {}, malformed: {}, truncated: {})",
            style("Skipped:").yellow().bold(),
            format_number(stats.skipped()),
            stats.skipped_unsupported,
            stats.skipped_malformed,
            stats.truncated_frames
        );
    }
    if stats.degraded_ips > 0 {
        println!(
            "  {} {}",
            style("Unparseable IPs:").yellow().bold(),
            format_number(stats.degraded_ips)
        );
    }
    println!(
        "  {} {} ({})",
        style("Output:").bold(),
        output_path,
        format_size(stats.bytes_written, BINARY)
    );
    println!();
}

/// Print a header at the start of the conversion
pub fn print_header(input: &str, output: &str, row_group_size: usize) {
    println!();
    println!(
        "{} {}",
        style("sharelog-to-parquet").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Input:").bold(), input);
    println!("  {} {}", style("Output:").bold(), output);
    println!(
        "  {} {}",
        style("Row group size:").bold(),
        format_number(row_group_size as u64)
    );
    println!();
}

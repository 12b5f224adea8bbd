//! CLI presenter for output formatting

use std::io::{self, Write};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.cyan} {msg}")
                .unwrap(),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    /// Mark spinner as failed and finish
    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout (machine-readable results)
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Print an inline question, leaving the cursor on the same line
    pub fn prompt(&self, text: &str) {
        eprint!("{}", text);
        let _ = io::stderr().flush();
    }

    /// Format elapsed milliseconds as a m:ss clock
    pub fn format_elapsed(&self, elapsed_ms: u64) -> String {
        let total_secs = elapsed_ms / 1000;
        format!("{}:{:02}", total_secs / 60, total_secs % 60)
    }

    /// Update the spinner with the live recording clock
    pub fn update_recording_progress(&self, elapsed_ms: u64, limit_ms: u64) {
        self.update_spinner(&format!(
            "Recording... {} / {}",
            self.format_elapsed(elapsed_ms),
            self.format_elapsed(limit_ms)
        ));
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_elapsed_at_zero() {
        let presenter = Presenter::new();
        assert_eq!(presenter.format_elapsed(0), "0:00");
    }

    #[test]
    fn format_elapsed_under_a_minute() {
        let presenter = Presenter::new();
        assert_eq!(presenter.format_elapsed(5_000), "0:05");
        assert_eq!(presenter.format_elapsed(59_999), "0:59");
    }

    #[test]
    fn format_elapsed_past_a_minute() {
        let presenter = Presenter::new();
        assert_eq!(presenter.format_elapsed(65_000), "1:05");
        assert_eq!(presenter.format_elapsed(600_000), "10:00");
    }
}

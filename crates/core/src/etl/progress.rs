//! Progress reporting for directory passes
//!
//! Uses `indicatif`; a disabled reporter draws nothing, so callers never need
//! to branch on whether progress is shown.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {prefix} files {msg}";

/// Progress bar over the files of one directory pass
pub struct LoadProgress {
    bar: ProgressBar,
}

impl LoadProgress {
    /// Create a reporter for `total_files` files labelled `prefix`
    pub fn new(total_files: u64, prefix: &str, enabled: bool) -> Self {
        if !enabled {
            return Self::hidden();
        }

        let bar = ProgressBar::new(total_files);
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░  ");
        bar.set_style(style);
        bar.set_prefix(prefix.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A reporter that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Increment file progress by one
    pub fn inc_file(&self) {
        self.bar.inc(1);
    }

    /// Show the running songplay count
    pub fn update_songplays(&self, count: u64) {
        self.bar
            .set_message(format!("({} songplays)", format_number(count)));
    }

    /// Mark a file as skipped
    pub fn skip_file(&self, reason: &str) {
        self.bar.println(format!("  ⊘ Skipped: {}", reason));
        self.bar.inc(1);
    }

    /// Finish with success message
    pub fn finish_success(&self, msg: &str) {
        self.bar.finish_with_message(format!("✓ {}", msg));
    }

    /// Finish with error message
    pub fn finish_error(&self, msg: &str) {
        self.bar.abandon_with_message(format!("✗ {}", msg));
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

/// Format a number with thousand separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

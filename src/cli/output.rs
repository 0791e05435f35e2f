//! Output formatting for CLI

use songplay_core::etl::{LoadStats, RunReport, format_bytes, format_number};
use songplay_core::store::TableCounts;

use super::error::CliError;

/// Format table row counts, one table per line
pub fn format_table_counts(counts: &TableCounts) -> String {
    let rows = [
        ("songplays", counts.songplays),
        ("users", counts.users),
        ("songs", counts.songs),
        ("artists", counts.artists),
        ("time", counts.time),
    ];

    let mut output = String::new();
    for (table, count) in rows {
        output.push_str(&format!(
            "  {:<10} {:>12}\n",
            table,
            format_number(count.max(0) as u64)
        ));
    }
    output
}

fn format_pass(label: &str, stats: &LoadStats) -> String {
    let mut output = format!(
        "  {}: {}/{} files processed ({}), {} records",
        label,
        stats.files_processed,
        stats.files_found,
        format_bytes(stats.bytes_processed),
        format_number(stats.records_read as u64)
    );
    if stats.files_failed > 0 {
        output.push_str(&format!(", {} skipped", stats.files_failed));
    }
    output.push('\n');
    output
}

/// Format a run report for the terminal
pub fn format_run_report(report: &RunReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n✅ Run {} completed in {} ({})\n\n",
        report.run_id,
        report.duration_formatted(),
        report.backend
    ));
    output.push_str(&format_pass("song_data", &report.songs));
    output.push_str(&format_pass("log_data", &report.logs));
    output.push_str(&format!(
        "\nSongplays: {} inserted, {} unresolved, {} already present\n",
        format_number(report.logs.songplays_inserted as u64),
        format_number(report.logs.unresolved_songplays as u64),
        format_number(report.logs.duplicate_songplays as u64)
    ));
    output.push_str(&format!(
        "Throughput: {:.0} records/s\n",
        report.total().throughput()
    ));

    output.push_str("\nTable counts:\n");
    output.push_str(&format_table_counts(&report.counts));

    let total = report.total();
    if !total.errors.is_empty() {
        output.push_str(&format!("\n⚠️  Skipped files ({}):\n", total.errors_count));
        for error in &total.errors {
            output.push_str(&format!("  - {}\n", error));
        }
        if total.errors_count > total.errors.len() {
            output.push_str(&format!(
                "  ... and {} more\n",
                total.errors_count - total.errors.len()
            ));
        }
    }

    output
}

/// Serialize any report as pretty JSON
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RunReport {
        let mut logs = LoadStats::new();
        logs.files_found = 2;
        logs.files_processed = 1;
        logs.files_failed = 1;
        logs.songplays_inserted = 6820;
        logs.add_error("log_data/bad.json: Parse error".to_string());

        RunReport {
            run_id: "test-run".to_string(),
            backend: "memory".to_string(),
            songs: LoadStats::new(),
            logs,
            counts: TableCounts {
                songplays: 6820,
                users: 96,
                songs: 71,
                artists: 69,
                time: 6813,
            },
            duration_ms: 2500,
        }
    }

    #[test]
    fn test_format_table_counts() {
        let output = format_table_counts(&report().counts);
        assert!(output.contains("songplays"));
        assert!(output.contains("6,820"));
        assert_eq!(output.lines().count(), 5);
    }

    #[test]
    fn test_format_run_report_lists_skipped_files() {
        let output = format_run_report(&report());
        assert!(output.contains("Run test-run completed in 2.500s"));
        assert!(output.contains("1 skipped"));
        assert!(output.contains("log_data/bad.json"));
    }

    #[test]
    fn test_to_json() {
        let json = to_json(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["counts"]["users"], 96);
        assert_eq!(value["logs"]["filesFailed"], 1);
    }
}

//! Output formatting for CLI commands.

use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use regsweep_reconcile::{Deletion, DeletionReason, ListingBucket, ReportCounts};

/// Output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

#[derive(Tabled)]
struct VersionRow {
    #[tabled(rename = "Group")]
    group: String,

    #[tabled(rename = "ID")]
    id: u64,

    #[tabled(rename = "Digest")]
    digest: String,

    #[tabled(rename = "Tags")]
    tags: String,

    #[tabled(rename = "Created")]
    created_at: String,
}

/// Print listing buckets in the specified format.
pub fn print_listing(buckets: &[ListingBucket], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let rows: Vec<VersionRow> = buckets
                .iter()
                .flat_map(|bucket| {
                    let group = bucket.tags.join(", ");
                    bucket.records.iter().map(move |record| VersionRow {
                        group: group.clone(),
                        id: record.id,
                        digest: record.digest.clone(),
                        tags: record.tags.join(", "),
                        created_at: record.created_at.to_rfc3339(),
                    })
                })
                .collect();
            if rows.is_empty() {
                println!("{}", "No package versions found.".dimmed());
            } else {
                println!("{}", Table::new(rows));
            }
        }
        OutputFormat::Json => print_json(&buckets),
    }
}

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,

    #[tabled(rename = "Count")]
    count: usize,
}

/// Print reconciliation counts in the specified format.
pub fn print_report(counts: &ReportCounts, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let rows = vec![
                CountRow {
                    metric: "Ledger records",
                    count: counts.ledger_records,
                },
                CountRow {
                    metric: "Distinct digests",
                    count: counts.distinct_digests,
                },
                CountRow {
                    metric: "Total tags",
                    count: counts.total_tags,
                },
                CountRow {
                    metric: "Orphan digests",
                    count: counts.orphans,
                },
                CountRow {
                    metric: "Deletion targets",
                    count: counts.deletion_targets,
                },
                CountRow {
                    metric: "Dangling references",
                    count: counts.dangling,
                },
                CountRow {
                    metric: "Cross-references",
                    count: counts.cross_references,
                },
            ];
            println!("{}", Table::new(rows));
        }
        OutputFormat::Json => print_json(counts),
    }
}

/// Print the deletion plan before any deletion call is made, so the
/// operator can abort before data loss if the counts look wrong.
pub fn print_plan(deletions: &[Deletion], format: OutputFormat) {
    let tagged = deletions
        .iter()
        .filter(|d| d.reason == DeletionReason::Tagged)
        .count();
    let orphans = deletions.len() - tagged;
    match format {
        OutputFormat::Table => {
            print_info(&format!(
                "Deleting {} package versions ({} tagged, {} orphans).",
                deletions.len(),
                tagged,
                orphans
            ));
        }
        OutputFormat::Json => print_json(&deletions),
    }
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green().bold(), message);
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue().bold(), message);
}

fn print_json<T: Serialize + ?Sized>(data: &T) {
    let json = serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
    println!("{json}");
}

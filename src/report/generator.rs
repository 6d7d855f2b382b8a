//! Report generation.
//!
//! This module wraps ranked rows and totals into the audit's table schema
//! and renders the complete report as Markdown or JSON.

use crate::analysis::informative_score;
use crate::models::{
    AuditResult, RankedRow, Report, ReportMetadata, Summary, TableDetails, TableHeading,
};
use anyhow::Result;
use url::Url;

/// Build the audit result for a set of ranked rows.
pub fn assemble_audit(rows: Vec<RankedRow>, summary: Summary) -> AuditResult {
    let score = informative_score(&rows);
    let display_value = if rows.is_empty() {
        String::new()
    } else {
        format!(
            "Third-party code blocked the main thread for {} ms",
            format_number(round_to_ten(summary.wasted_ms))
        )
    };

    AuditResult {
        score,
        display_value,
        details: TableDetails {
            details_type: "table".to_string(),
            headings: table_headings(),
            items: rows,
            summary,
        },
    }
}

fn table_headings() -> Vec<TableHeading> {
    [
        ("entity", "link", "Third-Party"),
        ("transferSize", "bytes", "Transfer Size"),
        ("mainThreadTime", "ms", "Main-Thread Time"),
    ]
    .into_iter()
    .map(|(key, value_type, label)| TableHeading {
        key: key.to_string(),
        value_type: value_type.to_string(),
        label: label.to_string(),
    })
    .collect()
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, include_summary: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", report.title));

    if !report.audit.display_value.is_empty() {
        output.push_str(&format!("**{}**\n\n", report.audit.display_value));
    }

    output.push_str(&generate_metadata_section(&report.metadata));

    if include_summary {
        output.push_str(&generate_summary_section(&report.audit));
    }

    output.push_str(&generate_table_section(&report.audit.details));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Network Records:** {} (`{}`)\n",
        metadata.records_analyzed, metadata.network_file
    ));
    section.push_str(&format!(
        "- **Main-Thread Tasks:** {} (`{}`)\n",
        metadata.tasks_analyzed, metadata.tasks_file
    ));
    section.push_str(&format!(
        "- **CPU Multiplier:** {}x\n",
        metadata.cpu_multiplier
    ));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the summary section.
fn generate_summary_section(audit: &AuditResult) -> String {
    let summary = &audit.details.summary;
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Third Parties | Transfer Size | Main-Thread Time | Score |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        audit.details.items.len(),
        format_bytes(summary.wasted_bytes),
        format_ms(summary.wasted_ms),
        audit.score
    ));

    section
}

/// Generate the ranked table.
fn generate_table_section(details: &TableDetails) -> String {
    let mut section = String::new();

    section.push_str("## Third-Party Usage\n\n");

    if details.items.is_empty() {
        section.push_str("No third-party code was detected on this page.\n\n");
        return section;
    }

    let labels: Vec<&str> = details.headings.iter().map(|h| h.label.as_str()).collect();
    section.push_str(&format!("| {} |\n", labels.join(" | ")));
    section.push_str("|:---|---:|---:|\n");

    for row in &details.items {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            entity_link(row),
            format_bytes(row.transfer_size),
            format_ms(row.main_thread_time)
        ));
    }
    section.push('\n');

    section
}

fn entity_link(row: &RankedRow) -> String {
    let name = row.entity.replace('|', "\\|");
    match row.entity_homepage.as_deref().and_then(link_destination) {
        Some(homepage) => format!("[{}]({})", name, homepage),
        None => name,
    }
}

/// Normalize a homepage for use as a Markdown link destination.
///
/// `Url` percent-encodes spaces; parentheses and pipes are encoded here since
/// they would end the link or split the table cell. Unparseable homepages
/// yield `None`.
fn link_destination(homepage: &str) -> Option<String> {
    let url = Url::parse(homepage.trim()).ok()?;
    Some(
        url.as_str()
            .replace('(', "%28")
            .replace(')', "%29")
            .replace('|', "%7C"),
    )
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by tpaudit*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

fn round_to_ten(ms: f64) -> u64 {
    ((ms / 10.0).round() * 10.0).max(0.0) as u64
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    }
}

fn format_ms(ms: f64) -> String {
    format!("{} ms", format_number(ms.round().max(0.0) as u64))
}

fn format_number(num: u64) -> String {
    let digits = num.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

use colored::Colorize;

use crate::provisioner::models::{AccountInfo, ProvisionReport};

/// Build a table with columns and rows
pub fn format_table(headers: Vec<&str>, rows: Vec<Vec<String>>) -> String {
    let col_widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let mut width = header.len();
            for row in &rows {
                if i < row.len() {
                    width = width.max(row[i].len());
                }
            }
            width
        })
        .collect();

    let header_line = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = col_widths[i]))
        .collect::<Vec<_>>()
        .join(" | ");

    let mut out = String::new();
    out.push_str(&header_line.bold().to_string());
    out.push('\n');
    out.push_str(&"-".repeat(header_line.len()));
    out.push('\n');

    for row in rows {
        let row_line = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = col_widths.get(i).copied().unwrap_or(20);
                format!("{:width$}", cell, width = width)
            })
            .collect::<Vec<_>>()
            .join(" | ");
        out.push_str(&row_line);
        out.push('\n');
    }
    out
}

/// Format a single record as key-value pairs
pub fn format_record(data: Vec<(&str, String)>) {
    let max_key_len = data.iter().map(|(k, _)| k.len()).max().unwrap_or(20);

    for (key, value) in data {
        let padded_key = format!("{:width$}", key, width = max_key_len);
        println!("  {}: {}", padded_key.bright_cyan(), value);
    }
}

/// Format a header
pub fn print_header(text: &str) {
    println!();
    println!("{}", text.bold().bright_cyan());
    println!("{}", "=".repeat(text.len()));
    println!();
}

fn optional(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn account_row(account: &AccountInfo) -> Vec<String> {
    vec![
        account.local_name.clone(),
        account.address.clone(),
        optional(account.account_number),
        optional(account.sequence),
    ]
}

/// Print counters and resolved accounts of a finished run
pub fn print_report_summary(report: &ProvisionReport) {
    print_header("Provisioning Run Complete");

    let stats = &report.stats;
    let rate = format!("({:.1}%)", stats.success_rate());
    format_record(vec![
        ("Run ID", report.run_id.to_string()),
        ("Chain", report.chain_id.clone()),
        ("Requested", stats.requested.to_string()),
        ("Created", stats.created.to_string()),
        ("Funded", stats.funded.to_string()),
        ("Resolved", format!("{} {}", stats.resolved, rate.bright_green())),
        ("Duration", format!("{:.2}s", report.duration_seconds())),
    ]);

    if stats.funding_skipped > 0 {
        println!(
            "  {} {} accounts left unfunded: more sub faucets than accounts",
            "⚠".bright_yellow(),
            stats.funding_skipped
        );
    }
    if stats.dropped > 0 {
        println!(
            "  {} {} accounts dropped along the way",
            "⚠".bright_yellow(),
            stats.dropped
        );
    }

    if !report.accounts.is_empty() {
        println!();
        let rows = report.accounts.iter().map(account_row).collect();
        print!("{}", format_table(vec!["Name", "Address", "Number", "Sequence"], rows));
    }
}

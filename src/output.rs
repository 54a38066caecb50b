use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;

use crate::aggregate::{AggregateStats, Inventory};
use crate::models::{bytes_to_gb, bytes_to_mb, bytes_to_tb, LifecyclePolicy, RecordRow, RepositoryRecord};

pub const CSV_FILE_NAME: &str = "repo_info.csv";
pub const JSON_FILE_NAME: &str = "repo_info.json";

const CSV_HEADER: [&str; 8] = [
    "name",
    "lifecycle_policy",
    "image_count",
    "total_size_bytes",
    "total_size_mb",
    "total_size_gb",
    "total_size_tb",
    "tags",
];

const BANNER: &str = r"
 .-----.----.----.
 |  -__|  __|   _|
 |_____|____|__|

 .--.--.-----.---.-.-----.-----.
 |  |  |__ --|  _  |  _  |  -__|
 |_____|_____|___._|___  |_____|
                   |_____|    __
 .----.-----.-----.-----.----|  |_
 |   _|  -__|  _  |  _  |   _|   _|
 |__| |_____|   __|_____|__| |____|
            |__|
";

/// Where and how much to report
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub output_dir: PathBuf,
    pub top: usize,
}

pub fn print_banner() {
    println!("{}", BANNER.cyan());
}

/// Counter bar shown while repositories are being collected
pub fn progress_bar(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:50}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar
}

/// Emit the full report: details, CSV, summary, top-N, JSON, statistics.
pub fn emit_report(inventory: &Inventory, options: &ReportOptions) -> Result<()> {
    for record in &inventory.records {
        print_record(record);
    }

    let csv_path = options.output_dir.join(CSV_FILE_NAME);
    write_csv(&csv_path, &inventory.records)?;

    println!("{}", "Summary Report:".bold());
    for line in summary_lines(&inventory.stats) {
        println!("{}", line);
    }

    println!("\n{}", format!("Top {} biggest repositories by size:", options.top).bold());
    for line in leaderboard_lines(&inventory.records, options.top) {
        println!("{}", line);
    }

    let json_path = options.output_dir.join(JSON_FILE_NAME);
    write_json(&json_path, &inventory.records)?;

    println!("\n{}", "Statistics:".bold());
    for line in statistics_lines(inventory) {
        println!("{}", line);
    }
    println!(
        "\nWrote {} and {}",
        csv_path.display().to_string().dimmed(),
        json_path.display().to_string().dimmed()
    );

    Ok(())
}

fn print_record(record: &RepositoryRecord) {
    let mut lines = record_lines(record).into_iter();
    if let Some(first) = lines.next() {
        println!("{}", first.bold());
    }
    for line in lines {
        println!("{}", line);
    }
    println!();
}

fn policy_text(policy: &LifecyclePolicy) -> String {
    match policy {
        LifecyclePolicy::Absent => "None".to_string(),
        rules => rules.to_json_text(),
    }
}

fn size_text(bytes: u64) -> String {
    format!(
        "{:.3} bytes ({:.3} MB) ({:.3} GB) ({:.3} TB)",
        bytes as f64,
        bytes_to_mb(bytes),
        bytes_to_gb(bytes),
        bytes_to_tb(bytes)
    )
}

pub fn record_lines(record: &RepositoryRecord) -> Vec<String> {
    let mut lines = vec![
        format!("Repository: {}", record.name),
        format!("Lifecycle Policy: {}", policy_text(&record.lifecycle_policy)),
        format!("Number of Images: {}", record.image_count),
        format!("Total Size: {}", size_text(record.total_size_bytes)),
        "Tags:".to_string(),
    ];
    lines.extend(record.tags.iter().map(|t| format!("  {}: {}", t.key, t.value)));
    lines
}

pub fn summary_lines(stats: &AggregateStats) -> Vec<String> {
    let bytes = stats.total_size_bytes_all_repos;
    vec![
        "Total size of all repositories:".to_string(),
        format!("{:.3} TB", bytes_to_tb(bytes)),
        format!("{:.3} GB", bytes_to_gb(bytes)),
        format!("{:.3} MB", bytes_to_mb(bytes)),
        format!("{:.3} bytes", bytes as f64),
    ]
}

/// 1-indexed leaderboard of the first `top` records, which are already sorted by size
pub fn leaderboard_lines(records: &[RepositoryRecord], top: usize) -> Vec<String> {
    records
        .iter()
        .take(top)
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. {} - {} images - {}",
                i + 1,
                r.name,
                r.image_count,
                size_text(r.total_size_bytes)
            )
        })
        .collect()
}

pub fn statistics_lines(inventory: &Inventory) -> Vec<String> {
    let stats = &inventory.stats;
    let mut lines = vec![
        format!("Total number of repositories: {}", stats.total_repos),
        format!(
            "Total number of images across all repositories: {}",
            stats.total_images
        ),
        format!(
            "Number of repositories without tags: {}",
            stats.repos_without_tags
        ),
        format!(
            "Number of repositories without lifecycle policies: {}",
            stats.repos_without_policy
        ),
    ];
    if !inventory.failures.is_empty() {
        lines.push(format!(
            "Number of repositories that failed: {}",
            inventory.failures.len()
        ));
    }
    if inventory.skipped > 0 {
        lines.push(format!(
            "Number of repositories not collected before timeout: {}",
            inventory.skipped
        ));
    }
    lines
}

/// One flat row per record; policy and tags become embedded JSON text.
pub fn write_csv(path: &Path, records: &[RepositoryRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.write_record([
            record.name.clone(),
            record.lifecycle_policy.to_json_text(),
            record.image_count.to_string(),
            record.total_size_bytes.to_string(),
            format!("{:?}", record.total_size_mb()),
            format!("{:?}", record.total_size_gb()),
            format!("{:?}", record.total_size_tb()),
            record.tags_json_text(),
        ])?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Array of records, keys sorted, 4-space indentation
pub fn write_json(path: &Path, records: &[RepositoryRecord]) -> Result<()> {
    let rows = records
        .iter()
        .map(|r| serde_json::to_value(RecordRow::from(r)).map(sort_keys))
        .collect::<Result<Vec<_>, _>>()?;

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    Value::Array(rows).serialize(&mut serializer)?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

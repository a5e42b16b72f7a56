// Report files: one CSV per table plus the summary text, or a single JSON
// document holding everything.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::report::{Report, Table, SUMMARY_NAME};

/// On-disk format for the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One `<name>.csv` per table plus `analysis_summary.txt`
    Csv,
    /// A single `seolens_report.json`
    Json,
}

/// Quote a CSV cell when it contains the delimiter, a quote, or a line break.
pub fn escape_csv(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Render a table as CSV text with a header row.
pub fn to_csv(table: &Table) -> String {
    let mut out = String::new();
    let header: Vec<String> = table.columns.iter().map(|c| escape_csv(c)).collect();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(|c| escape_csv(c)).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    let mut file =
        fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write every artifact into `dir`, creating it if needed. Returns the paths
/// written, in artifact order.
pub fn write_report(report: &Report, dir: &Path, format: OutputFormat) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut written = Vec::new();
    match format {
        OutputFormat::Csv => {
            for table in &report.tables {
                let path = dir.join(format!("{}.csv", table.name));
                write_file(&path, &to_csv(table))?;
                written.push(path);
            }
            let path = dir.join(format!("{SUMMARY_NAME}.txt"));
            write_file(&path, &report.summary)?;
            written.push(path);
        }
        OutputFormat::Json => {
            let path = dir.join("seolens_report.json");
            let json = serde_json::to_string_pretty(report)?;
            write_file(&path, &json)?;
            written.push(path);
        }
    }

    info!(files = written.len(), dir = %dir.display(), "Report written");
    Ok(written)
}

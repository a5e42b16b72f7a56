use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use seolens::config::{self, Config};
use seolens::output::files::OutputFormat;
use seolens::record::Field;
use seolens::{AnalysisError, Session, SessionLock};

/// seolens: find duplicate titles and meta descriptions in SEO crawl exports.
///
/// Streams a CSV/TSV export in chunks, groups identical (case- and
/// whitespace-insensitive) titles and meta descriptions, counts frequent
/// word n-grams, and breaks everything down by page type.
#[derive(Parser)]
#[command(name = "seolens", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze an export and write the report files
    Analyze {
        /// Path to the CSV/TSV export
        input: PathBuf,

        /// Field delimiter (e.g. "," ";" "|" or "tab"); default ","
        #[arg(long)]
        delimiter: Option<String>,

        /// Records per chunk (default: 100000)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// N-gram sizes to count, comma separated (default: 2,3,4; "" disables)
        #[arg(long)]
        ngram_sizes: Option<String>,

        /// Top n-grams kept per table and page type (default: 50)
        #[arg(long)]
        top_k: Option<usize>,

        /// Leave out n-grams seen fewer times than this (default: 1)
        #[arg(long)]
        min_ngram_count: Option<u64>,

        /// Remove English stop words before counting n-grams
        #[arg(long)]
        stop_words: bool,

        /// Abort if more than this many distinct values are held in memory
        #[arg(long)]
        max_distinct: Option<usize>,

        /// Directory for report files (default: ./output)
        #[arg(long, short)]
        output_dir: Option<PathBuf>,

        /// Report file format
        #[arg(long, value_enum, default_value = "csv")]
        format: OutputFormat,

        /// Also print the plain-text summary
        #[arg(long)]
        print_summary: bool,
    },

    /// Show how the export's columns map onto the analyzed fields
    Inspect {
        /// Path to the CSV/TSV export
        input: PathBuf,

        /// Field delimiter (e.g. "," ";" "|" or "tab"); default ","
        #[arg(long)]
        delimiter: Option<String>,
    },
}

fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("seolens=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            delimiter,
            chunk_size,
            ngram_sizes,
            top_k,
            min_ngram_count,
            stop_words,
            max_distinct,
            output_dir,
            format,
            print_summary,
        } => {
            let mut config = Config::load()?;
            if let Some(d) = delimiter {
                config.delimiter = config::parse_delimiter(&d)?;
            }
            if let Some(n) = chunk_size {
                config.analysis.chunk_size = n;
            }
            if let Some(sizes) = ngram_sizes {
                config.analysis.ngram_sizes =
                    config::parse_ngram_sizes(&sizes).context("--ngram-sizes")?;
            }
            if let Some(k) = top_k {
                config.analysis.top_k = k;
            }
            if let Some(min) = min_ngram_count {
                config.analysis.min_ngram_count = min;
            }
            if stop_words {
                config.analysis.remove_stop_words = true;
            }
            if max_distinct.is_some() {
                config.analysis.max_distinct_values = max_distinct;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }

            run_analysis(&input, &config, format, print_summary)?;
        }

        Commands::Inspect { input, delimiter } => {
            let mut config = Config::load()?;
            if let Some(d) = delimiter {
                config.delimiter = config::parse_delimiter(&d)?;
            }
            inspect(&input, &config)?;
        }
    }

    Ok(())
}

/// Stream the export through one session and write the report.
fn run_analysis(
    input: &std::path::Path,
    config: &Config,
    format: OutputFormat,
    print_summary: bool,
) -> Result<()> {
    println!("Analyzing {}...", input.display());

    let ingestor = seolens::ingest::open(input, config.delimiter, config.analysis.chunk_size)?;
    let header = ingestor.header().to_vec();

    let lock = SessionLock::new();
    let mut session = Session::new(&lock, config.analysis.clone())?;
    session.start()?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("  {spinner} {msg} ({elapsed})")?);
    pb.enable_steady_tick(Duration::from_millis(120));

    let mut records = 0usize;
    let mut skipped = 0usize;
    for chunk in ingestor {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                pb.finish_and_clear();
                session.cancel();
                return Err(e);
            }
        };

        match session.add_chunk(chunk) {
            Ok(outcome) => {
                records += outcome.accepted;
                skipped += outcome.skipped;
                pb.set_message(format!(
                    "chunk {}: {} records, {} skipped",
                    outcome.chunk, records, skipped
                ));
            }
            Err(e) => {
                pb.finish_and_clear();
                if matches!(e, AnalysisError::Schema { .. }) {
                    println!("  {} {}", "Available columns:".yellow(), header.join(", "));
                }
                return Err(e.into());
            }
        }
    }
    pb.finish_and_clear();

    let analysis = session.finalize()?;
    let report = seolens::report::build(analysis);
    let written = seolens::output::files::write_report(&report, &config.output_dir, format)?;

    seolens::output::terminal::display_analysis(analysis);
    if print_summary {
        println!("{}", report.summary);
    }

    println!(
        "{}",
        format!(
            "Wrote {} report files to {}",
            written.len(),
            config.output_dir.display()
        )
        .bold()
    );
    info!(records, skipped, "Analysis complete");
    Ok(())
}

/// Print the header, the resolved column mapping, and the row count.
fn inspect(input: &std::path::Path, config: &Config) -> Result<()> {
    let mut ingestor = seolens::ingest::open(input, config.delimiter, config.analysis.chunk_size)?;

    println!("\n{}", format!("=== {} ===", input.display()).bold());
    println!("  Columns: {}", ingestor.header().join(", "));
    println!();

    let columns = ingestor.columns().clone();
    for field in [Field::Url, Field::Title, Field::MetaDescription, Field::PageType] {
        let mapped = columns
            .index(field)
            .and_then(|i| ingestor.header().get(i))
            .map(|name| name.green().to_string());
        let shown = match mapped {
            Some(name) => name,
            None if field == Field::PageType => "(absent, all rows use \"none\")".dimmed().to_string(),
            None => "missing".red().bold().to_string(),
        };
        println!("  {:<18} {}", field.as_str(), shown);
    }

    let missing = columns.missing_required();
    if !missing.is_empty() {
        warn!(?missing, "Required columns not found");
    }

    for chunk in ingestor.by_ref() {
        chunk?;
    }
    println!("\n  Data rows: {}", ingestor.rows_read());
    Ok(())
}

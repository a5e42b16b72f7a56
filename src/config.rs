use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::error::AnalysisError;

/// N-gram sizes the counter supports.
pub const SUPPORTED_NGRAM_SIZES: [usize; 3] = [2, 3, 4];

/// Knobs consumed by the aggregation engine.
///
/// `chunk_size` is informational: results never depend on it. It only sets
/// how many records the ingestor buffers per chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisConfig {
    pub chunk_size: usize,
    /// Subset of {2, 3, 4}. Empty disables n-gram analysis.
    pub ngram_sizes: Vec<usize>,
    /// Entries kept per n-gram table and page type
    pub top_k: usize,
    /// N-grams seen fewer times than this are left out of the tables
    pub min_ngram_count: u64,
    /// Drop English stop words before building n-grams
    pub remove_stop_words: bool,
    /// Abort the session once this many distinct values are held in memory
    pub max_distinct_values: Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100_000,
            ngram_sizes: SUPPORTED_NGRAM_SIZES.to_vec(),
            top_k: 50,
            min_ngram_count: 1,
            remove_stop_words: false,
            max_distinct_values: None,
        }
    }
}

impl AnalysisConfig {
    /// Check every knob before a session is allowed to start.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.chunk_size == 0 {
            return Err(AnalysisError::Configuration(
                "chunk_size must be a positive integer".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(AnalysisError::Configuration(
                "top_k must be a positive integer".to_string(),
            ));
        }
        if self.min_ngram_count == 0 {
            return Err(AnalysisError::Configuration(
                "min_ngram_count must be at least 1".to_string(),
            ));
        }
        if let Some(n) = self
            .ngram_sizes
            .iter()
            .find(|n| !SUPPORTED_NGRAM_SIZES.contains(n))
        {
            return Err(AnalysisError::Configuration(format!(
                "n-gram size {n} is not supported (choose from 2, 3, 4)"
            )));
        }
        if self.max_distinct_values == Some(0) {
            return Err(AnalysisError::Configuration(
                "max_distinct_values must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a comma-separated list of n-gram sizes such as "2,3,4".
pub fn parse_ngram_sizes(value: &str) -> Result<Vec<usize>> {
    let mut sizes = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let n: usize = part
            .parse()
            .with_context(|| format!("Invalid n-gram size '{part}'"))?;
        if !sizes.contains(&n) {
            sizes.push(n);
        }
    }
    sizes.sort_unstable();
    Ok(sizes)
}

/// Parse a one-character delimiter, accepting "tab" and "\t" for tabs.
pub fn parse_delimiter(value: &str) -> Result<char> {
    match value {
        "tab" | "\\t" | "\t" => Ok('\t'),
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => anyhow::bail!("Delimiter must be a single character, got '{other}'"),
            }
        }
    }
}

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy. Command-line flags
/// override anything set here.
pub struct Config {
    pub analysis: AnalysisConfig,
    /// Directory the report files are written into
    pub output_dir: PathBuf,
    pub delimiter: char,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn load() -> Result<Self> {
        let defaults = AnalysisConfig::default();

        let chunk_size = match env::var("SEOLENS_CHUNK_SIZE") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("SEOLENS_CHUNK_SIZE is not a number: '{v}'"))?,
            Err(_) => defaults.chunk_size,
        };
        let top_k = match env::var("SEOLENS_TOP_K") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("SEOLENS_TOP_K is not a number: '{v}'"))?,
            Err(_) => defaults.top_k,
        };
        let min_ngram_count = match env::var("SEOLENS_MIN_NGRAM_COUNT") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("SEOLENS_MIN_NGRAM_COUNT is not a number: '{v}'"))?,
            Err(_) => defaults.min_ngram_count,
        };
        let ngram_sizes = match env::var("SEOLENS_NGRAM_SIZES") {
            Ok(v) => parse_ngram_sizes(&v).context("SEOLENS_NGRAM_SIZES")?,
            Err(_) => defaults.ngram_sizes,
        };
        let max_distinct_values = match env::var("SEOLENS_MAX_DISTINCT") {
            Ok(v) => Some(
                v.parse()
                    .with_context(|| format!("SEOLENS_MAX_DISTINCT is not a number: '{v}'"))?,
            ),
            Err(_) => None,
        };
        let remove_stop_words = matches!(
            env::var("SEOLENS_STOP_WORDS").as_deref(),
            Ok("1") | Ok("true") | Ok("yes")
        );
        let delimiter = match env::var("SEOLENS_DELIMITER") {
            Ok(v) => parse_delimiter(&v)?,
            Err(_) => ',',
        };

        Ok(Self {
            analysis: AnalysisConfig {
                chunk_size,
                ngram_sizes,
                top_k,
                min_ngram_count,
                remove_stop_words,
                max_distinct_values,
            },
            output_dir: env::var("SEOLENS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./output")),
            delimiter,
        })
    }
}

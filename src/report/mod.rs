// Report builder: renders a finalized analysis into named tables and a
// plain-text summary.
//
// Rendering is a pure function of the `Analysis`: nothing is recomputed
// from records and nothing is written anywhere. Writing files is the job of
// `output::files`.

pub mod summary;
pub mod tables;

use serde::Serialize;

use crate::record::TextField;
use crate::session::Analysis;

/// Artifact name of the plain-text summary.
pub const SUMMARY_NAME: &str = "analysis_summary";

/// A rectangular table with a fixed column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn new(name: impl Into<String>, columns: &[&'static str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.to_vec(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row width for {}", self.name);
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by header name.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == name)
    }
}

/// Every rendered artifact, in contract order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub tables: Vec<Table>,
    pub summary: String,
}

impl Report {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Names of every artifact, tables first, summary last.
    pub fn artifact_names(&self) -> Vec<&str> {
        self.tables
            .iter()
            .map(|t| t.name.as_str())
            .chain(std::iter::once(SUMMARY_NAME))
            .collect()
    }
}

/// Artifact name of the n-gram table for `field` and `n`.
pub fn ngram_table_name(field: TextField, n: usize) -> String {
    format!("{}_{n}gram_analysis", field.as_str())
}

/// Render every table and the summary.
///
/// Order: duplicate rollups, page-type summaries, title n-gram tables,
/// meta-description n-gram tables, reference tables.
pub fn build(analysis: &Analysis) -> Report {
    let mut tables = Vec::new();

    for field in TextField::ALL {
        tables.push(tables::duplicate_rollup(&analysis.dedup, field));
    }
    for field in TextField::ALL {
        tables.push(tables::page_type_summary(&analysis.segments, field));
    }
    for field in TextField::ALL {
        for table in analysis.ngrams.tables.iter().filter(|t| t.field == field) {
            tables.push(tables::ngram_table(table));
        }
    }
    for field in TextField::ALL {
        tables.push(tables::reference(&analysis.dedup, field));
    }

    Report {
        tables,
        summary: summary::render(analysis),
    }
}

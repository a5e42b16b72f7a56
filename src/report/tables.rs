// Table renderers. Column order and row order here are part of the output
// contract: primary metric descending, ties broken by key ascending.

use std::collections::BTreeSet;

use super::{ngram_table_name, Table};
use crate::analysis::dedup::DedupReport;
use crate::analysis::ngrams::NgramTable;
use crate::record::TextField;
use crate::segment::{PageTypeStat, Segmentation};

/// Render a duplication rate as a percentage, or `N/A` when undefined.
pub fn format_rate(rate: Option<f64>) -> String {
    match rate {
        Some(r) => format!("{:.2}", r * 100.0),
        None => "N/A".to_string(),
    }
}

fn key_column(field: TextField) -> &'static str {
    match field {
        TextField::Title => "Title",
        TextField::MetaDescription => "Meta_Description",
    }
}

fn companion_column(field: TextField) -> &'static str {
    match field {
        TextField::Title => "Meta_Descriptions",
        TextField::MetaDescription => "Titles",
    }
}

fn duplicate_column(field: TextField) -> &'static str {
    match field {
        TextField::Title => "Duplicate_Titles",
        TextField::MetaDescription => "Duplicate_Meta_Descriptions",
    }
}

/// `title_duplicate_rollup` / `meta_description_duplicate_rollup`.
pub fn duplicate_rollup(dedup: &DedupReport, field: TextField) -> Table {
    let mut table = Table::new(
        format!("{}_duplicate_rollup", field.as_str()),
        &[
            key_column(field),
            "Duplicate_Count",
            "Unique_Pagetypes",
            "Pagetype_List",
            companion_column(field),
            "URLs",
        ],
    );

    // Groups arrive sorted by size descending, then key
    for group in &dedup.field(field).groups {
        let page_types = group.page_types();
        let companions: BTreeSet<&str> = group
            .members
            .iter()
            .map(|m| m.other_text.as_str())
            .filter(|t| !t.is_empty())
            .collect();
        let urls: Vec<&str> = group.members.iter().map(|m| m.url.as_str()).collect();

        table.push(vec![
            group.key.clone(),
            group.len().to_string(),
            page_types.len().to_string(),
            page_types
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            companions.into_iter().collect::<Vec<_>>().join("\n"),
            urls.join("\n"),
        ]);
    }

    table
}

fn summary_row(stat: &PageTypeStat, field: TextField) -> Vec<String> {
    vec![
        stat.page_type.clone(),
        stat.total_records.to_string(),
        stat.non_missing(field).to_string(),
        stat.missing(field).to_string(),
        stat.duplicates(field).to_string(),
        stat.within_type_duplicates(field).to_string(),
        format_rate(stat.duplication_rate(field)),
    ]
}

/// `title_pagetype_summary` / `meta_description_pagetype_summary`.
///
/// The grand-total row always comes last.
pub fn page_type_summary(segments: &Segmentation, field: TextField) -> Table {
    let mut table = Table::new(
        format!("{}_pagetype_summary", field.as_str()),
        &[
            "Pagetype",
            "Total_URLs",
            "Non_Missing",
            "Missing",
            duplicate_column(field),
            "Within_Pagetype_Duplicates",
            "Duplication_Rate",
        ],
    );

    let mut stats: Vec<&PageTypeStat> = segments.segments.iter().map(|s| &s.stat).collect();
    stats.sort_by(|a, b| {
        b.duplicates(field)
            .cmp(&a.duplicates(field))
            .then_with(|| a.page_type.cmp(&b.page_type))
    });

    for stat in stats {
        table.push(summary_row(stat, field));
    }
    table.push(summary_row(&segments.total, field));

    table
}

/// `{field}_{n}gram_analysis`.
pub fn ngram_table(ngrams: &NgramTable) -> Table {
    let mut table = Table::new(
        ngram_table_name(ngrams.field, ngrams.n),
        &["Pagetype", "Ngram", "Frequency"],
    );
    for entry in ngrams.ranked() {
        table.push(vec![
            entry.page_type.to_string(),
            entry.ngram.to_string(),
            entry.count.to_string(),
        ]);
    }
    table
}

/// `title_reference` / `meta_description_reference`: one row per record
/// that belongs to a duplicate group.
pub fn reference(dedup: &DedupReport, field: TextField) -> Table {
    let mut table = Table::new(
        format!("{}_reference", field.as_str()),
        &["Content", "URL", "Pagetype", "Other_Content"],
    );
    for group in &dedup.field(field).groups {
        for member in &group.members {
            table.push(vec![
                member.text.clone(),
                member.url.clone(),
                member.page_type.to_string(),
                member.other_text.clone(),
            ]);
        }
    }
    table
}

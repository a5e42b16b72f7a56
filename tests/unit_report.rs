// Unit tests for the report builder.
//
// Tests artifact names and order, column order, row order inside each
// table, rate rendering, and the plain-text summary.

use seolens::config::AnalysisConfig;
use seolens::record::RawRecord;
use seolens::report::{self, Report, Table};
use seolens::{analyze, Analysis};

fn raw(url: &str, title: &str, meta: &str, page_type: &str) -> RawRecord {
    RawRecord {
        url: Some(url.to_string()),
        title: Some(title.to_string()),
        meta_description: Some(meta.to_string()),
        page_type: Some(page_type.to_string()),
        unreadable: None,
    }
}

fn sample_analysis() -> Analysis {
    let chunk = vec![
        raw("u1", "Red Shoes", "m1", "blog"),
        raw("u2", "red shoes", "m2", "blog"),
        raw("u3", "Blue Hats", "m3", "product"),
        raw("u4", "", "m4", "news"),
    ];
    analyze(AnalysisConfig::default(), vec![chunk]).unwrap()
}

fn sample_report() -> Report {
    report::build(&sample_analysis())
}

fn cell<'a>(table: &'a Table, row: usize, column: &str) -> &'a str {
    let index = table.column(column).unwrap();
    &table.rows[row][index]
}

// ============================================================
// Artifacts
// ============================================================

#[test]
fn artifacts_in_contract_order() {
    let report = sample_report();
    assert_eq!(
        report.artifact_names(),
        vec![
            "title_duplicate_rollup",
            "meta_description_duplicate_rollup",
            "title_pagetype_summary",
            "meta_description_pagetype_summary",
            "title_2gram_analysis",
            "title_3gram_analysis",
            "title_4gram_analysis",
            "meta_description_2gram_analysis",
            "meta_description_3gram_analysis",
            "meta_description_4gram_analysis",
            "title_reference",
            "meta_description_reference",
            "analysis_summary",
        ]
    );
}

#[test]
fn ngram_tables_follow_configured_sizes() {
    let config = AnalysisConfig {
        ngram_sizes: vec![3],
        ..AnalysisConfig::default()
    };
    let analysis = analyze(config, vec![vec![raw("u1", "a b c", "d e f", "x")]]).unwrap();
    let report = report::build(&analysis);
    assert!(report.table("title_3gram_analysis").is_some());
    assert!(report.table("title_2gram_analysis").is_none());
    assert!(report.table("meta_description_4gram_analysis").is_none());
}

#[test]
fn rendering_is_pure() {
    let analysis = sample_analysis();
    assert_eq!(report::build(&analysis), report::build(&analysis));
}

// ============================================================
// Duplicate rollup and reference
// ============================================================

#[test]
fn rollup_columns_and_cells() {
    let report = sample_report();
    let table = report.table("title_duplicate_rollup").unwrap();
    assert_eq!(
        table.columns,
        vec![
            "Title",
            "Duplicate_Count",
            "Unique_Pagetypes",
            "Pagetype_List",
            "Meta_Descriptions",
            "URLs"
        ]
    );
    assert_eq!(table.rows.len(), 1);
    assert_eq!(cell(table, 0, "Title"), "red shoes");
    assert_eq!(cell(table, 0, "Duplicate_Count"), "2");
    assert_eq!(cell(table, 0, "Unique_Pagetypes"), "1");
    assert_eq!(cell(table, 0, "Pagetype_List"), "blog");
    assert_eq!(cell(table, 0, "Meta_Descriptions"), "m1\nm2");
    assert_eq!(cell(table, 0, "URLs"), "u1\nu2");
}

#[test]
fn meta_rollup_is_empty_without_duplicates() {
    let report = sample_report();
    let table = report.table("meta_description_duplicate_rollup").unwrap();
    assert_eq!(table.columns[0], "Meta_Description");
    assert_eq!(table.columns[4], "Titles");
    assert!(table.is_empty());
}

#[test]
fn reference_lists_each_duplicated_record() {
    let report = sample_report();
    let table = report.table("title_reference").unwrap();
    assert_eq!(table.columns, vec!["Content", "URL", "Pagetype", "Other_Content"]);
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[0], vec!["Red Shoes", "u1", "blog", "m1"]);
    assert_eq!(table.rows[1], vec!["red shoes", "u2", "blog", "m2"]);
}

// ============================================================
// Page-type summary
// ============================================================

#[test]
fn summary_rows_sorted_with_total_last() {
    let report = sample_report();
    let table = report.table("title_pagetype_summary").unwrap();
    assert_eq!(
        table.columns,
        vec![
            "Pagetype",
            "Total_URLs",
            "Non_Missing",
            "Missing",
            "Duplicate_Titles",
            "Within_Pagetype_Duplicates",
            "Duplication_Rate"
        ]
    );

    let order: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(order, vec!["blog", "news", "product", "TOTAL"]);

    assert_eq!(cell(table, 0, "Duplication_Rate"), "100.00");
    assert_eq!(cell(table, 0, "Within_Pagetype_Duplicates"), "2");
    assert_eq!(cell(table, 2, "Duplication_Rate"), "0.00");

    let total = table.rows.len() - 1;
    assert_eq!(cell(table, total, "Total_URLs"), "4");
    assert_eq!(cell(table, total, "Missing"), "1");
    assert_eq!(cell(table, total, "Duplication_Rate"), "66.67");
}

#[test]
fn rate_is_not_applicable_when_every_value_is_missing() {
    let report = sample_report();
    let table = report.table("title_pagetype_summary").unwrap();
    let news = table.rows.iter().position(|r| r[0] == "news").unwrap();
    assert_eq!(cell(table, news, "Non_Missing"), "0");
    assert_eq!(cell(table, news, "Duplication_Rate"), "N/A");
}

#[test]
fn page_types_named_like_synthetic_rows_stay_distinct() {
    let chunk = vec![
        raw("u1", "Red Shoes", "m1", "ALL"),
        raw("u2", "Red Shoes", "m2", "TOTAL"),
        raw("u3", "Red Shoes", "m3", "blog"),
    ];
    let analysis = analyze(AnalysisConfig::default(), vec![chunk]).unwrap();
    let report = report::build(&analysis);

    let summary = report.table("title_pagetype_summary").unwrap();
    let order: Vec<&str> = summary.rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(
        order,
        vec!["ALL (page type)", "TOTAL (page type)", "blog", "TOTAL"]
    );
    assert_eq!(cell(summary, 3, "Total_URLs"), "3");

    let ngrams = report.table("title_2gram_analysis").unwrap();
    let synthetic: Vec<&Vec<String>> = ngrams.rows.iter().filter(|r| r[0] == "ALL").collect();
    assert_eq!(synthetic.len(), 1);
    assert_eq!(synthetic[0][2], "3");
    assert!(ngrams.rows.iter().any(|r| r[0] == "ALL (page type)" && r[2] == "1"));
}

// ============================================================
// N-gram tables
// ============================================================

#[test]
fn ngram_rows_ranked_by_frequency() {
    let report = sample_report();
    let table = report.table("title_2gram_analysis").unwrap();
    assert_eq!(table.columns, vec!["Pagetype", "Ngram", "Frequency"]);
    assert_eq!(table.rows[0], vec!["ALL", "red shoes", "2"]);
    assert_eq!(table.rows[1], vec!["blog", "red shoes", "2"]);

    let counts: Vec<u64> = table.rows.iter().map(|r| r[2].parse().unwrap()).collect();
    assert!(counts.windows(2).all(|w| w[0] >= w[1]));
}

// ============================================================
// Plain-text summary
// ============================================================

#[test]
fn summary_text_has_headline_numbers() {
    let report = sample_report();
    let text = &report.summary;
    assert!(text.starts_with("SEO Content Analysis Summary Report"));
    assert!(text.contains("Total URLs analyzed: 4"), "{text}");
    assert!(text.contains("Total page types: 3"), "{text}");
    assert!(text.contains("Missing Titles: 1"), "{text}");
    assert!(text.contains("Most repeated Title: 2 occurrences (\"red shoes\")"), "{text}");
    assert!(text.contains("Page Type: blog"), "{text}");
    assert!(text.contains("Duplicate Titles: 2 (100.0%)"), "{text}");
    assert!(text.contains("Duplicate Titles: 0 (N/A, no titles present)"), "{text}");
}

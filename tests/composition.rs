// Composition tests: the modules chained together end to end.
//
//   delimited file -> ingest -> session -> report -> report files
//
// Chunking and input order must never change the result, so several tests
// run the same records through different chunk sizes and orders.

use std::fs;

use seolens::config::AnalysisConfig;
use seolens::ingest::{self, ChunkedIngestor};
use seolens::output::files::{write_report, OutputFormat};
use seolens::record::{RawRecord, TextField};
use seolens::report;
use seolens::{analyze, Analysis, Session, SessionLock};

fn raw(url: &str, title: &str, meta: &str, page_type: &str) -> RawRecord {
    RawRecord {
        url: Some(url.to_string()),
        title: Some(title.to_string()),
        meta_description: Some(meta.to_string()),
        page_type: Some(page_type.to_string()),
        unreadable: None,
    }
}

/// A small crawl with cross-type duplicates, missing values, and shared
/// n-grams.
fn crawl() -> Vec<RawRecord> {
    let titles = [
        "Red Shoes for Sale",
        "red shoes for sale",
        "Red Shoes on Sale",
        "Blue Hats | Store",
        "blue hats | store",
        "",
        "About Us",
        "Contact Us",
        "RED SHOES FOR SALE",
        "Summer Hats on Sale",
        "",
        "Gift Cards",
    ];
    let metas = [
        "Shop red shoes today.",
        "Shop red shoes today.",
        "Great deals on shoes.",
        "",
        "Hats for every season.",
        "Hats for every season.",
        "Who we are.",
        "",
        "Shop red shoes today.",
        "Great deals on hats.",
        "Who we are.",
        "",
    ];
    let types = [
        "product", "product", "category", "category", "product", "blog", "page", "page",
        "blog", "category", "", "product",
    ];
    (0..titles.len())
        .map(|i| raw(&format!("https://example.com/{i}"), titles[i], metas[i], types[i]))
        .collect()
}

fn run(records: &[RawRecord], chunk_size: usize) -> Analysis {
    let chunks: Vec<Vec<RawRecord>> = records.chunks(chunk_size).map(<[_]>::to_vec).collect();
    analyze(AnalysisConfig::default(), chunks).unwrap()
}

// ============================================================
// Chunk invariance
// ============================================================

#[test]
fn every_chunk_size_gives_the_same_report() {
    let records = crawl();
    let baseline = report::build(&run(&records, records.len()));

    for size in 1..records.len() {
        let analysis = run(&records, size);
        assert_eq!(report::build(&analysis), baseline, "chunk size {size}");
    }
}

#[test]
fn input_order_does_not_matter() {
    let records = crawl();
    let forward = run(&records, 5);

    let mut reversed = records.clone();
    reversed.reverse();
    let backward = run(&reversed, 3);

    let mut rotated = records.clone();
    rotated.rotate_left(7);
    let shifted = run(&rotated, 4);

    for other in [&backward, &shifted] {
        assert_eq!(forward.dedup, other.dedup);
        assert_eq!(forward.ngrams, other.ngrams);
        assert_eq!(forward.segments, other.segments);
    }
}

// ============================================================
// Aggregators -> Segmentation
// ============================================================

#[test]
fn page_type_rows_add_up_to_total() {
    let analysis = run(&crawl(), 4);
    let segments = &analysis.segments;

    let records: usize = segments.segments.iter().map(|s| s.stat.total_records).sum();
    assert_eq!(records, segments.total.total_records);
    assert_eq!(records, analysis.ingestion.records);

    for field in TextField::ALL {
        let duplicates: usize = segments.segments.iter().map(|s| s.stat.duplicates(field)).sum();
        assert_eq!(duplicates, segments.total.duplicates(field));
        assert_eq!(duplicates, analysis.dedup.field(field).duplicate_records());
    }

    // Blank page type lands in the "none" bucket
    assert!(segments.get("none").is_some());
}

#[test]
fn cross_type_duplicates_count_in_each_page_type() {
    let analysis = run(&crawl(), 12);
    let titles = &analysis.dedup.title;

    let top = titles.most_repeated().unwrap();
    assert_eq!(top.key, "red shoes for sale");
    assert_eq!(top.len(), 3);

    let product = analysis.segments.get("product").unwrap();
    let blog = analysis.segments.get("blog").unwrap();
    assert_eq!(product.stat.within_type_duplicates(TextField::Title), 2);
    assert_eq!(blog.stat.within_type_duplicates(TextField::Title), 0);
    assert!(blog.stat.duplicates(TextField::Title) >= 1);
}

#[test]
fn segment_ngrams_match_ngram_tables() {
    let analysis = run(&crawl(), 6);
    let category = analysis.segments.get("category").unwrap();
    let slice = category
        .top_ngrams
        .iter()
        .find(|s| s.field == TextField::Title && s.n == 2)
        .unwrap();
    assert!(slice.entries.iter().all(|e| e.page_type.as_str() == "category"));
    assert!(slice.entries.iter().any(|e| e.ngram.to_string() == "on sale"));
}

// ============================================================
// File -> Session -> Report files
// ============================================================

const EXPORT: &str = "Address,Title 1,Meta Description 1,Page Type,Status\n\
https://shop.test/a,Red Shoes,\"Shop shoes, today\",product,200\n\
https://shop.test/b,red shoes,\"Shop shoes, today\",product,200\n\
https://shop.test/c,Hats,,category,200\n\
https://shop.test/d,Broken row\n\
\n\
https://shop.test/e,\"Multi\nline title\",Desc,blog,301\n";

#[test]
fn export_to_report_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("crawl.csv");
    fs::write(&input, EXPORT).unwrap();

    let ingestor = ingest::open(&input, ',', 2).unwrap();
    let lock = SessionLock::new();
    let mut session = Session::new(&lock, AnalysisConfig::default()).unwrap();
    session.start().unwrap();
    for chunk in ingestor {
        session.add_chunk(chunk.unwrap()).unwrap();
    }
    let analysis = session.finalize().unwrap();

    assert_eq!(analysis.ingestion.rows_seen, 5);
    assert_eq!(analysis.ingestion.records, 4);
    assert_eq!(analysis.ingestion.malformed_rows, 1);
    assert_eq!(analysis.dedup.title.groups[0].key, "red shoes");

    let report = report::build(analysis);
    let out = dir.path().join("out");
    let written = write_report(&report, &out, OutputFormat::Csv).unwrap();
    assert_eq!(written.len(), report.artifact_names().len());

    let rollup = fs::read_to_string(out.join("title_duplicate_rollup.csv")).unwrap();
    let mut lines = rollup.lines();
    assert_eq!(
        lines.next(),
        Some("Title,Duplicate_Count,Unique_Pagetypes,Pagetype_List,Meta_Descriptions,URLs")
    );
    assert!(rollup.contains("red shoes,2,1,product,\"Shop shoes, today\""));

    let summary = fs::read_to_string(out.join("analysis_summary.txt")).unwrap();
    assert_eq!(summary, report.summary);
    assert!(summary.contains("Malformed rows skipped: 1"));
}

#[test]
fn json_report_holds_every_table() {
    let dir = tempfile::tempdir().unwrap();
    let report = report::build(&run(&crawl(), 5));

    let written = write_report(&report, dir.path(), OutputFormat::Json).unwrap();
    assert_eq!(written.len(), 1);

    let text = fs::read_to_string(&written[0]).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let tables = value["tables"].as_array().unwrap();
    assert_eq!(tables.len(), report.tables.len());
    assert_eq!(tables[0]["name"], "title_duplicate_rollup");
    assert!(value["summary"].as_str().unwrap().contains("Overall Statistics"));
}

#[test]
fn tab_delimited_export_with_no_page_type_column() {
    let input = "url\ttitle\tmeta_description\n\
                 u1\tSame\tOne\n\
                 u2\tsame\tTwo\n";
    let ingestor = ChunkedIngestor::new(input.as_bytes(), '\t', 10).unwrap();
    assert!(ingestor.columns().missing_required().is_empty());

    let chunks: Vec<Vec<RawRecord>> = ingestor.map(|c| c.unwrap()).collect();
    let analysis = analyze(AnalysisConfig::default(), chunks).unwrap();
    assert_eq!(analysis.segments.page_type_count(), 1);
    assert_eq!(analysis.segments.segments[0].stat.page_type, "none");
    assert_eq!(analysis.dedup.title.duplicate_records(), 2);
}

#[test]
fn missing_column_fails_the_session() {
    let input = "url,title\nu1,A\nu2,B\n";
    let mut ingestor = ChunkedIngestor::new(input.as_bytes(), ',', 10).unwrap();
    let chunk = ingestor.next().unwrap().unwrap();

    let lock = SessionLock::new();
    let mut session = Session::new(&lock, AnalysisConfig::default()).unwrap();
    session.start().unwrap();
    let err = session.add_chunk(chunk).unwrap_err();
    assert!(err.to_string().contains("meta_description"), "{err}");
    assert!(!lock.is_busy());
}

// ============================================================
// Damaged input
// ============================================================

#[test]
fn latin1_row_is_skipped_and_the_rest_still_group() {
    let input: &[u8] = b"url,title,meta_description,page_type\n\
u1,Same,d,blog\n\
u2,Caf\xe9 Paris,d,blog\n\
u3,Same,d,blog\n";
    let chunks: Vec<Vec<RawRecord>> = ChunkedIngestor::new(input, ',', 10)
        .unwrap()
        .map(|c| c.unwrap())
        .collect();
    let analysis = analyze(AnalysisConfig::default(), chunks).unwrap();

    assert_eq!(analysis.ingestion.rows_seen, 3);
    assert_eq!(analysis.ingestion.records, 2);
    assert_eq!(analysis.ingestion.malformed_rows, 1);
    assert_eq!(analysis.ingestion.malformed_samples[0].row, 2);
    assert!(analysis.ingestion.malformed_samples[0].reason.contains("UTF-8"));

    let group = &analysis.dedup.title.groups[0];
    assert_eq!(group.key, "same");
    assert_eq!(group.len(), 2);
}

#[test]
fn unterminated_quote_costs_one_row() {
    let input = "url,title,meta_description,page_type\n\
u1,\"Broken title,d,blog\n\
u2,Alpha,d2,blog\n\
u3,Beta,d3,blog\n\
u4,Alpha,d4,news\n\
u5,Gamma,d5,news\n";
    let chunks: Vec<Vec<RawRecord>> = ChunkedIngestor::new(input.as_bytes(), ',', 2)
        .unwrap()
        .map(|c| c.unwrap())
        .collect();
    let analysis = analyze(AnalysisConfig::default(), chunks).unwrap();

    assert_eq!(analysis.ingestion.records, 4);
    assert_eq!(analysis.ingestion.malformed_rows, 1);
    assert_eq!(analysis.ingestion.malformed_samples[0].row, 1);
    assert_eq!(analysis.dedup.title.groups[0].key, "alpha");
    assert_eq!(analysis.segments.page_type_count(), 2);
}

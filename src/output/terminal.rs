// Colored terminal output for a finished analysis.
//
// Everything here reads the finalized `Analysis`; the CSV/JSON files carry
// the full tables, the terminal only shows the headline numbers.

use colored::Colorize;

use crate::record::TextField;
use crate::report::summary::format_count;
use crate::report::tables::format_rate;
use crate::session::Analysis;

/// Rows of each duplicate list shown in the terminal.
const TOP_GROUPS: usize = 10;

/// Display the overview, top duplicate groups, and page-type breakdown.
pub fn display_analysis(analysis: &Analysis) {
    let ingestion = &analysis.ingestion;

    println!(
        "\n{}",
        format!(
            "=== SEO Content Analysis ({} URLs, {} page types) ===",
            format_count(ingestion.records),
            analysis.segments.page_type_count()
        )
        .bold()
    );
    println!(
        "  Unique URLs: {}   Chunks: {}",
        format_count(analysis.dedup.distinct_urls),
        ingestion.chunks
    );
    if ingestion.malformed_rows > 0 {
        println!(
            "  {} {} malformed rows skipped",
            "!".yellow(),
            format_count(ingestion.malformed_rows)
        );
    }

    for field in TextField::ALL {
        display_duplicates(analysis, field);
    }
    display_page_types(analysis);
}

fn display_duplicates(analysis: &Analysis, field: TextField) {
    let dupes = analysis.dedup.field(field);
    println!(
        "\n{}",
        format!(
            "--- Duplicate {}s: {} records in {} groups ---",
            field.label(),
            format_count(dupes.duplicate_records()),
            format_count(dupes.groups.len())
        )
        .bold()
    );

    if dupes.groups.is_empty() {
        println!("  {}", "No duplicates found.".green());
        return;
    }

    for group in dupes.groups.iter().take(TOP_GROUPS) {
        let count = format!("{:>5}x", group.len());
        let colored_count = if group.len() >= 10 {
            count.red().bold()
        } else if group.len() >= 3 {
            count.yellow()
        } else {
            count.normal()
        };
        let page_types: Vec<&str> = group.page_types().into_iter().map(|p| p.as_str()).collect();
        println!(
            "  {}  {:<70} {}",
            colored_count,
            super::truncate_chars(&group.key, 70),
            page_types.join(", ").dimmed()
        );
    }
    if dupes.groups.len() > TOP_GROUPS {
        println!(
            "  {}",
            format!("... {} more groups in the report files", dupes.groups.len() - TOP_GROUPS)
                .dimmed()
        );
    }
}

fn display_page_types(analysis: &Analysis) {
    println!("\n{}", "--- By Page Type ---".bold());
    println!(
        "  {:<24} {:>10}  {:>12} {:>8}  {:>12} {:>8}",
        "Pagetype".dimmed(),
        "URLs".dimmed(),
        "Dup titles".dimmed(),
        "Rate %".dimmed(),
        "Dup metas".dimmed(),
        "Rate %".dimmed(),
    );
    println!("  {}", "-".repeat(82).dimmed());

    let rows = analysis
        .segments
        .segments
        .iter()
        .map(|s| &s.stat)
        .chain(std::iter::once(&analysis.segments.total));
    for stat in rows {
        println!(
            "  {:<24} {:>10}  {:>12} {:>8}  {:>12} {:>8}",
            super::truncate_chars(&stat.page_type, 24),
            format_count(stat.total_records),
            format_count(stat.duplicate_title_count),
            format_rate(stat.duplication_rate(TextField::Title)),
            format_count(stat.duplicate_meta_count),
            format_rate(stat.duplication_rate(TextField::MetaDescription)),
        );
    }
    println!();
}

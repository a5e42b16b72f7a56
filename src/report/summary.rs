// Plain-text summary report (`analysis_summary`).

use crate::record::TextField;
use crate::segment::PageTypeStat;
use crate::session::Analysis;

/// Format a count with thousands separators: 1234567 -> "1,234,567".
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn heading(out: &mut String, title: &str) {
    out.push_str(&format!("{title}\n{}\n", "-".repeat(title.chars().count())));
}

fn duplicate_line(out: &mut String, stat: &PageTypeStat, field: TextField) {
    let duplicates = stat.duplicates(field);
    out.push_str(&format!(
        "Duplicate {}s: {}",
        field.label(),
        format_count(duplicates)
    ));
    match stat.duplication_rate(field) {
        Some(rate) if duplicates > 0 => out.push_str(&format!(" ({:.1}%)", rate * 100.0)),
        Some(_) => {}
        None => out.push_str(&format!(" (N/A, no {}s present)", field.label().to_lowercase())),
    }
    out.push('\n');
}

/// Render the summary. Deterministic: no timestamps, no environment.
pub fn render(analysis: &Analysis) -> String {
    let mut out = String::new();
    let title = "SEO Content Analysis Summary Report";
    out.push_str(&format!("{title}\n{}\n\n", "=".repeat(title.len())));

    let ingestion = &analysis.ingestion;
    heading(&mut out, "Overall Statistics");
    out.push_str(&format!("Total URLs analyzed: {}\n", format_count(ingestion.records)));
    out.push_str(&format!(
        "Unique URLs: {}\n",
        format_count(analysis.dedup.distinct_urls)
    ));
    out.push_str(&format!(
        "Total page types: {}\n",
        format_count(analysis.segments.page_type_count())
    ));
    out.push_str(&format!(
        "Malformed rows skipped: {}\n",
        format_count(ingestion.malformed_rows)
    ));
    for sample in ingestion.malformed_samples.iter().take(5) {
        out.push_str(&format!("  row {}: {}\n", sample.row, sample.reason));
    }
    if ingestion.malformed_rows > 5 {
        out.push_str(&format!("  ... and {} more\n", ingestion.malformed_rows - 5));
    }

    for field in TextField::ALL {
        let dupes = analysis.dedup.field(field);
        let label = field.label();
        out.push('\n');
        heading(&mut out, &format!("{label} Analysis"));
        out.push_str(&format!("Total {label}s: {}\n", format_count(dupes.non_missing())));
        out.push_str(&format!("Missing {label}s: {}\n", format_count(dupes.missing())));
        out.push_str(&format!(
            "Unique {label}s: {}\n",
            format_count(dupes.distinct_values)
        ));
        out.push_str(&format!(
            "Duplicate {label}s: {}\n",
            format_count(dupes.duplicate_records())
        ));
        out.push_str(&format!(
            "Number of unique duplicate {label}s: {}\n",
            format_count(dupes.groups.len())
        ));
        if let Some(top) = dupes.most_repeated() {
            out.push_str(&format!(
                "Most repeated {label}: {} occurrences (\"{}\")\n",
                format_count(top.len()),
                top.key
            ));
        }
    }

    out.push('\n');
    heading(&mut out, "Analysis by Page Type");
    for segment in &analysis.segments.segments {
        let stat = &segment.stat;
        out.push('\n');
        out.push_str(&format!("Page Type: {}\n", stat.page_type));
        out.push_str(&format!("Total URLs: {}\n", format_count(stat.total_records)));
        for field in TextField::ALL {
            duplicate_line(&mut out, stat, field);
        }
    }

    out
}

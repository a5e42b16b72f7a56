// Page-type segmentation: per-page-type statistics and n-gram slices
// derived from the finalized aggregators.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::dedup::{DedupReport, PageTypeDuplicates};
use crate::analysis::ngrams::{NgramEntry, NgramReport, Scope};
use crate::record::{PageType, TextField, TOTAL_LABEL};

/// Counts for one page type (or the grand total).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageTypeStat {
    pub page_type: String,
    pub total_records: usize,
    pub duplicate_title_count: usize,
    pub duplicate_meta_count: usize,
    pub missing_title_count: usize,
    pub missing_meta_count: usize,
    pub within_type_duplicate_title_count: usize,
    pub within_type_duplicate_meta_count: usize,
}

impl PageTypeStat {
    fn empty(label: &str, total_records: usize) -> Self {
        Self {
            page_type: label.to_string(),
            total_records,
            duplicate_title_count: 0,
            duplicate_meta_count: 0,
            missing_title_count: 0,
            missing_meta_count: 0,
            within_type_duplicate_title_count: 0,
            within_type_duplicate_meta_count: 0,
        }
    }

    fn absorb(&mut self, field: TextField, counts: &PageTypeDuplicates) {
        match field {
            TextField::Title => {
                self.duplicate_title_count += counts.duplicates;
                self.missing_title_count += counts.missing;
                self.within_type_duplicate_title_count += counts.within_page_type_duplicates;
            }
            TextField::MetaDescription => {
                self.duplicate_meta_count += counts.duplicates;
                self.missing_meta_count += counts.missing;
                self.within_type_duplicate_meta_count += counts.within_page_type_duplicates;
            }
        }
    }

    pub fn duplicates(&self, field: TextField) -> usize {
        match field {
            TextField::Title => self.duplicate_title_count,
            TextField::MetaDescription => self.duplicate_meta_count,
        }
    }

    pub fn missing(&self, field: TextField) -> usize {
        match field {
            TextField::Title => self.missing_title_count,
            TextField::MetaDescription => self.missing_meta_count,
        }
    }

    pub fn within_type_duplicates(&self, field: TextField) -> usize {
        match field {
            TextField::Title => self.within_type_duplicate_title_count,
            TextField::MetaDescription => self.within_type_duplicate_meta_count,
        }
    }

    pub fn non_missing(&self, field: TextField) -> usize {
        self.total_records.saturating_sub(self.missing(field))
    }

    /// Duplicates over non-missing values; `None` when there are none.
    pub fn duplication_rate(&self, field: TextField) -> Option<f64> {
        match self.non_missing(field) {
            0 => None,
            n => Some(self.duplicates(field) as f64 / n as f64),
        }
    }
}

/// One page type's statistics plus its top n-grams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub stat: PageTypeStat,
    /// Top n-grams of this page type, ordered by field then n
    pub top_ngrams: Vec<NgramSlice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NgramSlice {
    pub field: TextField,
    pub n: usize,
    pub entries: Vec<NgramEntry>,
}

/// Every page type, sorted by label, plus the grand total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segmentation {
    pub segments: Vec<Segment>,
    pub total: PageTypeStat,
}

impl Segmentation {
    pub fn get(&self, page_type: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.stat.page_type == page_type)
    }

    pub fn page_type_count(&self) -> usize {
        self.segments.len()
    }
}

/// Partition finalized state by page type.
///
/// `tally` is the raw record count per page type accumulated during
/// ingestion; it decides which page types exist.
pub fn segment(
    dedup: &DedupReport,
    ngrams: &NgramReport,
    tally: &BTreeMap<PageType, usize>,
) -> Segmentation {
    let mut total = PageTypeStat::empty(TOTAL_LABEL, tally.values().sum());

    let segments = tally
        .iter()
        .map(|(page_type, &records)| {
            let mut stat = PageTypeStat::empty(page_type.as_str(), records);
            for field in TextField::ALL {
                if let Some(counts) = dedup.field(field).by_page_type.get(page_type) {
                    debug_assert_eq!(counts.records, records);
                    stat.absorb(field, counts);
                    total.absorb(field, counts);
                }
            }

            let scope = Scope::PageType(page_type.clone());
            let top_ngrams = ngrams
                .tables
                .iter()
                .map(|table| NgramSlice {
                    field: table.field,
                    n: table.n,
                    entries: table.scope(&scope).to_vec(),
                })
                .collect();

            Segment { stat, top_ngrams }
        })
        .collect();

    Segmentation { segments, total }
}

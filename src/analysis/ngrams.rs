// N-gram counter: frequency of word 2/3/4-grams per field and page type.
//
// Each n-gram is stored once per (field, n) with a total (the synthetic
// "ALL" page type) and a per-page-type breakdown. Every occurrence counts,
// including repeats inside the same text.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Serialize, Serializer};

use super::tokenize::{windows, Tokenizer};
use super::traits::ChunkAggregator;
use crate::record::{PageType, Record, TextField, ALL_PAGE_TYPES};

/// An ordered token tuple. Ordering is lexicographic over the tokens.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ngram(Vec<String>);

impl Ngram {
    pub fn new<S: Into<String>>(tokens: impl IntoIterator<Item = S>) -> Self {
        Ngram(tokens.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Ngram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl Serialize for Ngram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Which slice of the data an n-gram count belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// Every page type together. Sorts before any real page type.
    All,
    PageType(PageType),
}

impl Scope {
    pub fn as_str(&self) -> &str {
        match self {
            Scope::All => ALL_PAGE_TYPES,
            Scope::PageType(p) => p.as_str(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A counted n-gram within one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NgramEntry {
    pub ngram: Ngram,
    pub page_type: Scope,
    pub count: u64,
}

/// Descending count, then ascending token tuple.
pub fn rank_order(a: &NgramEntry, b: &NgramEntry) -> Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| a.ngram.cmp(&b.ngram))
        .then_with(|| a.page_type.cmp(&b.page_type))
}

/// Top entries of one (field, n) pair, sliced per scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NgramTable {
    pub field: TextField,
    pub n: usize,
    /// Distinct n-grams seen for this field and size, before any cut
    pub distinct: usize,
    #[serde(serialize_with = "serialize_scoped")]
    pub by_scope: BTreeMap<Scope, Vec<NgramEntry>>,
}

fn serialize_scoped<S: Serializer>(
    map: &BTreeMap<Scope, Vec<NgramEntry>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(map.iter().map(|(scope, entries)| (scope.as_str(), entries)))
}

impl NgramTable {
    pub fn scope(&self, scope: &Scope) -> &[NgramEntry] {
        self.by_scope.get(scope).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all(&self) -> &[NgramEntry] {
        self.scope(&Scope::All)
    }

    /// Every entry of every scope in rank order.
    pub fn ranked(&self) -> Vec<&NgramEntry> {
        let mut entries: Vec<&NgramEntry> = self.by_scope.values().flatten().collect();
        entries.sort_by(|a, b| rank_order(a, b));
        entries
    }
}

/// Finalized output of the n-gram counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NgramReport {
    /// Ordered by field (title first), then n ascending
    pub tables: Vec<NgramTable>,
}

impl NgramReport {
    pub fn table(&self, field: TextField, n: usize) -> Option<&NgramTable> {
        self.tables.iter().find(|t| t.field == field && t.n == n)
    }
}

#[derive(Debug, Clone, Default)]
struct NgramTally {
    total: u64,
    by_page_type: BTreeMap<PageType, u64>,
}

impl NgramTally {
    fn bump(&mut self, page_type: &PageType, by: u64) {
        self.total += by;
        match self.by_page_type.get_mut(page_type) {
            Some(count) => *count += by,
            None => {
                self.by_page_type.insert(page_type.clone(), by);
            }
        }
    }
}

/// Incremental n-gram counter.
#[derive(Debug)]
pub struct NgramCounter {
    tokenizer: Tokenizer,
    sizes: Vec<usize>,
    counts: BTreeMap<(TextField, usize), HashMap<Ngram, NgramTally>>,
}

impl NgramCounter {
    /// Counter for the given n-gram sizes. Duplicate sizes are ignored.
    pub fn new(sizes: &[usize], tokenizer: Tokenizer) -> Self {
        let mut sizes = sizes.to_vec();
        sizes.sort_unstable();
        sizes.dedup();

        let mut counts = BTreeMap::new();
        for field in TextField::ALL {
            for &n in &sizes {
                counts.insert((field, n), HashMap::new());
            }
        }

        Self {
            tokenizer,
            sizes,
            counts,
        }
    }

    /// Consume the counter and keep the `top_k` most frequent n-grams per
    /// scope, dropping anything seen fewer than `min_count` times.
    pub fn finalize(self, top_k: usize, min_count: u64) -> NgramReport {
        let tables = self
            .counts
            .into_iter()
            .map(|((field, n), counts)| {
                let distinct = counts.len();
                let mut by_scope: BTreeMap<Scope, Vec<NgramEntry>> = BTreeMap::new();

                for (ngram, tally) in counts {
                    if tally.total >= min_count {
                        by_scope.entry(Scope::All).or_default().push(NgramEntry {
                            ngram: ngram.clone(),
                            page_type: Scope::All,
                            count: tally.total,
                        });
                    }
                    for (page_type, count) in tally.by_page_type {
                        if count < min_count {
                            continue;
                        }
                        let scope = Scope::PageType(page_type);
                        by_scope.entry(scope.clone()).or_default().push(NgramEntry {
                            ngram: ngram.clone(),
                            page_type: scope,
                            count,
                        });
                    }
                }

                for entries in by_scope.values_mut() {
                    entries.sort_unstable_by(rank_order);
                    entries.truncate(top_k);
                }

                NgramTable {
                    field,
                    n,
                    distinct,
                    by_scope,
                }
            })
            .collect();

        NgramReport { tables }
    }
}

impl ChunkAggregator for NgramCounter {
    fn add_chunk(&mut self, records: &[Record]) {
        if self.sizes.is_empty() {
            return;
        }
        for record in records {
            for field in TextField::ALL {
                let tokens = self.tokenizer.tokenize(record.text(field));
                for &n in &self.sizes {
                    let Some(counts) = self.counts.get_mut(&(field, n)) else {
                        continue;
                    };
                    for window in windows(&tokens, n) {
                        counts
                            .entry(Ngram::new(window.iter().cloned()))
                            .or_default()
                            .bump(&record.page_type, 1);
                    }
                }
            }
        }
    }

    fn distinct_values(&self) -> usize {
        self.counts.values().map(HashMap::len).sum()
    }

    fn merge(&mut self, other: Self) {
        for (key, counts) in other.counts {
            let target = self.counts.entry(key).or_default();
            for (ngram, tally) in counts {
                let entry = target.entry(ngram).or_default();
                for (page_type, count) in &tally.by_page_type {
                    entry.bump(page_type, *count);
                }
            }
        }
    }
}

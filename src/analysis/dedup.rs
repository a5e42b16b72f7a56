// Duplicate aggregator: groups records by normalized title and by
// normalized meta description.
//
// Memory grows with the number of distinct normalized values (plus the
// member list of each group). High-cardinality exports are the dominant
// memory risk; that is a known scaling limit of exact grouping, guarded by
// the session's `max_distinct_values` ceiling.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use super::traits::ChunkAggregator;
use crate::record::{NormalizedKey, PageType, Record, TextField};

/// One record's membership in a duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GroupMember {
    pub url: String,
    pub page_type: PageType,
    /// The record's own text for this field, trimmed but not normalized
    pub text: String,
    /// The record's other text field (meta description for title groups)
    pub other_text: String,
}

/// All records sharing one normalized value. Only groups with at least two
/// members are reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub key: String,
    /// Sorted by url, then page type, so arrival order never shows
    pub members: Vec<GroupMember>,
}

impl DuplicateGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Distinct page types among the members, sorted.
    pub fn page_types(&self) -> BTreeSet<&PageType> {
        self.members.iter().map(|m| &m.page_type).collect()
    }
}

/// Per-page-type counts for one text field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageTypeDuplicates {
    pub records: usize,
    pub missing: usize,
    /// Records whose value appears at least twice anywhere in the export
    pub duplicates: usize,
    /// Records whose value appears at least twice inside this page type
    pub within_page_type_duplicates: usize,
}

impl PageTypeDuplicates {
    pub fn non_missing(&self) -> usize {
        self.records - self.missing
    }

    /// Duplicate records over non-missing records. `None` when every value
    /// is missing.
    pub fn duplication_rate(&self) -> Option<f64> {
        match self.non_missing() {
            0 => None,
            n => Some(self.duplicates as f64 / n as f64),
        }
    }
}

/// Finalized duplicate state for one text field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDuplicates {
    pub field: TextField,
    /// Groups with two or more members, largest first, ties by key
    pub groups: Vec<DuplicateGroup>,
    pub by_page_type: BTreeMap<PageType, PageTypeDuplicates>,
    /// Distinct non-missing normalized values
    pub distinct_values: usize,
}

impl FieldDuplicates {
    pub fn records(&self) -> usize {
        self.by_page_type.values().map(|p| p.records).sum()
    }

    pub fn missing(&self) -> usize {
        self.by_page_type.values().map(|p| p.missing).sum()
    }

    pub fn non_missing(&self) -> usize {
        self.records() - self.missing()
    }

    pub fn duplicate_records(&self) -> usize {
        self.groups.iter().map(DuplicateGroup::len).sum()
    }

    pub fn most_repeated(&self) -> Option<&DuplicateGroup> {
        self.groups.first()
    }
}

/// Finalized output of the duplicate aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DedupReport {
    pub title: FieldDuplicates,
    pub meta_description: FieldDuplicates,
    pub distinct_urls: usize,
}

impl DedupReport {
    pub fn field(&self, field: TextField) -> &FieldDuplicates {
        match field {
            TextField::Title => &self.title,
            TextField::MetaDescription => &self.meta_description,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    records: usize,
    missing: usize,
}

#[derive(Debug, Default)]
struct FieldState {
    groups: BTreeMap<String, Vec<GroupMember>>,
    tallies: BTreeMap<PageType, Tally>,
}

impl FieldState {
    fn add(&mut self, record: &Record, field: TextField) {
        let tally = self.tallies.entry(record.page_type.clone()).or_default();
        tally.records += 1;

        match NormalizedKey::from_text(record.text(field)) {
            NormalizedKey::Missing => tally.missing += 1,
            NormalizedKey::Value(key) => {
                self.groups.entry(key).or_default().push(GroupMember {
                    url: record.url.clone(),
                    page_type: record.page_type.clone(),
                    text: record.text(field).trim().to_string(),
                    other_text: record.text(field.other()).trim().to_string(),
                });
            }
        }
    }

    fn merge(&mut self, other: FieldState) {
        for (key, members) in other.groups {
            self.groups.entry(key).or_default().extend(members);
        }
        for (page_type, t) in other.tallies {
            let tally = self.tallies.entry(page_type).or_default();
            tally.records += t.records;
            tally.missing += t.missing;
        }
    }

    fn finalize(self, field: TextField) -> FieldDuplicates {
        let distinct_values = self.groups.len();
        let mut by_page_type: BTreeMap<PageType, PageTypeDuplicates> = self
            .tallies
            .into_iter()
            .map(|(page_type, t)| {
                let stats = PageTypeDuplicates {
                    records: t.records,
                    missing: t.missing,
                    ..Default::default()
                };
                (page_type, stats)
            })
            .collect();

        let mut groups = Vec::new();
        for (key, mut members) in self.groups {
            if members.len() < 2 {
                continue;
            }
            members.sort();

            let mut per_type: BTreeMap<&PageType, usize> = BTreeMap::new();
            for member in &members {
                *per_type.entry(&member.page_type).or_default() += 1;
            }
            for (page_type, count) in per_type {
                if let Some(stats) = by_page_type.get_mut(page_type) {
                    stats.duplicates += count;
                    if count > 1 {
                        stats.within_page_type_duplicates += count;
                    }
                }
            }

            groups.push(DuplicateGroup { key, members });
        }

        // Keys are unique, so this order is total
        groups.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.key.cmp(&b.key)));

        FieldDuplicates {
            field,
            groups,
            by_page_type,
            distinct_values,
        }
    }
}

/// Incremental duplicate detector over titles and meta descriptions.
#[derive(Debug, Default)]
pub struct DedupAggregator {
    fields: [FieldState; 2],
    urls: HashSet<String>,
}

impl DedupAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the aggregator and produce the finalized groups and rollups.
    pub fn finalize(self) -> DedupReport {
        let distinct_urls = self.urls.len();
        let [title, meta_description] = self.fields;
        DedupReport {
            title: title.finalize(TextField::Title),
            meta_description: meta_description.finalize(TextField::MetaDescription),
            distinct_urls,
        }
    }
}

impl ChunkAggregator for DedupAggregator {
    fn add_chunk(&mut self, records: &[Record]) {
        for record in records {
            for field in TextField::ALL {
                self.fields[field.index()].add(record, field);
            }
            if !self.urls.contains(&record.url) {
                self.urls.insert(record.url.clone());
            }
        }
    }

    fn distinct_values(&self) -> usize {
        self.fields.iter().map(|f| f.groups.len()).sum::<usize>() + self.urls.len()
    }

    fn merge(&mut self, other: Self) {
        let [title, meta_description] = other.fields;
        self.fields[TextField::Title.index()].merge(title);
        self.fields[TextField::MetaDescription.index()].merge(meta_description);
        self.urls.extend(other.urls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(url: &str, title: &str, page_type: &str) -> Record {
        Record::new(url, title, "", Some(page_type))
    }

    #[test]
    fn groups_ignore_case_and_spacing() {
        let mut agg = DedupAggregator::new();
        agg.add_chunk(&[
            rec("u1", "Red Shoes", "product"),
            rec("u2", "  red   shoes ", "product"),
            rec("u3", "Blue Shoes", "product"),
        ]);
        let report = agg.finalize();
        assert_eq!(report.title.groups.len(), 1);
        assert_eq!(report.title.groups[0].key, "red shoes");
        assert_eq!(report.title.distinct_values, 2);

        let texts: Vec<&str> = report.title.groups[0]
            .members
            .iter()
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(texts, vec!["Red Shoes", "red   shoes"]);
    }

    #[test]
    fn within_page_type_duplicates_need_two_in_same_type() {
        let mut agg = DedupAggregator::new();
        agg.add_chunk(&[
            rec("u1", "Same", "blog"),
            rec("u2", "Same", "blog"),
            rec("u3", "Same", "product"),
        ]);
        let report = agg.finalize();
        let blog = report.title.by_page_type[&PageType::new(Some("blog"))];
        let product = report.title.by_page_type[&PageType::new(Some("product"))];
        assert_eq!(blog.duplicates, 2);
        assert_eq!(blog.within_page_type_duplicates, 2);
        assert_eq!(product.duplicates, 1);
        assert_eq!(product.within_page_type_duplicates, 0);
    }

    #[test]
    fn merge_matches_single_pass() {
        let records = vec![
            rec("u1", "A", "blog"),
            rec("u2", "B", "blog"),
            rec("u3", "a", "product"),
            rec("u4", "", "product"),
        ];

        let mut whole = DedupAggregator::new();
        whole.add_chunk(&records);

        let mut left = DedupAggregator::new();
        left.add_chunk(&records[2..]);
        let mut right = DedupAggregator::new();
        right.add_chunk(&records[..2]);
        left.merge(right);

        assert_eq!(whole.finalize(), left.finalize());
    }
}

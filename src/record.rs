// Record model: what the ingestor hands the engine, and the normalization
// rules every aggregator shares.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Label used for records without a page type.
pub const NONE_PAGE_TYPE: &str = "none";

/// Synthetic page type that aggregates every other page type.
pub const ALL_PAGE_TYPES: &str = "ALL";

/// Label of the grand-total row in page-type summaries.
pub const TOTAL_LABEL: &str = "TOTAL";

/// Suffix appended to real page types that collide with a synthetic label.
const RESERVED_SUFFIX: &str = " (page type)";

/// Every column the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    Url,
    Title,
    MetaDescription,
    PageType,
}

impl Field {
    pub const REQUIRED: [Field; 3] = [Field::Url, Field::Title, Field::MetaDescription];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Url => "url",
            Field::Title => "title",
            Field::MetaDescription => "meta_description",
            Field::PageType => "page_type",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two text fields that are checked for duplicates and n-grams.
///
/// Each has its own namespace: a title never groups with a meta description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TextField {
    Title,
    MetaDescription,
}

impl TextField {
    pub const ALL: [TextField; 2] = [TextField::Title, TextField::MetaDescription];

    /// Prefix used in artifact names (`title_duplicate_rollup`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            TextField::Title => "title",
            TextField::MetaDescription => "meta_description",
        }
    }

    /// Human-readable name for summaries and terminal output.
    pub fn label(&self) -> &'static str {
        match self {
            TextField::Title => "Title",
            TextField::MetaDescription => "Meta Description",
        }
    }

    /// The companion field listed next to this one in rollups.
    pub fn other(&self) -> TextField {
        match self {
            TextField::Title => TextField::MetaDescription,
            TextField::MetaDescription => TextField::Title,
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            TextField::Title => 0,
            TextField::MetaDescription => 1,
        }
    }
}

/// A page-type label, trimmed, with absent/blank labels mapped to `none`.
///
/// A real page type spelled exactly like `ALL` or `TOTAL` gets
/// `" (page type)"` appended so it never reads as the synthetic scope or
/// the grand-total row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageType(String);

impl PageType {
    pub fn new(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(label) if label == ALL_PAGE_TYPES || label == TOTAL_LABEL => {
                PageType(format!("{label}{RESERVED_SUFFIX}"))
            }
            Some(label) if !label.is_empty() => PageType(label.to_string()),
            _ => PageType::none(),
        }
    }

    pub fn none() -> Self {
        PageType(NONE_PAGE_TYPE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized form of a text value used as a grouping key.
///
/// `Missing` is never a group key: empty values are counted, not grouped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NormalizedKey {
    Missing,
    Value(String),
}

impl NormalizedKey {
    /// Lower-case and collapse whitespace runs into single spaces.
    pub fn from_text(text: &str) -> Self {
        let mut out = String::with_capacity(text.len());
        for word in text.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.extend(word.chars().flat_map(char::to_lowercase));
        }
        if out.is_empty() {
            NormalizedKey::Missing
        } else {
            NormalizedKey::Value(out)
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, NormalizedKey::Missing)
    }
}

/// A row as the ingestor saw it. Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub url: Option<String>,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub page_type: Option<String>,
    /// Set when the ingestor could not read the row at all (bad encoding,
    /// broken quoting). Holds the reason; the other fields are then absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unreadable: Option<String>,
}

impl RawRecord {
    /// Placeholder for a row the ingestor could not decode, so the session
    /// still counts it.
    pub fn unreadable(reason: impl Into<String>) -> Self {
        Self {
            unreadable: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::Url => self.url.is_some(),
            Field::Title => self.title.is_some(),
            Field::MetaDescription => self.meta_description.is_some(),
            Field::PageType => self.page_type.is_some(),
        }
    }
}

/// A validated record. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    pub page_type: PageType,
}

impl Record {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        meta_description: impl Into<String>,
        page_type: Option<&str>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            meta_description: meta_description.into(),
            page_type: PageType::new(page_type),
        }
    }

    /// Convert a raw row, returning the reason it is malformed otherwise.
    pub fn from_raw(raw: RawRecord) -> std::result::Result<Self, String> {
        if let Some(reason) = &raw.unreadable {
            return Err(reason.clone());
        }
        let missing: Vec<&str> = Field::REQUIRED
            .iter()
            .filter(|f| !raw.has(**f))
            .map(|f| f.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(format!("missing {}", missing.join(", ")));
        }

        let page_type = PageType::new(raw.page_type.as_deref());
        Ok(Self {
            url: raw.url.unwrap_or_default(),
            title: raw.title.unwrap_or_default(),
            meta_description: raw.meta_description.unwrap_or_default(),
            page_type,
        })
    }

    pub fn text(&self, field: TextField) -> &str {
        match field {
            TextField::Title => &self.title,
            TextField::MetaDescription => &self.meta_description,
        }
    }
}

// Delimited-file ingestor: the CLI's record source.
//
// Reads a CSV/TSV export with an explicit delimiter, maps the header onto
// the engine's fields using known column aliases, and yields fixed-size
// chunks of `RawRecord`s. Quoted fields follow RFC 4180: doubled quotes
// escape a quote and quoted fields may span lines.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::record::{Field, RawRecord};

const URL_ALIASES: &[&str] = &["full url", "address", "url"];
const TITLE_ALIASES: &[&str] = &["title", "title 1"];
const META_ALIASES: &[&str] = &["meta description", "meta description 1", "meta_description"];
const PAGE_TYPE_ALIASES: &[&str] = &["pagetype", "page type", "page_type"];

/// A quoted field may span at most this many physical lines. Past that the
/// opening quote is treated as unterminated.
const MAX_QUOTED_LINES: usize = 1_000;

/// One logical row read from the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Fields(Vec<String>),
    /// The row could not be read; holds the reason.
    Unreadable(String),
}

#[derive(Debug, Clone)]
struct Line {
    text: String,
    valid_utf8: bool,
}

/// Reads one logical row at a time from delimited text.
///
/// Bad rows never end the stream. A row with invalid UTF-8 comes back as
/// `Row::Unreadable`. So does a row whose quote never closes; the lines the
/// open quote swallowed are then read again as rows of their own.
pub struct DelimitedReader<R> {
    reader: R,
    delimiter: char,
    buf: Vec<u8>,
    replay: VecDeque<Line>,
}

impl<R: BufRead> DelimitedReader<R> {
    pub fn new(reader: R, delimiter: char) -> Self {
        Self {
            reader,
            delimiter,
            buf: Vec::new(),
            replay: VecDeque::new(),
        }
    }

    fn next_line(&mut self) -> io::Result<Option<Line>> {
        if let Some(line) = self.replay.pop_front() {
            return Ok(Some(line));
        }
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        // Quotes and delimiters are ASCII, so a lossy decode still splits
        // the row correctly.
        let valid_utf8 = std::str::from_utf8(&self.buf).is_ok();
        let text = String::from_utf8_lossy(&self.buf)
            .trim_end_matches(['\n', '\r'])
            .to_string();
        Ok(Some(Line { text, valid_utf8 }))
    }

    /// Next row, or `None` at end of input.
    pub fn read_row(&mut self) -> io::Result<Option<Row>> {
        let mut consumed: Vec<Line> = Vec::new();
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut in_quotes = false;

        loop {
            let Some(line) = self.next_line()? else {
                if consumed.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.unterminated(consumed)));
            };
            if in_quotes {
                field.push('\n');
            }

            let mut chars = line.text.chars().peekable();
            while let Some(c) = chars.next() {
                if in_quotes {
                    if c == '"' {
                        if chars.peek() == Some(&'"') {
                            field.push('"');
                            chars.next();
                        } else {
                            in_quotes = false;
                        }
                    } else {
                        field.push(c);
                    }
                } else if c == '"' && field.is_empty() {
                    in_quotes = true;
                } else if c == self.delimiter {
                    fields.push(std::mem::take(&mut field));
                } else {
                    field.push(c);
                }
            }
            consumed.push(line);

            if !in_quotes {
                fields.push(field);
                if consumed.iter().any(|l| !l.valid_utf8) {
                    return Ok(Some(Row::Unreadable("invalid UTF-8".to_string())));
                }
                return Ok(Some(Row::Fields(fields)));
            }
            if consumed.len() >= MAX_QUOTED_LINES {
                return Ok(Some(self.unterminated(consumed)));
            }
        }
    }

    /// Give up on a quote that never closed. Only its opening line is lost.
    fn unterminated(&mut self, mut consumed: Vec<Line>) -> Row {
        for line in consumed.drain(1..).rev() {
            self.replay.push_front(line);
        }
        Row::Unreadable("unterminated quoted field".to_string())
    }
}

fn normalize_header(name: &str) -> String {
    name.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// Position of each engine field in the file's header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub url: Option<usize>,
    pub title: Option<usize>,
    pub meta_description: Option<usize>,
    pub page_type: Option<usize>,
}

impl ColumnMap {
    /// Resolve header names against the alias lists. The first matching
    /// column wins.
    pub fn from_header(header: &[String]) -> Self {
        let names: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| names.iter().position(|n| n == alias))
        };
        Self {
            url: find(URL_ALIASES),
            title: find(TITLE_ALIASES),
            meta_description: find(META_ALIASES),
            page_type: find(PAGE_TYPE_ALIASES),
        }
    }

    /// Required fields with no matching column.
    pub fn missing_required(&self) -> Vec<Field> {
        Field::REQUIRED
            .into_iter()
            .filter(|f| self.index(*f).is_none())
            .collect()
    }

    pub fn index(&self, field: Field) -> Option<usize> {
        match field {
            Field::Url => self.url,
            Field::Title => self.title,
            Field::MetaDescription => self.meta_description,
            Field::PageType => self.page_type,
        }
    }

    /// Pick this row's fields. Short rows leave the trailing fields absent.
    pub fn project(&self, row: &[String]) -> RawRecord {
        let pick = |idx: Option<usize>| idx.and_then(|i| row.get(i)).cloned();
        RawRecord {
            url: pick(self.url),
            title: pick(self.title),
            meta_description: pick(self.meta_description),
            page_type: pick(self.page_type),
            unreadable: None,
        }
    }
}

/// Yields chunks of at most `chunk_size` rows. Blank lines are skipped.
pub struct ChunkedIngestor<R> {
    rows: DelimitedReader<R>,
    columns: ColumnMap,
    header: Vec<String>,
    chunk_size: usize,
    rows_read: usize,
    done: bool,
}

impl<R: BufRead> ChunkedIngestor<R> {
    /// Read the header and set up column mapping.
    pub fn new(reader: R, delimiter: char, chunk_size: usize) -> Result<Self> {
        let mut rows = DelimitedReader::new(reader, delimiter);
        let header = match rows.read_row().context("Failed to read header row")? {
            Some(Row::Fields(header)) => header,
            Some(Row::Unreadable(reason)) => anyhow::bail!("Header row is unreadable: {reason}"),
            None => anyhow::bail!("Input is empty: no header row found"),
        };
        let columns = ColumnMap::from_header(&header);
        debug!(?columns, "Resolved column mapping");

        Ok(Self {
            rows,
            columns,
            header,
            chunk_size: chunk_size.max(1),
            rows_read: 0,
            done: false,
        })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Data rows read so far (blank lines excluded).
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    fn next_chunk(&mut self) -> Result<Option<Vec<RawRecord>>> {
        let mut chunk = Vec::with_capacity(self.chunk_size.min(8192));
        while chunk.len() < self.chunk_size {
            let row = self
                .rows
                .read_row()
                .with_context(|| format!("Failed to read row {}", self.rows_read + 2))?;
            let record = match row {
                None => {
                    self.done = true;
                    break;
                }
                Some(Row::Fields(row)) if row.len() == 1 && row[0].trim().is_empty() => continue,
                Some(Row::Fields(row)) => self.columns.project(&row),
                // Handed on so the session counts it with the other bad rows
                Some(Row::Unreadable(reason)) => RawRecord::unreadable(reason),
            };
            self.rows_read += 1;
            chunk.push(record);
        }
        Ok((!chunk.is_empty()).then_some(chunk))
    }
}

impl<R: BufRead> Iterator for ChunkedIngestor<R> {
    type Item = Result<Vec<RawRecord>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_chunk() {
            Ok(chunk) => chunk.map(Ok),
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Open a delimited file for chunked reading.
pub fn open(
    path: &Path,
    delimiter: char,
    chunk_size: usize,
) -> Result<ChunkedIngestor<BufReader<File>>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    ChunkedIngestor::new(BufReader::new(file), delimiter, chunk_size)
        .with_context(|| format!("Failed to read {}", path.display()))
}

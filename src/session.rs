// Analysis session: the state machine that drives the aggregators.
//
//   Idle --start--> Ingesting --add_chunk*--> Ingesting --finalize--> Finalized
//   any state --reset/cancel--> Idle
//
// Only one session may be ingesting per `SessionLock`. The lock is an
// explicit handle owned by the caller; there is no process-global state.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::dedup::{DedupAggregator, DedupReport};
use crate::analysis::ngrams::{NgramCounter, NgramReport};
use crate::analysis::tokenize::Tokenizer;
use crate::analysis::traits::ChunkAggregator;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, MalformedRow, Result};
use crate::record::{Field, PageType, RawRecord, Record};
use crate::segment::{segment, Segmentation};

/// How many malformed rows are kept verbatim for the summary. The rest are
/// only counted.
const MALFORMED_SAMPLE_LIMIT: usize = 100;

/// Malformed rows logged at warn level before switching to debug.
const MALFORMED_WARN_LIMIT: usize = 10;

/// Caller-owned handle that admits one ingesting session at a time.
#[derive(Debug, Clone, Default)]
pub struct SessionLock {
    busy: Arc<AtomicBool>,
}

impl SessionLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while some session created from this lock is ingesting.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn acquire(&self) -> Option<LockGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LockGuard {
                busy: Arc::clone(&self.busy),
            })
    }
}

/// Releases the lock when the ingesting state is dropped.
#[derive(Debug)]
struct LockGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Public view of where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Ingesting,
    Finalized,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Ingesting => "ingesting",
            SessionState::Finalized => "finalized",
        }
    }
}

/// Row accounting for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionStats {
    pub chunks: usize,
    /// Rows handed to the session, valid or not
    pub rows_seen: usize,
    /// Rows that became records
    pub records: usize,
    pub malformed_rows: usize,
    /// The first malformed rows, kept for reporting
    pub malformed_samples: Vec<MalformedRow>,
}

/// Everything a finalized session knows. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub config: AnalysisConfig,
    pub ingestion: IngestionStats,
    pub dedup: DedupReport,
    pub ngrams: NgramReport,
    pub segments: Segmentation,
}

/// What happened to one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOutcome {
    /// 1-based chunk number
    pub chunk: usize,
    pub accepted: usize,
    pub skipped: usize,
}

#[derive(Debug)]
struct Ingesting {
    _guard: LockGuard,
    dedup: DedupAggregator,
    ngrams: NgramCounter,
    page_types: BTreeMap<PageType, usize>,
    stats: IngestionStats,
}

impl Ingesting {
    fn new(guard: LockGuard, config: &AnalysisConfig) -> Self {
        let tokenizer = if config.remove_stop_words {
            Tokenizer::without_stop_words()
        } else {
            Tokenizer::new()
        };
        Self {
            _guard: guard,
            dedup: DedupAggregator::new(),
            ngrams: NgramCounter::new(&config.ngram_sizes, tokenizer),
            page_types: BTreeMap::new(),
            stats: IngestionStats::default(),
        }
    }

    fn ingest(&mut self, chunk: Vec<RawRecord>, config: &AnalysisConfig) -> Result<ChunkOutcome> {
        let index = self.stats.chunks + 1;
        if chunk.is_empty() {
            return Err(AnalysisError::EmptyChunk { chunk: index });
        }

        // Schema check happens before any state changes. Unreadable rows say
        // nothing about the columns, so a chunk made only of them passes.
        let readable: Vec<&RawRecord> = chunk
            .iter()
            .filter(|row| row.unreadable.is_none())
            .collect();
        let missing: Vec<Field> = Field::REQUIRED
            .into_iter()
            .filter(|f| !readable.is_empty() && !readable.iter().any(|row| row.has(*f)))
            .collect();
        if !missing.is_empty() {
            return Err(AnalysisError::Schema {
                chunk: index,
                missing,
            });
        }

        let first_row = self.stats.rows_seen + 1;
        let rows = chunk.len();
        let mut records = Vec::with_capacity(rows);
        for (offset, raw) in chunk.into_iter().enumerate() {
            match Record::from_raw(raw) {
                Ok(record) => records.push(record),
                Err(reason) => self.skip(first_row + offset, reason),
            }
        }

        self.dedup.add_chunk(&records);
        self.ngrams.add_chunk(&records);
        for record in &records {
            *self.page_types.entry(record.page_type.clone()).or_default() += 1;
        }

        self.stats.chunks = index;
        self.stats.rows_seen += rows;
        self.stats.records += records.len();

        let held = self.dedup.distinct_values() + self.ngrams.distinct_values();
        debug!(
            chunk = index,
            rows,
            accepted = records.len(),
            distinct_values = held,
            "Chunk aggregated"
        );
        if let Some(limit) = config.max_distinct_values {
            if held > limit {
                return Err(AnalysisError::ResourceExhausted {
                    limit,
                    observed: held,
                });
            }
        }

        Ok(ChunkOutcome {
            chunk: index,
            accepted: records.len(),
            skipped: rows - records.len(),
        })
    }

    fn skip(&mut self, row: usize, reason: String) {
        self.stats.malformed_rows += 1;
        if self.stats.malformed_rows <= MALFORMED_WARN_LIMIT {
            warn!(row, reason = %reason, "Skipping malformed row");
        } else {
            debug!(row, reason = %reason, "Skipping malformed row");
        }
        if self.stats.malformed_samples.len() < MALFORMED_SAMPLE_LIMIT {
            self.stats.malformed_samples.push(MalformedRow { row, reason });
        }
    }

    fn finish(self, config: &AnalysisConfig) -> Analysis {
        let dedup = self.dedup.finalize();
        let ngrams = self.ngrams.finalize(config.top_k, config.min_ngram_count);
        let segments = segment(&dedup, &ngrams, &self.page_types);

        info!(
            records = self.stats.records,
            malformed = self.stats.malformed_rows,
            page_types = segments.page_type_count(),
            duplicate_titles = dedup.title.duplicate_records(),
            duplicate_meta_descriptions = dedup.meta_description.duplicate_records(),
            "Analysis finalized"
        );

        Analysis {
            config: config.clone(),
            ingestion: self.stats,
            dedup,
            ngrams,
            segments,
        }
    }
}

#[derive(Debug)]
enum State {
    Idle,
    Ingesting(Box<Ingesting>),
    Finalized(Box<Analysis>),
}

/// One analysis session.
#[derive(Debug)]
pub struct Session {
    lock: SessionLock,
    config: AnalysisConfig,
    state: State,
}

impl Session {
    /// Create an idle session. The config is validated here.
    pub fn new(lock: &SessionLock, config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            lock: lock.clone(),
            config,
            state: State::Idle,
        })
    }

    pub fn state(&self) -> SessionState {
        match self.state {
            State::Idle => SessionState::Idle,
            State::Ingesting(_) => SessionState::Ingesting,
            State::Finalized(_) => SessionState::Finalized,
        }
    }

    fn sequence_error(&self, operation: &'static str) -> AnalysisError {
        AnalysisError::Sequence {
            operation,
            state: self.state().as_str(),
        }
    }

    /// Idle -> Ingesting. Fails if another session holds the lock.
    pub fn start(&mut self) -> Result<()> {
        if !matches!(self.state, State::Idle) {
            return Err(self.sequence_error("start"));
        }
        let guard = self.lock.acquire().ok_or(AnalysisError::Sequence {
            operation: "start",
            state: "blocked by another ingesting session",
        })?;
        self.state = State::Ingesting(Box::new(Ingesting::new(guard, &self.config)));
        info!(
            chunk_size = self.config.chunk_size,
            ngram_sizes = ?self.config.ngram_sizes,
            top_k = self.config.top_k,
            "Analysis session started"
        );
        Ok(())
    }

    /// Feed one chunk. Malformed rows are skipped and counted; schema,
    /// empty-chunk, and cardinality errors abort the session.
    pub fn add_chunk(&mut self, chunk: Vec<RawRecord>) -> Result<ChunkOutcome> {
        let state = self.state();
        let State::Ingesting(ingesting) = &mut self.state else {
            return Err(AnalysisError::Sequence {
                operation: "add a chunk",
                state: state.as_str(),
            });
        };

        match ingesting.ingest(chunk, &self.config) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if err.aborts_session() {
                    warn!(error = %err, "Aborting analysis session");
                    self.state = State::Idle;
                }
                Err(err)
            }
        }
    }

    /// Ingesting -> Finalized. Calling it again returns the same analysis
    /// without recomputing anything.
    pub fn finalize(&mut self) -> Result<&Analysis> {
        if matches!(self.state, State::Ingesting(_)) {
            if let State::Ingesting(ingesting) = std::mem::replace(&mut self.state, State::Idle) {
                let analysis = ingesting.finish(&self.config);
                self.state = State::Finalized(Box::new(analysis));
            }
        }

        match &self.state {
            State::Finalized(analysis) => Ok(analysis.as_ref()),
            _ => Err(self.sequence_error("finalize")),
        }
    }

    /// The finalized analysis, if there is one.
    pub fn analysis(&self) -> Option<&Analysis> {
        match &self.state {
            State::Finalized(analysis) => Some(analysis.as_ref()),
            _ => None,
        }
    }

    /// Discard everything and return to Idle.
    pub fn reset(&mut self) {
        if !matches!(self.state, State::Idle) {
            debug!(state = self.state().as_str(), "Session reset");
        }
        self.state = State::Idle;
    }

    /// Abandon an in-progress ingestion. Nothing partial is ever exposed.
    pub fn cancel(&mut self) {
        if matches!(self.state, State::Ingesting(_)) {
            info!("Analysis session cancelled");
        }
        self.reset();
    }
}

/// Run a whole stream of chunks through a private session.
pub fn analyze<I>(config: AnalysisConfig, chunks: I) -> Result<Analysis>
where
    I: IntoIterator<Item = Vec<RawRecord>>,
{
    let lock = SessionLock::new();
    let mut session = Session::new(&lock, config)?;
    session.start()?;
    for chunk in chunks {
        session.add_chunk(chunk)?;
    }
    session.finalize().cloned()
}

// seolens: streaming duplicate and n-gram analysis for SEO crawl exports.
//
// This is the library root. The engine (record, analysis, session, segment,
// report) is pure and synchronous; ingest and output are the CLI's
// collaborators for reading exports and writing report files.

pub mod analysis;
pub mod config;
pub mod error;
pub mod ingest;
pub mod output;
pub mod record;
pub mod report;
pub mod segment;
pub mod session;

pub use error::{AnalysisError, Result};
pub use session::{analyze, Analysis, Session, SessionLock, SessionState};

// Incremental aggregation: duplicate grouping and n-gram counting.
//
// Both aggregators consume validated records chunk by chunk and are consumed
// by `finalize`, so a finalized aggregator cannot be fed again.

pub mod traits;
pub mod tokenize;
pub mod dedup;
pub mod ngrams;

// Chunk aggregator trait: the seam the session drives.
//
// Anything the session feeds chunk by chunk implements this. Merging two
// partial aggregators must give the same state as feeding one aggregator
// both inputs, in either order.

use crate::record::Record;

/// An accumulator updated one chunk at a time.
pub trait ChunkAggregator {
    /// Fold a chunk of validated records into the running state.
    fn add_chunk(&mut self, records: &[Record]);

    /// Number of distinct values currently held (the memory driver).
    fn distinct_values(&self) -> usize;

    /// Absorb another partial state built from a disjoint slice of the input.
    fn merge(&mut self, other: Self)
    where
        Self: Sized;
}

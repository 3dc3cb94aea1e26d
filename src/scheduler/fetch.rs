use alloy::primitives::{Address, B256};
use futures::{StreamExt, TryStreamExt, stream};

use crate::{
    error::LedgerError,
    ledger::{LedgerReader, RawLogEntry, sort_by_position},
    scheduler::range_iterator::ChunkIterator,
    types::Chunk,
};

/// Fetches every matching log in `chunk`.
///
/// The chunk is split into sub-ranges of at most `max_fetch_span` blocks, with at most
/// `max_concurrent_fetches` requests in flight. The merged result is ordered by
/// `(block_number, log_index)`. Any failing sub-range fails the whole chunk.
pub(crate) async fn fetch_chunk_logs<L: LedgerReader>(
    reader: &L,
    contract: Address,
    topic: B256,
    chunk: Chunk,
    max_fetch_span: u64,
    max_concurrent_fetches: usize,
) -> Result<Vec<RawLogEntry>, LedgerError> {
    let batches: Vec<Vec<RawLogEntry>> =
        stream::iter(ChunkIterator::new(chunk.from, chunk.to, max_fetch_span))
            .map(|range| reader.fetch_events(contract, topic, range.from, range.to))
            .buffered(max_concurrent_fetches)
            .try_collect()
            .await?;

    let mut logs: Vec<RawLogEntry> = batches.into_iter().flatten().collect();
    sort_by_position(&mut logs);

    if !logs.is_empty() {
        debug!(chunk = %chunk, log_count = logs.len(), "Fetched logs for chunk");
    }
    Ok(logs)
}

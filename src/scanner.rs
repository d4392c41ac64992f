use crate::error::WatchError;
use crate::events::{SignatureTable, decode};
use crate::node::{FilterCriteria, NodeConnection};
use crate::router::EventRouter;
use tracing::{info, warn};

/// Runs the bounded historical pass: one query from the criteria's start
/// block to the node's current head, every entry decoded and routed in the
/// order the node returned it (chain order).
///
/// Returns the block cursor: the block number of the last entry observed,
/// or the start block minus one when nothing matched. Range rejections are
/// surfaced as [`WatchError::RangeTooLarge`]; splitting the range is the
/// caller's decision.
pub async fn scan<C: NodeConnection>(
    connection: &C,
    criteria: &FilterCriteria,
    table: &SignatureTable,
    router: &mut EventRouter,
) -> Result<u64, WatchError> {
    let from_block = criteria.from_block.unwrap_or(0);
    info!("Starting historical scan from block {}", from_block);

    let logs = connection.query_logs(criteria).await?;
    info!("Received {} historical logs", logs.len());

    let mut cursor = from_block.saturating_sub(1);
    for log in &logs {
        match decode(log, table) {
            Ok(outcome) => router.route(log, outcome),
            Err(e) => warn!(
                "Skipping undecodable log in tx {:?} (index {:?}): {}",
                log.transaction_hash, log.log_index, e
            ),
        }
        if let Some(block) = log.block_number {
            cursor = block;
        }
    }

    Ok(cursor)
}

use thiserror::Error;

/// Failures that stop, or can stop, a watch.
///
/// Per-entry decode failures are deliberately not part of this enum; they
/// are reported through [`DecodeError`] and the run continues.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Dialing the node, reopening the connection or opening a
    /// subscription failed.
    #[error("node connection failed: {0}")]
    Connection(String),

    /// The node rejected a historical log query because the block range
    /// matched too many results. `suggested` carries the sub-range the node
    /// asked us to retry with, when it provided one. Splitting the range is
    /// the caller's decision.
    #[error("historical log query rejected by node: {reason}")]
    RangeTooLarge {
        reason: String,
        suggested: Option<(u64, u64)>,
    },

    /// A request kept failing after the bounded per-request retries.
    #[error("rpc request failed: {0}")]
    Rpc(String),

    /// The live feed dropped and the reconnect budget was spent.
    #[error("gave up reconnecting after {0} attempts")]
    ReconnectsExhausted(usize),
}

/// A log carried a recognized event signature but its payload did not match
/// the expected layout. Distinct from the unrecognized classification:
/// malformed entries are surfaced, never silently skipped.
#[derive(Debug, Error)]
#[error("malformed {signature} log: {source}")]
pub struct DecodeError {
    /// Canonical declaration of the event the payload failed to match.
    pub signature: &'static str,
    #[source]
    pub source: alloy::sol_types::Error,
}

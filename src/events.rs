use crate::error::DecodeError;
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;
use alloy_primitives::B256;

sol! {
    #[derive(Debug)]
    event Balance(uint256 indexed tokenId, uint256 balance, uint64 expiration);
}

/// Event signatures the decoder recognizes for the watched contract.
///
/// Hashes are computed from the canonical declaration strings by the `sol!`
/// expansion, shared read-only by every component.
#[derive(Debug, Clone)]
pub struct SignatureTable {
    balance: B256,
}

impl SignatureTable {
    pub fn new() -> Self {
        SignatureTable {
            balance: Balance::SIGNATURE_HASH,
        }
    }

    pub fn contains(&self, topic0: &B256) -> bool {
        *topic0 == self.balance
    }
}

impl Default for SignatureTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of classifying one raw log entry against the signature table.
#[derive(Debug)]
pub enum DecodeOutcome {
    Balance(Balance),
    /// The entry carries no known event signature. A classification
    /// outcome, not an error.
    Unrecognized,
}

/// Decodes a raw log entry. Pure function of its inputs.
///
/// Entries without topics, or whose first topic is not in `table`, are
/// `Unrecognized`. Entries that match a known signature but whose topics or
/// payload do not fit the event layout are a hard [`DecodeError`].
pub fn decode(log: &Log, table: &SignatureTable) -> Result<DecodeOutcome, DecodeError> {
    let Some(topic0) = log.topic0() else {
        return Ok(DecodeOutcome::Unrecognized);
    };

    if !table.contains(topic0) {
        return Ok(DecodeOutcome::Unrecognized);
    }

    let decoded = Balance::decode_raw_log(log.topics(), &log.data().data)
        .map_err(|source| DecodeError {
            signature: Balance::SIGNATURE,
            source,
        })?;

    Ok(DecodeOutcome::Balance(decoded))
}

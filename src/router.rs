use crate::events::{Balance, DecodeOutcome};
use alloy::rpc::types::Log;
use alloy_primitives::Address;

/// Caller-supplied handler slots, one per classification outcome.
///
/// `on_event` receives the raw log alongside the decoded record so callers
/// that need idempotent processing can key on (transaction hash, log index).
pub struct Handlers {
    pub on_event: Box<dyn FnMut(Balance, &Log) + Send>,
    pub on_unrecognized_address: Box<dyn FnMut(&Log) + Send>,
    pub on_unrecognized_signature: Box<dyn FnMut(&Log) + Send>,
}

/// Dispatches each classified entry to exactly one handler.
///
/// The check order is signature first, then emitting address: an entry with
/// an unknown signature is never reported as coming from a foreign address.
pub struct EventRouter {
    address: Address,
    handlers: Handlers,
}

impl EventRouter {
    pub fn new(address: Address, handlers: Handlers) -> Self {
        EventRouter { address, handlers }
    }

    pub fn route(&mut self, log: &Log, outcome: DecodeOutcome) {
        match outcome {
            DecodeOutcome::Unrecognized => (self.handlers.on_unrecognized_signature)(log),
            DecodeOutcome::Balance(event) => {
                if log.address() == self.address {
                    (self.handlers.on_event)(event, log);
                } else {
                    (self.handlers.on_unrecognized_address)(log);
                }
            }
        }
    }
}

use crate::error::WatchError;
use alloy::rpc::types::{Filter, Log};
use alloy_primitives::Address;

/// Address and block scope shared by the historical query and the live
/// subscription, constructed once per watch.
#[derive(Debug, Clone, Copy)]
pub struct FilterCriteria {
    pub address: Address,
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}

impl FilterCriteria {
    /// Bounded criteria for the historical backfill.
    pub fn historical(address: Address, from_block: u64) -> Self {
        FilterCriteria {
            address,
            from_block: Some(from_block),
            to_block: None,
        }
    }

    /// Criteria for the live subscription. Block ranges do not apply to a
    /// push feed.
    pub fn live(address: Address) -> Self {
        FilterCriteria {
            address,
            from_block: None,
            to_block: None,
        }
    }

    /// Address-only filter, no topic constraint: entries with unrecognized
    /// signatures must still reach the router for classification.
    pub fn to_filter(&self) -> Filter {
        let mut filter = Filter::new().address(self.address);
        if let Some(from) = self.from_block {
            filter = filter.from_block(from);
        }
        if let Some(to) = self.to_block {
            filter = filter.to_block(to);
        }
        filter
    }
}

/// One delivery from a live subscription: an entry or an error
/// notification, never both.
pub enum SubscriptionEvent {
    Entry(Log),
    /// The transport dropped the feed, either because the connection closed
    /// or because its bounded delivery buffer overflowed and entries were
    /// lost.
    Lost(String),
}

/// A push subscription scoped to one [`FilterCriteria`].
pub trait LogSubscription {
    /// Waits for the next delivery. Suspends indefinitely between
    /// deliveries; cancellation is the caller's select branch.
    fn next_event(&mut self) -> impl Future<Output = SubscriptionEvent> + Send;
}

/// The node connection collaborator consumed by the scanner, the monitor
/// and the coordinator.
pub trait NodeConnection {
    type Subscription: LogSubscription + Send;

    /// One bounded request for all logs matching `criteria`, returned in
    /// chain order.
    fn query_logs(
        &self,
        criteria: &FilterCriteria,
    ) -> impl Future<Output = Result<Vec<Log>, WatchError>> + Send;

    /// Opens a live subscription scoped to `criteria`'s address.
    fn subscribe_logs(
        &self,
        criteria: &FilterCriteria,
    ) -> impl Future<Output = Result<Self::Subscription, WatchError>> + Send;

    /// Re-establishes the underlying transport after a loss.
    fn reopen(&mut self) -> impl Future<Output = Result<(), WatchError>> + Send;
}

use crate::error::WatchError;
use crate::events::{SignatureTable, decode};
use crate::node::{FilterCriteria, LogSubscription, NodeConnection, SubscriptionEvent};
use crate::router::EventRouter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why a live session ended.
#[derive(Debug)]
pub enum MonitorExit {
    /// External cancellation; a clean stop.
    Cancelled,
    /// The transport dropped the feed. Reconnecting is the coordinator's
    /// decision, not the monitor's.
    TransportLost { reason: String },
}

/// Runs one live session: subscribes, then decodes and routes each entry
/// synchronously before accepting the next delivery. Each iteration handles
/// exactly one entry or one error notification.
///
/// Entries at blocks at or below `scanned_through` were already delivered
/// by the historical pass and are skipped.
pub async fn monitor<C: NodeConnection>(
    connection: &C,
    criteria: &FilterCriteria,
    scanned_through: u64,
    table: &SignatureTable,
    router: &mut EventRouter,
    shutdown: &CancellationToken,
) -> Result<MonitorExit, WatchError> {
    let mut subscription = connection.subscribe_logs(criteria).await?;
    info!("Live subscription open for {}", criteria.address);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Live monitor cancelled");
                return Ok(MonitorExit::Cancelled);
            }
            event = subscription.next_event() => match event {
                SubscriptionEvent::Entry(log) => {
                    if log.block_number.is_some_and(|block| block <= scanned_through) {
                        debug!(
                            "Entry at block {:?} already covered by historical scan",
                            log.block_number
                        );
                        continue;
                    }
                    match decode(&log, table) {
                        Ok(outcome) => router.route(&log, outcome),
                        Err(e) => warn!(
                            "Skipping undecodable log in tx {:?} (index {:?}): {}",
                            log.transaction_hash, log.log_index, e
                        ),
                    }
                }
                SubscriptionEvent::Lost(reason) => {
                    warn!("Live subscription lost: {}", reason);
                    return Ok(MonitorExit::TransportLost { reason });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Balance;
    use crate::node::testing::{MockNode, balance_payload, raw_log};
    use crate::router::Handlers;
    use alloy::sol_types::SolEvent;
    use alloy_primitives::{Address, B256, U256};
    use std::sync::{Arc, Mutex};

    const MONITORED: Address = Address::repeat_byte(0xab);
    const FOREIGN: Address = Address::repeat_byte(0xcd);

    struct Recorded {
        events: Mutex<Vec<u64>>,
        foreign: Mutex<Vec<u64>>,
    }

    fn recording_router(address: Address) -> (EventRouter, Arc<Recorded>) {
        let recorded = Arc::new(Recorded {
            events: Mutex::new(Vec::new()),
            foreign: Mutex::new(Vec::new()),
        });
        let (events, foreign) = (recorded.clone(), recorded.clone());
        let handlers = Handlers {
            on_event: Box::new(move |_, log| {
                events
                    .events
                    .lock()
                    .unwrap()
                    .push(log.block_number.unwrap_or(0));
            }),
            on_unrecognized_address: Box::new(move |log| {
                foreign
                    .foreign
                    .lock()
                    .unwrap()
                    .push(log.block_number.unwrap_or(0));
            }),
            on_unrecognized_signature: Box::new(|_| {}),
        };
        (EventRouter::new(address, handlers), recorded)
    }

    fn live_entry(emitter: Address, block: u64) -> SubscriptionEvent {
        SubscriptionEvent::Entry(raw_log(
            emitter,
            vec![Balance::SIGNATURE_HASH, B256::from(U256::from(1))],
            balance_payload(1000, 1_700_000_000),
            block,
            0,
        ))
    }

    #[tokio::test]
    async fn routes_entries_until_transport_lost() {
        let node = MockNode::new().with_session(vec![
            live_entry(MONITORED, 11),
            live_entry(MONITORED, 12),
            SubscriptionEvent::Lost("websocket closed".into()),
        ]);
        let (mut router, recorded) = recording_router(MONITORED);
        let criteria = FilterCriteria::live(MONITORED);
        let shutdown = CancellationToken::new();

        let exit = monitor(
            &node,
            &criteria,
            10,
            &SignatureTable::new(),
            &mut router,
            &shutdown,
        )
        .await
        .unwrap();

        assert!(matches!(
            exit,
            MonitorExit::TransportLost { reason } if reason == "websocket closed"
        ));
        assert_eq!(*recorded.events.lock().unwrap(), vec![11, 12]);
    }

    #[tokio::test]
    async fn skips_entries_already_covered_by_the_scan() {
        let node = MockNode::new().with_session(vec![
            live_entry(MONITORED, 9),
            live_entry(MONITORED, 10),
            live_entry(MONITORED, 11),
            SubscriptionEvent::Lost("done".into()),
        ]);
        let (mut router, recorded) = recording_router(MONITORED);
        let criteria = FilterCriteria::live(MONITORED);
        let shutdown = CancellationToken::new();

        monitor(
            &node,
            &criteria,
            10,
            &SignatureTable::new(),
            &mut router,
            &shutdown,
        )
        .await
        .unwrap();

        assert_eq!(*recorded.events.lock().unwrap(), vec![11]);
    }

    #[tokio::test]
    async fn live_entries_are_classified_like_historical_ones() {
        let node = MockNode::new().with_session(vec![
            live_entry(FOREIGN, 11),
            live_entry(MONITORED, 12),
            SubscriptionEvent::Lost("done".into()),
        ]);
        let (mut router, recorded) = recording_router(MONITORED);
        let criteria = FilterCriteria::live(MONITORED);
        let shutdown = CancellationToken::new();

        monitor(
            &node,
            &criteria,
            0,
            &SignatureTable::new(),
            &mut router,
            &shutdown,
        )
        .await
        .unwrap();

        assert_eq!(*recorded.events.lock().unwrap(), vec![12]);
        assert_eq!(*recorded.foreign.lock().unwrap(), vec![11]);
    }

    #[tokio::test]
    async fn cancellation_stops_a_quiet_session_cleanly() {
        let node = MockNode::new().with_session(Vec::new());
        let (mut router, recorded) = recording_router(MONITORED);
        let criteria = FilterCriteria::live(MONITORED);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let exit = monitor(
            &node,
            &criteria,
            0,
            &SignatureTable::new(),
            &mut router,
            &shutdown,
        )
        .await
        .unwrap();

        assert!(matches!(exit, MonitorExit::Cancelled));
        assert!(recorded.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn subscribe_failure_propagates() {
        let node =
            MockNode::new().with_session_error(WatchError::Connection("refused".into()));
        let (mut router, _) = recording_router(MONITORED);
        let criteria = FilterCriteria::live(MONITORED);
        let shutdown = CancellationToken::new();

        let err = monitor(
            &node,
            &criteria,
            0,
            &SignatureTable::new(),
            &mut router,
            &shutdown,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, WatchError::Connection(_)));
    }
}

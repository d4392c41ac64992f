use crate::error::WatchError;
use crate::events::SignatureTable;
use crate::monitor::{MonitorExit, monitor};
use crate::node::{FilterCriteria, NodeConnection};
use crate::router::{EventRouter, Handlers};
use crate::scanner::scan;
use alloy_primitives::Address;
use std::time::Duration;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Lifecycle of one watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Scanning,
    Live,
    Reconnecting,
    Terminated,
}

/// Reconnect policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct WatchSettings {
    pub max_reconnect_attempts: usize,
    pub reconnect_base_delay: Duration,
}

impl Default for WatchSettings {
    fn default() -> Self {
        WatchSettings {
            max_reconnect_attempts: 10,
            reconnect_base_delay: Duration::from_millis(500),
        }
    }
}

impl WatchSettings {
    fn backoff_schedule(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(self.reconnect_base_delay.as_millis() as u64)
            .factor(2)
            .max_delay(Duration::from_secs(60))
            .map(jitter)
            .take(self.max_reconnect_attempts)
    }
}

enum ReconnectOutcome {
    Resumed,
    Cancelled,
}

/// Owns the watch run loop: historical scan, handover to the live monitor
/// at the block cursor, and reconnection when the live transport drops.
///
/// The scanner and the monitor never run concurrently for the same filter;
/// their execution is strictly sequential, so the cursor and the router
/// need no locking. The node connection is held for the whole run and
/// released on every exit path.
pub struct WatchCoordinator<C: NodeConnection> {
    connection: C,
    criteria: FilterCriteria,
    table: SignatureTable,
    router: EventRouter,
    settings: WatchSettings,
    shutdown: CancellationToken,
    state: WatchState,
}

impl<C: NodeConnection> WatchCoordinator<C> {
    pub fn new(
        connection: C,
        address: Address,
        checkpoint: Option<u64>,
        handlers: Handlers,
        settings: WatchSettings,
    ) -> Self {
        WatchCoordinator {
            connection,
            criteria: FilterCriteria::historical(address, checkpoint.unwrap_or(0)),
            table: SignatureTable::new(),
            router: EventRouter::new(address, handlers),
            settings,
            shutdown: CancellationToken::new(),
            state: WatchState::Idle,
        }
    }

    /// Token that stops the watch from any task; cancelling it is the
    /// `stop()` half of the control pair.
    pub fn shutdown_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    fn enter(&mut self, state: WatchState) {
        info!("Watch state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Runs until cancelled or a fatal error.
    ///
    /// An entry mined between the historical snapshot and the subscription
    /// opening may be delivered by neither pass or by both; no content
    /// deduplication happens here. Callers that need exactly-once delivery
    /// must key their handler on (transaction hash, log index).
    pub async fn run(&mut self) -> Result<(), WatchError> {
        self.enter(WatchState::Scanning);
        let scanned_through =
            match scan(&self.connection, &self.criteria, &self.table, &mut self.router).await {
                Ok(cursor) => cursor,
                Err(e) => {
                    self.enter(WatchState::Terminated);
                    return Err(e);
                }
            };
        info!(
            "Historical scan complete through block {}, switching to live feed",
            scanned_through
        );

        let live = FilterCriteria::live(self.criteria.address);
        let mut failed_sessions = 0usize;

        loop {
            self.enter(WatchState::Live);
            match monitor(
                &self.connection,
                &live,
                scanned_through,
                &self.table,
                &mut self.router,
                &self.shutdown,
            )
            .await
            {
                Ok(MonitorExit::Cancelled) => {
                    self.enter(WatchState::Terminated);
                    return Ok(());
                }
                Ok(MonitorExit::TransportLost { reason }) => {
                    failed_sessions = 0;
                    warn!("Live transport lost: {}", reason);
                }
                Err(e) => {
                    failed_sessions += 1;
                    warn!("Live session failed before subscribing: {}", e);
                    if failed_sessions > self.settings.max_reconnect_attempts {
                        self.enter(WatchState::Terminated);
                        return Err(WatchError::ReconnectsExhausted(
                            self.settings.max_reconnect_attempts,
                        ));
                    }
                }
            }

            match self.reconnect().await? {
                ReconnectOutcome::Resumed => {}
                ReconnectOutcome::Cancelled => {
                    self.enter(WatchState::Terminated);
                    return Ok(());
                }
            }
        }
    }

    /// Backoff-and-reopen loop, bounded by the settings. The historical
    /// scan is not re-run after a reconnect; entries mined while
    /// disconnected are not recovered.
    async fn reconnect(&mut self) -> Result<ReconnectOutcome, WatchError> {
        self.enter(WatchState::Reconnecting);

        for (attempt, delay) in self.settings.backoff_schedule().enumerate() {
            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(ReconnectOutcome::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            match self.connection.reopen().await {
                Ok(()) => {
                    info!("Node connection reopened on attempt {}", attempt + 1);
                    return Ok(ReconnectOutcome::Resumed);
                }
                Err(e) => warn!("Reconnect attempt {} failed: {}", attempt + 1, e),
            }
        }

        self.enter(WatchState::Terminated);
        Err(WatchError::ReconnectsExhausted(
            self.settings.max_reconnect_attempts,
        ))
    }
}

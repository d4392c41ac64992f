use crate::error::WatchError;
use crate::node::{FilterCriteria, LogSubscription, NodeConnection, SubscriptionEvent};
use alloy::providers::fillers::FillProvider;
use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use alloy::pubsub::Subscription;
use alloy::rpc::types::Log;
use regex::Regex;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::timeout;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

type AlloyFullProvider = FillProvider<
    alloy::providers::fillers::JoinFill<
        alloy::providers::Identity,
        alloy::providers::fillers::JoinFill<
            alloy::providers::fillers::GasFiller,
            alloy::providers::fillers::JoinFill<
                alloy::providers::fillers::BlobGasFiller,
                alloy::providers::fillers::JoinFill<
                    alloy::providers::fillers::NonceFiller,
                    alloy::providers::fillers::ChainIdFiller,
                >,
            >,
        >,
    >,
    alloy::providers::RootProvider,
>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120); // 2 minutes timeout per request

/// WebSocket-backed node connection.
///
/// Historical queries retry transient failures with backoff and a request
/// timeout; range rejections are classified and surfaced without retrying,
/// with the node's suggested sub-range parsed out when present.
#[derive(Clone)]
pub struct NodeClient {
    url: String,
    provider: AlloyFullProvider,
    max_retries: usize,
}

impl NodeClient {
    pub async fn connect(url: &str) -> Result<Self, WatchError> {
        let provider = Self::dial(url).await?;
        Ok(NodeClient {
            url: url.to_string(),
            provider,
            max_retries: 5,
        })
    }

    async fn dial(url: &str) -> Result<AlloyFullProvider, WatchError> {
        let ws = WsConnect::new(url);
        ProviderBuilder::new()
            .connect_ws(ws)
            .await
            .map_err(|e| WatchError::Connection(e.to_string()))
    }

    fn retry_strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(100)
            .factor(2)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.max_retries)
    }

    fn is_range_rejection(error_str: &str) -> bool {
        error_str.contains("exceeds max results")
            || error_str.contains("query returned more than")
            || error_str.contains("block range is too large")
    }

    fn parse_suggested_range(error_str: &str) -> Option<(u64, u64)> {
        let re = Regex::new(r"retry with the range (\d+)-(\d+)").ok()?;
        let captures = re.captures(error_str)?;

        let from = captures.get(1)?.as_str().parse().ok()?;
        let to = captures.get(2)?.as_str().parse().ok()?;

        Some((from, to))
    }
}

impl NodeConnection for NodeClient {
    type Subscription = NodeSubscription;

    async fn query_logs(&self, criteria: &FilterCriteria) -> Result<Vec<Log>, WatchError> {
        let client = self.clone();
        let criteria = *criteria;
        Retry::spawn(self.retry_strategy(), move || {
            let client = client.clone();
            async move {
                let filter = criteria.to_filter();
                match timeout(REQUEST_TIMEOUT, client.provider.get_logs(&filter)).await {
                    Ok(Ok(logs)) => Ok(Ok(logs)),
                    Ok(Err(e)) => {
                        let error_str = e.to_string();
                        if Self::is_range_rejection(&error_str) {
                            debug!("Log range rejected by node, not retrying: {}", error_str);
                            // nested Ok so the retry wrapper passes this through
                            Ok(Err(WatchError::RangeTooLarge {
                                suggested: Self::parse_suggested_range(&error_str),
                                reason: error_str,
                            }))
                        } else {
                            warn!("RPC error on {}: {}", client.url, error_str);
                            Err(WatchError::Rpc(error_str))
                        }
                    }
                    Err(_) => {
                        warn!(
                            "Request timeout after {} seconds on {}",
                            REQUEST_TIMEOUT.as_secs(),
                            client.url
                        );
                        Err(WatchError::Rpc(format!(
                            "request timeout after {} seconds",
                            REQUEST_TIMEOUT.as_secs()
                        )))
                    }
                }
            }
        })
        .await
        .and_then(|r| r)
    }

    async fn subscribe_logs(
        &self,
        criteria: &FilterCriteria,
    ) -> Result<NodeSubscription, WatchError> {
        let filter = criteria.to_filter();
        let subscription = self
            .provider
            .subscribe_logs(&filter)
            .await
            .map_err(|e| WatchError::Connection(e.to_string()))?;
        Ok(NodeSubscription {
            inner: subscription,
        })
    }

    async fn reopen(&mut self) -> Result<(), WatchError> {
        self.provider = Self::dial(&self.url).await?;
        Ok(())
    }
}

/// Live feed over the provider's pubsub channel.
///
/// Consumed with `recv` rather than the stream adapter: a lagged delivery
/// buffer must surface as a lost notification, not as silently skipped
/// entries.
pub struct NodeSubscription {
    inner: Subscription<Log>,
}

impl LogSubscription for NodeSubscription {
    async fn next_event(&mut self) -> SubscriptionEvent {
        match self.inner.recv().await {
            Ok(log) => SubscriptionEvent::Entry(log),
            Err(RecvError::Lagged(count)) => SubscriptionEvent::Lost(format!(
                "subscription buffer overflowed, {count} entries dropped"
            )),
            Err(RecvError::Closed) => {
                SubscriptionEvent::Lost("subscription channel closed".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_range_rejections() {
        assert!(NodeClient::is_range_rejection(
            "query exceeds max results 10000, retry with the range 100-4242"
        ));
        assert!(NodeClient::is_range_rejection("block range is too large"));
        assert!(!NodeClient::is_range_rejection("connection reset by peer"));
    }

    #[test]
    fn parses_the_suggested_range_out_of_the_rejection() {
        let suggested = NodeClient::parse_suggested_range(
            "query exceeds max results 10000, retry with the range 100-4242",
        );
        assert_eq!(suggested, Some((100, 4242)));
    }

    #[test]
    fn rejection_without_a_hint_has_no_suggested_range() {
        assert_eq!(
            NodeClient::parse_suggested_range("query exceeds max results"),
            None
        );
    }
}

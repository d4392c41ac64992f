pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod monitor;
pub mod node;
pub mod router;
pub mod rpc;
pub mod scanner;

pub use config::Config;
pub use coordinator::{WatchCoordinator, WatchSettings, WatchState};
pub use error::{DecodeError, WatchError};
pub use events::{Balance, DecodeOutcome, SignatureTable, decode};
pub use monitor::MonitorExit;
pub use node::{FilterCriteria, LogSubscription, NodeConnection, SubscriptionEvent};
pub use router::{EventRouter, Handlers};
pub use rpc::NodeClient;

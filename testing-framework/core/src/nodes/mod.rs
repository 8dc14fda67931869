pub mod api_client;
mod identity;
mod node;
pub mod operator;
pub mod rpc;
mod status;

use std::convert::Infallible;

pub use identity::NodeIdentity;
pub use node::{Lifecycle, Node};
pub use status::{NodeInfo, NodeStatus, SyncInfo, ValidatorInfo};
use thiserror::Error;

use crate::{environment::EnvironmentError, polling::PollTimeout};

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("node {node}: environment operation failed: {source}")]
    Environment {
        node: String,
        #[source]
        source: EnvironmentError,
    },
    #[error("node {node}: rpc request failed: {source}")]
    Rpc {
        node: String,
        #[source]
        source: rpc::RpcError,
    },
    #[error("node {node}: failed to decode {what}: {source}")]
    Decode {
        node: String,
        what: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("node {node} never became live: {source}")]
    StartupTimeout {
        node: String,
        #[source]
        source: PollTimeout,
    },
    #[error("node {node} timed out: {source}")]
    Timeout {
        node: String,
        #[source]
        source: PollTimeout,
    },
    #[error("node {node} is not running")]
    NotRunning { node: String },
    #[error("node {node} has already been started")]
    AlreadyStarted { node: String },
    #[error("node {node} has been stopped")]
    Stopped { node: String },
}

impl NodeError {
    /// Last progress value (block height) seen before a wait gave up.
    #[must_use]
    pub const fn last_observed(&self) -> Option<u64> {
        match self {
            Self::StartupTimeout { source, .. } | Self::Timeout { source, .. } => {
                source.last_progress()
            }
            _ => None,
        }
    }
}

impl From<Infallible> for NodeError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use super::status::NodeStatus;

/// Host-reachable `host:port` pairs discovered for a started node.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeEndpoints {
    pub rpc: String,
    pub gateway: String,
}

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to build {endpoint} URL: {source}")]
    Endpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("{endpoint} is unreachable: {reason}")]
    Unreachable { endpoint: String, reason: String },
    #[error("{url} responded with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("node returned JSON-RPC error {code}: {message}")]
    Remote { code: i64, message: String },
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RpcError {
    /// True when the node answered but the payload could not be parsed.
    #[must_use]
    pub const fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

/// Read-only view of a node: consensus status plus the query gateway.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    async fn status(&self) -> Result<NodeStatus, RpcError>;

    /// Raw response body for a gateway resource path such as
    /// `/babylon/incentive/params`.
    async fn query_gateway(&self, path: &str, params: &[(&str, &str)])
    -> Result<Bytes, RpcError>;
}

/// Binds RPC handles to freshly discovered endpoints.
pub trait RpcConnector: Send + Sync {
    fn connect(&self, endpoints: &NodeEndpoints) -> Result<Arc<dyn NodeRpc>, RpcError>;
}

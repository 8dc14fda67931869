//! Typed queries against a live node's REST gateway.

mod btclightclient;
mod incentive;

pub use btclightclient::BtcHeaderInfo;
use bytes::Bytes;
pub use incentive::{Coin, Gauge, IncentiveParams, RewardGauges};
use serde::de::DeserializeOwned;

use crate::nodes::{Node, NodeError};

impl Node {
    /// Raw GET against the gateway; non-2xx responses surface as
    /// [`NodeError::Rpc`].
    pub async fn query_gateway(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Bytes, NodeError> {
        self.rpc()?
            .query_gateway(path, params)
            .await
            .map_err(|source| self.rpc_error(source))
    }

    pub async fn query_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, NodeError> {
        let body = self.query_gateway(path, params).await?;
        self.decode_json(path, &body)
    }

    pub(crate) fn decode_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &[u8],
    ) -> Result<T, NodeError> {
        serde_json::from_slice(body).map_err(|source| NodeError::Decode {
            node: self.name().to_owned(),
            what: path.to_owned(),
            source,
        })
    }
}

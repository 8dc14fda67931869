use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};

use super::{
    rpc::{NodeEndpoints, NodeRpc, RpcConnector, RpcError},
    status::NodeStatus,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const STATUS_PATH: &str = "status";

/// JSON-RPC (status) and REST gateway client for one node.
#[derive(Clone)]
pub struct HttpRpcClient {
    rpc_url: Url,
    gateway_url: Url,
    client: Client,
}

impl HttpRpcClient {
    pub fn new(endpoints: &NodeEndpoints, client: Client) -> Result<Self, RpcError> {
        Ok(Self {
            rpc_url: endpoint_url("rpc", &endpoints.rpc)?,
            gateway_url: endpoint_url("gateway", &endpoints.gateway)?,
            client,
        })
    }

    #[must_use]
    pub const fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    #[must_use]
    pub const fn gateway_url(&self) -> &Url {
        &self.gateway_url
    }

    async fn get_bytes(&self, url: Url, params: &[(&str, &str)]) -> Result<Bytes, RpcError> {
        let response = self
            .client
            .get(url.clone())
            .query(params)
            .send()
            .await
            .map_err(|err| {
                if err.is_connect() {
                    RpcError::Unreachable {
                        endpoint: url.to_string(),
                        reason: err.to_string(),
                    }
                } else {
                    RpcError::Transport(err)
                }
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RpcError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl NodeRpc for HttpRpcClient {
    async fn status(&self) -> Result<NodeStatus, RpcError> {
        let url = join_url(&self.rpc_url, STATUS_PATH)?;
        let body = self.get_bytes(url, &[]).await?;
        NodeStatus::from_rpc_response(&body)
    }

    async fn query_gateway(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Bytes, RpcError> {
        let url = join_url(&self.gateway_url, path)?;
        self.get_bytes(url, params).await
    }
}

/// Connector handing out [`HttpRpcClient`]s that share one connection pool.
#[derive(Clone)]
pub struct HttpConnector {
    client: Client,
}

impl HttpConnector {
    pub fn new() -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client))
    }

    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl RpcConnector for HttpConnector {
    fn connect(&self, endpoints: &NodeEndpoints) -> Result<Arc<dyn NodeRpc>, RpcError> {
        Ok(Arc::new(HttpRpcClient::new(endpoints, self.client.clone())?))
    }
}

fn endpoint_url(endpoint: &str, host_port: &str) -> Result<Url, RpcError> {
    Url::parse(&format!("http://{host_port}/")).map_err(|source| RpcError::Endpoint {
        endpoint: endpoint.to_owned(),
        source,
    })
}

fn join_url(base: &Url, path: &str) -> Result<Url, RpcError> {
    base.join(path.trim_start_matches('/'))
        .map_err(|source| RpcError::Endpoint {
            endpoint: path.to_owned(),
            source,
        })
}

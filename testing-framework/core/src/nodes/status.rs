use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};

use super::rpc::RpcError;

/// Point-in-time read of a node's consensus progress.
///
/// CometBFT encodes 64-bit integers as strings; plain numbers are accepted
/// too.
#[serde_as]
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SyncInfo {
    #[serde(default)]
    pub latest_block_hash: String,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub latest_block_height: u64,
    #[serde(default)]
    pub latest_block_time: String,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub earliest_block_height: Option<u64>,
    #[serde(default)]
    pub catching_up: bool,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeInfo {
    pub id: String,
    pub network: String,
    pub moniker: String,
    pub version: String,
}

#[serde_as]
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    #[serde(default)]
    pub address: String,
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub voting_power: Option<u64>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    #[serde(default, alias = "NodeInfo")]
    pub node_info: NodeInfo,
    #[serde(alias = "SyncInfo")]
    pub sync_info: SyncInfo,
    #[serde(default, alias = "ValidatorInfo")]
    pub validator_info: Option<ValidatorInfo>,
}

#[derive(Deserialize)]
struct JsonRpcEnvelope<T> {
    result: Option<T>,
    error: Option<JsonRpcFailure>,
}

#[derive(Deserialize)]
struct JsonRpcFailure {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

impl NodeStatus {
    /// Decodes the body of a JSON-RPC `status` call.
    pub fn from_rpc_response(body: &[u8]) -> Result<Self, RpcError> {
        let envelope: JsonRpcEnvelope<Self> =
            serde_json::from_slice(body).map_err(|source| RpcError::Decode {
                what: "status response".to_owned(),
                source,
            })?;

        match (envelope.result, envelope.error) {
            (_, Some(failure)) => Err(RpcError::Remote {
                code: failure.code,
                message: match failure.data {
                    Some(data) => format!("{}: {data}", failure.message),
                    None => failure.message,
                },
            }),
            (Some(status), None) => Ok(status),
            (None, None) => Err(RpcError::Remote {
                code: 0,
                message: "response carries neither result nor error".to_owned(),
            }),
        }
    }

    /// Decodes the output of the in-environment `status --output=json`
    /// command.
    pub fn from_cli_output(stdout: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(stdout.trim())
    }

    #[must_use]
    pub const fn latest_height(&self) -> u64 {
        self.sync_info.latest_block_height
    }
}

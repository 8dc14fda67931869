use std::{env, path::PathBuf, sync::Arc};

use babylon_e2e_core::{
    HarnessSettings, HttpConnector, Node, NodeError, NodeIdentity, RpcError,
    settings::SettingsError,
};
use babylon_e2e_docker::DockerEnvironment;
use thiserror::Error;
use tokio::time::Instant;

/// Pre-generated home directory (config, genesis, keys) of the node.
pub const NODE_HOME_ENV: &str = "BABYLON_E2E_NODE_HOME";
/// Hex-encoded validator public key; unset for a non-validator.
pub const VALIDATOR_KEY_ENV: &str = "BABYLON_E2E_VALIDATOR_KEY";
pub const CHAIN_ID_ENV: &str = "BABYLON_E2E_CHAIN_ID";

const DEFAULT_CHAIN_ID: &str = "chain-test";
const DEFAULT_NODE_NAME: &str = "babylon-e2e-validator-0";

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("{NODE_HOME_ENV} must point at a generated node home")]
    MissingHome,
    #[error("{VALIDATOR_KEY_ENV} is not valid hex: {0}")]
    ValidatorKey(#[from] hex::FromHexError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Connector(#[from] RpcError),
    #[error(transparent)]
    Node(#[from] NodeError),
}

/// Identity of the single node described by the environment.
pub fn identity_from_env() -> Result<NodeIdentity, NetworkError> {
    let home = env::var_os(NODE_HOME_ENV)
        .map(PathBuf::from)
        .ok_or(NetworkError::MissingHome)?;
    let chain_id = env::var(CHAIN_ID_ENV).unwrap_or_else(|_| DEFAULT_CHAIN_ID.to_owned());
    let identity = NodeIdentity::new(DEFAULT_NODE_NAME, chain_id, home);

    match env::var(VALIDATOR_KEY_ENV) {
        Ok(key) => Ok(identity.validator(hex::decode(key.trim())?)),
        Err(_) => Ok(identity),
    }
}

/// Starts one dockerised node and waits until it serves RPC.
pub async fn spawn_node(identity: NodeIdentity) -> Result<Node, NetworkError> {
    let settings = HarnessSettings::from_env()?;
    let mut node = Node::new(
        identity,
        Arc::new(DockerEnvironment::from_env()),
        Arc::new(HttpConnector::new()?),
        settings,
    )
    .with_setup_time(Instant::now());
    node.run().await?;
    node.log_action("node is live");
    Ok(node)
}

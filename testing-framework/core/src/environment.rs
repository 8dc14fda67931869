use std::{io, path::PathBuf, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

/// What a manager needs to materialise one node's isolated environment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EnvironmentSpec {
    pub chain_id: String,
    pub node_name: String,
    pub config_dir: PathBuf,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("{command} exited with code {code:?}: {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("{command} timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
    #[error("environment {name} has no host binding for port {port}")]
    PortUnavailable { name: String, port: String },
    #[error("no environment named {name}")]
    Unknown { name: String },
}

/// Owner of node environments (containers, processes).
///
/// Environments are keyed by node name; one manager is shared by every node
/// of a run.
#[async_trait]
pub trait EnvironmentManager: Send + Sync {
    async fn create(&self, spec: &EnvironmentSpec) -> Result<(), EnvironmentError>;

    async fn remove(&self, name: &str) -> Result<(), EnvironmentError>;

    async fn exec(
        &self,
        name: &str,
        argv: &[String],
        input: &str,
    ) -> Result<ExecOutput, EnvironmentError>;

    /// Externally reachable `host:port` for an internal port id such as
    /// `26657/tcp`.
    async fn host_port(&self, name: &str, internal_port: &str) -> Result<String, EnvironmentError>;
}

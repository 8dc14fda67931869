use std::{
    env, fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{adjust_attempts, polling::PollPolicy};

pub const CONFIG_PATH_ENV: &str = "BABYLON_E2E_CONFIG";

const DEFAULT_BINARY: &str = "babylond";
const DEFAULT_RPC_PORT: &str = "26657/tcp";
const DEFAULT_GATEWAY_PORT: &str = "1317/tcp";

const LIVENESS_ATTEMPTS: u32 = 90;
const WAIT_ATTEMPTS: u32 = 60;
const WAIT_PAUSE: Duration = Duration::from_secs(2);
const FINE_WAIT_PAUSE: Duration = Duration::from_millis(50);

/// Knobs shared by every node controller of a run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
    /// Node binary invoked inside the environment for out-of-band commands.
    pub binary: String,
    pub rpc_port: String,
    pub gateway_port: String,
    /// Budget for the first successful status read after start (about 3m).
    pub liveness: PollPolicy,
    pub wait: PollPolicy,
    /// Sub-second cadence for tight block waits.
    pub fine_wait: PollPolicy,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_owned(),
            rpc_port: DEFAULT_RPC_PORT.to_owned(),
            gateway_port: DEFAULT_GATEWAY_PORT.to_owned(),
            liveness: PollPolicy::new(adjust_attempts(LIVENESS_ATTEMPTS), WAIT_PAUSE),
            wait: PollPolicy::new(adjust_attempts(WAIT_ATTEMPTS), WAIT_PAUSE),
            fine_wait: PollPolicy::new(adjust_attempts(WAIT_ATTEMPTS), FINE_WAIT_PAUSE),
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read harness settings at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse harness settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl HarnessSettings {
    /// Defaults, overridden by the YAML file named in `BABYLON_E2E_CONFIG`
    /// when set.
    pub fn from_env() -> Result<Self, SettingsError> {
        env::var_os(CONFIG_PATH_ENV).map_or_else(
            || Ok(Self::default()),
            |path| Self::from_file(Path::new(&path)),
        )
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

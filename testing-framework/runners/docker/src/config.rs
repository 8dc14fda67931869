use std::{env, time::Duration};

use babylon_e2e_core::adjust_timeout;

const IMAGE_ENV: &str = "BABYLON_E2E_IMAGE";
const NETWORK_ENV: &str = "BABYLON_E2E_NETWORK";
const DEFAULT_IMAGE: &str = "babylonlabs-io/babylond:local";
const PUBLISHED_IMAGE_PREFIX: &str = "babylonlabs/babylond:";
const DEFAULT_HOME_DIR: &str = "/home/babylon/babylondata";
const DOCKER_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// How node containers are launched.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DockerConfig {
    pub image: String,
    pub platform: Option<String>,
    pub network: Option<String>,
    pub binary: String,
    /// Node home inside the container; the node's config dir is mounted here.
    pub home_dir: String,
    /// Internal ports published to ephemeral host ports.
    pub published_ports: Vec<String>,
    pub command_timeout: Duration,
}

impl DockerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let (image, platform) = resolve_image();
        Self {
            image,
            platform,
            network: env::var(NETWORK_ENV).ok().filter(|value| !value.is_empty()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    #[must_use]
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_owned(),
            platform: None,
            network: None,
            binary: "babylond".to_owned(),
            home_dir: DEFAULT_HOME_DIR.to_owned(),
            published_ports: vec!["26657/tcp".to_owned(), "1317/tcp".to_owned()],
            command_timeout: adjust_timeout(DOCKER_COMMAND_TIMEOUT),
        }
    }
}

/// Image (and the platform it must run under) for node containers.
pub fn resolve_image() -> (String, Option<String>) {
    let image = env::var(IMAGE_ENV).unwrap_or_else(|_| String::from(DEFAULT_IMAGE));
    let platform = image
        .starts_with(PUBLISHED_IMAGE_PREFIX)
        .then(|| "linux/amd64".to_owned());
    (image, platform)
}

use async_trait::async_trait;
use babylon_e2e_core::{EnvironmentError, EnvironmentManager, EnvironmentSpec, ExecOutput};
use tracing::info;

use crate::{command::run_docker, config::DockerConfig};

const NO_SUCH_CONTAINER: &str = "No such container";

/// Runs each node in its own detached container.
#[derive(Clone, Debug, Default)]
pub struct DockerEnvironment {
    config: DockerConfig,
}

impl DockerEnvironment {
    #[must_use]
    pub const fn new(config: DockerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::new(DockerConfig::from_env())
    }

    #[must_use]
    pub const fn config(&self) -> &DockerConfig {
        &self.config
    }

    async fn docker(&self, args: &[String], input: &str) -> Result<ExecOutput, EnvironmentError> {
        run_docker(args, input, self.config.command_timeout).await
    }
}

#[async_trait]
impl EnvironmentManager for DockerEnvironment {
    async fn create(&self, spec: &EnvironmentSpec) -> Result<(), EnvironmentError> {
        info!(
            node = %spec.node_name,
            image = %self.config.image,
            "starting node container"
        );
        let output = self.docker(&run_args(&self.config, spec), "").await?;
        info!(
            node = %spec.node_name,
            container = %output.stdout.trim(),
            "started node container"
        );
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), EnvironmentError> {
        let args = ["rm", "-f", name].map(String::from);
        self.docker(&args, "")
            .await
            .map(|_| ())
            .map_err(|err| unknown_if_missing(name, err))
    }

    async fn exec(
        &self,
        name: &str,
        argv: &[String],
        input: &str,
    ) -> Result<ExecOutput, EnvironmentError> {
        let mut args = vec!["exec".to_owned(), "-i".to_owned(), name.to_owned()];
        args.extend_from_slice(argv);
        self.docker(&args, input)
            .await
            .map_err(|err| unknown_if_missing(name, err))
    }

    async fn host_port(&self, name: &str, internal_port: &str) -> Result<String, EnvironmentError> {
        let args = ["port", name, internal_port].map(String::from);
        let output = self
            .docker(&args, "")
            .await
            .map_err(|err| unknown_if_missing(name, err))?;
        parse_host_port(&output.stdout).ok_or_else(|| EnvironmentError::PortUnavailable {
            name: name.to_owned(),
            port: internal_port.to_owned(),
        })
    }
}

/// Arguments of the `docker run` starting one node.
fn run_args(config: &DockerConfig, spec: &EnvironmentSpec) -> Vec<String> {
    let mut args = vec![
        "run".to_owned(),
        "-d".to_owned(),
        "--name".to_owned(),
        spec.node_name.clone(),
        "--hostname".to_owned(),
        spec.node_name.clone(),
        "-e".to_owned(),
        format!("CHAIN_ID={}", spec.chain_id),
    ];
    if let Some(platform) = &config.platform {
        args.extend(["--platform".to_owned(), platform.clone()]);
    }
    if let Some(network) = &config.network {
        args.extend(["--network".to_owned(), network.clone()]);
    }
    args.extend([
        "-v".to_owned(),
        format!("{}:{}", spec.config_dir.display(), config.home_dir),
    ]);
    for port in &config.published_ports {
        args.extend(["-p".to_owned(), port.clone()]);
    }
    args.extend([
        config.image.clone(),
        config.binary.clone(),
        "start".to_owned(),
        "--home".to_owned(),
        config.home_dir.clone(),
    ]);
    args
}

/// First binding printed by `docker port`, with wildcard hosts rewritten to
/// loopback.
fn parse_host_port(output: &str) -> Option<String> {
    let line = output.lines().map(str::trim).find(|line| !line.is_empty())?;
    let (host, port) = line.rsplit_once(':')?;
    port.parse::<u16>().ok()?;
    let host = match host {
        "0.0.0.0" | "[::]" | "::" | "" => "127.0.0.1",
        other => other,
    };
    Some(format!("{host}:{port}"))
}

fn unknown_if_missing(name: &str, err: EnvironmentError) -> EnvironmentError {
    match err {
        EnvironmentError::Failed { ref stderr, .. } if stderr.contains(NO_SUCH_CONTAINER) => {
            EnvironmentError::Unknown {
                name: name.to_owned(),
            }
        }
        other => other,
    }
}

use std::{convert::Infallible, future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{
    NodeError, NodeIdentity, NodeStatus, SyncInfo,
    operator::extract_operator_address,
    rpc::{NodeEndpoints, NodeRpc, RpcConnector, RpcError},
};
use crate::{
    environment::{EnvironmentError, EnvironmentManager, EnvironmentSpec},
    polling::{Condition, FnCondition, PollError, PollPolicy, poll_until},
    settings::HarnessSettings,
};

/// Externally visible lifecycle of a [`Node`].
///
/// `run` moves a node from `Unstarted` to `Live` while holding `&mut self`,
/// so the intermediate starting phase is never observable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lifecycle {
    Unstarted,
    Live,
    Stopped,
}

enum NodeState {
    Unstarted,
    Live(LiveNode),
    Stopped,
}

/// Runtime state bound to exactly one live environment.
struct LiveNode {
    rpc: Arc<dyn NodeRpc>,
    endpoints: NodeEndpoints,
    operator_address: Option<String>,
}

/// Controller for one node under test.
///
/// A controller observes a single environment instance: once stopped it
/// cannot be started again.
pub struct Node {
    identity: NodeIdentity,
    settings: HarnessSettings,
    environment: Arc<dyn EnvironmentManager>,
    connector: Arc<dyn RpcConnector>,
    state: NodeState,
    setup_time: Instant,
}

impl Node {
    #[must_use]
    pub fn new(
        identity: NodeIdentity,
        environment: Arc<dyn EnvironmentManager>,
        connector: Arc<dyn RpcConnector>,
        settings: HarnessSettings,
    ) -> Self {
        Self {
            identity,
            settings,
            environment,
            connector,
            state: NodeState::Unstarted,
            setup_time: Instant::now(),
        }
    }

    /// Shares a reference point with other nodes of the same run so their
    /// log timings line up.
    #[must_use]
    pub const fn with_setup_time(mut self, setup_time: Instant) -> Self {
        self.setup_time = setup_time;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    #[must_use]
    pub fn chain_id(&self) -> &str {
        &self.identity.chain_id
    }

    #[must_use]
    pub const fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    #[must_use]
    pub const fn settings(&self) -> &HarnessSettings {
        &self.settings
    }

    #[must_use]
    pub const fn is_validator(&self) -> bool {
        self.identity.is_validator
    }

    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        match self.state {
            NodeState::Unstarted => Lifecycle::Unstarted,
            NodeState::Live(_) => Lifecycle::Live,
            NodeState::Stopped => Lifecycle::Stopped,
        }
    }

    /// Operator address derived during bootstrap; validators only.
    #[must_use]
    pub fn operator_address(&self) -> Option<&str> {
        match &self.state {
            NodeState::Live(live) => live.operator_address.as_deref(),
            NodeState::Unstarted | NodeState::Stopped => None,
        }
    }

    #[must_use]
    pub const fn endpoints(&self) -> Option<&NodeEndpoints> {
        match &self.state {
            NodeState::Live(live) => Some(&live.endpoints),
            NodeState::Unstarted | NodeState::Stopped => None,
        }
    }

    pub fn log_action(&self, action: &str) {
        let since_setup = self.setup_time.elapsed();
        info!(node = %self.identity.name, ?since_setup, "{action}");
    }

    /// Starts the node's environment and blocks until its RPC answers.
    ///
    /// Validators additionally get their operator address derived. On any
    /// failure the controller keeps no runtime state.
    pub async fn run(&mut self) -> Result<(), NodeError> {
        match self.state {
            NodeState::Unstarted => {}
            NodeState::Live(_) => {
                return Err(NodeError::AlreadyStarted {
                    node: self.identity.name.clone(),
                })
            }
            NodeState::Stopped => {
                return Err(NodeError::Stopped {
                    node: self.identity.name.clone(),
                })
            }
        }

        info!(
            node = %self.identity.name,
            chain_id = %self.identity.chain_id,
            "starting node environment"
        );
        let spec = EnvironmentSpec {
            chain_id: self.identity.chain_id.clone(),
            node_name: self.identity.name.clone(),
            config_dir: self.identity.config_dir.clone(),
        };
        self.environment
            .create(&spec)
            .await
            .map_err(|source| self.environment_error(source))?;

        match self.bring_up().await {
            Ok(live) => {
                self.state = NodeState::Live(live);
                Ok(())
            }
            Err(err) => {
                self.discard_environment().await;
                Err(err)
            }
        }
    }

    /// Removes the node's environment. Terminal for this controller.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        if matches!(self.state, NodeState::Stopped) {
            return Err(NodeError::Stopped {
                node: self.identity.name.clone(),
            });
        }

        info!(node = %self.identity.name, "stopping node environment");
        self.environment
            .remove(&self.identity.name)
            .await
            .map_err(|source| self.environment_error(source))?;
        self.state = NodeState::Stopped;
        info!(node = %self.identity.name, "stopped node environment");
        Ok(())
    }

    pub async fn host_port(&self, port_id: &str) -> Result<String, NodeError> {
        self.environment
            .host_port(&self.identity.name, port_id)
            .await
            .map_err(|source| self.environment_error(source))
    }

    /// Polls status until `predicate` holds for the node's sync info.
    pub async fn wait_until<P>(&self, predicate: P) -> Result<(), NodeError>
    where
        P: FnMut(&SyncInfo) -> bool + Send,
    {
        let mut condition = SyncCondition::new(self, predicate);
        self.poll(
            self.settings.wait,
            "timed out waiting for sync condition",
            &mut condition,
        )
        .await
    }

    pub async fn wait_for_condition<F, Fut>(
        &self,
        check: F,
        message: &str,
    ) -> Result<(), NodeError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = bool> + Send,
    {
        self.wait_for_condition_with_pause(check, message, self.settings.wait.pause())
            .await
    }

    pub async fn wait_for_condition_with_pause<F, Fut>(
        &self,
        check: F,
        message: &str,
        pause: Duration,
    ) -> Result<(), NodeError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = bool> + Send,
    {
        let mut condition = FnCondition::new(check);
        self.poll(self.settings.wait.with_pause(pause), message, &mut condition)
            .await
    }

    pub async fn wait_for_next_block(&self) -> Result<(), NodeError> {
        self.wait_for_next_blocks(1).await
    }

    /// Returns once the observed height exceeds `initial + n`, i.e. one block
    /// later than a literal reading of "n more blocks".
    pub async fn wait_for_next_blocks(&self, n: u64) -> Result<(), NodeError> {
        self.wait_past_blocks(n, self.settings.wait).await
    }

    /// [`Self::wait_for_next_block`] at a 50ms cadence.
    pub async fn wait_for_next_block_with_sleep_50ms(&self) -> Result<(), NodeError> {
        self.wait_past_blocks(1, self.settings.fine_wait).await
    }

    /// Single status read; panics when the node cannot be queried, since a
    /// failed read mid-scenario means the environment itself is broken.
    pub async fn latest_block_number(&self) -> u64 {
        self.try_latest_block_number()
            .await
            .unwrap_or_else(|err| panic!("failed to read latest block height: {err}"))
    }

    pub async fn try_latest_block_number(&self) -> Result<u64, NodeError> {
        Ok(self.rpc_status().await?.latest_height())
    }

    /// Status read through the in-environment CLI rather than the RPC port.
    pub async fn status(&self) -> Result<NodeStatus, NodeError> {
        self.live()?;
        let argv = [
            self.settings.binary.clone(),
            "status".to_owned(),
            "--output=json".to_owned(),
        ];
        let output = self
            .environment
            .exec(&self.identity.name, &argv, "")
            .await
            .map_err(|source| self.environment_error(source))?;

        NodeStatus::from_cli_output(&output.stdout).map_err(|source| NodeError::Decode {
            node: self.identity.name.clone(),
            what: "status command output".to_owned(),
            source,
        })
    }

    pub(crate) fn rpc(&self) -> Result<&dyn NodeRpc, NodeError> {
        Ok(self.live()?.rpc.as_ref())
    }

    pub(crate) async fn rpc_status(&self) -> Result<NodeStatus, NodeError> {
        self.rpc()?
            .status()
            .await
            .map_err(|source| self.rpc_error(source))
    }

    pub(crate) async fn poll<C>(
        &self,
        policy: PollPolicy,
        message: &str,
        condition: &mut C,
    ) -> Result<(), NodeError>
    where
        C: Condition + ?Sized,
        NodeError: From<C::Error>,
    {
        match poll_until(policy, message, condition).await {
            Ok(_) => Ok(()),
            Err(PollError::Exhausted(source)) => Err(NodeError::Timeout {
                node: self.identity.name.clone(),
                source,
            }),
            Err(PollError::Condition(err)) => Err(err.into()),
        }
    }

    pub(crate) fn rpc_error(&self, source: RpcError) -> NodeError {
        NodeError::Rpc {
            node: self.identity.name.clone(),
            source,
        }
    }

    fn environment_error(&self, source: EnvironmentError) -> NodeError {
        NodeError::Environment {
            node: self.identity.name.clone(),
            source,
        }
    }

    fn live(&self) -> Result<&LiveNode, NodeError> {
        match &self.state {
            NodeState::Live(live) => Ok(live),
            NodeState::Unstarted => Err(NodeError::NotRunning {
                node: self.identity.name.clone(),
            }),
            NodeState::Stopped => Err(NodeError::Stopped {
                node: self.identity.name.clone(),
            }),
        }
    }

    /// Post-create startup steps; the environment exists but is not yet
    /// owned by any runtime state.
    async fn bring_up(&self) -> Result<LiveNode, NodeError> {
        let endpoints = NodeEndpoints {
            rpc: self.host_port(&self.settings.rpc_port).await?,
            gateway: self.host_port(&self.settings.gateway_port).await?,
        };
        let rpc = self
            .connector
            .connect(&endpoints)
            .map_err(|source| self.rpc_error(source))?;

        self.await_liveness(rpc.as_ref()).await?;
        let operator_address = self.derive_operator_address().await?;

        Ok(LiveNode {
            rpc,
            endpoints,
            operator_address,
        })
    }

    /// Best-effort removal after a failed start, so the name can be reused.
    async fn discard_environment(&self) {
        if let Err(err) = self.environment.remove(&self.identity.name).await {
            warn!(
                node = %self.identity.name,
                %err,
                "failed to remove environment after unsuccessful start"
            );
        }
    }

    async fn wait_past_blocks(&self, n: u64, policy: PollPolicy) -> Result<(), NodeError> {
        let latest = self.try_latest_block_number().await?;
        let threshold = latest.saturating_add(n);
        let message =
            format!("timed out waiting for height above {threshold}, started at {latest}");
        let mut condition =
            SyncCondition::new(self, move |sync: &SyncInfo| sync.latest_block_height > threshold);
        self.poll(policy, &message, &mut condition).await
    }

    async fn await_liveness(&self, rpc: &dyn NodeRpc) -> Result<(), NodeError> {
        let mut liveness = Liveness {
            rpc,
            node: &self.identity.name,
            height: None,
        };
        match poll_until(
            self.settings.liveness,
            "node never answered a status query",
            &mut liveness,
        )
        .await
        {
            Ok(attempt) => {
                info!(
                    node = %self.identity.name,
                    attempt,
                    height = ?liveness.height,
                    "started node environment"
                );
                Ok(())
            }
            Err(PollError::Exhausted(source)) => Err(NodeError::StartupTimeout {
                node: self.identity.name.clone(),
                source,
            }),
            Err(PollError::Condition(never)) => match never {},
        }
    }

    async fn derive_operator_address(&self) -> Result<Option<String>, NodeError> {
        if !self.identity.is_validator {
            info!(
                node = %self.identity.name,
                "node is not a validator, skipping operator address"
            );
            return Ok(None);
        }

        info!(node = %self.identity.name, "extracting validator operator address");
        let argv = [
            self.settings.binary.clone(),
            "debug".to_owned(),
            "addr".to_owned(),
            hex::encode(&self.identity.public_key),
        ];
        let output = self
            .environment
            .exec(&self.identity.name, &argv, "")
            .await
            .map_err(|source| self.environment_error(source))?;

        let mut address = extract_operator_address(&output.stderr);
        if address.is_empty() {
            address = extract_operator_address(&output.stdout);
        }
        if address.is_empty() {
            warn!(
                node = %self.identity.name,
                "debug addr output carried no operator address"
            );
            return Ok(None);
        }
        Ok(Some(address))
    }
}

/// Liveness probe: any successful status read counts, failures mean "not yet".
struct Liveness<'a> {
    rpc: &'a dyn NodeRpc,
    node: &'a str,
    height: Option<u64>,
}

#[async_trait]
impl<'a> Condition for Liveness<'a> {
    type Error = Infallible;

    async fn evaluate(&mut self) -> Result<bool, Self::Error> {
        match self.rpc.status().await {
            Ok(status) => {
                self.height = Some(status.latest_height());
                Ok(true)
            }
            Err(err) => {
                debug!(node = %self.node, %err, "status not answered yet");
                Ok(false)
            }
        }
    }

    fn progress(&self) -> Option<u64> {
        self.height
    }
}

/// Predicate over freshly read sync info, remembering the last height seen.
struct SyncCondition<'a, P> {
    node: &'a Node,
    predicate: P,
    height: Option<u64>,
}

impl<'a, P> SyncCondition<'a, P> {
    const fn new(node: &'a Node, predicate: P) -> Self {
        Self {
            node,
            predicate,
            height: None,
        }
    }
}

#[async_trait]
impl<'a, P> Condition for SyncCondition<'a, P>
where
    P: FnMut(&SyncInfo) -> bool + Send,
{
    type Error = NodeError;

    async fn evaluate(&mut self) -> Result<bool, Self::Error> {
        let status = self.node.rpc_status().await?;
        self.height = Some(status.latest_height());
        Ok((self.predicate)(&status.sync_info))
    }

    fn progress(&self) -> Option<u64> {
        self.height
    }
}

//! In-memory stand-ins for the environment manager and node RPC.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    environment::{EnvironmentError, EnvironmentManager, EnvironmentSpec, ExecOutput},
    nodes::{
        Node, NodeIdentity, NodeStatus, SyncInfo,
        rpc::{NodeEndpoints, NodeRpc, RpcConnector, RpcError},
    },
    polling::PollPolicy,
    settings::HarnessSettings,
};

/// Default settings with every policy shrunk to `attempts` tries. Only the
/// fine-grained policy keeps a real pause.
pub fn quick_settings(attempts: u32) -> HarnessSettings {
    let policy = PollPolicy::new(attempts, Duration::ZERO);
    HarnessSettings {
        liveness: policy,
        wait: policy,
        fine_wait: policy.with_pause(Duration::from_millis(50)),
        ..HarnessSettings::default()
    }
}

/// Started non-validator node backed by `rpc`.
pub async fn live_node(rpc: &Arc<ScriptedRpc>, attempts: u32) -> Node {
    let mut node = Node::new(
        NodeIdentity::new("node-0", "chain-test", "/tmp/node-0"),
        Arc::new(FakeEnvironment::default()),
        ScriptedConnector::new(Arc::clone(rpc)),
        quick_settings(attempts),
    );
    node.run().await.expect("scripted node starts");
    node
}

/// Replays queued values; once drained, keeps answering with the last one.
pub struct Script<T> {
    queue: VecDeque<T>,
    last: Option<T>,
}

impl<T: Clone> Script<T> {
    pub fn new(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            queue: values.into_iter().collect(),
            last: None,
        }
    }

    pub fn next(&mut self) -> Option<T> {
        if let Some(value) = self.queue.pop_front() {
            self.last = Some(value);
        }
        self.last.clone()
    }
}

#[derive(Default)]
pub struct FakeEnvironment {
    live: Mutex<HashSet<String>>,
    created: Mutex<Vec<EnvironmentSpec>>,
    removed: Mutex<Vec<String>>,
    execs: Mutex<Vec<Vec<String>>>,
    exec_outputs: Mutex<HashMap<String, ExecOutput>>,
    failing_execs: Mutex<HashSet<String>>,
}

impl FakeEnvironment {
    /// Canned output for commands whose first argument after the binary is
    /// `subcommand`.
    pub fn respond_to(&self, subcommand: &str, output: ExecOutput) {
        self.exec_outputs
            .lock()
            .unwrap()
            .insert(subcommand.to_owned(), output);
    }

    /// Makes commands with the given subcommand exit non-zero.
    pub fn fail_exec(&self, subcommand: &str) {
        self.failing_execs
            .lock()
            .unwrap()
            .insert(subcommand.to_owned());
    }

    pub fn created(&self) -> Vec<EnvironmentSpec> {
        self.created.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    pub fn execs(&self) -> Vec<Vec<String>> {
        self.execs.lock().unwrap().clone()
    }

    fn ensure_live(&self, name: &str) -> Result<(), EnvironmentError> {
        if self.live.lock().unwrap().contains(name) {
            Ok(())
        } else {
            Err(EnvironmentError::Unknown {
                name: name.to_owned(),
            })
        }
    }
}

#[async_trait]
impl EnvironmentManager for FakeEnvironment {
    async fn create(&self, spec: &EnvironmentSpec) -> Result<(), EnvironmentError> {
        if !self.live.lock().unwrap().insert(spec.node_name.clone()) {
            return Err(EnvironmentError::Failed {
                command: format!("create {}", spec.node_name),
                code: Some(1),
                stderr: "name already in use".to_owned(),
            });
        }
        self.created.lock().unwrap().push(spec.clone());
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<(), EnvironmentError> {
        self.ensure_live(name)?;
        self.live.lock().unwrap().remove(name);
        self.removed.lock().unwrap().push(name.to_owned());
        Ok(())
    }

    async fn exec(
        &self,
        name: &str,
        argv: &[String],
        _input: &str,
    ) -> Result<ExecOutput, EnvironmentError> {
        self.ensure_live(name)?;
        self.execs.lock().unwrap().push(argv.to_vec());
        let subcommand = argv.get(1).cloned().unwrap_or_default();
        if self.failing_execs.lock().unwrap().contains(&subcommand) {
            return Err(EnvironmentError::Failed {
                command: format!("exec {name}"),
                code: Some(1),
                stderr: format!("{subcommand} failed"),
            });
        }
        Ok(self
            .exec_outputs
            .lock()
            .unwrap()
            .get(&subcommand)
            .cloned()
            .unwrap_or_default())
    }

    async fn host_port(&self, name: &str, internal_port: &str) -> Result<String, EnvironmentError> {
        self.ensure_live(name)?;
        let port = internal_port.trim_end_matches("/tcp");
        Ok(format!("127.0.0.1:{port}"))
    }
}

#[derive(Clone, Debug)]
pub enum GatewayReply {
    Body(&'static str),
    Status(u16),
}

/// Node RPC whose heights and gateway replies are scripted up front.
///
/// A `None` height means the node is unreachable for that read.
pub struct ScriptedRpc {
    heights: Mutex<Script<Option<u64>>>,
    gateway: Mutex<HashMap<String, Script<GatewayReply>>>,
    status_calls: AtomicU32,
    gateway_calls: Mutex<Vec<String>>,
}

impl ScriptedRpc {
    pub fn with_heights(heights: impl IntoIterator<Item = Option<u64>>) -> Arc<Self> {
        Arc::new(Self {
            heights: Mutex::new(Script::new(heights)),
            gateway: Mutex::new(HashMap::new()),
            status_calls: AtomicU32::new(0),
            gateway_calls: Mutex::new(Vec::new()),
        })
    }

    pub fn live_at(height: u64) -> Arc<Self> {
        Self::with_heights([Some(height)])
    }

    pub fn reply(&self, path: &str, replies: impl IntoIterator<Item = GatewayReply>) {
        self.gateway
            .lock()
            .unwrap()
            .insert(path.to_owned(), Script::new(replies));
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn gateway_calls(&self) -> Vec<String> {
        self.gateway_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NodeRpc for ScriptedRpc {
    async fn status(&self) -> Result<NodeStatus, RpcError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match self.heights.lock().unwrap().next().flatten() {
            Some(height) => Ok(NodeStatus {
                sync_info: SyncInfo {
                    latest_block_height: height,
                    ..SyncInfo::default()
                },
                ..NodeStatus::default()
            }),
            None => Err(RpcError::Unreachable {
                endpoint: "rpc".to_owned(),
                reason: "connection refused".to_owned(),
            }),
        }
    }

    async fn query_gateway(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Bytes, RpcError> {
        let rendered = params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        self.gateway_calls.lock().unwrap().push(if rendered.is_empty() {
            path.to_owned()
        } else {
            format!("{path}?{rendered}")
        });

        let reply = self
            .gateway
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(Script::next);
        match reply {
            Some(GatewayReply::Body(body)) => Ok(Bytes::from_static(body.as_bytes())),
            Some(GatewayReply::Status(status)) => Err(RpcError::Status {
                url: path.to_owned(),
                status,
                body: String::new(),
            }),
            None => Err(RpcError::Status {
                url: path.to_owned(),
                status: 501,
                body: "unscripted path".to_owned(),
            }),
        }
    }
}

pub struct ScriptedConnector {
    rpc: Arc<ScriptedRpc>,
    connected: Mutex<Vec<NodeEndpoints>>,
}

impl ScriptedConnector {
    pub fn new(rpc: Arc<ScriptedRpc>) -> Arc<Self> {
        Arc::new(Self {
            rpc,
            connected: Mutex::new(Vec::new()),
        })
    }

    pub fn connected(&self) -> Vec<NodeEndpoints> {
        self.connected.lock().unwrap().clone()
    }
}

impl RpcConnector for ScriptedConnector {
    fn connect(&self, endpoints: &NodeEndpoints) -> Result<Arc<dyn NodeRpc>, RpcError> {
        self.connected.lock().unwrap().push(endpoints.clone());
        Ok(Arc::clone(&self.rpc) as Arc<dyn NodeRpc>)
    }
}

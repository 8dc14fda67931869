pub mod environment;
pub mod logging;
pub mod nodes;
pub mod polling;
pub mod queries;
pub mod settings;

#[cfg(test)]
pub(crate) mod fakes;

use std::{env, ops::Mul as _, sync::LazyLock, time::Duration};

pub use environment::{EnvironmentError, EnvironmentManager, EnvironmentSpec, ExecOutput};
pub use nodes::{
    Lifecycle, Node, NodeError, NodeIdentity, NodeStatus, SyncInfo,
    api_client::HttpConnector,
    operator::{OPERATOR_ADDRESS_PREFIX, extract_operator_address},
    rpc::{NodeEndpoints, NodeRpc, RpcConnector, RpcError},
};
pub use polling::{Condition, FnCondition, PollError, PollPolicy, PollTimeout, poll_until};
pub use settings::HarnessSettings;

pub static IS_SLOW_TEST_ENV: LazyLock<bool> =
    LazyLock::new(|| env::var("SLOW_TEST_ENV").is_ok_and(|s| s == "true"));

/// In slow test environments like Codecov, use 2x timeout.
#[must_use]
pub fn adjust_timeout(d: Duration) -> Duration {
    if *IS_SLOW_TEST_ENV { d.mul(2) } else { d }
}

/// Attempt-count twin of [`adjust_timeout`] for fixed-interval polling.
#[must_use]
pub fn adjust_attempts(attempts: u32) -> u32 {
    if *IS_SLOW_TEST_ENV {
        attempts.saturating_mul(2)
    } else {
        attempts
    }
}

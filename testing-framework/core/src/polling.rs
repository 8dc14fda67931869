use std::{convert::Infallible, fmt, future::Future, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Fixed-interval polling budget: at most `max_attempts` evaluations with
/// `pause` between two consecutive ones.
///
/// The total budget is `max_attempts x pause`; there is no separate
/// wall-clock deadline.
#[serde_as]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PollPolicy {
    max_attempts: u32,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "pause_ms")]
    pause: Duration,
}

impl PollPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, pause: Duration) -> Self {
        Self {
            max_attempts,
            pause,
        }
    }

    /// Never less than one: a policy always evaluates its condition once.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }

    #[must_use]
    pub const fn pause(&self) -> Duration {
        self.pause
    }

    #[must_use]
    pub const fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// A repeatedly evaluated predicate.
///
/// Implementations own whatever they need to observe (an RPC handle, a
/// counter) and may expose the last numeric progress value they saw, which
/// ends up in the [`PollTimeout`] report.
#[async_trait]
pub trait Condition: Send {
    type Error: Send;

    async fn evaluate(&mut self) -> Result<bool, Self::Error>;

    fn progress(&self) -> Option<u64> {
        None
    }
}

/// Adapts an async closure into an infallible [`Condition`].
pub struct FnCondition<F>(F);

impl<F> FnCondition<F> {
    pub const fn new(check: F) -> Self {
        Self(check)
    }
}

#[async_trait]
impl<F, Fut> Condition for FnCondition<F>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = bool> + Send,
{
    type Error = Infallible;

    async fn evaluate(&mut self) -> Result<bool, Self::Error> {
        Ok((self.0)().await)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub struct PollTimeout {
    message: String,
    attempts: u32,
    last_progress: Option<u64>,
}

impl PollTimeout {
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub const fn last_progress(&self) -> Option<u64> {
        self.last_progress
    }
}

impl fmt::Display for PollTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (gave up after {} attempts", self.message, self.attempts)?;
        if let Some(progress) = self.last_progress {
            write!(f, ", last observed {progress}")?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Error)]
pub enum PollError<E> {
    #[error(transparent)]
    Exhausted(#[from] PollTimeout),
    #[error("condition evaluation failed: {0}")]
    Condition(#[source] E),
}

/// Evaluates `condition` until it holds or the policy's attempts run out.
///
/// Returns the attempt number on which the condition held. Sleeps only
/// between attempts, so an exhausted policy of `a` attempts sleeps `a - 1`
/// times. An evaluation error aborts polling immediately.
pub async fn poll_until<C>(
    policy: PollPolicy,
    message: &str,
    condition: &mut C,
) -> Result<u32, PollError<C::Error>>
where
    C: Condition + ?Sized,
{
    let max_attempts = policy.max_attempts();
    for attempt in 1..=max_attempts {
        if condition.evaluate().await.map_err(PollError::Condition)? {
            debug!(attempt, "condition satisfied");
            return Ok(attempt);
        }

        debug!(
            attempt,
            max_attempts,
            progress = ?condition.progress(),
            "condition not yet satisfied"
        );
        if attempt < max_attempts {
            sleep(policy.pause()).await;
        }
    }

    let timeout = PollTimeout {
        message: message.to_owned(),
        attempts: max_attempts,
        last_progress: condition.progress(),
    };
    warn!(%timeout, "polling budget exhausted");
    Err(timeout.into())
}

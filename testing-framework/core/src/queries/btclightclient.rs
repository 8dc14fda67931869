use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};

use crate::{
    nodes::{Node, NodeError},
    polling::Condition,
};

const TIP_PATH: &str = "/babylon/btclightclient/v1/tip";

/// Tip of the BTC header chain tracked by the light client.
#[serde_as]
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BtcHeaderInfo {
    #[serde(default)]
    pub header_hex: String,
    #[serde(default)]
    pub hash_hex: String,
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub height: u32,
    #[serde(default)]
    pub work: String,
}

#[derive(Deserialize)]
struct TipResponse {
    header: BtcHeaderInfo,
}

impl Node {
    pub async fn query_tip(&self) -> Result<BtcHeaderInfo, NodeError> {
        let response: TipResponse = self.query_json(TIP_PATH, &[]).await?;
        Ok(response.header)
    }

    /// Polls the light-client tip until it reaches `target`.
    pub async fn wait_until_btc_height(&self, target: u32) -> Result<(), NodeError> {
        let mut condition = BtcTipReached {
            node: self,
            target,
            height: None,
        };
        self.poll(
            self.settings().wait,
            &format!("timed out waiting for btc height {target}"),
            &mut condition,
        )
        .await
    }
}

struct BtcTipReached<'a> {
    node: &'a Node,
    target: u32,
    height: Option<u32>,
}

#[async_trait]
impl<'a> Condition for BtcTipReached<'a> {
    type Error = NodeError;

    async fn evaluate(&mut self) -> Result<bool, Self::Error> {
        let tip = self.node.query_tip().await?;
        self.height = Some(tip.height);
        Ok(tip.height >= self.target)
    }

    fn progress(&self) -> Option<u64> {
        self.height.map(u64::from)
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::nodes::{Node, NodeError};

const PARAMS_PATH: &str = "/babylon/incentive/params";

/// Amounts are arbitrary-precision integers and stay in their string form.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: String,
}

impl Coin {
    #[must_use]
    pub fn amount_u128(&self) -> Option<u128> {
        self.amount.parse().ok()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Gauge {
    #[serde(default)]
    pub coins: Vec<Coin>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardGauges {
    pub coins: Vec<Coin>,
    pub withdrawn_coins: Vec<Coin>,
}

impl RewardGauges {
    /// Amount of `denom` earned but not yet withdrawn.
    #[must_use]
    pub fn withdrawable(&self, denom: &str) -> u128 {
        let sum = |coins: &[Coin]| -> u128 {
            coins
                .iter()
                .filter(|coin| coin.denom == denom)
                .filter_map(Coin::amount_u128)
                .sum()
        };
        sum(&self.coins).saturating_sub(sum(&self.withdrawn_coins))
    }
}

/// Decimal portions are kept as the chain renders them.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncentiveParams {
    pub btc_staking_portion: String,
    pub fp_portion: String,
}

#[derive(Deserialize)]
struct GaugeResponse {
    gauge: Option<Gauge>,
}

#[derive(Deserialize)]
struct ParamsResponse {
    params: IncentiveParams,
}

#[derive(Deserialize)]
struct RewardGaugesResponse {
    #[serde(default)]
    reward_gauges: HashMap<String, RewardGauges>,
}

impl Node {
    /// BTC staking gauge recorded at `height`, if any.
    pub async fn query_btc_staking_gauge(&self, height: u64) -> Result<Option<Gauge>, NodeError> {
        let path = format!("/babylon/incentive/btc_staking_gauge/{height}");
        let response: GaugeResponse = self.query_json(&path, &[]).await?;
        Ok(response.gauge)
    }

    /// Transport failures here abort the test; only a malformed body is
    /// returned as an error.
    pub async fn query_incentive_params(&self) -> Result<IncentiveParams, NodeError> {
        let body = self
            .query_gateway(PARAMS_PATH, &[])
            .await
            .unwrap_or_else(|err| panic!("querying incentive params: {err}"));
        let response: ParamsResponse = self.decode_json(PARAMS_PATH, &body)?;
        Ok(response.params)
    }

    /// Reward gauges of `address`, keyed by stakeholder type.
    pub async fn query_reward_gauge(
        &self,
        address: &str,
    ) -> Result<HashMap<String, RewardGauges>, NodeError> {
        let path = format!("/babylon/incentive/address/{address}/reward_gauge");
        let response: RewardGaugesResponse = self.query_json(&path, &[]).await?;
        Ok(response.reward_gauges)
    }
}

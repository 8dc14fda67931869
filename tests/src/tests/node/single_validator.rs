use babylon_e2e_core::{OPERATOR_ADDRESS_PREFIX, extract_operator_address};
use babylon_e2e_tests::{
    common::network::{identity_from_env, spawn_node},
    init_test_logging,
};

#[tokio::test]
#[ignore = "requires docker, a babylond image and a generated node home"]
async fn single_validator_produces_blocks() {
    init_test_logging();
    let identity = identity_from_env().expect("node identity from environment");
    let is_validator = identity.is_validator;
    let mut node = spawn_node(identity).await.expect("node starts");

    if is_validator {
        let address = node.operator_address().expect("validator operator address");
        assert!(address.starts_with(OPERATOR_ADDRESS_PREFIX));
        assert_eq!(address.len(), OPERATOR_ADDRESS_PREFIX.len() + 39);
        assert_eq!(extract_operator_address(address), address);
    }

    node.wait_for_next_block().await.expect("first block");
    assert!(node.latest_block_number().await >= 1);

    let before = node.latest_block_number().await;
    node.wait_for_next_blocks(2).await.expect("chain advances");
    let after = node.latest_block_number().await;
    assert!(after > before + 2, "height went from {before} to {after}");

    node.wait_until(|sync| !sync.catching_up)
        .await
        .expect("node caught up");
    node.wait_for_next_block_with_sleep_50ms()
        .await
        .expect("next block at fine cadence");

    let status = node.status().await.expect("cli status");
    assert_eq!(status.node_info.network, node.chain_id());

    let params = node.query_incentive_params().await.expect("incentive params");
    assert!(!params.btc_staking_portion.is_empty());

    let tip = node.query_tip().await.expect("btc tip");
    node.wait_until_btc_height(tip.height)
        .await
        .expect("tip is already reached");

    node.log_action("checks done");
    node.stop().await.expect("node stops");
}

//! # JSON-RPC Client Flow
//!
//! `CeloRpcClient` against a fake node over real HTTP, then the full poll
//! loop on top of it.

#[cfg(test)]
mod tests {
    use crate::integration::fake_node::FakeNode;
    use signer_monitor::adapters::block_with_signers;
    use signer_monitor::{
        Address, BitmapDecoder, CeloRpcClient, CeloRpcConfig, ChainClient, MonitorConfig,
        MonitorError, PrometheusMetricsSink, SignerBit, SignerMonitorService, TickOutcome,
    };
    use signer_telemetry::ExporterMetrics;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    const EPOCH_SIZE: u64 = 17_280;

    fn signer() -> Address {
        Address([0x5C; 20])
    }

    fn client_for(node: &FakeNode) -> CeloRpcClient {
        CeloRpcClient::new(CeloRpcConfig {
            url: node.url(),
            epoch_size: EPOCH_SIZE,
            request_timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    async fn node_with_signer_at(slot: usize, set_size: usize) -> FakeNode {
        let node = FakeNode::start().await;
        let mut validators: Vec<Address> = (0..set_size as u8).map(|i| Address([i; 20])).collect();
        validators[slot] = signer();
        node.set_validators(validators);
        node
    }

    #[tokio::test]
    async fn test_epoch_derived_from_head() {
        let node = node_with_signer_at(1, 3).await;
        node.set_head(block_with_signers(17_281, &[0, 2]));
        let client = client_for(&node);

        let epoch = assert_ok!(client.epoch_info().await);
        assert_eq!(epoch.number, 2);
        assert_eq!(epoch.start_block, 17_281);
        assert_eq!(epoch.end_block, 34_560);
    }

    #[tokio::test]
    async fn test_validator_lookup_and_bitmap() {
        let node = node_with_signer_at(1, 3).await;
        node.set_head(block_with_signers(500, &[0, 2]));
        let client = client_for(&node);

        let position = assert_ok!(client.validator_index(&signer()).await);
        assert_eq!(position.index, Some(1));
        assert_eq!(position.set_size, 3);

        let block = assert_ok!(client.latest_block().await);
        assert_eq!(block.number, 500);
        assert_eq!(
            BitmapDecoder::new().bit_at(&block, position),
            SignerBit::Missed
        );

        let stranger = assert_ok!(client.validator_index(&Address([0xEE; 20])).await);
        assert_eq!(stranger.index, None);
    }

    #[tokio::test]
    async fn test_rpc_error_is_reported() {
        let node = node_with_signer_at(0, 1).await;
        node.disable_method("istanbul_getValidators");
        let client = client_for(&node);

        let err = assert_err!(client.validator_index(&signer()).await);
        match err {
            MonitorError::Rpc { method, message } => {
                assert_eq!(method, "istanbul_getValidators");
                assert!(message.contains("-32601"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_head_is_malformed() {
        let node = node_with_signer_at(0, 1).await;
        let client = client_for(&node);

        let err = assert_err!(client.latest_block().await);
        assert!(matches!(err, MonitorError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_node() {
        let client = CeloRpcClient::new(CeloRpcConfig {
            url: "http://127.0.0.1:1".to_string(),
            epoch_size: EPOCH_SIZE,
            request_timeout: Duration::from_millis(500),
        })
        .unwrap();

        let err = assert_err!(client.client_version().await);
        assert!(matches!(err, MonitorError::Connection { .. }));
    }

    /// Full stack: HTTP node → poll loop → Prometheus registry.
    #[tokio::test]
    async fn test_poll_loop_over_http() {
        let node = node_with_signer_at(2, 4).await;
        node.set_head(block_with_signers(34_559, &[0, 1, 3]));

        let metrics = Arc::new(ExporterMetrics::new().unwrap());
        let sink = Arc::new(PrometheusMetricsSink::new(
            Arc::clone(&metrics),
            signer().to_hex(),
        ));
        let mut service =
            SignerMonitorService::new(MonitorConfig::new(signer()), Arc::new(client_for(&node)), sink);
        service.initialize().await;

        let outcome = assert_ok!(service.tick().await);
        assert!(matches!(outcome, TickOutcome::Processed(_)));
        assert_eq!(service.machine().state().consecutive, 1);

        // Last block of epoch 2, then the first block of epoch 3.
        node.set_head(block_with_signers(34_560, &[0, 1, 2, 3]));
        assert_ok!(service.tick().await);
        node.set_head(block_with_signers(34_561, &[0, 1, 2, 3]));
        assert_ok!(service.tick().await);
        assert_eq!(service.tracker().epoch().number, 3);

        let text = metrics.encode().unwrap();
        assert!(text.contains("celochain_web3_client_info"));
        assert!(text.contains("celo/v1.8.4-stable"));
        assert!(text.contains(&format!(
            "celochain_epoch_current{{signer=\"{}\"}} 3",
            signer().to_hex()
        )));
    }
}

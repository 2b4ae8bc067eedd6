//! # Poll Flow → Prometheus Exposition
//!
//! Drives the poll loop with the scripted chain client and checks what a
//! Prometheus scrape would see.
//!
//! ```text
//! MockChainClient ──→ SignerMonitorService ──→ PrometheusMetricsSink ──→ ExporterMetrics::encode
//! ```

#[cfg(test)]
mod tests {
    use signer_monitor::adapters::{block_with_signers, MockChainClient};
    use signer_monitor::{
        Address, EpochInfo, MonitorConfig, PrometheusMetricsSink, SignerMonitorService,
        TickOutcome,
    };
    use signer_telemetry::ExporterMetrics;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const SIGNER_SLOT: usize = 1;

    fn signer() -> Address {
        Address([0x42; 20])
    }

    fn validators() -> Vec<Address> {
        vec![Address([1; 20]), signer(), Address([2; 20]), Address([3; 20])]
    }

    struct Harness {
        chain: Arc<MockChainClient>,
        metrics: Arc<ExporterMetrics>,
        service: SignerMonitorService<MockChainClient, PrometheusMetricsSink>,
    }

    impl Harness {
        async fn new(slow_reset_delay: u64) -> Self {
            let chain = Arc::new(MockChainClient::new());
            chain.set_epoch(EpochInfo {
                start_block: 1,
                number: 1,
                end_block: 200,
            });
            chain.set_validators(validators());

            let metrics = Arc::new(ExporterMetrics::new().unwrap());
            let sink = Arc::new(PrometheusMetricsSink::new(
                Arc::clone(&metrics),
                signer().to_hex(),
            ));

            let mut config = MonitorConfig::new(signer());
            config.slow_reset_delay = slow_reset_delay;
            config.exporter_version = "0.1.0".to_string();

            let mut service = SignerMonitorService::new(config, Arc::clone(&chain), sink);
            service.initialize().await;

            Self {
                chain,
                metrics,
                service,
            }
        }

        async fn miss(&mut self, number: u64) -> TickOutcome {
            self.chain
                .set_latest(block_with_signers(number, &[0, 2, 3]));
            assert_ok!(self.service.tick().await)
        }

        async fn sign(&mut self, number: u64) -> TickOutcome {
            self.chain
                .set_latest(block_with_signers(number, &[0, SIGNER_SLOT, 2, 3]));
            assert_ok!(self.service.tick().await)
        }

        /// Value of `name{signer=...}` in the current exposition.
        fn sample(&self, name: &str) -> Option<i64> {
            let prefix = format!("{}{{signer=\"{}\"}} ", name, signer().to_hex());
            self.metrics
                .encode()
                .unwrap()
                .lines()
                .find_map(|line| line.strip_prefix(prefix.as_str()))
                .and_then(|value| value.trim().parse().ok())
        }
    }

    // =============================================================================
    // FLOWS
    // =============================================================================

    /// Startup pushes zeroed downtime gauges, epoch and version info.
    #[tokio::test]
    async fn test_startup_exposition() {
        let harness = Harness::new(3).await;

        assert_eq!(harness.sample("celochain_downtime_blocks_consecutive"), Some(0));
        assert_eq!(harness.sample("celochain_downtime_blocks_consecutive_slow"), Some(0));
        assert_eq!(harness.sample("celochain_latest_block_number"), Some(0));
        assert_eq!(harness.sample("celochain_epoch_current"), Some(1));

        let text = harness.metrics.encode().unwrap();
        assert!(text.contains("celochain_exporter_info"));
        assert!(text.contains("version=\"0.1.0\""));
        assert!(text.contains("version=\"celo/mock-v1.0.0\""));
    }

    /// Two misses, then four signed blocks with the default delay of 3.
    #[tokio::test]
    async fn test_slow_gauge_holds_then_resets() {
        let mut h = Harness::new(3).await;

        h.miss(100).await;
        h.miss(101).await;
        assert_eq!(h.sample("celochain_downtime_blocks_consecutive"), Some(2));
        assert_eq!(h.sample("celochain_downtime_blocks_total"), Some(2));

        h.sign(102).await;
        assert_eq!(h.sample("celochain_downtime_blocks_consecutive"), Some(0));
        assert_eq!(h.sample("celochain_downtime_blocks_consecutive_slow"), Some(2));

        h.sign(103).await;
        h.sign(104).await;
        assert_eq!(h.sample("celochain_downtime_blocks_consecutive_slow"), Some(2));

        h.sign(105).await;
        assert_eq!(h.sample("celochain_downtime_blocks_consecutive_slow"), Some(0));
        assert_eq!(h.sample("celochain_downtime_blocks_total"), Some(2));
        assert_eq!(h.sample("celochain_latest_block_number"), Some(105));
    }

    /// A miss after a gap restarts both runs, even mid-debounce.
    #[tokio::test]
    async fn test_gap_miss_restarts_slow_run() {
        let mut h = Harness::new(3).await;

        h.miss(100).await;
        h.miss(101).await;
        h.sign(102).await;
        h.miss(103).await;

        assert_eq!(h.sample("celochain_downtime_blocks_consecutive"), Some(1));
        assert_eq!(h.sample("celochain_downtime_blocks_consecutive_slow"), Some(1));
        assert_eq!(h.sample("celochain_downtime_blocks_total"), Some(3));
    }

    /// Countdown settles on the processed block once the same head is seen again.
    #[tokio::test]
    async fn test_countdown_follows_processed_block() {
        let mut h = Harness::new(3).await;

        h.sign(150).await;
        let outcome = h.sign(150).await;

        assert_eq!(outcome, TickOutcome::Unchanged { block: 150 });
        assert_eq!(h.sample("celochain_epoch_countdown_blocks"), Some(50));
        assert_eq!(h.sample("celochain_epoch_countdown_seconds"), Some(250));
    }

    /// Crossing the epoch's last block refreshes on the next one; the countdown
    /// is still measured from the last processed block.
    #[tokio::test]
    async fn test_epoch_rollover_updates_gauge() {
        let mut h = Harness::new(3).await;

        h.sign(200).await;
        h.chain.set_epoch(EpochInfo {
            start_block: 201,
            number: 2,
            end_block: 400,
        });
        h.sign(201).await;

        assert_eq!(h.sample("celochain_epoch_current"), Some(2));
        assert_eq!(h.sample("celochain_epoch_countdown_blocks"), Some(200));
        assert_eq!(h.chain.epoch_info_calls(), 2);
    }
}

//! Celo JSON-RPC Chain Client
//!
//! Implements the `ChainClient` port over HTTP JSON-RPC.
//!
//! | Port call | RPC method |
//! |-----------|------------|
//! | `latest_block` | `eth_getBlockByNumber("latest", false)` |
//! | `epoch_info` | `eth_blockNumber` + configured epoch size |
//! | `validator_index` | `istanbul_getValidators("latest")` |
//! | `client_version` | `web3_clientVersion` |

use crate::domain::{Address, Block, EpochInfo, ValidatorPosition};
use crate::error::{MonitorError, MonitorResult};
use crate::ports::outbound::ChainClient;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Blocks per epoch on Celo mainnet.
pub const DEFAULT_EPOCH_SIZE: u64 = 17_280;

/// Connection settings for [`CeloRpcClient`].
#[derive(Clone, Debug)]
pub struct CeloRpcConfig {
    pub url: String,
    pub epoch_size: u64,
    /// HTTP-level request timeout
    pub request_timeout: Duration,
}

impl Default for CeloRpcConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8545".to_string(),
            epoch_size: DEFAULT_EPOCH_SIZE,
            request_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse<R> {
    result: Option<R>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Subset of the block object the monitor needs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcBlock {
    number: String,
    extra_data: String,
}

/// HTTP JSON-RPC client for a Celo node.
pub struct CeloRpcClient {
    client: Client,
    config: CeloRpcConfig,
    request_id: AtomicU64,
}

impl CeloRpcClient {
    pub fn new(config: CeloRpcConfig) -> MonitorResult<Self> {
        if config.epoch_size == 0 {
            return Err(MonitorError::MalformedResponse {
                what: "epoch size",
                reason: "must be greater than zero".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            config,
            request_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    async fn call<P: Serialize + Send, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> MonitorResult<R> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.request_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self
            .client
            .post(&self.config.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| MonitorError::Connection {
                reason: format!("{} ({})", e, self.config.url),
            })?;

        let body: JsonRpcResponse<R> =
            response
                .json()
                .await
                .map_err(|e| MonitorError::MalformedResponse {
                    what: "JSON-RPC envelope",
                    reason: e.to_string(),
                })?;

        unwrap_response(method, body)
    }

    async fn block_number(&self) -> MonitorResult<u64> {
        let raw: String = self.call("eth_blockNumber", [(); 0]).await?;
        parse_quantity(&raw)
    }
}

fn unwrap_response<R>(method: &str, body: JsonRpcResponse<R>) -> MonitorResult<R> {
    if let Some(error) = body.error {
        return Err(MonitorError::Rpc {
            method: method.to_string(),
            message: format!("{} (code {})", error.message, error.code),
        });
    }
    body.result.ok_or_else(|| MonitorError::MalformedResponse {
        what: "JSON-RPC envelope",
        reason: format!("{} returned no result", method),
    })
}

#[async_trait]
impl ChainClient for CeloRpcClient {
    async fn latest_block(&self) -> MonitorResult<Block> {
        let raw: RpcBlock = self
            .call("eth_getBlockByNumber", ("latest", false))
            .await?;

        Ok(Block {
            number: parse_quantity(&raw.number)?,
            extra_data: parse_data(&raw.extra_data)?,
        })
    }

    async fn epoch_info(&self) -> MonitorResult<EpochInfo> {
        let head = self.block_number().await?;
        let epoch = epoch_for_block(head, self.config.epoch_size);
        debug!(head, epoch = epoch.number, end_block = epoch.end_block, "Resolved epoch");
        Ok(epoch)
    }

    async fn validator_index(&self, signer: &Address) -> MonitorResult<ValidatorPosition> {
        let raw: Vec<String> = self.call("istanbul_getValidators", ["latest"]).await?;

        let validators = raw
            .iter()
            .map(|v| v.parse::<Address>())
            .collect::<MonitorResult<Vec<_>>>()?;

        Ok(ValidatorPosition {
            index: validators.iter().position(|v| v == signer),
            set_size: validators.len(),
        })
    }

    async fn client_version(&self) -> MonitorResult<String> {
        self.call("web3_clientVersion", [(); 0]).await
    }
}

/// Epoch containing `block` for a chain with fixed `epoch_size`.
///
/// Block 0 is epoch 0; epoch `n >= 1` spans `(n-1)*size+1 ..= n*size`.
pub fn epoch_for_block(block: u64, epoch_size: u64) -> EpochInfo {
    if block == 0 {
        return EpochInfo::default();
    }
    let number = block.div_ceil(epoch_size);
    EpochInfo {
        start_block: (number - 1) * epoch_size + 1,
        number,
        end_block: number * epoch_size,
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(raw: &str) -> MonitorResult<u64> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16).map_err(|e| MonitorError::MalformedResponse {
        what: "hex quantity",
        reason: format!("{:?}: {}", raw, e),
    })
}

/// Parse `0x`-prefixed hex data.
pub fn parse_data(raw: &str) -> MonitorResult<Vec<u8>> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits).map_err(|e| MonitorError::MalformedResponse {
        what: "hex data",
        reason: e.to_string(),
    })
}

//! Minimal Celo JSON-RPC node for exercising the HTTP client.
//!
//! Serves `eth_blockNumber`, `eth_getBlockByNumber`, `istanbul_getValidators`
//! and `web3_clientVersion` from in-memory state.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use signer_monitor::{Address, Block};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Default)]
struct NodeState {
    head: Option<Block>,
    validators: Vec<Address>,
    unsupported: Vec<String>,
}

/// Handle to a running fake node.
#[derive(Clone)]
pub struct FakeNode {
    state: Arc<Mutex<NodeState>>,
    addr: SocketAddr,
}

impl FakeNode {
    /// Bind to an ephemeral port and start serving.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(NodeState::default()));
        let router = Router::new()
            .route("/", post(handle_rpc))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { state, addr }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_head(&self, block: Block) {
        self.state.lock().head = Some(block);
    }

    pub fn set_validators(&self, validators: Vec<Address>) {
        self.state.lock().validators = validators;
    }

    /// Answer `method` with a JSON-RPC "method not found" error.
    pub fn disable_method(&self, method: &str) {
        self.state.lock().unsupported.push(method.to_string());
    }
}

async fn handle_rpc(
    State(state): State<Arc<Mutex<NodeState>>>,
    Json(request): Json<Value>,
) -> Json<Value> {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let state = state.lock();

    if state.unsupported.contains(&method) {
        return Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": format!("the method {method} does not exist") }
        }));
    }

    let head_number = state.head.as_ref().map_or(0, |b| b.number);
    let result = match method.as_str() {
        "eth_blockNumber" => json!(format!("0x{:x}", head_number)),
        "eth_getBlockByNumber" => match &state.head {
            Some(block) => json!({
                "number": format!("0x{:x}", block.number),
                "extraData": format!("0x{}", hex::encode(&block.extra_data)),
                "hash": "0x00",
            }),
            None => Value::Null,
        },
        "istanbul_getValidators" => json!(state
            .validators
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()),
        "web3_clientVersion" => json!("celo/v1.8.4-stable/linux-amd64/go1.19"),
        _ => Value::Null,
    };

    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

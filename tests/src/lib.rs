//! # Signer Watch Test Suite
//!
//! End-to-end flows across crates.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fake_node.rs   # axum JSON-RPC server scripted per test
//!     ├── poll_flow.rs   # poll loop → Prometheus text exposition
//!     └── rpc_flow.rs    # CeloRpcClient against the fake node
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p signer-watch-tests
//! cargo test -p signer-watch-tests integration::poll_flow
//! ```

pub mod integration;

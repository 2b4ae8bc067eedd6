//! Cross-crate integration flows.

pub mod fake_node;
mod poll_flow;
mod rpc_flow;

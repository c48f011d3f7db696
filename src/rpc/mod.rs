//! Stdio JSON-RPC transport glue.
//!
//! The engine core never depends on this module; it exists so the binary
//! (and embedders that want a ready-made front-end) can expose the engine
//! over newline-delimited JSON-RPC 2.0.

pub mod protocol;
pub mod server;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use server::RpcServer;

//! In-memory, time-indexed graph engine.
//!
//! [`store::GraphStore`] holds nodes, an append-only edge log and an
//! undirected adjacency index, and answers bounded breadth-first expansions
//! restricted to a time window. [`server`] exposes it over gRPC and
//! [`mcp_stdio`] as JSON-RPC tools on stdin/stdout.

pub mod config;
pub mod error;
pub mod mcp_stdio;
pub mod mcp_types;
pub mod record;
pub mod server;
pub mod store;
pub mod telemetry;

pub use record::{Attributes, EdgeRecord, NodeRecord};
pub use store::{GraphStats, GraphStore, Subgraph};

use crate::error::{EngineError, EngineResult};
use std::env;
use std::net::SocketAddr;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:50061";
pub const ADDR_ENV_VAR: &str = "GRAPH_ENGINE_ADDR";

/// How the process exposes the graph store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeMode {
    /// gRPC over HTTP/2 on `listen_addr`.
    Grpc,
    /// JSON-RPC tool calls over stdin/stdout.
    McpStdio,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub listen_addr: SocketAddr,
    pub mode: ServeMode,
}

impl EngineConfig {
    /// Reads `GRAPH_ENGINE_ADDR` and the process arguments.
    pub fn from_env() -> EngineResult<Self> {
        let addr = env::var(ADDR_ENV_VAR).ok();
        Self::from_parts(env::args().skip(1), addr.as_deref())
    }

    pub fn from_parts<I, S>(args: I, addr: Option<&str>) -> EngineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let is_mcp = args.into_iter().any(|a| a.as_ref() == "--mcp");
        let value = addr
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_LISTEN_ADDR);
        let listen_addr: SocketAddr = value
            .parse()
            .map_err(|source| EngineError::InvalidAddress {
                value: value.to_string(),
                source,
            })?;

        Ok(Self {
            listen_addr,
            mode: if is_mcp {
                ServeMode::McpStdio
            } else {
                ServeMode::Grpc
            },
        })
    }
}

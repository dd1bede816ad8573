use graph_engine::config::{EngineConfig, ServeMode};
use graph_engine::mcp_stdio::run_mcp_stdio;
use graph_engine::server;
use graph_engine::store::GraphStore;
use graph_engine::telemetry::init_tracing;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EngineConfig::from_env()?;
    init_tracing();

    let store = Arc::new(GraphStore::new());

    match config.mode {
        ServeMode::McpStdio => run_mcp_stdio(store).await?,
        ServeMode::Grpc => server::serve(&config, store).await?,
    }

    Ok(())
}

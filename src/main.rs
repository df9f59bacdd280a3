// Command server: accepts AI commands over HTTP and streams the external
// executable's progress over WebSocket or SSE.
//
// Configured through environment variables, see `ServerConfig::from_env`.

use anyhow::Result;
use kodegen_ai_command::{ServerConfig, logging, start_server};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = ServerConfig::from_env()?;
    let handle = start_server(config).await?;
    log::info!("Listening on {}", handle.addr());

    tokio::signal::ctrl_c().await?;
    log::info!("Shutdown signal received");
    handle.shutdown().await?;

    Ok(())
}

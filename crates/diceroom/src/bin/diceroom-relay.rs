//! Standalone relay server.
//!
//! `DICEROOM_BIND` overrides the listen address and `RUST_LOG` the log
//! filter (default `info`). Stops on Ctrl-C.

use std::env;

use diceroom::{DiceroomError, DiceroomServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), DiceroomError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = ServerConfig::default();
    if let Ok(addr) = env::var("DICEROOM_BIND") {
        config.bind_addr = addr;
    }

    let server = DiceroomServer::builder().config(config).build().await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutdown requested");
        })
        .await
}

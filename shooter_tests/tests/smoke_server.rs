use std::sync::Arc;

use shooter_server::bind_ephemeral;
use shooter_server::GameServer;
use shooter_shared::config::GameConfig;

/// Smoke test: server can run a few ticks without panicking.
#[tokio::test]
async fn server_runs_few_ticks() -> anyhow::Result<()> {
    let mut server = bind_ephemeral(GameConfig::default()).await?;
    server.run_for_ticks(3).await?;
    Ok(())
}

/// Binding the configured address twice fails cleanly instead of panicking.
#[tokio::test]
async fn double_bind_reports_an_error() -> anyhow::Result<()> {
    let server = bind_ephemeral(GameConfig::default()).await?;
    let addr = server.local_addr()?;
    let config = Arc::new(GameConfig::default());
    assert!(GameServer::bind_addr(config, &addr.to_string()).await.is_err());
    Ok(())
}

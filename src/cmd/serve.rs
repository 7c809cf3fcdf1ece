//! Board server command: `taskboard serve`.

use anyhow::Result;

use taskboard::board::server::{ServerConfig, start_server};
use taskboard::config::TaskboardConfig;

pub async fn cmd_serve(config: &TaskboardConfig, open: bool) -> Result<()> {
    let server_config = ServerConfig::from(config);

    // No browser inside containers
    if open && !server_config.dev_mode {
        let url = format!("http://localhost:{}", server_config.port);
        tokio::spawn(async move {
            // Give the listener time to bind
            tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                tracing::warn!(error = %e, url = %url, "failed to open browser");
            }
        });
    }

    start_server(server_config).await
}

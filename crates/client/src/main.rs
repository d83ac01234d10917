//! Escape-room session client binary.
//!
//! # Architecture
//!
//! This binary is the composition root that assembles:
//! 1. Content (session tuning, level document, theme) from the data directory
//! 2. Runtime (session rules) via RuntimeBuilder
//! 3. Network client (optional) when `RELAY_URL` and `ROOM_ID` are set
//! 4. Console frontend reading commands from stdin
//!
//! # Examples
//!
//! ```bash
//! # Solo run of the bundled level
//! ESCAPE_LEVEL=cellar cargo run -p escape-client
//!
//! # Join a relay room
//! RELAY_URL=ws://localhost:8080 ROOM_ID=lobby PLAYER_ID=ada cargo run -p escape-client
//! ```

mod console;

use std::sync::Arc;

use anyhow::{Context, Result};
use escape_content::{ContentFactory, ThemeRegistry};
use escape_net::{NetClient, WebSocketTransport};
use escape_runtime::{
    FileLevelRepository, InMemoryScoreRepository, LevelRepository, Runtime, RuntimeConfig,
    logging,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // 1. Load configuration from environment
    let config = RuntimeConfig::from_env();

    // 2. Setup logging (guard flushes the log file on exit)
    let _guard = logging::setup_logging(&config.session_id, config.log_to_stderr)?;

    tracing::info!("Starting escape client");
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("Level: {}, player: {}", config.level_id, config.player_id);

    // 3. Load content
    let content = ContentFactory::new(&config.data_dir);
    let session_config = content.load_config()?;

    let levels = FileLevelRepository::new(&config.data_dir);
    let level = levels
        .load(&config.level_id)
        .await?
        .with_context(|| format!("level '{}' not found", config.level_id))?;
    let theme = ThemeRegistry::new().resolve(level.theme.as_deref());

    // 4. Build Runtime
    let mut builder = Runtime::builder()
        .config(config.clone())
        .session_config(session_config)
        .level(level)
        .theme(theme)
        .scores(Arc::new(InMemoryScoreRepository::new()));

    // 5. Optional: join a networked room
    match &config.net {
        Some(net_config) => {
            tracing::info!(
                "Networking enabled: room={} relay={}",
                net_config.room_id,
                net_config.url
            );
            builder = builder.net(NetClient::new(
                net_config.clone(),
                Arc::new(WebSocketTransport),
            ));
        }
        None => tracing::debug!("Networking disabled (RELAY_URL/ROOM_ID not set)"),
    }

    let runtime = builder.build().await?;
    tracing::info!("Runtime built successfully");

    // 6. Run the console until quit
    console::run(&runtime).await?;

    runtime.shutdown().await?;
    tracing::info!("Client shutdown complete");
    Ok(())
}

//! High-level runtime orchestrator.
//!
//! The runtime owns the session worker, wires up command/event channels and
//! the optional network client, and exposes a builder-based API.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use escape_core::{GameError, LevelDocument, PlayerId, Session, SessionConfig, Theme, Timestamp};
use escape_net::NetClient;

use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::handle::RuntimeHandle;
use crate::repository::{LevelRepository, ScoreRepository};
use crate::worker::SessionWorker;

/// Main runtime that drives one session
///
/// [`RuntimeHandle`] provides a cloneable façade for clients.
pub struct Runtime {
    handle: RuntimeHandle,
    net: Option<NetClient>,
    worker_handle: JoinHandle<()>,
}

impl Runtime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> RuntimeHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self, topic: Topic) -> tokio::sync::broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    pub fn net(&self) -> Option<&NetClient> {
        self.net.as_ref()
    }

    /// Stop the network client and the session worker.
    pub async fn shutdown(self) -> Result<()> {
        if let Some(net) = &self.net {
            net.disable().await;
        }
        // The worker may already be gone; joining below reports that.
        let _ = self.handle.shutdown().await;
        drop(self.handle);

        self.worker_handle
            .await
            .map_err(RuntimeError::WorkerJoin)?;
        Ok(())
    }
}

/// Builder for [`Runtime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    session_config: SessionConfig,
    level: Option<LevelDocument>,
    theme: Option<Arc<dyn Theme>>,
    net: Option<NetClient>,
    scores: Option<Arc<dyn ScoreRepository>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            session_config: SessionConfig::default(),
            level: None,
            theme: None,
            net: None,
            scores: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Override session tuning
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Provide the level to play
    pub fn level(mut self, level: LevelDocument) -> Self {
        self.level = Some(level);
        self
    }

    /// Fetch the configured level id from a repository
    pub async fn level_from(mut self, levels: &dyn LevelRepository) -> Result<Self> {
        let id = &self.config.level_id;
        let level = levels
            .load(id)
            .await?
            .ok_or_else(|| RuntimeError::LevelNotFound(id.clone()))?;
        self.level = Some(level);
        Ok(self)
    }

    /// Set the theme (defaults to the generic basic theme)
    pub fn theme(mut self, theme: Arc<dyn Theme>) -> Self {
        self.theme = Some(theme);
        self
    }

    /// Join a networked room with this client
    pub fn net(mut self, client: NetClient) -> Self {
        self.net = Some(client);
        self
    }

    /// Record finished runs in this leaderboard
    pub fn scores(mut self, scores: Arc<dyn ScoreRepository>) -> Self {
        self.scores = Some(scores);
        self
    }

    /// Build the session and spawn its worker.
    pub async fn build(self) -> Result<Runtime> {
        let level = self.level.ok_or(RuntimeError::MissingLevel)?;
        let theme: Arc<dyn Theme> = match self.theme {
            Some(theme) => theme,
            None => Arc::new(escape_core::BasicTheme),
        };

        let session = Session::new(
            level,
            theme,
            self.session_config,
            PlayerId::new(self.config.player_id.as_str()),
            Timestamp::ZERO,
        )
        .inspect_err(|e| {
            tracing::error!(
                "Level '{}' rejected [{}]: {}",
                self.config.level_id,
                e.error_code(),
                e
            )
        })?;

        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);
        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer_size);

        let inbound_rx = match &self.net {
            Some(net) => {
                let (tx, rx) = mpsc::unbounded_channel();
                net.set_on_message(move |message| {
                    // The worker is gone once the runtime shuts down.
                    let _ = tx.send(message);
                })
                .await;
                Some(rx)
            }
            None => None,
        };

        let worker = SessionWorker::new(
            session,
            self.config.level_id.clone(),
            Instant::now(),
            command_rx,
            inbound_rx,
            self.net.clone(),
            event_bus.clone(),
            self.scores,
            self.config.ticks,
        );
        let worker_handle = tokio::spawn(worker.run());

        if let Some(net) = &self.net {
            net.enable().await;
        }

        tracing::info!("Runtime started for level '{}'", self.config.level_id);

        Ok(Runtime {
            handle: RuntimeHandle::new(command_tx, event_bus),
            net: self.net,
            worker_handle,
        })
    }
}

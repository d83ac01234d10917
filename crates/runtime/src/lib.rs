//! Runtime orchestration for escape-room sessions.
//!
//! This crate drives a [`escape_core::Session`] on a single cooperative tokio
//! task, publishes its events, and mirrors it into a networked room when a
//! [`escape_net::NetClient`] is attached. Consumers embed [`Runtime`] and
//! talk to the session through [`RuntimeHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`handle`] exposes the command façade downstream clients use
//! - [`events`] provides the topic-based event bus
//! - [`sync`] translates between session changes and gameplay messages
//! - [`repository`] holds level and score storage contracts
//! - [`config`] and [`logging`] cover process setup
pub mod config;
pub mod error;
pub mod events;
pub mod handle;
pub mod logging;
pub mod repository;
pub mod runtime;
pub mod sync;

mod worker;

pub use config::{RuntimeConfig, TickRates};
pub use error::{Result, RuntimeError};
pub use events::{ClockEvent, Event, EventBus, NetworkEvent, Topic};
pub use handle::{RuntimeHandle, SessionSnapshot};
pub use repository::{
    FileLevelRepository, InMemoryLevelRepository, InMemoryScoreRepository, LevelRepository,
    RankedScore, RepositoryError, ScoreEntry, ScoreMetric, ScoreRepository,
};
pub use runtime::{Runtime, RuntimeBuilder};
pub use sync::GameMessage;

//! Repository layer for levels and scores.
//!
//! Level storage and leaderboards live outside the session engine; the
//! runtime only needs these contracts. In-memory implementations back tests
//! and offline play, and [`FileLevelRepository`] reads the content directory.

mod error;
mod file;
mod memory;
mod traits;

pub use error::{RepositoryError, Result};
pub use file::FileLevelRepository;
pub use memory::{InMemoryLevelRepository, InMemoryScoreRepository};
pub use traits::{LevelRepository, RankedScore, ScoreEntry, ScoreMetric, ScoreRepository};

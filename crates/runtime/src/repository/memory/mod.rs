//! In-memory repository implementations for testing and offline play.

mod level;
mod score;

pub use level::InMemoryLevelRepository;
pub use score::InMemoryScoreRepository;

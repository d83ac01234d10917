//! Repository contracts for level documents and completed-run scores.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use escape_core::LevelDocument;

use super::Result;

/// Store of level documents keyed by an opaque id.
#[async_trait]
pub trait LevelRepository: Send + Sync {
    /// Load a level, or `None` if no level has this id.
    async fn load(&self, id: &str) -> Result<Option<LevelDocument>>;

    /// Save a level, replacing any previous document with the same id.
    async fn save(&self, id: &str, level: &LevelDocument) -> Result<()>;

    /// List all level ids, sorted.
    async fn list(&self) -> Result<Vec<String>>;
}

/// Leaderboard dimension. Lower is better for every metric.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMetric {
    TimeMs,
    Moves,
}

/// One finished run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub level_id: String,
    pub player_id: String,
    pub time_ms: u64,
    pub moves: u32,
}

impl ScoreEntry {
    pub fn value(&self, metric: ScoreMetric) -> u64 {
        match metric {
            ScoreMetric::TimeMs => self.time_ms,
            ScoreMetric::Moves => u64::from(self.moves),
        }
    }
}

/// A player's best value for one metric.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedScore {
    pub player_id: String,
    pub value: u64,
}

/// Leaderboard keeping each player's best value per metric and level.
#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// Record a finished run.
    ///
    /// Returns the metrics for which this run improved the player's best.
    async fn submit(&self, entry: &ScoreEntry) -> Result<Vec<ScoreMetric>>;

    /// Best `limit` players for a level, best first. Ties keep submission order.
    async fn top(&self, level_id: &str, metric: ScoreMetric, limit: usize)
    -> Result<Vec<RankedScore>>;

    /// 1-based rank of a player, or `None` if they have no score.
    async fn rank(&self, level_id: &str, player_id: &str, metric: ScoreMetric)
    -> Result<Option<usize>>;
}

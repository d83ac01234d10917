//! In-memory ScoreRepository implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::repository::{
    RankedScore, RepositoryError, Result, ScoreEntry, ScoreMetric, ScoreRepository,
};

const METRICS: [ScoreMetric; 2] = [ScoreMetric::TimeMs, ScoreMetric::Moves];

#[derive(Clone, Copy, Debug)]
struct Best {
    value: u64,
    /// Submission counter when this best was set; breaks ties.
    seq: u64,
}

#[derive(Debug, Default)]
struct Board {
    /// (level, player, metric) → best
    best: HashMap<(String, String, ScoreMetric), Best>,
    next_seq: u64,
}

impl Board {
    fn ranking(&self, level_id: &str, metric: ScoreMetric) -> Vec<(&str, Best)> {
        let mut rows: Vec<(&str, Best)> = self
            .best
            .iter()
            .filter(|((level, _, m), _)| level == level_id && *m == metric)
            .map(|((_, player, _), best)| (player.as_str(), *best))
            .collect();
        rows.sort_by_key(|(_, best)| (best.value, best.seq));
        rows
    }
}

/// Leaderboard held in memory.
#[derive(Debug, Default)]
pub struct InMemoryScoreRepository {
    board: RwLock<Board>,
}

impl InMemoryScoreRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScoreRepository for InMemoryScoreRepository {
    async fn submit(&self, entry: &ScoreEntry) -> Result<Vec<ScoreMetric>> {
        let mut board = self
            .board
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        let seq = board.next_seq;
        board.next_seq += 1;

        let mut improved = Vec::new();
        for metric in METRICS {
            let value = entry.value(metric);
            let key = (entry.level_id.clone(), entry.player_id.clone(), metric);
            let better = board.best.get(&key).is_none_or(|best| value < best.value);
            if better {
                board.best.insert(key, Best { value, seq });
                improved.push(metric);
            }
        }
        Ok(improved)
    }

    async fn top(
        &self,
        level_id: &str,
        metric: ScoreMetric,
        limit: usize,
    ) -> Result<Vec<RankedScore>> {
        let board = self
            .board
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(board
            .ranking(level_id, metric)
            .into_iter()
            .take(limit)
            .map(|(player, best)| RankedScore {
                player_id: player.to_owned(),
                value: best.value,
            })
            .collect())
    }

    async fn rank(
        &self,
        level_id: &str,
        player_id: &str,
        metric: ScoreMetric,
    ) -> Result<Option<usize>> {
        let board = self
            .board
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(board
            .ranking(level_id, metric)
            .iter()
            .position(|(player, _)| *player == player_id)
            .map(|index| index + 1))
    }
}

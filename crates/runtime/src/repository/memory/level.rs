//! In-memory LevelRepository implementation.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use escape_core::LevelDocument;

use crate::repository::{LevelRepository, RepositoryError, Result};

/// Levels held in a map, keyed by id.
#[derive(Debug, Default)]
pub struct InMemoryLevelRepository {
    levels: RwLock<BTreeMap<String, LevelDocument>>,
}

impl InMemoryLevelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with one level already stored.
    pub fn with_level(id: impl Into<String>, level: LevelDocument) -> Self {
        let mut levels = BTreeMap::new();
        levels.insert(id.into(), level);
        Self {
            levels: RwLock::new(levels),
        }
    }
}

#[async_trait]
impl LevelRepository for InMemoryLevelRepository {
    async fn load(&self, id: &str) -> Result<Option<LevelDocument>> {
        let levels = self
            .levels
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(levels.get(id).cloned())
    }

    async fn save(&self, id: &str, level: &LevelDocument) -> Result<()> {
        let mut levels = self
            .levels
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        levels.insert(id.to_owned(), level.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let levels = self
            .levels
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(levels.keys().cloned().collect())
    }
}

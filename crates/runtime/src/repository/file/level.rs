//! Level repository backed by the content directory.

use std::path::PathBuf;

use async_trait::async_trait;

use escape_content::{ContentFactory, LevelLoader};
use escape_core::LevelDocument;

use crate::repository::{LevelRepository, RepositoryError, Result};

/// Reads levels from `data_dir/levels/` (RON or JSON) and saves new ones as
/// JSON next to them.
pub struct FileLevelRepository {
    factory: ContentFactory,
}

impl FileLevelRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            factory: ContentFactory::new(data_dir),
        }
    }

    fn levels_dir(&self) -> PathBuf {
        self.factory.data_dir().join(ContentFactory::LEVELS_DIR)
    }

    fn check_id(id: &str) -> Result<()> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(())
        } else {
            Err(RepositoryError::InvalidId(id.to_owned()))
        }
    }
}

#[async_trait]
impl LevelRepository for FileLevelRepository {
    async fn load(&self, id: &str) -> Result<Option<LevelDocument>> {
        Self::check_id(id)?;
        let Ok(path) = self.factory.level_path(id) else {
            return Ok(None);
        };
        let level = LevelLoader::load(&path)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        tracing::debug!("Loaded level '{}' from {}", id, path.display());
        Ok(Some(level))
    }

    async fn save(&self, id: &str, level: &LevelDocument) -> Result<()> {
        Self::check_id(id)?;
        let dir = self.levels_dir();
        tokio::fs::create_dir_all(&dir).await?;

        let json =
            LevelLoader::to_json(level).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let path = dir.join(format!("{id}.json"));
        let temp_path = path.with_extension("json.tmp");

        tokio::fs::write(&temp_path, json).await?;
        // Atomic rename
        tokio::fs::rename(&temp_path, &path).await?;

        tracing::debug!("Saved level '{}' to {}", id, path.display());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>> {
        if !self.levels_dir().is_dir() {
            return Ok(Vec::new());
        }
        self.factory
            .list_levels()
            .map_err(|e| RepositoryError::Io(std::io::Error::other(e.to_string())))
    }
}

//! Content factory for loading levels and tuning from a data directory.

use std::path::{Path, PathBuf};

use escape_core::{LevelDocument, SessionConfig};

use crate::loaders::{ConfigLoader, LevelFormat, LevelLoader, LoadResult};

/// Loads session content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── session.toml
/// └── levels/
///     ├── cellar.ron
///     └── boiler_room.json
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub const CONFIG_FILE: &'static str = "session.toml";
    pub const LEVELS_DIR: &'static str = "levels";

    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load session tuning from `session.toml`, or defaults when the file is absent.
    pub fn load_config(&self) -> LoadResult<SessionConfig> {
        let path = self.data_dir.join(Self::CONFIG_FILE);
        if !path.exists() {
            return Ok(SessionConfig::default());
        }
        ConfigLoader::load(&path)
    }

    /// Path of the level file for `id`, trying each supported extension.
    pub fn level_path(&self, id: &str) -> LoadResult<PathBuf> {
        let levels = self.data_dir.join(Self::LEVELS_DIR);
        LevelFormat::EXTENSIONS
            .iter()
            .map(|ext| levels.join(format!("{id}.{ext}")))
            .find(|path| path.is_file())
            .ok_or_else(|| anyhow::anyhow!("Level '{}' not found in {}", id, levels.display()))
    }

    pub fn load_level(&self, id: &str) -> LoadResult<LevelDocument> {
        LevelLoader::load(&self.level_path(id)?)
    }

    /// Ids of every level file in `levels/`, sorted.
    pub fn list_levels(&self) -> LoadResult<Vec<String>> {
        let levels = self.data_dir.join(Self::LEVELS_DIR);
        let entries = std::fs::read_dir(&levels)
            .map_err(|e| anyhow::anyhow!("Failed to list levels in {}: {}", levels.display(), e))?;

        let mut ids: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| LevelFormat::from_path(path).is_ok())
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_owned))
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

//! Level document loader.
//!
//! Levels authored on disk use RON; levels fetched from a remote store
//! arrive as JSON. Both decode into the same [`LevelDocument`].

use std::path::Path;

use escape_core::LevelDocument;

use crate::loaders::{LoadResult, read_file};

/// On-disk encoding of a level document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LevelFormat {
    Ron,
    Json,
}

impl LevelFormat {
    pub const EXTENSIONS: [&'static str; 2] = ["ron", "json"];

    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> LoadResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| anyhow::anyhow!("Level file {} has no extension", path.display()))?;
        extension
            .parse()
            .map_err(|_| anyhow::anyhow!("Unsupported level format '{}' ({})", extension, path.display()))
    }
}

/// Loader for level documents.
pub struct LevelLoader;

impl LevelLoader {
    /// Load a level, picking the format from the file extension.
    pub fn load(path: &Path) -> LoadResult<LevelDocument> {
        let format = LevelFormat::from_path(path)?;
        let content = read_file(path)?;
        Self::parse(&content, format)
            .map_err(|e| anyhow::anyhow!("Failed to load level {}: {}", path.display(), e))
    }

    pub fn parse(content: &str, format: LevelFormat) -> LoadResult<LevelDocument> {
        match format {
            LevelFormat::Ron => ron::from_str(content)
                .map_err(|e| anyhow::anyhow!("Failed to parse level RON: {}", e)),
            LevelFormat::Json => serde_json::from_str(content)
                .map_err(|e| anyhow::anyhow!("Failed to parse level JSON: {}", e)),
        }
    }

    pub fn to_json(level: &LevelDocument) -> LoadResult<String> {
        serde_json::to_string(level).map_err(|e| anyhow::anyhow!("Failed to encode level: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escape_core::{MissionKind, Position};
    use std::io::Write;

    const JSON_LEVEL: &str = r#"{
        "name": "Boiler room",
        "grid": [
            [{"type": "start"}, {"type": "floor"}, {"floor": {"type": "floor"}, "object": {"type": "fire"}}],
            [{"type": "wall"}, {"type": "floor"}, {"type": "exit"}]
        ],
        "missions": [{"type": "extinguish", "description": "Put out the fire"}],
        "lives": 2
    }"#;

    #[test]
    fn json_level_loads_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(JSON_LEVEL.as_bytes()).unwrap();

        let level = LevelLoader::load(file.path()).unwrap();

        assert_eq!(level.name, "Boiler room");
        assert_eq!(level.grid.dimensions().width, 3);
        assert_eq!(level.missions[0].kind, MissionKind::Extinguish);
        assert_eq!(level.spawn_position(), Position::ORIGIN);
        assert_eq!(level.lives, Some(2));
    }

    #[test]
    fn ron_level_parses() {
        let level = LevelLoader::parse(
            r#"(
                name: "Closet",
                grid: [[{"type": "floor"}, {"type": "exit"}]],
                spawn: Some((x: 0, y: 0)),
            )"#,
            LevelFormat::Ron,
        )
        .unwrap();

        assert_eq!(level.grid.dimensions().height, 1);
        assert_eq!(level.spawn, Some(Position::ORIGIN));
    }

    #[test]
    fn ragged_grid_is_rejected() {
        let err = LevelLoader::parse(
            r#"{"grid": [[{"type": "floor"}], [{"type": "floor"}, {"type": "floor"}]]}"#,
            LevelFormat::Json,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Failed to parse level JSON"));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(LevelFormat::from_path(Path::new("level.yaml")).is_err());
        assert_eq!(LevelFormat::from_path(Path::new("a/b.RON")).unwrap(), LevelFormat::Ron);
    }

    #[test]
    fn json_round_trip_preserves_level() {
        let level = LevelLoader::parse(JSON_LEVEL, LevelFormat::Json).unwrap();
        let encoded = LevelLoader::to_json(&level).unwrap();
        assert_eq!(LevelLoader::parse(&encoded, LevelFormat::Json).unwrap(), level);
    }
}

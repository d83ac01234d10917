//! Session tuning loader.

use std::path::Path;

use escape_core::SessionConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for session tuning from TOML files.
///
/// Every key is optional; missing keys keep their defaults.
///
/// ```toml
/// move_cooldown_ms = 150
/// hazard_interval_ms = 5000
/// hazard_cooldown_scope = "per_tile"
/// ```
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load(path: &Path) -> LoadResult<SessionConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<SessionConfig> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escape_core::HazardCooldownScope;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "move_cooldown_ms = 200\nhazard_cooldown_scope = \"shared\"").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();

        assert_eq!(config.move_cooldown_ms, 200);
        assert_eq!(config.hazard_cooldown_scope, HazardCooldownScope::Shared);
        assert_eq!(config.hazard_interval_ms, SessionConfig::DEFAULT_HAZARD_INTERVAL_MS);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ConfigLoader::load(Path::new("/nonexistent/session.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/session.toml"));
    }
}

//! Theme lookup by name.

use std::collections::HashMap;
use std::sync::Arc;

use escape_core::{BasicTheme, Theme};

/// Name → theme table consulted when a level names its theme.
///
/// Unknown or missing names resolve to the generic [`BasicTheme`] so a level
/// always loads, with generic walkability and no interactions.
#[derive(Clone)]
pub struct ThemeRegistry {
    themes: HashMap<String, Arc<dyn Theme>>,
    fallback: Arc<dyn Theme>,
}

impl ThemeRegistry {
    pub fn new() -> Self {
        let fallback: Arc<dyn Theme> = Arc::new(BasicTheme);
        let mut themes = HashMap::new();
        themes.insert(fallback.name().to_owned(), Arc::clone(&fallback));
        Self { themes, fallback }
    }

    /// Registers a theme under its own name, replacing any previous entry.
    pub fn register(&mut self, theme: Arc<dyn Theme>) {
        self.themes.insert(theme.name().to_owned(), theme);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Theme>> {
        self.themes.get(name).cloned()
    }

    pub fn resolve(&self, name: Option<&str>) -> Arc<dyn Theme> {
        name.and_then(|name| self.get(name))
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.themes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ThemeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeRegistry")
            .field("themes", &self.names())
            .finish()
    }
}

//! Level content and session tuning loaders.
//!
//! This crate turns data files into the inputs an `escape-core` session is
//! built from:
//! - Level documents (RON on disk, JSON from remote stores)
//! - Session tuning (TOML)
//! - Theme resolution by name
//!
//! Loaded content is immutable for the lifetime of a session.

pub mod themes;

#[cfg(feature = "loaders")]
pub mod loaders;

pub use themes::ThemeRegistry;

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, ContentFactory, LevelFormat, LevelLoader, LoadResult};

//! File-based repository implementations.

mod level;

pub use level::FileLevelRepository;

//! Persistence Module
//!
//! Resumable build progress. One JSON cache per agent, keyed by a hash of
//! everything that decides which voxels the agent builds.

pub mod build_cache_data;
pub mod build_cache_operations;

pub use build_cache_data::{BuildCache, CacheStatus, CacheTotals, DebugCounters};
pub use build_cache_operations::{
    begin_palette, cache_path, config_hash, load_cache, mark_finished, mark_started, new_cache,
    now_millis, progress_percent, reconcile_cache, save_cache, BUILD_CACHE_FILE,
};

pub type PersistenceResult<T> = Result<T, PersistenceError>;

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Save failed for {path}: {error}")]
    SaveFailed { path: String, error: String },
    #[error("Load failed for {path}: {error}")]
    LoadFailed { path: String, error: String },
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::IoError(err.to_string())
    }
}

//! Build Cache Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in build_cache_operations.rs

use glam::IVec3;
use serde::{Deserialize, Serialize};

/// Persisted scheduler position of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildCache {
    /// Hash of the inputs that decide which voxels this agent builds
    pub config_hash: String,
    pub placed_blocks: u64,
    /// `placed_blocks` when the current palette pass began; a resumed run
    /// recounts the pass from here against the world
    #[serde(default)]
    pub palette_base_placed: Option<u64>,
    /// Schedulable voxels in this worker's strip
    pub total_blocks: u64,
    /// Schedulable voxels in the whole work region, across all workers
    pub region_total_blocks: u64,
    pub total_layers: i32,
    pub current_layer: i32,
    /// Position in the current layer's ordered palette
    pub current_palette: usize,
    /// Unix milliseconds
    pub start_time: Option<i64>,
    /// Set once the run completed; a finished cache is never rebuilt
    pub end_time: Option<i64>,
    /// Schematic-relative corners of this worker's scope
    pub origin: IVec3,
    pub destination: IVec3,
    /// Absolute world corners of this worker's scope
    pub placement_origin: IVec3,
    pub placement_destination: IVec3,
    #[serde(default)]
    pub debug: DebugCounters,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugCounters {
    /// Resumes of an unfinished build
    pub disconnect_count: u64,
    /// Time spent in nearest-candidate queries
    pub find_next_total_ms: u64,
    pub restock_count: u64,
    pub restock_take_time_ms: u64,
    pub place_count: u64,
}

/// How the loaded cache relates to the current configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// No cache on disk
    Fresh,
    /// Stored hash differed; counters reset
    Reset,
    /// Stored hash matched; cursors restored
    Resumed,
    /// Stored hash matched and the build already completed
    Finished,
}

/// Values recomputed from the schematic for the active partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTotals {
    pub total_blocks: u64,
    pub region_total_blocks: u64,
    pub total_layers: i32,
    pub origin: IVec3,
    pub destination: IVec3,
    pub placement_origin: IVec3,
    pub placement_destination: IVec3,
}

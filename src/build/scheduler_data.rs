//! Scheduler Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in scheduler_operations.rs

use super::candidate_index_data::CandidateIndex;
use super::control::RunControl;
use super::partition::{WorkRegion, WorkerAssignment, WorkerScope};
use super::verification::VerificationReport;
use crate::constants::{placement, scheduler};
use crate::navigation::PathfinderConfig;
use crate::persistence::{CacheStatus, DebugCounters};
use crate::world::{BlockChangeReceiver, BlockEquivalence, MaterialRequest};
use glam::IVec3;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Iteration strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Bottom-to-top, one horizontal layer at a time
    #[default]
    Building,
    /// Flat map art: the whole volume is one layer
    Mapart,
}

/// Runtime settings of one build run
#[derive(Debug, Clone)]
pub struct BuildSettings {
    pub mode: BuildMode,
    /// Hash of the inputs that decide which voxels this agent builds
    pub config_hash: String,
    /// Absolute world position of schematic voxel (0, 0, 0)
    pub placement_origin: IVec3,
    /// `None` covers the whole schematic
    pub work_region: Option<WorkRegion>,
    pub worker: WorkerAssignment,
    pub skip_blocks: Vec<String>,
    pub equivalence: BlockEquivalence,
    pub cooldown: Duration,
    pub pause_poll: Duration,
    pub verification_rounds: u32,
    pub settle_delay: Duration,
    pub max_material_retries: u32,
    pub max_place_attempts: u32,
    pub yield_interval: u64,
    pub pathfinder: PathfinderConfig,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            mode: BuildMode::Building,
            config_hash: String::new(),
            placement_origin: IVec3::ZERO,
            work_region: None,
            worker: WorkerAssignment::default(),
            skip_blocks: placement::DEFAULT_SKIP_BLOCKS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            equivalence: BlockEquivalence::default(),
            cooldown: placement::BUILDING_COOLDOWN,
            pause_poll: scheduler::PAUSE_POLL,
            verification_rounds: scheduler::VERIFICATION_ROUNDS,
            settle_delay: scheduler::SETTLE_DELAY,
            max_material_retries: placement::MAX_MATERIAL_RETRIES,
            max_place_attempts: placement::MAX_PLACE_ATTEMPTS,
            yield_interval: scheduler::YIELD_INTERVAL,
            pathfinder: PathfinderConfig::default(),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    Completed,
    /// Stop requested; the cache holds the resume point
    Stopped,
    /// The cache already marked this build as finished
    AlreadyFinished,
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub status: BuildStatus,
    pub cache_status: CacheStatus,
    pub placed: u64,
    pub total: u64,
    /// Placement attempts of the main loop
    pub attempts: u64,
    /// Placement actions issued by the main loop
    pub issued: u64,
    pub verification: Option<VerificationReport>,
    pub debug: DebugCounters,
}

/// Read-only view of a running build
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressSnapshot {
    pub placed: u64,
    pub total: u64,
    pub current_layer: i32,
    pub total_layers: i32,
    pub current_material: Option<String>,
    pub paused: bool,
    pub finished: bool,
}

/// Shared progress, written by the scheduler and read by observers
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    pub inner: Arc<RwLock<ProgressSnapshot>>,
}

/// Everything shared with the outside while a run is going
#[derive(Debug, Clone, Default)]
pub struct BuildHandles {
    pub control: RunControl,
    pub progress: ProgressHandle,
    pub notifications: Option<BlockChangeReceiver>,
}

/// Palette pass in progress
#[derive(Debug, Clone)]
pub struct PalettePass {
    pub pid: u16,
    pub index: CandidateIndex,
    /// Materials of the entries after this one in the layer
    pub upcoming: Vec<MaterialRequest>,
    pub shortfall_streak: u32,
    /// Issued or unloaded attempts per candidate
    pub attempts: FxHashMap<usize, u32>,
}

/// Cursor state between scheduler iterations
#[derive(Debug, Clone)]
pub struct SchedulerState {
    pub scope: WorkerScope,
    pub total_layers: i32,
    /// Ordered palette of the current layer, computed on entry
    pub layer_palette: Option<Vec<u16>>,
    /// Voxel count per palette id in the current layer
    pub layer_counts: FxHashMap<u16, u32>,
    pub pass: Option<PalettePass>,
    pub iterations: u64,
    pub find_next_time: Duration,
    /// Counters carried over from earlier sessions
    pub debug_base: DebugCounters,
}

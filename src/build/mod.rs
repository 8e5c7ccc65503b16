//! Build scheduling
//!
//! Decides which voxel to build next (layer, then palette entry, then
//! nearest candidate), places it, and repairs whatever is still wrong once
//! every layer has been walked.

pub mod candidate_index_data;
pub mod candidate_index_operations;
pub mod control;
pub mod cooldown;
pub mod palette_order;
pub mod partition;
pub mod placement_data;
pub mod placement_operations;
pub mod scheduler_data;
pub mod scheduler_operations;
pub mod verification;

pub use candidate_index_data::{CandidateIndex, NearestQuery};
pub use candidate_index_operations::{
    build_index, candidate_count, nearest_candidate, remove_candidate,
};
pub use control::RunControl;
pub use cooldown::CooldownWindow;
pub use palette_order::order_palette;
pub use partition::{all_strips, worker_strip, WorkRegion, WorkerAssignment, WorkerScope};
pub use placement_data::{
    DeferReason, MaterialDemand, Orientation, PlacementEngine, PlacementOutcome, PlacementStats,
    PlacementTarget, RestockPlan,
};
pub use placement_operations::{
    attempt_place, create_engine, ensure_held, move_within_reach, orientation_for, plan_restock,
};
pub use scheduler_data::{
    BuildHandles, BuildMode, BuildReport, BuildSettings, BuildStatus, ProgressHandle,
    ProgressSnapshot,
};
pub use scheduler_operations::{
    compute_totals, progress_snapshot, resolve_region, run_build, snapshot_percent,
};
pub use verification::{collect_mismatches, verify_and_repair, VerificationPlan, VerificationReport};

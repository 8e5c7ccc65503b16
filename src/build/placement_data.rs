//! Placement Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in placement_operations.rs

use super::cooldown::CooldownWindow;
use crate::world::{BlockEquivalence, MaterialRequest};
use glam::{IVec3, Vec3};
use std::time::Duration;

/// Why a candidate was not confirmed on this attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    /// A placement is already in flight for this candidate
    InCooldown,
    /// Placement issued now; confirmation comes later
    Issued,
    /// World query returned nothing; retried after the cooldown
    UnloadedRegion,
}

/// Outcome of one placement attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// World already shows the target block
    Placed,
    Deferred(DeferReason),
    /// Material could not be obtained; the candidate stays in the set
    MaterialShortfall { item: String, shortfall: u32 },
}

/// Packet fields derived from block properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub direction: u8,
    pub cursor: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            direction: 0,
            cursor: Vec3::splat(0.5),
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

/// One voxel to place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementTarget {
    /// Schematic linear index
    pub id: usize,
    /// Absolute world position
    pub position: IVec3,
    pub pid: u16,
}

/// What the scheduler still needs, used to size withdrawals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialDemand {
    /// Voxels of the current palette entry not yet confirmed
    pub remaining: u32,
    /// Materials of the palette entries that follow, in build order
    pub upcoming: Vec<MaterialRequest>,
}

/// Withdraw/prefetch plan for a missing item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestockPlan {
    pub withdraw: u32,
    pub prefetch: Vec<MaterialRequest>,
}

/// Counters for one engine lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementStats {
    pub attempts: u64,
    pub issued: u64,
    pub already_placed: u64,
    pub unloaded: u64,
    pub shortfalls: u64,
    pub restock_count: u64,
    pub restock_time: Duration,
}

/// State the placement engine keeps between attempts
#[derive(Debug, Clone)]
pub struct PlacementEngine {
    pub cooldown: CooldownWindow,
    pub equivalence: BlockEquivalence,
    pub stats: PlacementStats,
}

//! Pathfinder Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in pathfinder_operations.rs

use crate::constants::navigation as nav;
use glam::{IVec3, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Ordering;
use std::time::Duration;

/// One node of a bounded search
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub coord: IVec3,
    /// Hop count from the search start
    pub g: u32,
    /// Euclidean distance to the target
    pub h: f32,
    pub f: f32,
    pub step_count: u32,
    /// Arena index of the parent node
    pub parent: Option<usize>,
}

/// Node storage of one search call, dropped when the call returns
#[derive(Debug, Default)]
pub struct SearchArena {
    pub nodes: Vec<SearchNode>,
    pub by_coord: FxHashMap<IVec3, usize>,
    pub closed: FxHashSet<IVec3>,
}

/// Open-set entry: lowest `f` first, then insertion order
#[derive(Debug, Clone, Copy)]
pub struct OpenEntry {
    pub f: f32,
    pub seq: u64,
    pub node: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    // BinaryHeap is a max-heap, so both keys are reversed
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Why a bounded search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTermination {
    /// Popped a node at the target cell
    Arrived,
    /// Popped a node at the hop budget
    StepBudget,
    /// Open set ran dry; the best node found is used
    Exhausted,
    /// Expansion cap hit; the best node found is used
    ExpansionCap,
    /// Wall-clock deadline hit; the best node found is used
    Deadline,
}

/// Result of one bounded search call
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Cells to visit after the start cell, at most `step_budget` long
    pub path: Vec<IVec3>,
    /// Cell the path ends in
    pub reached: IVec3,
    /// Closest-to-target cell seen during the search
    pub best: IVec3,
    pub termination: SearchTermination,
    pub expanded: usize,
}

/// Result of one navigate-towards call
#[derive(Debug, Clone)]
pub struct NavigationReport {
    /// Target actually used; differs from the request when it was obstructed
    pub target: IVec3,
    pub final_position: Vec3,
    pub arrived: bool,
    pub search_calls: u32,
    pub nudges: u32,
    pub timed_out: bool,
    pub elapsed: Duration,
}

/// Search and movement limits
#[derive(Debug, Clone)]
pub struct PathfinderConfig {
    pub step_budget: u32,
    pub max_expansions: usize,
    pub search_deadline: Duration,
    pub navigation_deadline: Duration,
    pub max_search_calls: u32,
    pub yield_interval: usize,
    pub stuck_threshold: u32,
    pub stuck_nudge: f32,
    pub hop_interval: Duration,
    pub alternate_radius_start: i32,
    pub alternate_radius_max: i32,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            step_budget: nav::STEP_BUDGET,
            max_expansions: nav::MAX_EXPANSIONS,
            search_deadline: nav::SEARCH_DEADLINE,
            navigation_deadline: nav::NAVIGATION_DEADLINE,
            max_search_calls: nav::MAX_SEARCH_CALLS,
            yield_interval: nav::YIELD_INTERVAL,
            stuck_threshold: nav::STUCK_THRESHOLD,
            stuck_nudge: nav::STUCK_NUDGE,
            hop_interval: nav::HOP_INTERVAL,
            alternate_radius_start: nav::ALTERNATE_RADIUS_START,
            alternate_radius_max: nav::ALTERNATE_RADIUS_MAX,
        }
    }
}

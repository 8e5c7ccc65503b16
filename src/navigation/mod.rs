//! Local navigation
//!
//! Bounded A* over the 6-connected voxel grid. Each search call is capped in
//! hop depth, expansions and wall-clock time; the driver re-invokes it as
//! the agent advances and always leaves the agent at the best cell it found.

pub mod pathfinder_data;
pub mod pathfinder_operations;

pub use pathfinder_data::{
    NavigationReport, OpenEntry, PathfinderConfig, SearchArena, SearchNode, SearchOutcome,
    SearchTermination,
};
pub use pathfinder_operations::{
    bounded_search, cell_of, find_alternate_target, heuristic, is_walkable, navigate_towards,
    reconstruct_path, replay_path,
};

//! Candidate Index Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in candidate_index_operations.rs

use glam::IVec3;
use rustc_hash::FxHashMap;

/// Not-yet-placed voxels of the palette being built, bucketed by a coarse grid
///
/// Candidate ids are schematic linear indices; positions are absolute world
/// coordinates.
#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    pub bucket_size: i32,
    pub buckets: FxHashMap<IVec3, Vec<usize>>,
    pub positions: FxHashMap<usize, IVec3>,
}

/// Result of a nearest-candidate query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NearestQuery {
    /// Closest candidate not skipped and not already placed
    pub candidate: Option<(usize, IVec3)>,
    /// Candidates dropped because the world already matched
    pub reconciled: Vec<usize>,
    /// Candidates passed over by the skip predicate
    pub skipped: usize,
}

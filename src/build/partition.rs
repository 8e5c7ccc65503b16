//! Work region and worker strips
//!
//! Coordinates are schematic-relative. Several workers split the Z span of
//! one work region into contiguous strips and never touch each other's voxels.

use crate::schematic::SchematicData;
use glam::IVec3;
use serde::{Deserialize, Serialize};

/// Inclusive X/Z rectangle of voxels in scope for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRegion {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}

impl WorkRegion {
    /// Whole X/Z extent of a schematic
    pub fn covering(schematic: &SchematicData) -> Self {
        Self {
            min_x: 0,
            min_z: 0,
            max_x: schematic.size.x - 1,
            max_z: schematic.size.z - 1,
        }
    }

    pub fn z_span(&self) -> i32 {
        self.max_z - self.min_z + 1
    }
}

/// Which worker this agent is among `worker_count`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerAssignment {
    pub worker_id: u32,
    pub worker_count: u32,
}

impl Default for WorkerAssignment {
    fn default() -> Self {
        Self {
            worker_id: 0,
            worker_count: 1,
        }
    }
}

/// Inclusive Z range owned by one worker
///
/// Strips are `ceil(span / count)` wide; the last one may be shorter and,
/// with more workers than rows, trailing workers own nothing (`None`).
pub fn worker_strip(region: &WorkRegion, assignment: WorkerAssignment) -> Option<(i32, i32)> {
    if assignment.worker_count == 0 || assignment.worker_id >= assignment.worker_count {
        return None;
    }
    let span = region.z_span();
    if span <= 0 {
        return None;
    }
    let height = (span as u32).div_ceil(assignment.worker_count) as i32;
    let start = region.min_z + assignment.worker_id as i32 * height;
    let end = region.max_z.min(start + height - 1);
    (start <= end).then_some((start, end))
}

/// Strips of every worker in id order
pub fn all_strips(region: &WorkRegion, worker_count: u32) -> Vec<Option<(i32, i32)>> {
    (0..worker_count)
        .map(|worker_id| {
            worker_strip(
                region,
                WorkerAssignment {
                    worker_id,
                    worker_count,
                },
            )
        })
        .collect()
}

/// Resolved scope of one worker: region X range and strip Z range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerScope {
    pub min_x: i32,
    pub max_x: i32,
    pub min_z: i32,
    pub max_z: i32,
}

impl WorkerScope {
    /// Scope of a worker, `None` when its strip is empty
    pub fn resolve(region: &WorkRegion, assignment: WorkerAssignment) -> Option<Self> {
        let (min_z, max_z) = worker_strip(region, assignment)?;
        Some(Self {
            min_x: region.min_x,
            max_x: region.max_x,
            min_z,
            max_z,
        })
    }

    /// Whether a schematic-relative voxel belongs to this worker
    pub fn contains(&self, pos: IVec3) -> bool {
        (self.min_x..=self.max_x).contains(&pos.x) && (self.min_z..=self.max_z).contains(&pos.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(min_z: i32, max_z: i32) -> WorkRegion {
        WorkRegion {
            min_x: 0,
            min_z,
            max_x: 15,
            max_z,
        }
    }

    #[test]
    fn test_three_even_strips() {
        let strips = all_strips(&region(0, 29), 3);
        assert_eq!(strips, vec![Some((0, 9)), Some((10, 19)), Some((20, 29))]);
    }

    #[test]
    fn test_shorter_final_strip() {
        let strips = all_strips(&region(5, 14), 3);
        assert_eq!(strips, vec![Some((5, 8)), Some((9, 12)), Some((13, 14))]);
    }

    #[test]
    fn test_strips_cover_span_without_overlap() {
        for span in 1..40 {
            for count in 1..12 {
                let r = region(-7, -7 + span - 1);
                let mut owner = vec![0u32; span as usize];
                for (start, end) in all_strips(&r, count).into_iter().flatten() {
                    for z in start..=end {
                        owner[(z - r.min_z) as usize] += 1;
                    }
                }
                assert!(
                    owner.iter().all(|&n| n == 1),
                    "span {} with {} workers: {:?}",
                    span,
                    count,
                    owner
                );
            }
        }
    }

    #[test]
    fn test_more_workers_than_rows() {
        let strips = all_strips(&region(0, 1), 4);
        assert_eq!(strips, vec![Some((0, 0)), Some((1, 1)), None, None]);
    }

    #[test]
    fn test_invalid_assignment_owns_nothing() {
        let r = region(0, 9);
        let bad = WorkerAssignment {
            worker_id: 3,
            worker_count: 3,
        };
        assert_eq!(worker_strip(&r, bad), None);
        assert!(WorkerScope::resolve(&r, bad).is_none());
    }

    #[test]
    fn test_scope_membership() {
        let scope = WorkerScope::resolve(
            &region(0, 29),
            WorkerAssignment {
                worker_id: 1,
                worker_count: 3,
            },
        )
        .expect("non-empty strip");
        assert!(scope.contains(IVec3::new(15, 40, 10)));
        assert!(!scope.contains(IVec3::new(15, 0, 9)));
        assert!(!scope.contains(IVec3::new(16, 0, 12)));
    }
}

//! Candidate Index Operations - Pure DOP Functions
//!
//! Nearest-first selection over bucketed candidates. Buckets are visited in
//! order of their lower-bound distance so most of the set is never touched.

use super::candidate_index_data::{CandidateIndex, NearestQuery};
use crate::constants::placement::{BUCKET_SIZE, NEAR_ENOUGH_SQUARED};
use glam::{IVec3, Vec3};

/// Bucket key of a world position
pub fn bucket_of(pos: IVec3, bucket_size: i32) -> IVec3 {
    pos.div_euclid(IVec3::splat(bucket_size))
}

/// Build an index over `(id, world position)` pairs
pub fn build_index<I>(candidates: I) -> CandidateIndex
where
    I: IntoIterator<Item = (usize, IVec3)>,
{
    let mut index = CandidateIndex {
        bucket_size: BUCKET_SIZE,
        ..Default::default()
    };
    for (id, pos) in candidates {
        insert_candidate(&mut index, id, pos);
    }
    index
}

pub fn insert_candidate(index: &mut CandidateIndex, id: usize, pos: IVec3) {
    if index.positions.insert(id, pos).is_some() {
        return;
    }
    index
        .buckets
        .entry(bucket_of(pos, index.bucket_size))
        .or_default()
        .push(id);
}

/// Remove a candidate; returns whether it was present
pub fn remove_candidate(index: &mut CandidateIndex, id: usize) -> bool {
    let Some(pos) = index.positions.remove(&id) else {
        return false;
    };
    let key = bucket_of(pos, index.bucket_size);
    if let Some(bucket) = index.buckets.get_mut(&key) {
        bucket.retain(|&other| other != id);
        if bucket.is_empty() {
            index.buckets.remove(&key);
        }
    }
    true
}

pub fn candidate_count(index: &CandidateIndex) -> usize {
    index.positions.len()
}

pub fn contains_candidate(index: &CandidateIndex, id: usize) -> bool {
    index.positions.contains_key(&id)
}

pub fn candidate_position(index: &CandidateIndex, id: usize) -> Option<IVec3> {
    index.positions.get(&id).copied()
}

/// Squared distance from a point to the closest point of a bucket
fn bucket_lower_bound(key: IVec3, bucket_size: i32, origin: Vec3) -> f32 {
    let min = (key * bucket_size).as_vec3();
    let max = min + Vec3::splat(bucket_size as f32);
    let closest = origin.clamp(min, max);
    origin.distance_squared(closest)
}

fn voxel_distance_squared(pos: IVec3, origin: Vec3) -> f32 {
    (pos.as_vec3() + Vec3::splat(0.5)).distance_squared(origin)
}

/// Nearest remaining candidate to `origin`
///
/// `already_placed` is the lazy reconciliation check: matching candidates are
/// removed from the index and reported, even while cooling down. `skip`
/// passes over the rest without removing them. A candidate closer than the
/// near-enough radius is taken without scanning further buckets.
pub fn nearest_candidate<S, P>(
    index: &mut CandidateIndex,
    origin: Vec3,
    skip: S,
    mut already_placed: P,
) -> NearestQuery
where
    S: Fn(usize) -> bool,
    P: FnMut(usize, IVec3) -> bool,
{
    let mut order: Vec<(f32, IVec3)> = index
        .buckets
        .keys()
        .map(|&key| (bucket_lower_bound(key, index.bucket_size, origin), key))
        .collect();
    order.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.to_array().cmp(&b.1.to_array())));

    let mut query = NearestQuery::default();
    let mut best: Option<(f32, usize, IVec3)> = None;

    'buckets: for (bound, key) in order {
        if best.is_some_and(|(d, _, _)| bound >= d) {
            break;
        }
        let Some(bucket) = index.buckets.get(&key) else {
            continue;
        };
        for &id in bucket {
            let Some(&pos) = index.positions.get(&id) else {
                continue;
            };
            if already_placed(id, pos) {
                query.reconciled.push(id);
                continue;
            }
            if skip(id) {
                query.skipped += 1;
                continue;
            }
            let d = voxel_distance_squared(pos, origin);
            if best.map_or(true, |(bd, bid, _)| d < bd || (d == bd && id < bid)) {
                best = Some((d, id, pos));
                if d < NEAR_ENOUGH_SQUARED {
                    break 'buckets;
                }
            }
        }
    }

    for &id in &query.reconciled {
        remove_candidate(index, id);
    }
    query.candidate = best.map(|(_, id, pos)| (id, pos));
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> CandidateIndex {
        build_index((0..n).map(|i| (i, IVec3::new(i as i32 * 5, 0, 0))))
    }

    fn linear_nearest(index: &CandidateIndex, origin: Vec3) -> Option<usize> {
        index
            .positions
            .iter()
            .min_by(|a, b| {
                voxel_distance_squared(*a.1, origin)
                    .total_cmp(&voxel_distance_squared(*b.1, origin))
                    .then_with(|| a.0.cmp(b.0))
            })
            .map(|(&id, _)| id)
    }

    #[test]
    fn test_build_and_remove() {
        let mut index = line(10);
        assert_eq!(candidate_count(&index), 10);
        assert!(remove_candidate(&mut index, 3));
        assert!(!remove_candidate(&mut index, 3));
        assert_eq!(candidate_count(&index), 9);
        assert!(!contains_candidate(&index, 3));
        assert_eq!(candidate_position(&index, 4), Some(IVec3::new(20, 0, 0)));
    }

    #[test]
    fn test_empty_buckets_are_dropped() {
        let mut index = build_index([(0, IVec3::new(100, 0, 0)), (1, IVec3::ZERO)]);
        assert_eq!(index.buckets.len(), 2);
        remove_candidate(&mut index, 0);
        assert_eq!(index.buckets.len(), 1);
    }

    #[test]
    fn test_negative_coordinates_bucket_correctly() {
        assert_eq!(bucket_of(IVec3::new(-1, 0, -16), 16), IVec3::new(-1, 0, -1));
        assert_eq!(bucket_of(IVec3::new(15, 0, 16), 16), IVec3::new(0, 0, 1));
    }

    #[test]
    fn test_nearest_matches_linear_scan() {
        let mut index = build_index((0..300).map(|i| {
            let i32i = i as i32;
            (i, IVec3::new((i32i * 37) % 97 - 48, (i32i * 11) % 7, (i32i * 53) % 89 - 44))
        }));
        for origin in [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(-60.0, 3.0, 40.0),
            Vec3::new(200.0, -5.0, -200.0),
        ] {
            let expected_d = linear_nearest(&index, origin)
                .and_then(|id| candidate_position(&index, id))
                .map(|p| voxel_distance_squared(p, origin));
            let got = nearest_candidate(&mut index, origin, |_| false, |_, _| false);
            let got_d = got.candidate.map(|(_, p)| voxel_distance_squared(p, origin));
            if expected_d.is_some_and(|d| d >= NEAR_ENOUGH_SQUARED) {
                assert_eq!(got_d, expected_d);
            } else {
                assert!(got_d.is_some_and(|d| d < NEAR_ENOUGH_SQUARED));
            }
        }
    }

    #[test]
    fn test_skip_leaves_candidate_in_index() {
        let mut index = line(3);
        let query = nearest_candidate(&mut index, Vec3::ZERO, |id| id == 0, |_, _| false);
        assert_eq!(query.candidate.map(|(id, _)| id), Some(1));
        assert_eq!(query.skipped, 1);
        assert!(contains_candidate(&index, 0));
    }

    #[test]
    fn test_already_placed_candidates_are_reconciled() {
        let mut index = line(4);
        let query = nearest_candidate(&mut index, Vec3::ZERO, |_| false, |id, _| id < 2);
        assert_eq!(query.candidate.map(|(id, _)| id), Some(2));
        assert_eq!(query.reconciled, vec![0, 1]);
        assert_eq!(candidate_count(&index), 2);
    }

    #[test]
    fn test_empty_index_yields_nothing() {
        let mut index = build_index(std::iter::empty());
        let query = nearest_candidate(&mut index, Vec3::ZERO, |_| false, |_, _| false);
        assert!(query.candidate.is_none());
        assert!(query.reconciled.is_empty());
    }
}

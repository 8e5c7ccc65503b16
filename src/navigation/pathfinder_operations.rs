//! Pathfinder Operations - Pure DOP Functions
//!
//! Bounded A* over the 6-connected voxel grid plus the outer driving loop
//! that re-invokes it until the agent reaches its target or runs out of time.

use super::pathfinder_data::{
    NavigationReport, OpenEntry, PathfinderConfig, SearchArena, SearchNode, SearchOutcome,
    SearchTermination,
};
use crate::build::control::RunControl;
use crate::constants::navigation::{STAND_OFFSET, STUCK_EPSILON};
use crate::world::{is_passable, AgentPose, WorldQuery};
use glam::{IVec3, Vec3};
use std::collections::BinaryHeap;
use tokio::time::Instant;

const NEIGHBORS: [IVec3; 6] = [
    IVec3::new(0, 1, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(0, 0, -1),
    IVec3::new(0, 0, 1),
    IVec3::new(-1, 0, 0),
    IVec3::new(1, 0, 0),
];

/// Whether the agent can occupy a cell: both the cell and the one above
/// must be loaded and passable
pub fn is_walkable<W: WorldQuery + ?Sized>(world: &W, pos: IVec3) -> bool {
    let passable = |p: IVec3| world.block_at(p).is_some_and(|b| is_passable(&b.name));
    passable(pos) && passable(pos + IVec3::Y)
}

/// Euclidean distance between two cells
pub fn heuristic(from: IVec3, to: IVec3) -> f32 {
    from.as_vec3().distance(to.as_vec3())
}

/// Cell containing a world position
pub fn cell_of(position: Vec3) -> IVec3 {
    position.floor().as_ivec3()
}

fn push_node(
    arena: &mut SearchArena,
    open: &mut BinaryHeap<OpenEntry>,
    seq: &mut u64,
    node: SearchNode,
) {
    let id = arena.nodes.len();
    arena.by_coord.insert(node.coord, id);
    open.push(OpenEntry {
        f: node.f,
        seq: *seq,
        node: id,
    });
    arena.nodes.push(node);
    *seq += 1;
}

/// Walk parent indices back from `end`, excluding the start cell
pub fn reconstruct_path(arena: &SearchArena, end: usize) -> Vec<IVec3> {
    let mut path = Vec::new();
    let mut cursor = end;
    while let Some(parent) = arena.nodes[cursor].parent {
        path.push(arena.nodes[cursor].coord);
        cursor = parent;
    }
    path.reverse();
    path
}

/// One bounded A* search
///
/// Never fails: when the target cannot be reached inside the hop budget,
/// expansion cap or deadline, the path to the closest cell found is returned.
pub async fn bounded_search<F>(
    start: IVec3,
    target: IVec3,
    walkable: F,
    config: &PathfinderConfig,
) -> SearchOutcome
where
    F: Fn(IVec3) -> bool,
{
    let started = Instant::now();
    let mut arena = SearchArena::default();
    let mut open = BinaryHeap::new();
    let mut seq = 0u64;

    let h = heuristic(start, target);
    push_node(
        &mut arena,
        &mut open,
        &mut seq,
        SearchNode {
            coord: start,
            g: 0,
            h,
            f: h,
            step_count: 0,
            parent: None,
        },
    );

    let mut best = 0usize;
    let mut iterations = 0usize;
    let mut expanded = 0usize;

    let (end, termination) = loop {
        let Some(entry) = open.pop() else {
            break (best, SearchTermination::Exhausted);
        };

        iterations += 1;
        if config.yield_interval > 0 && iterations % config.yield_interval == 0 {
            tokio::task::yield_now().await;
        }
        if started.elapsed() > config.search_deadline {
            break (best, SearchTermination::Deadline);
        }

        let current = entry.node;
        let node = arena.nodes[current].clone();
        // Superseded by a cheaper entry for the same cell
        if entry.f > node.f || !arena.closed.insert(node.coord) {
            continue;
        }

        if node.h < arena.nodes[best].h {
            best = current;
        }
        if node.h < 1.0 {
            break (current, SearchTermination::Arrived);
        }
        if node.step_count >= config.step_budget {
            break (current, SearchTermination::StepBudget);
        }
        if expanded >= config.max_expansions {
            break (best, SearchTermination::ExpansionCap);
        }
        expanded += 1;

        for dir in NEIGHBORS {
            let next = node.coord + dir;
            if arena.closed.contains(&next) || !walkable(next) {
                continue;
            }
            let g = node.g + 1;
            let h = heuristic(next, target);
            match arena.by_coord.get(&next).copied() {
                Some(existing) if arena.nodes[existing].g <= g => {}
                Some(existing) => {
                    let slot = &mut arena.nodes[existing];
                    slot.g = g;
                    slot.f = g as f32 + h;
                    slot.step_count = node.step_count + 1;
                    slot.parent = Some(current);
                    open.push(OpenEntry {
                        f: slot.f,
                        seq,
                        node: existing,
                    });
                    seq += 1;
                }
                None => push_node(
                    &mut arena,
                    &mut open,
                    &mut seq,
                    SearchNode {
                        coord: next,
                        g,
                        h,
                        f: g as f32 + h,
                        step_count: node.step_count + 1,
                        parent: Some(current),
                    },
                ),
            }
        }
    };

    SearchOutcome {
        path: reconstruct_path(&arena, end),
        reached: arena.nodes[end].coord,
        best: arena.nodes[best].coord,
        termination,
        expanded,
    }
}

/// Nearest open column around an obstructed target
///
/// Scans a cube of `radius` around `target` for a walkable cell and returns
/// the closest one; ties keep scan order.
pub fn find_alternate_target<W: WorldQuery + ?Sized>(
    world: &W,
    target: IVec3,
    radius: i32,
) -> Option<IVec3> {
    let mut best: Option<(f32, IVec3)> = None;
    for dy in -radius..=radius {
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                let candidate = target + IVec3::new(dx, dy, dz);
                let distance = heuristic(target, candidate);
                if distance > radius as f32 {
                    continue;
                }
                if best.is_some_and(|(d, _)| d <= distance) {
                    continue;
                }
                if is_walkable(world, candidate) {
                    best = Some((distance, candidate));
                }
            }
        }
    }
    best.map(|(_, pos)| pos)
}

/// Move the agent along a path, one hop per `hop_interval`
pub async fn replay_path<A: AgentPose + ?Sized>(
    agent: &mut A,
    path: &[IVec3],
    config: &PathfinderConfig,
) {
    let offset = Vec3::from(STAND_OFFSET);
    for cell in path {
        agent.move_to(cell.as_vec3() + offset);
        tokio::time::sleep(config.hop_interval).await;
    }
}

/// Drive the agent towards a target cell with repeated bounded searches
///
/// Soft on every failure: on timeout, stop or an unreachable target the
/// agent simply stays wherever the last search left it.
pub async fn navigate_towards<A>(
    agent: &mut A,
    target: IVec3,
    config: &PathfinderConfig,
    control: &RunControl,
) -> NavigationReport
where
    A: WorldQuery + AgentPose + ?Sized,
{
    let started = Instant::now();
    let mut report = NavigationReport {
        target,
        final_position: agent.current_position(),
        arrived: false,
        search_calls: 0,
        nudges: 0,
        timed_out: false,
        elapsed: Default::default(),
    };

    if report.final_position.distance(target.as_vec3()) < 0.5 {
        report.arrived = true;
        return report;
    }

    let mut target_checked = false;
    let mut radius = config.alternate_radius_start;
    let mut last_position = agent.current_position();
    let mut stuck = 0u32;

    while report.search_calls < config.max_search_calls {
        if control.is_stopped() {
            break;
        }

        if !target_checked {
            if let Some(block) = agent.block_at(report.target) {
                target_checked = true;
                if !is_passable(&block.name) {
                    log::warn!(
                        "[Pathfinder] Target {} blocked by {}, searching radius {}",
                        report.target,
                        block.name,
                        radius
                    );
                    match find_alternate_target(&*agent, report.target, radius) {
                        Some(alternate) => report.target = alternate,
                        None => {
                            radius = (radius + 1).min(config.alternate_radius_max);
                            target_checked = false;
                        }
                    }
                }
            }
        }

        let here = cell_of(agent.current_position());
        if heuristic(here, report.target) < 1.0 {
            report.arrived = true;
            break;
        }

        let position = agent.current_position();
        if last_position.distance(position) < STUCK_EPSILON {
            stuck += 1;
            if stuck > config.stuck_threshold {
                log::error!("[Pathfinder] Stuck at {}, forcing a vertical nudge", here);
                agent.move_to(position + Vec3::new(0.0, config.stuck_nudge, 0.0));
                report.nudges += 1;
                stuck = 0;
            }
        } else {
            stuck = 0;
        }
        last_position = agent.current_position();

        let outcome = {
            let world = &*agent;
            bounded_search(here, report.target, |p| is_walkable(world, p), config).await
        };
        replay_path(agent, &outcome.path, config).await;
        report.search_calls += 1;

        if started.elapsed() > config.navigation_deadline {
            log::warn!(
                "[Pathfinder] Navigation timed out after {:?}, stopping at {}",
                config.navigation_deadline,
                cell_of(agent.current_position())
            );
            report.timed_out = true;
            break;
        }
    }

    report.final_position = agent.current_position();
    report.elapsed = started.elapsed();
    log::debug!(
        "[Pathfinder] {} -> {} in {:?} ({} searches, arrived: {})",
        cell_of(last_position),
        report.target,
        report.elapsed,
        report.search_calls,
        report.arrived
    );
    report
}

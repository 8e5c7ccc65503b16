//! Post-build verification and repair
//!
//! Re-walks the worker's scope after the main loop, groups mismatches by
//! palette id and feeds them back through the placement engine for a
//! bounded number of rounds.

use super::control::RunControl;
use super::partition::WorkerScope;
use super::placement_data::{MaterialDemand, PlacementEngine, PlacementOutcome, PlacementTarget};
use super::placement_operations::{attempt_place, move_within_reach};
use crate::constants::schematic::AIR_PID;
use crate::navigation::PathfinderConfig;
use crate::schematic::{self, SchematicData};
use crate::world::{BlockCheck, BuildAgent, MaterialLogistics, WorldQuery};
use glam::IVec3;
use std::time::Duration;

/// Mismatches found by one scan
#[derive(Debug, Clone, Default)]
pub struct MismatchScan {
    /// Sorted by palette id, then by voxel index
    pub mismatched: Vec<PlacementTarget>,
    /// Voxels whose region was not loaded
    pub unknown: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    /// Repair rounds performed
    pub rounds: u32,
    pub repair_attempts: u64,
    /// Mismatched plus unverifiable voxels left after the last round
    pub residual: usize,
}

/// Parameters shared by every verification round
#[derive(Debug, Clone)]
pub struct VerificationPlan<'a> {
    pub schematic: &'a SchematicData,
    pub scope: WorkerScope,
    pub placement_origin: IVec3,
    pub skip_blocks: &'a [String],
    pub rounds: u32,
    pub settle_delay: Duration,
    pub pathfinder: &'a PathfinderConfig,
}

fn is_scheduled(plan: &VerificationPlan<'_>, pid: u16) -> bool {
    pid != AIR_PID
        && schematic::palette_entry(plan.schematic, pid)
            .is_some_and(|entry| !plan.skip_blocks.contains(&entry.name))
}

/// Compare every scheduled voxel in scope against the world
pub fn collect_mismatches<W: WorldQuery + ?Sized>(
    world: &W,
    engine: &PlacementEngine,
    plan: &VerificationPlan<'_>,
) -> MismatchScan {
    let mut scan = MismatchScan::default();
    let size = plan.schematic.size;
    for y in 0..size.y {
        for z in plan.scope.min_z..=plan.scope.max_z {
            for x in plan.scope.min_x..=plan.scope.max_x {
                let rel = IVec3::new(x, y, z);
                let Some(id) = schematic::index(plan.schematic, rel) else {
                    continue;
                };
                let pid = schematic::block_pid_by_index(plan.schematic, id);
                if !is_scheduled(plan, pid) {
                    continue;
                }
                let Some(entry) = schematic::palette_entry(plan.schematic, pid) else {
                    continue;
                };
                let position = plan.placement_origin + rel;
                match engine
                    .equivalence
                    .check(world.block_at(position).as_ref(), &entry.name)
                {
                    BlockCheck::Matches => {}
                    BlockCheck::Unknown => scan.unknown += 1,
                    BlockCheck::Mismatch => scan.mismatched.push(PlacementTarget {
                        id,
                        position,
                        pid,
                    }),
                }
            }
        }
    }
    scan.mismatched.sort_by_key(|target| (target.pid, target.id));
    scan
}

/// Repair mismatches for at most `plan.rounds` rounds
///
/// The first scan waits one settle delay so placements still in flight
/// from the main loop can land. Always terminates; whatever is still wrong
/// afterwards is reported as the residual count.
pub async fn verify_and_repair<A, L>(
    engine: &mut PlacementEngine,
    agent: &mut A,
    logistics: &L,
    plan: &VerificationPlan<'_>,
    control: &RunControl,
) -> VerificationReport
where
    A: BuildAgent + ?Sized,
    L: MaterialLogistics + ?Sized,
{
    let mut report = VerificationReport::default();

    let mut settled = control.sleep(plan.settle_delay).await;
    while settled && report.rounds < plan.rounds {
        let scan = collect_mismatches(&*agent, engine, plan);
        if scan.mismatched.is_empty() && scan.unknown == 0 {
            break;
        }
        report.rounds += 1;
        log::info!(
            "[Verification] Round {}/{}: {} mismatched, {} unverifiable",
            report.rounds,
            plan.rounds,
            scan.mismatched.len(),
            scan.unknown
        );

        engine.cooldown.clear();
        for (i, target) in scan.mismatched.iter().enumerate() {
            if control.is_stopped() {
                break;
            }
            let Some(entry) = schematic::palette_entry(plan.schematic, target.pid) else {
                continue;
            };
            let remaining = scan.mismatched[i..]
                .iter()
                .take_while(|other| other.pid == target.pid)
                .count() as u32;
            let demand = MaterialDemand {
                remaining,
                upcoming: Vec::new(),
            };

            move_within_reach(agent, target.position, plan.pathfinder, control).await;
            report.repair_attempts += 1;
            // attempt_place re-checks the world first, so self-resolved
            // voxels are not placed over
            if let PlacementOutcome::MaterialShortfall { item, shortfall } =
                attempt_place(engine, agent, logistics, target, entry, &demand).await
            {
                log::warn!(
                    "[Verification] {} short by {} at {}",
                    item,
                    shortfall,
                    target.position
                );
            }
        }

        settled = control.sleep(plan.settle_delay).await;
    }

    let last = collect_mismatches(&*agent, engine, plan);
    report.residual = last.mismatched.len() + last.unknown;
    if report.residual > 0 {
        log::warn!(
            "[Verification] {} voxels unresolved after {} rounds",
            report.residual,
            report.rounds
        );
    } else {
        log::info!("[Verification] Region matches after {} rounds", report.rounds);
    }
    report
}

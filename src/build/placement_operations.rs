//! Placement Operations - Pure DOP Functions
//!
//! Single-voxel placement: cooldown check, world check, material
//! acquisition, orientation lookup and the fire-and-forget placement.

use super::control::RunControl;
use super::cooldown::CooldownWindow;
use super::placement_data::{
    DeferReason, MaterialDemand, Orientation, PlacementEngine, PlacementOutcome, PlacementStats,
    PlacementTarget, RestockPlan,
};
use crate::constants::placement::{EYE_HEIGHT, INVENTORY_SLOTS, REACH, STACK_SIZE, STAND_HEIGHT};
use crate::navigation::{navigate_towards, NavigationReport, PathfinderConfig};
use crate::schematic::PaletteEntry;
use crate::world::{
    AgentPose, BlockCheck, BlockEquivalence, BuildAgent, MaterialLogistics, MaterialRequest,
    PlacementAction, WorldQuery,
};
use glam::{IVec3, Vec3};
use std::time::Duration;
use tokio::time::Instant;

pub fn create_engine(cooldown: Duration, equivalence: BlockEquivalence) -> PlacementEngine {
    PlacementEngine {
        cooldown: CooldownWindow::new(cooldown),
        equivalence,
        stats: PlacementStats::default(),
    }
}

/// Direction code, yaw and pitch for a palette entry
pub fn orientation_for(entry: &PaletteEntry) -> Orientation {
    let prop = |key: &str| entry.properties.get(key).map(String::as_str);
    let mut o = Orientation::default();

    if prop("half") == Some("bottom") || prop("type") == Some("bottom") {
        o.direction = 1;
    }
    match prop("axis") {
        Some("y") => o.direction = 0,
        Some("x") => o.direction = 4,
        Some("z") => o.direction = 2,
        _ => {}
    }

    let facing = prop("facing");
    match facing {
        Some("south") => o.yaw = 0.0,
        Some("west") => o.yaw = 90.0,
        Some("north") => o.yaw = 180.0,
        Some("east") => o.yaw = 270.0,
        Some("up") => {
            o.direction = 1;
            o.pitch = 90.0;
        }
        Some("down") => {
            o.direction = 0;
            o.pitch = -90.0;
        }
        _ => {}
    }

    if facing.is_some() && entry.name.contains("anvil") {
        o.yaw = (o.yaw + 270.0) % 360.0;
    }

    // Fixtures attach against the face the agent looks at
    let name = entry.name.as_str();
    if name.contains("trapdoor") || name.contains("button") || name.contains("_glazed_") {
        match facing {
            Some("north") => o.yaw = 0.0,
            Some("east") => o.yaw = 90.0,
            Some("south") => o.yaw = 180.0,
            Some("west") => o.yaw = 270.0,
            _ => {}
        }
    }
    o
}

/// Agent eye position
pub fn eye_position(agent_position: Vec3) -> Vec3 {
    agent_position + Vec3::new(0.0, EYE_HEIGHT, 0.0)
}

/// Whether a voxel centre is within placement reach of an eye position
pub fn within_reach(eye: Vec3, pos: IVec3) -> bool {
    eye.distance(pos.as_vec3() + Vec3::splat(0.5)) <= REACH
}

/// Walk to the stand point above `pos` unless it is already in reach
///
/// Navigation is soft: the caller attempts the placement from wherever
/// the agent ended up.
pub async fn move_within_reach<A>(
    agent: &mut A,
    pos: IVec3,
    config: &PathfinderConfig,
    control: &RunControl,
) -> Option<NavigationReport>
where
    A: WorldQuery + AgentPose + ?Sized,
{
    if within_reach(eye_position(agent.current_position()), pos) {
        return None;
    }
    let stand = pos + IVec3::new(0, STAND_HEIGHT, 0);
    Some(navigate_towards(agent, stand, config, control).await)
}

/// Size a withdrawal for a missing item
///
/// The current entry's remaining count is withdrawn (capped at a full
/// inventory); upcoming materials are prefetched into whatever slots are
/// left after that.
pub fn plan_restock(item: &str, demand: &MaterialDemand, empty_slots: u32) -> RestockPlan {
    let withdraw = demand.remaining.clamp(1, INVENTORY_SLOTS * STACK_SIZE);
    let mut free = empty_slots.saturating_sub(withdraw.div_ceil(STACK_SIZE));
    let mut prefetch = Vec::new();
    for request in &demand.upcoming {
        if free == 0 {
            break;
        }
        if request.name == item || request.count == 0 {
            continue;
        }
        let count = request.count.min(free * STACK_SIZE);
        free -= count.div_ceil(STACK_SIZE);
        prefetch.push(MaterialRequest {
            name: request.name.clone(),
            count,
        });
    }
    RestockPlan { withdraw, prefetch }
}

fn hold_if_present<A: AgentPose + ?Sized>(agent: &mut A, item: &str) -> bool {
    if agent.held_item().is_some_and(|held| held.name == item) {
        return true;
    }
    match agent.inventory_slot_of(item) {
        Some(slot) => {
            agent.set_held_slot(slot);
            agent.held_item().is_some_and(|held| held.name == item)
        }
        None => false,
    }
}

/// Put `item` in the agent's hand, withdrawing it when missing
///
/// Returns the shortfall on failure. The logistics call may stall for a
/// long time; nothing else in the engine changes while it is awaited.
pub async fn ensure_held<A, L>(
    engine: &mut PlacementEngine,
    agent: &mut A,
    logistics: &L,
    item: &str,
    demand: &MaterialDemand,
) -> Result<(), u32>
where
    A: AgentPose + ?Sized,
    L: MaterialLogistics + ?Sized,
{
    if hold_if_present(agent, item) {
        return Ok(());
    }

    let plan = plan_restock(item, demand, agent.empty_slot_count());
    log::info!(
        "[Placement] Restocking {} x{} (+{} prefetched materials)",
        item,
        plan.withdraw,
        plan.prefetch.len()
    );
    let started = Instant::now();
    let shortfall = logistics.withdraw(item, plan.withdraw).await;
    if !plan.prefetch.is_empty() {
        logistics.restock(&plan.prefetch).await;
    }
    engine.stats.restock_count += 1;
    engine.stats.restock_time += started.elapsed();

    if hold_if_present(agent, item) {
        if shortfall > 0 {
            log::warn!("[Placement] Partial restock of {}: {} short", item, shortfall);
        }
        Ok(())
    } else {
        log::warn!("[Placement] No {} available ({} short)", item, shortfall);
        Err(shortfall.max(1))
    }
}

/// One placement attempt for a candidate
pub async fn attempt_place<A, L>(
    engine: &mut PlacementEngine,
    agent: &mut A,
    logistics: &L,
    target: &PlacementTarget,
    entry: &PaletteEntry,
    demand: &MaterialDemand,
) -> PlacementOutcome
where
    A: BuildAgent + ?Sized,
    L: MaterialLogistics + ?Sized,
{
    engine.stats.attempts += 1;
    if engine.cooldown.contains(target.id) {
        return PlacementOutcome::Deferred(DeferReason::InCooldown);
    }

    let actual = agent.block_at(target.position);
    match engine.equivalence.check(actual.as_ref(), &entry.name) {
        BlockCheck::Matches => {
            engine.stats.already_placed += 1;
            return PlacementOutcome::Placed;
        }
        BlockCheck::Unknown => {
            engine.stats.unloaded += 1;
            engine.cooldown.insert(target.id, Instant::now());
            return PlacementOutcome::Deferred(DeferReason::UnloadedRegion);
        }
        BlockCheck::Mismatch => {}
    }

    if let Err(shortfall) = ensure_held(engine, agent, logistics, &entry.name, demand).await {
        engine.stats.shortfalls += 1;
        return PlacementOutcome::MaterialShortfall {
            item: entry.name.clone(),
            shortfall,
        };
    }

    let orientation = orientation_for(entry);
    agent.place_block(&PlacementAction {
        position: target.position,
        direction: orientation.direction,
        cursor: orientation.cursor,
        yaw: orientation.yaw,
        pitch: orientation.pitch,
        held_item: entry.name.clone(),
    });
    engine.cooldown.insert(target.id, Instant::now());
    engine.stats.issued += 1;
    PlacementOutcome::Deferred(DeferReason::Issued)
}

/// Forget the cooldown of a confirmed candidate
pub fn confirm_placement(engine: &mut PlacementEngine, id: usize) -> bool {
    engine.cooldown.release(id)
}

/// Expire cooldown entries; expired candidates become selectable again
pub fn expire_cooldowns(engine: &mut PlacementEngine) -> Vec<usize> {
    engine.cooldown.expire(Instant::now())
}

//! Scheduler Operations - Pure DOP Functions
//!
//! The build state machine: layer, then palette entry, then nearest
//! candidate. Progress is checkpointed to the build cache at every
//! palette/layer transition and when the run ends.

use super::candidate_index_data::CandidateIndex;
use super::candidate_index_operations::{
    build_index, candidate_count, contains_candidate, nearest_candidate, remove_candidate,
};
use super::partition::{WorkRegion, WorkerScope};
use super::palette_order::order_palette;
use super::placement_data::{
    DeferReason, MaterialDemand, PlacementEngine, PlacementOutcome, PlacementTarget,
};
use super::placement_operations::{
    attempt_place, confirm_placement, create_engine, expire_cooldowns, eye_position,
    move_within_reach, within_reach,
};
use super::scheduler_data::{
    BuildHandles, BuildMode, BuildReport, BuildSettings, BuildStatus, PalettePass,
    ProgressHandle, ProgressSnapshot, SchedulerState,
};
use super::verification::{verify_and_repair, VerificationPlan};
use crate::constants::placement::{MAPART_SCAN_DOWN, MAPART_SCAN_UP, SCAN_RADIUS};
use crate::constants::schematic::AIR_PID;
use crate::error::{PrinterError, PrinterResult};
use crate::persistence::{
    begin_palette, load_cache, mark_finished, mark_started, reconcile_cache, save_cache,
    BuildCache, CacheStatus, CacheTotals,
};
use crate::schematic::{self, PaletteEntry, SchematicData};
use crate::world::{BlockChangeReceiver, BlockCheck, BuildAgent, MaterialLogistics, MaterialRequest};
use glam::IVec3;
use rustc_hash::FxHashMap;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

/// Work region of a run, checked against the schematic bounds
pub fn resolve_region(
    schematic: &SchematicData,
    settings: &BuildSettings,
) -> PrinterResult<WorkRegion> {
    let region = settings
        .work_region
        .unwrap_or_else(|| WorkRegion::covering(schematic));
    let fits = region.min_x >= 0
        && region.min_z >= 0
        && region.min_x <= region.max_x
        && region.min_z <= region.max_z
        && region.max_x < schematic.size.x
        && region.max_z < schematic.size.z;
    if !fits {
        return Err(PrinterError::InvalidConfig {
            field: "work_region".to_string(),
            value: format!("{:?}", region),
            reason: format!("must lie inside the schematic extent {}", schematic.size),
        });
    }
    Ok(region)
}

pub fn total_layers(schematic: &SchematicData, mode: BuildMode) -> i32 {
    match mode {
        BuildMode::Building => schematic::layer_count(schematic),
        BuildMode::Mapart => schematic::layer_count(schematic).min(1),
    }
}

/// Y values covered by one scheduler layer
pub fn layer_y_range(schematic: &SchematicData, mode: BuildMode, layer: i32) -> RangeInclusive<i32> {
    match mode {
        BuildMode::Building => layer..=layer,
        BuildMode::Mapart => 0..=schematic.size.y - 1,
    }
}

/// Whether a palette id is ever scheduled
pub fn is_scheduled(schematic: &SchematicData, skip_blocks: &[String], pid: u16) -> bool {
    pid != AIR_PID
        && schematic::palette_entry(schematic, pid)
            .is_some_and(|entry| !skip_blocks.contains(&entry.name))
}

fn for_each_in_scope<F>(
    schematic: &SchematicData,
    scope: &WorkerScope,
    ys: RangeInclusive<i32>,
    mut f: F,
) where
    F: FnMut(IVec3, usize, u16),
{
    for y in ys {
        for z in scope.min_z..=scope.max_z {
            for x in scope.min_x..=scope.max_x {
                let rel = IVec3::new(x, y, z);
                if let Some(id) = schematic::index(schematic, rel) {
                    f(rel, id, schematic::block_pid_by_index(schematic, id));
                }
            }
        }
    }
}

/// Scheduled voxels inside a scope
pub fn count_scheduled(schematic: &SchematicData, skip_blocks: &[String], scope: &WorkerScope) -> u64 {
    let mut count = 0u64;
    for_each_in_scope(schematic, scope, 0..=schematic.size.y - 1, |_, _, pid| {
        if is_scheduled(schematic, skip_blocks, pid) {
            count += 1;
        }
    });
    count
}

/// Ordered palette of one layer plus per-entry voxel counts
pub fn layer_palette(
    schematic: &SchematicData,
    settings: &BuildSettings,
    scope: &WorkerScope,
    layer: i32,
) -> (Vec<u16>, FxHashMap<u16, u32>) {
    let mut counts: FxHashMap<u16, u32> = FxHashMap::default();
    let ys = layer_y_range(schematic, settings.mode, layer);
    for_each_in_scope(schematic, scope, ys, |_, _, pid| {
        if is_scheduled(schematic, &settings.skip_blocks, pid) {
            *counts.entry(pid).or_default() += 1;
        }
    });
    let pids: Vec<u16> = counts.keys().copied().collect();
    (order_palette(schematic, &pids), counts)
}

/// Candidate index of one palette entry in one layer
pub fn layer_candidates(
    schematic: &SchematicData,
    settings: &BuildSettings,
    scope: &WorkerScope,
    layer: i32,
    pid: u16,
) -> CandidateIndex {
    let mut candidates = Vec::new();
    let ys = layer_y_range(schematic, settings.mode, layer);
    for_each_in_scope(schematic, scope, ys, |rel, id, voxel_pid| {
        if voxel_pid == pid {
            candidates.push((id, settings.placement_origin + rel));
        }
    });
    build_index(candidates)
}

/// Totals the cache is reconciled against
pub fn compute_totals(
    schematic: &SchematicData,
    settings: &BuildSettings,
    region: &WorkRegion,
    scope: Option<&WorkerScope>,
) -> CacheTotals {
    let whole = WorkerScope {
        min_x: region.min_x,
        max_x: region.max_x,
        min_z: region.min_z,
        max_z: region.max_z,
    };
    let own = scope.copied().unwrap_or(whole);
    let origin = IVec3::new(own.min_x, 0, own.min_z);
    let destination = IVec3::new(own.max_x, schematic.size.y - 1, own.max_z);
    CacheTotals {
        total_blocks: scope.map_or(0, |s| count_scheduled(schematic, &settings.skip_blocks, s)),
        region_total_blocks: count_scheduled(schematic, &settings.skip_blocks, &whole),
        total_layers: total_layers(schematic, settings.mode),
        origin,
        destination,
        placement_origin: settings.placement_origin + origin,
        placement_destination: settings.placement_origin + destination,
    }
}

pub fn progress_snapshot(handle: &ProgressHandle) -> ProgressSnapshot {
    handle.inner.read().clone()
}

/// Placed share of the snapshot's blocks, 0-100
pub fn snapshot_percent(snapshot: &ProgressSnapshot) -> f64 {
    if snapshot.total == 0 {
        return if snapshot.finished { 100.0 } else { 0.0 };
    }
    snapshot.placed as f64 * 100.0 / snapshot.total as f64
}

fn publish_progress(
    handle: &ProgressHandle,
    cache: &BuildCache,
    material: Option<&PaletteEntry>,
    paused: bool,
) {
    let mut snapshot = handle.inner.write();
    snapshot.placed = cache.placed_blocks;
    snapshot.total = cache.total_blocks;
    snapshot.current_layer = cache.current_layer;
    snapshot.total_layers = cache.total_layers;
    snapshot.current_material = material.map(|entry| entry.name.clone());
    snapshot.paused = paused;
    snapshot.finished = cache.end_time.is_some();
}

fn sync_debug_counters(cache: &mut BuildCache, state: &SchedulerState, engine: &PlacementEngine) {
    let base = &state.debug_base;
    cache.debug.find_next_total_ms =
        base.find_next_total_ms + state.find_next_time.as_millis() as u64;
    cache.debug.restock_count = base.restock_count + engine.stats.restock_count;
    cache.debug.restock_take_time_ms =
        base.restock_take_time_ms + engine.stats.restock_time.as_millis() as u64;
    cache.debug.place_count = base.place_count + engine.stats.issued;
}

/// Persist the cache; failures only cost resumability
fn checkpoint(
    cache_file: Option<&Path>,
    cache: &mut BuildCache,
    state: &SchedulerState,
    engine: &PlacementEngine,
) {
    sync_debug_counters(cache, state, engine);
    let Some(path) = cache_file else {
        return;
    };
    if let Err(e) = save_cache(path, cache) {
        log::warn!("[BuildCache] Checkpoint to {} failed: {}", path.display(), e);
    }
}

fn count_placed(cache: &mut BuildCache, n: u64) {
    cache.placed_blocks = (cache.placed_blocks + n).min(cache.total_blocks);
}

fn advance_palette(cache: &mut BuildCache, state: &mut SchedulerState) {
    cache.current_palette += 1;
    begin_palette(cache);
    state.pass = None;
}

fn advance_layer(cache: &mut BuildCache, state: &mut SchedulerState) {
    cache.current_layer += 1;
    cache.current_palette = 0;
    begin_palette(cache);
    state.layer_palette = None;
    state.layer_counts.clear();
    state.pass = None;
}

/// Confirm candidates from pending world-change notifications
///
/// Never blocks; returns the number of confirmed candidates.
pub fn drain_notifications(
    receiver: &BlockChangeReceiver,
    schematic: &SchematicData,
    placement_origin: IVec3,
    entry: &PaletteEntry,
    pass: &mut PalettePass,
    engine: &mut PlacementEngine,
) -> u64 {
    let mut confirmed = 0;
    for change in receiver.try_iter() {
        let Some(id) = schematic::index(schematic, change.position - placement_origin) else {
            continue;
        };
        if !contains_candidate(&pass.index, id) {
            continue;
        }
        if engine.equivalence.check(change.block.as_ref(), &entry.name) == BlockCheck::Matches {
            remove_candidate(&mut pass.index, id);
            confirm_placement(engine, id);
            confirmed += 1;
        }
    }
    confirmed
}

/// Same-palette candidates around `first` that are reachable from `eye`
fn batch_targets(
    schematic: &SchematicData,
    settings: &BuildSettings,
    scope: &WorkerScope,
    pass: &PalettePass,
    engine: &PlacementEngine,
    first: PlacementTarget,
    eye: glam::Vec3,
) -> Vec<PlacementTarget> {
    let mut targets = vec![first];
    let rel = first.position - settings.placement_origin;
    let (down, up) = match settings.mode {
        BuildMode::Building => (0, 0),
        BuildMode::Mapart => (MAPART_SCAN_DOWN, MAPART_SCAN_UP),
    };
    for dy in (-down..=up).rev() {
        for dz in -SCAN_RADIUS..=SCAN_RADIUS {
            for dx in -SCAN_RADIUS..=SCAN_RADIUS {
                let offset = IVec3::new(dx, dy, dz);
                if offset == IVec3::ZERO {
                    continue;
                }
                let other = rel + offset;
                if !scope.contains(other) {
                    continue;
                }
                let Some(id) = schematic::index(schematic, other) else {
                    continue;
                };
                if !contains_candidate(&pass.index, id) || engine.cooldown.contains(id) {
                    continue;
                }
                let position = settings.placement_origin + other;
                if within_reach(eye, position) {
                    targets.push(PlacementTarget {
                        id,
                        position,
                        pid: pass.pid,
                    });
                }
            }
        }
    }
    targets
}

fn start_pass(
    schematic: &SchematicData,
    settings: &BuildSettings,
    state: &SchedulerState,
    layer: i32,
    cursor: usize,
    pid: u16,
) -> PalettePass {
    let upcoming = state
        .layer_palette
        .as_deref()
        .unwrap_or_default()
        .iter()
        .skip(cursor + 1)
        .filter_map(|&next| {
            let entry = schematic::palette_entry(schematic, next)?;
            Some(MaterialRequest {
                name: entry.name.clone(),
                count: state.layer_counts.get(&next).copied().unwrap_or(0),
            })
        })
        .collect();
    PalettePass {
        pid,
        index: layer_candidates(schematic, settings, &state.scope, layer, pid),
        upcoming,
        shortfall_streak: 0,
        attempts: FxHashMap::default(),
    }
}

fn build_report(
    status: BuildStatus,
    cache_status: CacheStatus,
    cache: &BuildCache,
    engine: &PlacementEngine,
) -> BuildReport {
    BuildReport {
        status,
        cache_status,
        placed: cache.placed_blocks,
        total: cache.total_blocks,
        attempts: engine.stats.attempts,
        issued: engine.stats.issued,
        verification: None,
        debug: cache.debug.clone(),
    }
}

/// Run one build to completion, stop, or an already-finished cache
///
/// Only invalid input is an error. Every runtime failure (unreachable
/// targets, shortfalls, unloaded regions, cache I/O) is absorbed and the
/// run continues.
pub async fn run_build<A, L>(
    agent: &mut A,
    logistics: &L,
    schematic: &SchematicData,
    settings: &BuildSettings,
    cache_file: Option<&Path>,
    handles: &BuildHandles,
) -> PrinterResult<BuildReport>
where
    A: BuildAgent + ?Sized,
    L: MaterialLogistics + ?Sized,
{
    let control = &handles.control;
    let region = resolve_region(schematic, settings)?;
    let scope = WorkerScope::resolve(&region, settings.worker);
    let totals = compute_totals(schematic, settings, &region, scope.as_ref());

    let stored = match cache_file.map(load_cache) {
        Some(Ok(stored)) => stored,
        Some(Err(e)) => {
            log::warn!("[BuildCache] Ignoring unreadable cache: {}", e);
            None
        }
        None => None,
    };
    let (mut cache, cache_status) = reconcile_cache(stored, &settings.config_hash, &totals);
    let mut engine = create_engine(settings.cooldown, settings.equivalence.clone());

    if cache_status == CacheStatus::Finished {
        log::info!("[Scheduler] Build {} already finished", settings.config_hash);
        publish_progress(&handles.progress, &cache, None, false);
        return Ok(build_report(
            BuildStatus::AlreadyFinished,
            cache_status,
            &cache,
            &engine,
        ));
    }

    let Some(scope) = scope else {
        log::info!(
            "[Scheduler] Worker {} of {} owns no rows, nothing to build",
            settings.worker.worker_id,
            settings.worker.worker_count
        );
        mark_started(&mut cache);
        mark_finished(&mut cache);
        if let Some(path) = cache_file {
            if let Err(e) = save_cache(path, &cache) {
                log::warn!("[BuildCache] Save to {} failed: {}", path.display(), e);
            }
        }
        publish_progress(&handles.progress, &cache, None, false);
        return Ok(build_report(
            BuildStatus::Completed,
            cache_status,
            &cache,
            &engine,
        ));
    };

    mark_started(&mut cache);
    let mut state = SchedulerState {
        scope,
        total_layers: totals.total_layers,
        layer_palette: None,
        layer_counts: FxHashMap::default(),
        pass: None,
        iterations: 0,
        find_next_time: Duration::ZERO,
        debug_base: cache.debug.clone(),
    };
    log::info!(
        "[Scheduler] Starting {:?} build of {} ({:?}): {} blocks in z {}..={}, layer {}/{}",
        settings.mode,
        schematic.name,
        cache_status,
        cache.total_blocks,
        scope.min_z,
        scope.max_z,
        cache.current_layer,
        state.total_layers
    );
    checkpoint(cache_file, &mut cache, &state, &engine);
    publish_progress(&handles.progress, &cache, None, false);

    let mut stopped = false;
    while cache.current_layer < state.total_layers {
        if control.is_stopped() {
            stopped = true;
            break;
        }
        if control.is_paused() {
            publish_progress(&handles.progress, &cache, None, true);
            control.sleep(settings.pause_poll).await;
            continue;
        }
        state.iterations += 1;
        if settings.yield_interval > 0 && state.iterations % settings.yield_interval == 0 {
            tokio::task::yield_now().await;
        }
        expire_cooldowns(&mut engine);

        if state.layer_palette.is_none() {
            let (order, counts) = layer_palette(schematic, settings, &state.scope, cache.current_layer);
            log::info!(
                "[Scheduler] Layer {}/{}: {} palette entries",
                cache.current_layer + 1,
                state.total_layers,
                order.len()
            );
            state.layer_palette = Some(order);
            state.layer_counts = counts;
        }
        let next_pid = state
            .layer_palette
            .as_ref()
            .and_then(|order| order.get(cache.current_palette).copied());
        let Some(pid) = next_pid else {
            advance_layer(&mut cache, &mut state);
            checkpoint(cache_file, &mut cache, &state, &engine);
            continue;
        };
        let Some(entry) = schematic::palette_entry(schematic, pid) else {
            advance_palette(&mut cache, &mut state);
            continue;
        };

        let mut pass = match state.pass.take() {
            Some(pass) if pass.pid == pid => pass,
            _ => {
                let pass = start_pass(
                    schematic,
                    settings,
                    &state,
                    cache.current_layer,
                    cache.current_palette,
                    pid,
                );
                log::info!(
                    "[Scheduler] Placing {} ({} candidates)",
                    entry.name,
                    candidate_count(&pass.index)
                );
                pass
            }
        };

        if let Some(receiver) = &handles.notifications {
            let confirmed = drain_notifications(
                receiver,
                schematic,
                settings.placement_origin,
                entry,
                &mut pass,
                &mut engine,
            );
            count_placed(&mut cache, confirmed);
        }

        let started = Instant::now();
        let query = {
            let world = &*agent;
            let equivalence = &engine.equivalence;
            let cooldown = &engine.cooldown;
            nearest_candidate(
                &mut pass.index,
                agent.current_position(),
                |id| cooldown.contains(id),
                |_, pos| equivalence.check(world.block_at(pos).as_ref(), &entry.name) == BlockCheck::Matches,
            )
        };
        state.find_next_time += started.elapsed();
        for &id in &query.reconciled {
            confirm_placement(&mut engine, id);
        }
        count_placed(&mut cache, query.reconciled.len() as u64);

        let Some((id, position)) = query.candidate else {
            if candidate_count(&pass.index) == 0 {
                log::info!("[Scheduler] Finished {} on layer {}", entry.name, cache.current_layer + 1);
                advance_palette(&mut cache, &mut state);
                checkpoint(cache_file, &mut cache, &state, &engine);
                publish_progress(&handles.progress, &cache, Some(entry), false);
            } else {
                // Everything left is in flight
                let wait = engine
                    .cooldown
                    .next_expiry()
                    .map(|at| at.saturating_duration_since(Instant::now()))
                    .unwrap_or(settings.pause_poll)
                    .max(Duration::from_millis(1));
                state.pass = Some(pass);
                control.sleep(wait).await;
            }
            continue;
        };

        move_within_reach(agent, position, &settings.pathfinder, control).await;
        let first = PlacementTarget { id, position, pid };
        let eye = eye_position(agent.current_position());
        let targets = batch_targets(schematic, settings, &state.scope, &pass, &engine, first, eye);

        let mut exhausted = false;
        for target in targets {
            if control.is_stopped() {
                break;
            }
            let demand = MaterialDemand {
                remaining: candidate_count(&pass.index) as u32,
                upcoming: pass.upcoming.clone(),
            };
            match attempt_place(&mut engine, agent, logistics, &target, entry, &demand).await {
                PlacementOutcome::Placed => {
                    remove_candidate(&mut pass.index, target.id);
                    confirm_placement(&mut engine, target.id);
                    count_placed(&mut cache, 1);
                    pass.shortfall_streak = 0;
                }
                PlacementOutcome::Deferred(DeferReason::InCooldown) => {}
                PlacementOutcome::Deferred(reason) => {
                    pass.shortfall_streak = 0;
                    let attempts = pass.attempts.entry(target.id).or_default();
                    *attempts += 1;
                    if *attempts >= settings.max_place_attempts {
                        log::warn!(
                            "[Scheduler] {} at {} unconfirmed after {} attempts ({:?}), leaving it to verification",
                            entry.name,
                            target.position,
                            attempts,
                            reason
                        );
                        remove_candidate(&mut pass.index, target.id);
                    }
                }
                PlacementOutcome::MaterialShortfall { item, shortfall } => {
                    pass.shortfall_streak += 1;
                    log::warn!(
                        "[Scheduler] Short {} of {} ({}/{})",
                        shortfall,
                        item,
                        pass.shortfall_streak,
                        settings.max_material_retries
                    );
                    exhausted = pass.shortfall_streak >= settings.max_material_retries;
                    break;
                }
            }
        }

        if exhausted {
            log::warn!(
                "[Scheduler] Giving up on {} for now, {} voxels left to verification",
                entry.name,
                candidate_count(&pass.index)
            );
            advance_palette(&mut cache, &mut state);
            checkpoint(cache_file, &mut cache, &state, &engine);
        } else {
            let short = pass.shortfall_streak > 0;
            state.pass = Some(pass);
            if short {
                control.sleep(settings.pause_poll).await;
            }
        }
        publish_progress(&handles.progress, &cache, Some(entry), false);
    }

    let attempts = engine.stats.attempts;
    let issued = engine.stats.issued;

    if stopped {
        log::info!(
            "[Scheduler] Stopped at layer {} palette {} ({} of {} placed)",
            cache.current_layer,
            cache.current_palette,
            cache.placed_blocks,
            cache.total_blocks
        );
        checkpoint(cache_file, &mut cache, &state, &engine);
        publish_progress(&handles.progress, &cache, None, false);
        return Ok(build_report(BuildStatus::Stopped, cache_status, &cache, &engine));
    }

    let plan = VerificationPlan {
        schematic,
        scope: state.scope,
        placement_origin: settings.placement_origin,
        skip_blocks: &settings.skip_blocks,
        rounds: settings.verification_rounds,
        settle_delay: settings.settle_delay,
        pathfinder: &settings.pathfinder,
    };
    let verification = verify_and_repair(&mut engine, agent, logistics, &plan, control).await;

    let status = if control.is_stopped() {
        BuildStatus::Stopped
    } else {
        cache.placed_blocks = cache
            .total_blocks
            .saturating_sub(verification.residual as u64);
        mark_finished(&mut cache);
        BuildStatus::Completed
    };
    checkpoint(cache_file, &mut cache, &state, &engine);
    publish_progress(&handles.progress, &cache, None, false);
    log::info!(
        "[Scheduler] Build {:?}: {}/{} placed, {} unresolved",
        status,
        cache.placed_blocks,
        cache.total_blocks,
        verification.residual
    );

    let mut report = build_report(status, cache_status, &cache, &engine);
    report.attempts = attempts;
    report.issued = issued;
    report.verification = Some(verification);
    Ok(report)
}

//! Build Cache Operations - Pure DOP Functions
//!
//! Load, save and reconcile the per-agent build cache.

use super::build_cache_data::{BuildCache, CacheStatus, CacheTotals};
use super::{PersistenceError, PersistenceResult};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const BUILD_CACHE_FILE: &str = "build_cache.json";

/// `<cache_dir>/<agent_id>/build_cache.json`
pub fn cache_path(cache_dir: &Path, agent_id: &str) -> PathBuf {
    cache_dir.join(agent_id).join(BUILD_CACHE_FILE)
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// CRC-32 of the canonical JSON of a fingerprint, as 8 hex digits
pub fn config_hash<T: Serialize>(fingerprint: &T) -> PersistenceResult<String> {
    let bytes = serde_json::to_vec(fingerprint)
        .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;
    Ok(format!("{:08x}", crc32fast::hash(&bytes)))
}

/// Read a cache; `Ok(None)` when there is none yet
pub fn load_cache(path: &Path) -> PersistenceResult<Option<BuildCache>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PersistenceError::LoadFailed {
                path: path.display().to_string(),
                error: e.to_string(),
            })
        }
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| PersistenceError::CorruptedData(format!("{}: {}", path.display(), e)))
}

/// Write a cache atomically (temp file, fsync, rename)
pub fn save_cache(path: &Path, cache: &BuildCache) -> PersistenceResult<()> {
    let failed = |error: String| PersistenceError::SaveFailed {
        path: path.display().to_string(),
        error,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| failed(e.to_string()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    {
        let file = File::create(&tmp_path).map_err(|e| failed(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, cache)
            .map_err(|e| PersistenceError::SerializationError(e.to_string()))?;
        writer.flush().map_err(|e| failed(e.to_string()))?;
        let file = writer
            .into_inner()
            .map_err(|e| failed(e.to_string()))?;
        file.sync_all().map_err(|e| failed(e.to_string()))?;
    }
    std::fs::rename(&tmp_path, path).map_err(|e| failed(e.to_string()))?;
    Ok(())
}

/// Cache with zeroed progress for the given totals
pub fn new_cache(config_hash: &str, totals: &CacheTotals) -> BuildCache {
    BuildCache {
        config_hash: config_hash.to_string(),
        placed_blocks: 0,
        palette_base_placed: Some(0),
        total_blocks: totals.total_blocks,
        region_total_blocks: totals.region_total_blocks,
        total_layers: totals.total_layers,
        current_layer: 0,
        current_palette: 0,
        start_time: None,
        end_time: None,
        origin: totals.origin,
        destination: totals.destination,
        placement_origin: totals.placement_origin,
        placement_destination: totals.placement_destination,
        debug: Default::default(),
    }
}

/// Decide between resuming a stored cache and starting over
///
/// A matching hash restores the cursors and absolute placement vectors and
/// counts a disconnect; any other hash resets every counter.
pub fn reconcile_cache(
    stored: Option<BuildCache>,
    current_hash: &str,
    totals: &CacheTotals,
) -> (BuildCache, CacheStatus) {
    match stored {
        None => (new_cache(current_hash, totals), CacheStatus::Fresh),
        Some(cache) if cache.config_hash != current_hash => {
            log::info!(
                "[BuildCache] Configuration changed ({} -> {}), progress reset",
                cache.config_hash,
                current_hash
            );
            (new_cache(current_hash, totals), CacheStatus::Reset)
        }
        Some(cache) if cache.end_time.is_some() => (cache, CacheStatus::Finished),
        Some(mut cache) => {
            cache.debug.disconnect_count += 1;
            // Totals follow the schematic actually loaded
            cache.total_blocks = totals.total_blocks;
            cache.region_total_blocks = totals.region_total_blocks;
            cache.total_layers = totals.total_layers;
            // Voxels of the interrupted pass are counted again when its
            // candidates are reconciled against the world
            if let Some(base) = cache.palette_base_placed {
                cache.placed_blocks = cache.placed_blocks.min(base);
            }
            cache.placed_blocks = cache.placed_blocks.min(cache.total_blocks);
            log::info!(
                "[BuildCache] Resuming at layer {}/{} palette {} ({} of {} placed)",
                cache.current_layer,
                cache.total_layers,
                cache.current_palette,
                cache.placed_blocks,
                cache.total_blocks
            );
            (cache, CacheStatus::Resumed)
        }
    }
}

/// Record the start of the palette pass at the current cursor
pub fn begin_palette(cache: &mut BuildCache) {
    cache.palette_base_placed = Some(cache.placed_blocks);
}

pub fn mark_started(cache: &mut BuildCache) {
    if cache.start_time.is_none() {
        cache.start_time = Some(now_millis());
    }
}

pub fn mark_finished(cache: &mut BuildCache) {
    cache.end_time = Some(now_millis());
}

/// Placed share of this worker's blocks, 0-100
pub fn progress_percent(cache: &BuildCache) -> f64 {
    if cache.total_blocks == 0 {
        return 100.0;
    }
    cache.placed_blocks as f64 * 100.0 / cache.total_blocks as f64
}

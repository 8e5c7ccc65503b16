//! Build configuration
//!
//! One TOML file per agent: which schematic, where it goes, which part of
//! it this agent owns and how placement is timed.

use crate::build::{
    run_build, BuildHandles, BuildMode, BuildReport, BuildSettings, WorkRegion, WorkerAssignment,
};
use crate::constants::{placement, scheduler};
use crate::persistence::{cache_path, config_hash};
use crate::schematic::{apply_material_substitutions, load_from_file, SchematicData};
use crate::world::{BlockEquivalence, BuildAgent, MaterialLogistics};
use anyhow::{Context, Result};
use glam::IVec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_skip_blocks() -> Vec<String> {
    placement::DEFAULT_SKIP_BLOCKS
        .iter()
        .map(|name| name.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchematicSource {
    pub path: PathBuf,
    /// Absolute world position of voxel (0, 0, 0)
    #[serde(default)]
    pub placement: [i32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub id: u32,
    pub count: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { id: 0, count: 1 }
    }
}

/// Overrides of the timing constants; unset values use the mode defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub placement_cooldown_ms: Option<u64>,
    pub pause_poll_ms: Option<u64>,
    pub verification_rounds: Option<u32>,
    pub settle_delay_ms: Option<u64>,
    pub max_material_retries: Option<u32>,
    pub max_place_attempts: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Names the cache directory of this agent
    pub agent_id: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default)]
    pub mode: BuildMode,
    pub schematic: SchematicSource,
    #[serde(default)]
    pub work_region: Option<WorkRegion>,
    #[serde(default)]
    pub worker: WorkerConfig,
    /// `[from, to]` block-name pairs applied to the palette before scheduling
    #[serde(default)]
    pub material_substitutions: Vec<(String, String)>,
    #[serde(default = "default_skip_blocks")]
    pub skip_blocks: Vec<String>,
    #[serde(default)]
    pub equivalence_classes: Option<Vec<Vec<String>>>,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub log_level: Option<String>,
}

/// Inputs of the config hash: everything that changes which voxels this
/// agent builds or where they go
#[derive(Debug, Serialize)]
pub struct ConfigFingerprint<'a> {
    pub schematic: String,
    pub placement: [i32; 3],
    pub mode: BuildMode,
    pub work_region: Option<WorkRegion>,
    pub worker_id: u32,
    pub worker_count: u32,
    pub material_substitutions: &'a [(String, String)],
    pub skip_blocks: &'a [String],
}

impl BuildConfig {
    /// Load and validate a config file
    ///
    /// A relative schematic path is resolved against the config file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("BuildConfig: cannot read {}", path.display()))?;
        let mut config: BuildConfig = toml::from_str(&text)
            .with_context(|| format!("BuildConfig: cannot parse {}", path.display()))?;
        if config.schematic.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.schematic.path = dir.join(&config.schematic.path);
            }
        }
        config.validate()?;
        log::info!(
            "[BuildConfig] Loaded {} for agent {} (worker {}/{})",
            path.display(),
            config.agent_id,
            config.worker.id,
            config.worker.count
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.agent_id.trim().is_empty() {
            return Err(anyhow::anyhow!("BuildConfig: agent_id cannot be empty"));
        }
        if self.worker.count == 0 {
            return Err(anyhow::anyhow!("BuildConfig: worker.count cannot be 0"));
        }
        if self.worker.id >= self.worker.count {
            return Err(anyhow::anyhow!(
                "BuildConfig: worker.id {} must be below worker.count {}",
                self.worker.id,
                self.worker.count
            ));
        }
        if let Some(region) = &self.work_region {
            if region.min_x > region.max_x || region.min_z > region.max_z {
                return Err(anyhow::anyhow!(
                    "BuildConfig: work_region min {:?} exceeds max {:?}",
                    (region.min_x, region.min_z),
                    (region.max_x, region.max_z)
                ));
            }
        }
        if self.timing.placement_cooldown_ms == Some(0) {
            return Err(anyhow::anyhow!(
                "BuildConfig: timing.placement_cooldown_ms cannot be 0"
            ));
        }
        if self.timing.max_place_attempts == Some(0) {
            return Err(anyhow::anyhow!(
                "BuildConfig: timing.max_place_attempts cannot be 0"
            ));
        }
        Ok(())
    }

    pub fn fingerprint(&self) -> ConfigFingerprint<'_> {
        ConfigFingerprint {
            schematic: self.schematic.path.display().to_string(),
            placement: self.schematic.placement,
            mode: self.mode,
            work_region: self.work_region,
            worker_id: self.worker.id,
            worker_count: self.worker.count,
            material_substitutions: &self.material_substitutions,
            skip_blocks: &self.skip_blocks,
        }
    }

    pub fn config_hash(&self) -> Result<String> {
        config_hash(&self.fingerprint()).context("BuildConfig: cannot hash fingerprint")
    }

    /// `<cache_dir>/<agent_id>/build_cache.json`
    pub fn cache_file(&self) -> PathBuf {
        cache_path(&self.cache_dir, &self.agent_id)
    }

    pub fn to_settings(&self) -> Result<BuildSettings> {
        let default_cooldown = match self.mode {
            BuildMode::Building => placement::BUILDING_COOLDOWN,
            BuildMode::Mapart => placement::MAPART_COOLDOWN,
        };
        let timing = &self.timing;
        Ok(BuildSettings {
            mode: self.mode,
            config_hash: self.config_hash()?,
            placement_origin: IVec3::from(self.schematic.placement),
            work_region: self.work_region,
            worker: WorkerAssignment {
                worker_id: self.worker.id,
                worker_count: self.worker.count,
            },
            skip_blocks: self.skip_blocks.clone(),
            equivalence: self
                .equivalence_classes
                .clone()
                .map(BlockEquivalence::new)
                .unwrap_or_default(),
            cooldown: timing
                .placement_cooldown_ms
                .map(Duration::from_millis)
                .unwrap_or(default_cooldown),
            pause_poll: timing
                .pause_poll_ms
                .map(Duration::from_millis)
                .unwrap_or(scheduler::PAUSE_POLL),
            verification_rounds: timing
                .verification_rounds
                .unwrap_or(scheduler::VERIFICATION_ROUNDS),
            settle_delay: timing
                .settle_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(scheduler::SETTLE_DELAY),
            max_material_retries: timing
                .max_material_retries
                .unwrap_or(placement::MAX_MATERIAL_RETRIES),
            max_place_attempts: timing
                .max_place_attempts
                .unwrap_or(placement::MAX_PLACE_ATTEMPTS),
            ..Default::default()
        })
    }

    /// Load the schematic and apply the material substitutions
    pub fn load_schematic(&self) -> Result<SchematicData> {
        let mut schematic = load_from_file(&self.schematic.path)
            .with_context(|| format!("BuildConfig: cannot load {}", self.schematic.path.display()))?;
        let renamed = apply_material_substitutions(&mut schematic, &self.material_substitutions);
        if renamed > 0 {
            log::info!(
                "[BuildConfig] Substituted {} palette entries in {}",
                renamed,
                schematic.name
            );
        }
        Ok(schematic)
    }
}

/// Load everything a config names and run the build
pub async fn run_configured_build<A, L>(
    agent: &mut A,
    logistics: &L,
    config: &BuildConfig,
    handles: &BuildHandles,
) -> Result<BuildReport>
where
    A: BuildAgent + ?Sized,
    L: MaterialLogistics + ?Sized,
{
    let schematic = config.load_schematic()?;
    let settings = config.to_settings()?;
    let cache_file = config.cache_file();
    let report = run_build(
        agent,
        logistics,
        &schematic,
        &settings,
        Some(cache_file.as_path()),
        handles,
    )
    .await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildStatus;
    use crate::persistence::{load_cache, CacheStatus};
    use crate::testing::{MockAgent, MockStation};
    use glam::Vec3;
    use tempfile::TempDir;

    const SCHEMATIC: &str = r#"{
        "name": "wall",
        "size": [3, 1, 1],
        "palette": [{"Name": "air"}, {"Name": "oak_planks"}],
        "blocks": [1, 1, 1]
    }"#;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        std::fs::write(dir.path().join("wall.json"), SCHEMATIC).expect("write schematic");
        let path = dir.path().join("agent.toml");
        std::fs::write(&path, body).expect("write config");
        path
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"
agent_id = "builder-1"

[schematic]
path = "wall.json"
"#,
        );
        let config = BuildConfig::load(&path).expect("load");
        assert_eq!(config.mode, BuildMode::Building);
        assert_eq!(config.worker, WorkerConfig::default());
        assert_eq!(config.schematic.path, dir.path().join("wall.json"));
        assert!(config.skip_blocks.iter().any(|b| b == "spore_blossom"));

        let settings = config.to_settings().expect("settings");
        assert_eq!(settings.cooldown, placement::BUILDING_COOLDOWN);
        assert_eq!(settings.verification_rounds, scheduler::VERIFICATION_ROUNDS);
        assert_eq!(settings.config_hash.len(), 8);
    }

    #[test]
    fn test_full_config() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"
agent_id = "map-2"
cache_dir = "state"
mode = "mapart"
material_substitutions = [["oak_planks", "birch_planks"]]
equivalence_classes = [["stone", "cobblestone"]]
debug = true
log_level = "debug"

[schematic]
path = "wall.json"
placement = [100, 64, -30]

[work_region]
min_x = 0
min_z = 0
max_x = 2
max_z = 0

[worker]
id = 1
count = 2

[timing]
placement_cooldown_ms = 750
verification_rounds = 5
"#,
        );
        let config = BuildConfig::load(&path).expect("load");
        let settings = config.to_settings().expect("settings");
        assert_eq!(settings.mode, BuildMode::Mapart);
        assert_eq!(settings.placement_origin, IVec3::new(100, 64, -30));
        assert_eq!(settings.worker.worker_id, 1);
        assert_eq!(settings.cooldown, Duration::from_millis(750));
        assert_eq!(settings.verification_rounds, 5);
        assert!(settings.equivalence.equivalent("cobblestone", "stone"));
        assert!(!settings.equivalence.equivalent("dirt", "grass_block"));
        assert_eq!(config.cache_file(), PathBuf::from("state/map-2/build_cache.json"));

        let schematic = config.load_schematic().expect("schematic");
        assert_eq!(schematic.palette[1].name, "birch_planks");
    }

    #[test]
    fn test_mapart_default_cooldown() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"
agent_id = "m"
mode = "mapart"

[schematic]
path = "wall.json"
"#,
        );
        let settings = BuildConfig::load(&path)
            .expect("load")
            .to_settings()
            .expect("settings");
        assert_eq!(settings.cooldown, placement::MAPART_COOLDOWN);
    }

    #[test]
    fn test_invalid_worker_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"
agent_id = "w"

[schematic]
path = "wall.json"

[worker]
id = 2
count = 2
"#,
        );
        let err = BuildConfig::load(&path).expect_err("worker id out of range");
        assert!(err.to_string().contains("worker.id"));
    }

    #[test]
    fn test_cosmetic_fields_do_not_change_hash() {
        let dir = TempDir::new().expect("temp dir");
        let base = r#"
agent_id = "h"

[schematic]
path = "wall.json"
"#;
        let path = write_config(&dir, base);
        let plain = BuildConfig::load(&path).expect("load");

        let mut noisy = plain.clone();
        noisy.debug = true;
        noisy.log_level = Some("trace".into());
        noisy.timing.placement_cooldown_ms = Some(100);
        assert_eq!(
            plain.config_hash().expect("hash"),
            noisy.config_hash().expect("hash")
        );

        let hash = plain.config_hash().expect("hash");
        let mut moved = plain.clone();
        moved.worker = WorkerConfig { id: 1, count: 3 };
        assert_ne!(hash, moved.config_hash().expect("hash"));

        let mut other_file = plain.clone();
        other_file.schematic.path = dir.path().join("tower.json");
        assert_ne!(hash, other_file.config_hash().expect("hash"));

        let mut cropped = plain.clone();
        cropped.work_region = Some(WorkRegion {
            min_x: 0,
            min_z: 0,
            max_x: 1,
            max_z: 0,
        });
        assert_ne!(hash, cropped.config_hash().expect("hash"));

        let mut substituted = plain.clone();
        substituted.material_substitutions = vec![("oak_planks".into(), "birch_planks".into())];
        assert_ne!(hash, substituted.config_hash().expect("hash"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_build_runs_and_caches() {
        let dir = TempDir::new().expect("temp dir");
        let cache_dir = dir.path().join("cache");
        let path = write_config(
            &dir,
            &format!(
                r#"
agent_id = "runner"
cache_dir = "{}"

[schematic]
path = "wall.json"
"#,
                cache_dir.display()
            ),
        );
        let config = BuildConfig::load(&path).expect("load");
        let mut agent = MockAgent::new(Vec3::new(1.5, 2.1, 0.5));
        let station = MockStation::unlimited(&agent);

        let report = run_configured_build(&mut agent, &station, &config, &BuildHandles::default())
            .await
            .expect("build");
        assert_eq!(report.status, BuildStatus::Completed);
        assert_eq!(report.placed, 3);

        let cache = load_cache(&config.cache_file())
            .expect("load")
            .expect("cache written");
        assert_eq!(cache.config_hash, config.config_hash().expect("hash"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_substitution_resets_cache_and_total() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(
            dir.path().join("mixed.json"),
            r#"{
                "name": "mixed",
                "size": [3, 1, 1],
                "palette": [{"Name": "air"}, {"Name": "oak_planks"}, {"Name": "glass"}],
                "blocks": [1, 2, 1]
            }"#,
        )
        .expect("write schematic");
        let cache_dir = dir.path().join("cache");
        let base = format!(
            r#"
agent_id = "swap"
cache_dir = "{}"

[schematic]
path = "mixed.json"
"#,
            cache_dir.display()
        );
        let path = dir.path().join("agent.toml");
        let mut agent = MockAgent::new(Vec3::new(1.5, 2.1, 0.5));
        let station = MockStation::unlimited(&agent);

        std::fs::write(&path, &base).expect("write config");
        let first = BuildConfig::load(&path).expect("load");
        let report = run_configured_build(&mut agent, &station, &first, &BuildHandles::default())
            .await
            .expect("build");
        assert_eq!(report.status, BuildStatus::Completed);
        assert_eq!(report.total, 3);

        // Glass becomes a skipped block, so the build shrinks to the planks
        let swapped = base.replace(
            "agent_id = \"swap\"",
            "agent_id = \"swap\"\nmaterial_substitutions = [[\"glass\", \"spore_blossom\"]]",
        );
        std::fs::write(&path, swapped).expect("write config");
        let second = BuildConfig::load(&path).expect("load");
        assert_ne!(
            first.config_hash().expect("hash"),
            second.config_hash().expect("hash")
        );
        let report = run_configured_build(&mut agent, &station, &second, &BuildHandles::default())
            .await
            .expect("build");
        assert_eq!(report.cache_status, CacheStatus::Reset);
        assert_eq!(report.status, BuildStatus::Completed);
        assert_eq!(report.total, 2);
        assert_eq!(report.placed, 2);
    }
}

// Schematic Printer - Data-Oriented Programming (DOP) Architecture
//
// Build core of an autonomous voxel builder: bounded local pathfinding,
// worker-partitioned scheduling, placement with a cooldown window, a
// resumable progress cache and a verification/repair pass.
//
// Data lives in *_data modules, transformations in *_operations modules.
// The live world is reached only through the traits in world::interfaces.

// Constants module
pub mod constants;

// Core modules
pub mod error;
pub mod schematic;
pub mod world;

// Build systems
pub mod build;
pub mod navigation;
pub mod persistence;

// Configuration
pub mod config;

#[cfg(test)]
pub(crate) mod testing;

pub use build::{
    run_build, BuildHandles, BuildMode, BuildReport, BuildSettings, BuildStatus, ProgressSnapshot,
    RunControl, WorkRegion, WorkerAssignment,
};
pub use config::{run_configured_build, BuildConfig};
pub use error::{ErrorContext, OptionExt, PrinterError, PrinterResult};
pub use navigation::{navigate_towards, NavigationReport, PathfinderConfig};
pub use persistence::{BuildCache, CacheStatus, PersistenceError};
pub use schematic::{PaletteEntry, SchematicData};
pub use world::{
    AgentPose, BlockChange, BlockEquivalence, BuildAgent, MaterialLogistics, PlacementSink,
    WorldBlock, WorldQuery,
};

/// Initialise env_logger, honouring `RUST_LOG` and falling back to
/// `default_level` (usually the config's `log_level`)
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(default_level: Option<&str>) {
    let env = env_logger::Env::default().default_filter_or(default_level.unwrap_or("info"));
    if env_logger::Builder::from_env(env).try_init().is_ok() {
        log::info!("[SchematicPrinter] Logging initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging(Some("debug"));
        init_logging(None);
    }
}

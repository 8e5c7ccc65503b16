//! Tuning constants shared across the printer

/// Schematic model
pub mod schematic {
    /// Palette id reserved for empty voxels
    pub const AIR_PID: u16 = 0;
}

/// Local navigation
pub mod navigation {
    use std::time::Duration;

    /// Block names an agent may occupy (both feet and head voxel)
    pub const PASSABLE_BLOCKS: &[&str] = &["air", "cave_air", "light", "water", "vine"];

    /// Maximum hop depth of one bounded search
    pub const STEP_BUDGET: u32 = 12;
    /// Hard cap on node expansions of one bounded search
    pub const MAX_EXPANSIONS: usize = 4096;
    /// Wall-clock limit of one bounded search
    pub const SEARCH_DEADLINE: Duration = Duration::from_millis(1500);
    /// Wall-clock limit of one navigate-towards call
    pub const NAVIGATION_DEADLINE: Duration = Duration::from_secs(8);
    /// Bounded searches per navigate-towards call
    pub const MAX_SEARCH_CALLS: u32 = 100;
    /// Search iterations between cooperative yields
    pub const YIELD_INTERVAL: usize = 100;
    /// Unchanged-position iterations before a forced nudge
    pub const STUCK_THRESHOLD: u32 = 10;
    /// Upward nudge applied when stuck
    pub const STUCK_NUDGE: f32 = 0.05;
    /// Movement below this counts as "not moved"
    pub const STUCK_EPSILON: f32 = 0.01;
    /// Minimum interval between two path-replay hops
    pub const HOP_INTERVAL: Duration = Duration::from_millis(40);
    /// Initial and maximum radius when the target cell is obstructed
    pub const ALTERNATE_RADIUS_START: i32 = 4;
    pub const ALTERNATE_RADIUS_MAX: i32 = 8;
    /// Offset from a voxel corner to where the agent stands in it
    pub const STAND_OFFSET: [f32; 3] = [0.5, 0.1, 0.5];
}

/// Candidate selection and placement
pub mod placement {
    use std::time::Duration;

    /// Edge length of a candidate bucket
    pub const BUCKET_SIZE: i32 = 16;
    /// Squared distance below which a candidate is taken without looking further
    pub const NEAR_ENOUGH_SQUARED: f32 = 16.0;
    /// Stand point above a candidate
    pub const STAND_HEIGHT: i32 = 2;
    /// Eye height above the agent position
    pub const EYE_HEIGHT: f32 = 1.6;
    /// Maximum eye-to-block-centre distance for a placement
    pub const REACH: f32 = 6.0;
    /// Horizontal half-width of the batch scan around a candidate
    pub const SCAN_RADIUS: i32 = 4;
    /// Cooldown before an unconfirmed placement may be retried
    pub const BUILDING_COOLDOWN: Duration = Duration::from_millis(5000);
    pub const MAPART_COOLDOWN: Duration = Duration::from_millis(2000);
    /// Block names cleared/placed before any finish material of a layer
    pub const SCAFFOLD_BLOCKS: &[&str] = &["air", "cobblestone", "glass"];
    /// Stack size and inventory capacity used for restock sizing
    pub const STACK_SIZE: u32 = 64;
    pub const INVENTORY_SLOTS: u32 = 36;
    /// Consecutive shortfalls before a palette entry is left to verification
    pub const MAX_MATERIAL_RETRIES: u32 = 3;
    /// Unconfirmed attempts before a candidate is left to verification
    pub const MAX_PLACE_ATTEMPTS: u32 = 5;
    /// Block names never scheduled: air variants and decorations that
    /// cannot be placed reliably
    pub const DEFAULT_SKIP_BLOCKS: &[&str] = &[
        "air",
        "cave_air",
        "void_air",
        "red_mushroom",
        "spore_blossom",
        "amethyst_cluster",
        "medium_amethyst_bud",
        "large_amethyst_bud",
        "twisting_vines",
    ];
    /// Vertical window of the mapart batch scan, relative to the candidate
    pub const MAPART_SCAN_UP: i32 = 5;
    pub const MAPART_SCAN_DOWN: i32 = 3;
}

/// Scheduler timing
pub mod scheduler {
    use std::time::Duration;

    /// Poll interval while paused
    pub const PAUSE_POLL: Duration = Duration::from_millis(500);
    /// Scheduler iterations between cooperative yields
    pub const YIELD_INTERVAL: u64 = 64;
    /// Verification rounds after the main loop
    pub const VERIFICATION_ROUNDS: u32 = 3;
    /// Wait after a verification round before re-checking the world
    pub const SETTLE_DELAY: Duration = Duration::from_millis(1000);
}

//! Live-world boundary
//!
//! Traits the printer core consumes from its session layer, the block-change
//! notification channel and the block comparison rules.

pub mod equivalence;
pub mod interfaces;

pub use equivalence::{is_passable, BlockCheck, BlockEquivalence};
pub use interfaces::{
    block_change_channel, publish_block_change, AgentPose, BlockChange, BlockChangeReceiver,
    BlockChangeSender, BuildAgent, HeldItem, MaterialLogistics, MaterialRequest, PlacementAction,
    PlacementSink, WorldBlock, WorldQuery,
};

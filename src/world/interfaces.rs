//! Collaborator interfaces consumed by the printer core
//!
//! The session layer, inventory handling and material stations live outside
//! this crate. They plug in by implementing these traits.

use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Block observed in the live world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldBlock {
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

/// Item stack currently in the agent's hand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldItem {
    pub name: String,
    pub count: u32,
}

/// Read access to the live world
pub trait WorldQuery {
    /// Block at an absolute position. `None` means the region is not loaded
    /// and must be treated as unknown, never as air.
    fn block_at(&self, pos: IVec3) -> Option<WorldBlock>;
}

/// Position and inventory of the agent
pub trait AgentPose {
    fn current_position(&self) -> Vec3;

    /// Immediate relocation, used when replaying a computed path
    fn move_to(&mut self, pos: Vec3);

    fn held_item(&self) -> Option<HeldItem>;

    /// Bring the stack in an inventory slot into the hand
    fn set_held_slot(&mut self, slot: u8);

    /// Inventory slot holding the named item, if any
    fn inventory_slot_of(&self, item: &str) -> Option<u8>;

    fn empty_slot_count(&self) -> u32;
}

/// Placement packet fields
///
/// The encoding of `direction` and the cursor offsets belongs to the world
/// protocol; the printer only derives them from block properties.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementAction {
    pub position: IVec3,
    pub direction: u8,
    pub cursor: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub held_item: String,
}

/// Fire-and-forget placement output
pub trait PlacementSink {
    /// Issue a placement. Confirmation is observed through [`WorldQuery`] or
    /// a block-change notification, never through a return value.
    fn place_block(&mut self, action: &PlacementAction);
}

/// Everything one agent exposes to its scheduler
pub trait BuildAgent: WorldQuery + AgentPose + PlacementSink {}

impl<T: WorldQuery + AgentPose + PlacementSink> BuildAgent for T {}

/// Material request sent to the logistics collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRequest {
    pub name: String,
    pub count: u32,
}

/// Shared material stations
///
/// Calls may stall for seconds while other agents are served. Ordinary
/// insufficiency is reported as a shortfall, not as an error.
#[allow(async_fn_in_trait)]
pub trait MaterialLogistics {
    /// Move `count` of `item` into the agent inventory; returns the shortfall
    async fn withdraw(&self, item: &str, count: u32) -> u32;

    /// Best-effort prefetch of several materials
    async fn restock(&self, items: &[MaterialRequest]);
}

/// World-change notification
#[derive(Debug, Clone, PartialEq)]
pub struct BlockChange {
    pub position: IVec3,
    pub block: Option<WorldBlock>,
}

pub type BlockChangeSender = flume::Sender<BlockChange>;
pub type BlockChangeReceiver = flume::Receiver<BlockChange>;

/// Bounded notification channel; senders drop changes when it is full
pub fn block_change_channel(capacity: usize) -> (BlockChangeSender, BlockChangeReceiver) {
    flume::bounded(capacity)
}

/// Non-blocking publish used by session layers
///
/// Returns `false` when the change was dropped because the channel is full
/// or the scheduler is gone; the scheduler falls back to re-querying.
pub fn publish_block_change(sender: &BlockChangeSender, change: BlockChange) -> bool {
    sender.try_send(change).is_ok()
}

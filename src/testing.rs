//! In-memory collaborators for unit tests

use crate::constants::placement::{INVENTORY_SLOTS, STACK_SIZE};
use crate::world::{
    AgentPose, BlockChange, BlockChangeSender, HeldItem, MaterialLogistics, MaterialRequest,
    PlacementAction, PlacementSink, WorldBlock, WorldQuery,
};
use glam::{IVec3, Vec3};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Route `log` output through the test harness
pub(crate) fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Item counts shared between an agent and its material station
#[derive(Debug, Default)]
pub(crate) struct MockInventory {
    pub items: BTreeMap<String, u32>,
}

impl MockInventory {
    fn stacks_used(&self) -> u32 {
        self.items
            .values()
            .map(|&count| count.div_ceil(STACK_SIZE))
            .sum()
    }
}

/// World plus agent: unset cells are air, cells outside the loaded bounds
/// are unknown
pub(crate) struct MockAgent {
    blocks: FxHashMap<IVec3, WorldBlock>,
    loaded: Option<(IVec3, IVec3)>,
    position: Vec3,
    frozen: bool,
    moves: usize,
    held: Option<String>,
    apply_placements: bool,
    /// Applied placements become visible only after this delay
    placement_delay: Option<Duration>,
    landing: Vec<(Instant, IVec3, WorldBlock)>,
    notifier: Option<BlockChangeSender>,
    pub inventory: Arc<Mutex<MockInventory>>,
    pub placements: Vec<PlacementAction>,
}

impl MockAgent {
    pub fn new(position: Vec3) -> Self {
        Self {
            blocks: FxHashMap::default(),
            loaded: None,
            position,
            frozen: false,
            moves: 0,
            held: None,
            apply_placements: true,
            placement_delay: None,
            landing: Vec::new(),
            notifier: None,
            inventory: Arc::new(Mutex::new(MockInventory::default())),
            placements: Vec::new(),
        }
    }

    pub fn set_block(&mut self, pos: IVec3, name: &str) {
        self.blocks.insert(
            pos,
            WorldBlock {
                name: name.to_string(),
                properties: Default::default(),
            },
        );
    }

    /// Inclusive bounds of the loaded region
    pub fn set_loaded_bounds(&mut self, min: IVec3, max: IVec3) {
        self.loaded = Some((min, max));
    }

    /// Ignore every `move_to`
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn move_count(&self) -> usize {
        self.moves
    }

    /// Whether issued placements change the world
    pub fn set_apply_placements(&mut self, apply: bool) {
        self.apply_placements = apply;
    }

    /// Let the world lag behind issued placements
    pub fn set_placement_delay(&mut self, delay: Duration) {
        self.placement_delay = Some(delay);
    }

    pub fn set_notifier(&mut self, sender: BlockChangeSender) {
        self.notifier = Some(sender);
    }

    pub fn give(&self, item: &str, count: u32) {
        *self
            .inventory
            .lock()
            .items
            .entry(item.to_string())
            .or_default() += count;
    }

    pub fn inventory_count(&self, item: &str) -> u32 {
        self.inventory.lock().items.get(item).copied().unwrap_or(0)
    }

    pub fn placements_at(&self, pos: IVec3) -> usize {
        self.placements.iter().filter(|a| a.position == pos).count()
    }
}

impl WorldQuery for MockAgent {
    fn block_at(&self, pos: IVec3) -> Option<WorldBlock> {
        if let Some((min, max)) = self.loaded {
            if pos.cmplt(min).any() || pos.cmpgt(max).any() {
                return None;
            }
        }
        let now = Instant::now();
        if let Some((_, _, block)) = self
            .landing
            .iter()
            .rev()
            .find(|(at, landed, _)| *landed == pos && *at <= now)
        {
            return Some(block.clone());
        }
        Some(self.blocks.get(&pos).cloned().unwrap_or_else(|| WorldBlock {
            name: "air".to_string(),
            properties: Default::default(),
        }))
    }
}

impl AgentPose for MockAgent {
    fn current_position(&self) -> Vec3 {
        self.position
    }

    fn move_to(&mut self, pos: Vec3) {
        if !self.frozen {
            self.position = pos;
            self.moves += 1;
        }
    }

    fn held_item(&self) -> Option<HeldItem> {
        let name = self.held.clone()?;
        let count = self.inventory_count(&name);
        (count > 0).then_some(HeldItem { name, count })
    }

    fn set_held_slot(&mut self, slot: u8) {
        let inventory = self.inventory.lock();
        self.held = inventory
            .items
            .iter()
            .filter(|(_, &count)| count > 0)
            .nth(slot as usize)
            .map(|(name, _)| name.clone());
    }

    fn inventory_slot_of(&self, item: &str) -> Option<u8> {
        let inventory = self.inventory.lock();
        inventory
            .items
            .iter()
            .filter(|(_, &count)| count > 0)
            .position(|(name, _)| name == item)
            .map(|slot| slot as u8)
    }

    fn empty_slot_count(&self) -> u32 {
        INVENTORY_SLOTS.saturating_sub(self.inventory.lock().stacks_used())
    }
}

impl PlacementSink for MockAgent {
    fn place_block(&mut self, action: &PlacementAction) {
        self.placements.push(action.clone());
        if !self.apply_placements {
            return;
        }
        if let Some(count) = self.inventory.lock().items.get_mut(&action.held_item) {
            *count = count.saturating_sub(1);
        }
        let block = WorldBlock {
            name: action.held_item.clone(),
            properties: Default::default(),
        };
        match self.placement_delay {
            Some(delay) => self
                .landing
                .push((Instant::now() + delay, action.position, block.clone())),
            None => {
                self.blocks.insert(action.position, block.clone());
            }
        }
        if let Some(sender) = &self.notifier {
            let _ = sender.try_send(BlockChange {
                position: action.position,
                block: Some(block),
            });
        }
    }
}

/// Material station sharing an agent's inventory
pub(crate) struct MockStation {
    inventory: Arc<Mutex<MockInventory>>,
    /// `None` for an unlimited supply
    stock: Mutex<Option<FxHashMap<String, u32>>>,
    pub withdrawals: Mutex<Vec<(String, u32)>>,
    pub restocks: Mutex<Vec<Vec<MaterialRequest>>>,
}

impl MockStation {
    pub fn unlimited(agent: &MockAgent) -> Self {
        Self {
            inventory: Arc::clone(&agent.inventory),
            stock: Mutex::new(None),
            withdrawals: Mutex::new(Vec::new()),
            restocks: Mutex::new(Vec::new()),
        }
    }

    pub fn with_stock(agent: &MockAgent, stock: &[(&str, u32)]) -> Self {
        let station = Self::unlimited(agent);
        *station.stock.lock() = Some(
            stock
                .iter()
                .map(|(name, count)| (name.to_string(), *count))
                .collect(),
        );
        station
    }
}

impl MaterialLogistics for MockStation {
    async fn withdraw(&self, item: &str, count: u32) -> u32 {
        self.withdrawals.lock().push((item.to_string(), count));
        let granted = match self.stock.lock().as_mut() {
            None => count,
            Some(stock) => {
                let available = stock.entry(item.to_string()).or_default();
                let granted = count.min(*available);
                *available -= granted;
                granted
            }
        };
        *self
            .inventory
            .lock()
            .items
            .entry(item.to_string())
            .or_default() += granted;
        count - granted
    }

    async fn restock(&self, items: &[MaterialRequest]) {
        self.restocks.lock().push(items.to_vec());
        for request in items {
            self.withdraw(&request.name, request.count).await;
        }
    }
}

//! Block-name comparison rules

use super::interfaces::WorldBlock;
use crate::constants::navigation::PASSABLE_BLOCKS;
use serde::{Deserialize, Serialize};

/// Result of comparing a world block against a target block name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCheck {
    Matches,
    Mismatch,
    /// The world query returned nothing (unloaded region)
    Unknown,
}

/// Groups of block names treated as interchangeable when verifying
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockEquivalence {
    classes: Vec<Vec<String>>,
}

impl Default for BlockEquivalence {
    fn default() -> Self {
        Self::new(vec![
            vec!["air".into(), "water".into(), "brown_mushroom".into()],
            vec!["grass_block".into(), "dirt".into(), "mycelium".into()],
            vec!["bamboo".into(), "bamboo_sapling".into()],
        ])
    }
}

impl BlockEquivalence {
    pub fn new(classes: Vec<Vec<String>>) -> Self {
        Self { classes }
    }

    /// No interchangeable names at all
    pub fn strict() -> Self {
        Self::new(Vec::new())
    }

    /// Whether `actual` satisfies a target named `target`
    ///
    /// Only the first class containing the target is consulted.
    pub fn equivalent(&self, actual: &str, target: &str) -> bool {
        if actual == target {
            return true;
        }
        self.classes
            .iter()
            .find(|class| class.iter().any(|name| name == target))
            .is_some_and(|class| class.iter().any(|name| name == actual))
    }

    pub fn check(&self, actual: Option<&WorldBlock>, target: &str) -> BlockCheck {
        match actual {
            None => BlockCheck::Unknown,
            Some(block) if self.equivalent(&block.name, target) => BlockCheck::Matches,
            Some(_) => BlockCheck::Mismatch,
        }
    }
}

/// Whether an agent can occupy a voxel of this block type
pub fn is_passable(name: &str) -> bool {
    PASSABLE_BLOCKS.contains(&name)
}

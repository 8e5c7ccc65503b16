//! Schematic Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in schematic_operations.rs

use glam::IVec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One block type of a schematic palette
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaletteEntry {
    #[serde(alias = "Name")]
    pub name: String,
    /// Orientation/state properties (facing, axis, half, face, ...)
    #[serde(alias = "Properties", default)]
    pub properties: BTreeMap<String, String>,
}

/// Target structure of a build run
///
/// `blocks` holds one palette id per voxel, laid out plane-major:
/// `index = x + z * size.x + y * size.x * size.z`, so every horizontal
/// layer is one contiguous index range.
#[derive(Debug, Clone)]
pub struct SchematicData {
    pub name: String,
    pub size: IVec3,
    pub palette: Vec<PaletteEntry>,
    pub blocks: Vec<u16>,
}

/// On-disk schematic document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchematicFile {
    #[serde(default)]
    pub name: String,
    pub size: IVec3,
    pub palette: Vec<PaletteEntry>,
    pub blocks: Vec<u16>,
}

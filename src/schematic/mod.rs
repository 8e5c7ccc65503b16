//! Voxel schematic model
//!
//! The target structure of a build run: a cuboid of palette ids plus the
//! palette itself. Immutable once scheduling starts; the only mutation is the
//! one-time material substitution pass.

pub mod schematic_data;
pub mod schematic_operations;

pub use schematic_data::{PaletteEntry, SchematicData, SchematicFile};
pub use schematic_operations::{
    apply_material_substitutions, block_pid_at, block_pid_by_index, contains, create_schematic,
    index, is_orientation_bearing, is_wall_mounted, layer_count, layer_indices, load_from_file,
    material_counts, non_air_count, palette_entry, parse_schematic, require_palette_entry,
    total_volume, vec3,
};

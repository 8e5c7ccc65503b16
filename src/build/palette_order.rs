//! Palette ordering within one layer

use crate::constants::placement::SCAFFOLD_BLOCKS;
use crate::schematic::{is_orientation_bearing, is_wall_mounted, palette_entry, SchematicData};

/// Rank of a palette entry: scaffold, plain, oriented, wall-mounted
fn rank(schematic: &SchematicData, pid: u16) -> u8 {
    let Some(entry) = palette_entry(schematic, pid) else {
        return u8::MAX;
    };
    if SCAFFOLD_BLOCKS.contains(&entry.name.as_str()) {
        0
    } else if is_wall_mounted(entry) {
        3
    } else if is_orientation_bearing(entry) {
        2
    } else {
        1
    }
}

/// Order the palette ids present in a layer
///
/// Scaffold materials come first so obstructions are cleared before finish
/// blocks go down, then plain blocks, then blocks with properties, with
/// wall-mounted ones last. Ties break by block name, then by palette id.
pub fn order_palette(schematic: &SchematicData, pids: &[u16]) -> Vec<u16> {
    let name = |pid: u16| {
        palette_entry(schematic, pid)
            .map(|entry| entry.name.as_str())
            .unwrap_or_default()
    };
    let mut ordered = pids.to_vec();
    ordered.sort_unstable();
    ordered.dedup();
    ordered.sort_by(|&a, &b| {
        rank(schematic, a)
            .cmp(&rank(schematic, b))
            .then_with(|| name(a).cmp(name(b)))
            .then_with(|| a.cmp(&b))
    });
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schematic::{create_schematic, PaletteEntry};
    use glam::IVec3;
    use std::collections::BTreeMap;

    fn entry(name: &str, props: &[(&str, &str)]) -> PaletteEntry {
        PaletteEntry {
            name: name.to_string(),
            properties: props
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn schematic() -> SchematicData {
        let palette = vec![
            entry("air", &[]),
            entry("stone_button", &[("face", "wall"), ("facing", "north")]),
            entry("oak_stairs", &[("facing", "east")]),
            entry("stone", &[]),
            entry("glass", &[]),
            entry("birch_planks", &[]),
            entry("cobblestone", &[]),
            entry("acacia_log", &[("axis", "y")]),
        ];
        create_schematic("order", IVec3::new(8, 1, 1), palette, (0..8).collect())
            .expect("valid schematic")
    }

    #[test]
    fn test_full_order() {
        let s = schematic();
        let ordered = order_palette(&s, &[1, 2, 3, 4, 5, 6, 7, 0]);
        // air, cobblestone, glass | birch_planks, stone | acacia_log, oak_stairs | stone_button
        assert_eq!(ordered, vec![0, 6, 4, 5, 3, 7, 2, 1]);
    }

    #[test]
    fn test_order_is_deterministic() {
        let s = schematic();
        let a = order_palette(&s, &[7, 3, 1, 5]);
        let b = order_palette(&s, &[5, 1, 3, 7]);
        assert_eq!(a, b);
        assert_eq!(a, order_palette(&s, &a));
    }

    #[test]
    fn test_scaffold_first_and_wall_last() {
        let s = schematic();
        let ordered = order_palette(&s, &[1, 2, 4, 3]);
        assert_eq!(ordered.first(), Some(&4));
        assert_eq!(ordered.last(), Some(&1));
    }

    #[test]
    fn test_duplicates_collapse() {
        let s = schematic();
        assert_eq!(order_palette(&s, &[3, 3, 5, 3]), vec![5, 3]);
    }

    #[test]
    fn test_same_name_ties_break_on_pid() {
        let palette = vec![
            entry("air", &[]),
            entry("oak_log", &[("axis", "x")]),
            entry("oak_log", &[("axis", "y")]),
        ];
        let s = create_schematic("ties", IVec3::new(3, 1, 1), palette, vec![0, 1, 2])
            .expect("valid schematic");
        assert_eq!(order_palette(&s, &[2, 1]), vec![1, 2]);
    }
}

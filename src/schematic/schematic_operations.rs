//! Schematic Operations - Pure DOP Functions
//!
//! Index/coordinate conversion, palette lookups, material substitution and
//! file loading for the schematic model.

use super::schematic_data::{PaletteEntry, SchematicData, SchematicFile};
use crate::constants::schematic::AIR_PID;
use crate::error::{ErrorContext, OptionExt, PrinterError, PrinterResult};
use flate2::read::GzDecoder;
use glam::IVec3;
use std::io::Read;
use std::ops::Range;
use std::path::Path;

/// Create a schematic, validating dimensions and palette references
pub fn create_schematic(
    name: &str,
    size: IVec3,
    palette: Vec<PaletteEntry>,
    blocks: Vec<u16>,
) -> PrinterResult<SchematicData> {
    if size.x <= 0 || size.y <= 0 || size.z <= 0 {
        return Err(PrinterError::InvalidSchematic {
            reason: format!("non-positive size {:?}", size),
        });
    }
    if palette.is_empty() {
        return Err(PrinterError::InvalidSchematic {
            reason: "palette is empty (entry 0 must be air)".to_string(),
        });
    }

    let volume = (size.x as usize) * (size.y as usize) * (size.z as usize);
    if blocks.len() != volume {
        return Err(PrinterError::InvalidSchematic {
            reason: format!("{} voxels for a volume of {}", blocks.len(), volume),
        });
    }
    if let Some(&pid) = blocks.iter().find(|&&pid| pid as usize >= palette.len()) {
        return Err(PrinterError::PaletteIdOutOfRange {
            pid,
            palette_len: palette.len(),
        });
    }

    Ok(SchematicData {
        name: name.to_string(),
        size,
        palette,
        blocks,
    })
}

/// Number of voxels in the schematic volume
pub fn total_volume(data: &SchematicData) -> usize {
    data.blocks.len()
}

/// Number of horizontal layers (Y extent)
pub fn layer_count(data: &SchematicData) -> i32 {
    data.size.y
}

/// Voxels per horizontal layer
pub fn layer_area(data: &SchematicData) -> usize {
    (data.size.x as usize) * (data.size.z as usize)
}

/// Check if a relative position lies inside the schematic volume
pub fn contains(data: &SchematicData, pos: IVec3) -> bool {
    pos.cmpge(IVec3::ZERO).all() && pos.cmplt(data.size).all()
}

/// Linear index of a relative position, `None` outside the volume
pub fn index(data: &SchematicData, pos: IVec3) -> Option<usize> {
    if !contains(data, pos) {
        return None;
    }
    let (sx, sz) = (data.size.x as usize, data.size.z as usize);
    Some(pos.x as usize + pos.z as usize * sx + pos.y as usize * sx * sz)
}

/// Relative position of a linear index
///
/// Inverse of [`index`] for every index below [`total_volume`].
pub fn vec3(data: &SchematicData, index: usize) -> IVec3 {
    let sx = data.size.x as usize;
    let area = layer_area(data);
    IVec3::new(
        (index % sx) as i32,
        (index / area) as i32,
        ((index % area) / sx) as i32,
    )
}

/// Palette id stored at a linear index, air outside the volume
pub fn block_pid_by_index(data: &SchematicData, index: usize) -> u16 {
    data.blocks.get(index).copied().unwrap_or(AIR_PID)
}

/// Palette id stored at a relative position, air outside the volume
pub fn block_pid_at(data: &SchematicData, pos: IVec3) -> u16 {
    index(data, pos)
        .map(|i| block_pid_by_index(data, i))
        .unwrap_or(AIR_PID)
}

/// Palette entry for a palette id
pub fn palette_entry(data: &SchematicData, pid: u16) -> Option<&PaletteEntry> {
    data.palette.get(pid as usize)
}

/// Palette entry for a palette id, as a hard error when missing
pub fn require_palette_entry(data: &SchematicData, pid: u16) -> PrinterResult<&PaletteEntry> {
    palette_entry(data, pid).ok_or_printer(|| PrinterError::PaletteIdOutOfRange {
        pid,
        palette_len: data.palette.len(),
    })
}

/// Linear index range of one horizontal layer
pub fn layer_indices(data: &SchematicData, layer: i32) -> Range<usize> {
    if layer < 0 || layer >= data.size.y {
        return 0..0;
    }
    let area = layer_area(data);
    let start = layer as usize * area;
    start..start + area
}

/// Count of non-air voxels
pub fn non_air_count(data: &SchematicData) -> usize {
    data.blocks.iter().filter(|&&pid| pid != AIR_PID).count()
}

/// Voxel count per palette id
pub fn material_counts(data: &SchematicData) -> Vec<u32> {
    let mut counts = vec![0u32; data.palette.len()];
    for &pid in &data.blocks {
        counts[pid as usize] += 1;
    }
    counts
}

/// Whether a palette entry carries orientation/state properties
pub fn is_orientation_bearing(entry: &PaletteEntry) -> bool {
    !entry.properties.is_empty()
}

/// Whether a palette entry is mounted on a wall (buttons, levers, ...)
pub fn is_wall_mounted(entry: &PaletteEntry) -> bool {
    entry.properties.get("face").map(String::as_str) == Some("wall")
}

/// Rename palette entries before scheduling
///
/// Entry 0 is never renamed. When a rename makes an entry identical to an
/// earlier one, its voxels are remapped onto the earlier id so a single
/// palette pass covers both. Returns the number of renamed entries.
pub fn apply_material_substitutions(
    data: &mut SchematicData,
    substitutions: &[(String, String)],
) -> usize {
    let mut renamed = 0;
    for entry in data.palette.iter_mut().skip(1) {
        if let Some((_, to)) = substitutions.iter().find(|(from, _)| *from == entry.name) {
            log::debug!("[Schematic] Substituting {} -> {}", entry.name, to);
            entry.name = to.clone();
            renamed += 1;
        }
    }
    if renamed == 0 {
        return 0;
    }

    let mut remap: Vec<u16> = (0..data.palette.len() as u16).collect();
    for later in 1..data.palette.len() {
        if let Some(earlier) = (1..later).find(|&e| data.palette[e] == data.palette[later]) {
            remap[later] = remap[earlier];
        }
    }
    for pid in data.blocks.iter_mut() {
        *pid = remap[*pid as usize];
    }
    renamed
}

/// Parse a schematic document
pub fn parse_schematic(json: &str) -> PrinterResult<SchematicData> {
    let file: SchematicFile = serde_json::from_str(json)?;
    create_schematic(&file.name, file.size, file.palette, file.blocks)
}

/// Load a schematic document from disk, gunzipping `.gz` files
pub fn load_from_file(path: &Path) -> PrinterResult<SchematicData> {
    let bytes = std::fs::read(path).map_err(|e| PrinterError::LoadFailed {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;

    let json = if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        let mut text = String::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_string(&mut text)
            .with_context(|| format!("decompressing {}", path.display()))?;
        text
    } else {
        String::from_utf8(bytes).with_context(|| format!("decoding {}", path.display()))?
    };

    let mut schematic = parse_schematic(&json)?;
    if schematic.name.is_empty() {
        schematic.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    log::info!(
        "[Schematic] Loaded '{}' {}x{}x{} with {} palette entries",
        schematic.name,
        schematic.size.x,
        schematic.size.y,
        schematic.size.z,
        schematic.palette.len()
    );
    Ok(schematic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::collections::BTreeMap;
    use std::io::Write;

    fn entry(name: &str) -> PaletteEntry {
        PaletteEntry {
            name: name.to_string(),
            properties: BTreeMap::new(),
        }
    }

    fn sample() -> SchematicData {
        let size = IVec3::new(3, 4, 5);
        let volume = 60;
        let blocks = (0..volume).map(|i| (i % 3) as u16).collect();
        create_schematic(
            "sample",
            size,
            vec![entry("air"), entry("stone"), entry("dirt")],
            blocks,
        )
        .expect("valid schematic")
    }

    #[test]
    fn test_index_vec3_bijection() {
        let s = sample();
        for i in 0..total_volume(&s) {
            let pos = vec3(&s, i);
            assert!(contains(&s, pos), "{:?} outside volume", pos);
            assert_eq!(index(&s, pos), Some(i));
        }
    }

    #[test]
    fn test_layers_are_contiguous() {
        let s = sample();
        for layer in 0..layer_count(&s) {
            for i in layer_indices(&s, layer) {
                assert_eq!(vec3(&s, i).y, layer);
            }
        }
        assert_eq!(layer_indices(&s, 4), 0..0);
    }

    #[test]
    fn test_out_of_bounds_is_air() {
        let s = sample();
        assert_eq!(index(&s, IVec3::new(3, 0, 0)), None);
        assert_eq!(index(&s, IVec3::new(0, -1, 0)), None);
        assert_eq!(block_pid_at(&s, IVec3::new(0, 0, 5)), AIR_PID);
    }

    #[test]
    fn test_rejects_bad_palette_reference() {
        let result = create_schematic("bad", IVec3::new(1, 1, 2), vec![entry("air")], vec![0, 1]);
        assert!(matches!(
            result,
            Err(PrinterError::PaletteIdOutOfRange { pid: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_voxel_count() {
        let result = create_schematic("bad", IVec3::new(2, 1, 2), vec![entry("air")], vec![0]);
        assert!(matches!(result, Err(PrinterError::InvalidSchematic { .. })));
    }

    #[test]
    fn test_substitution_merges_identical_entries() {
        let mut s = create_schematic(
            "sub",
            IVec3::new(3, 1, 1),
            vec![entry("air"), entry("stone"), entry("andesite")],
            vec![1, 2, 0],
        )
        .expect("valid schematic");

        let renamed =
            apply_material_substitutions(&mut s, &[("andesite".to_string(), "stone".to_string())]);

        assert_eq!(renamed, 1);
        assert_eq!(s.blocks, vec![1, 1, 0]);
        assert_eq!(material_counts(&s), vec![1, 2, 0]);
    }

    #[test]
    fn test_substitution_never_renames_air() {
        let mut s = sample();
        let renamed =
            apply_material_substitutions(&mut s, &[("air".to_string(), "glass".to_string())]);
        assert_eq!(renamed, 0);
        assert_eq!(s.palette[0].name, "air");
    }

    #[test]
    fn test_orientation_predicates() {
        let mut button = entry("stone_button");
        assert!(!is_orientation_bearing(&button));
        button.properties.insert("face".to_string(), "wall".to_string());
        assert!(is_orientation_bearing(&button));
        assert!(is_wall_mounted(&button));
    }

    #[test]
    fn test_load_gzipped_file() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("house.json.gz");
        let json = r#"{"size":[2,1,1],"palette":[{"Name":"air"},{"Name":"oak_log","Properties":{"axis":"x"}}],"blocks":[1,0]}"#;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes()).expect("compress");
        std::fs::write(&path, encoder.finish().expect("finish")).expect("write");

        let s = load_from_file(&path).expect("load");
        assert_eq!(s.name, "house.json");
        assert_eq!(non_air_count(&s), 1);
        assert_eq!(
            palette_entry(&s, 1).and_then(|e| e.properties.get("axis")),
            Some(&"x".to_string())
        );
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_from_file(Path::new("/nonexistent/schematic.json"));
        assert!(matches!(result, Err(PrinterError::LoadFailed { .. })));
    }
}

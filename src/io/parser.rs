use crate::core::structure::UnitCell;
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const CELL_TAGS: [&str; 6] = [
    "_cell_length_a",
    "_cell_length_b",
    "_cell_length_c",
    "_cell_angle_alpha",
    "_cell_angle_beta",
    "_cell_angle_gamma",
];

/// Parses a float value from a CIF string, safely removing uncertainty parentheses.
/// Example: "1.234(5)" -> 1.234
fn parse_cif_float(s: &str) -> Result<f64> {
    let clean_s = s.split('(').next().unwrap_or(s);
    clean_s.parse::<f64>().with_context(|| format!("Failed to parse '{}' as float", s))
}

/// Reads the unit cell of a CIF file.
pub fn cell_from_cif(path: &Path) -> Result<UnitCell> {
    let contents = fs::read_to_string(path).with_context(|| format!("Could not read CIF file: {:?}", path))?;
    cell_from_cif_str(&contents).with_context(|| format!("Invalid unit cell in {:?}", path))
}

/// Reads the `_cell_length_*` / `_cell_angle_*` tags from CIF text.
/// Only the cell is needed, so atom loops are ignored.
pub fn cell_from_cif_str(contents: &str) -> Result<UnitCell> {
    let mut params: HashMap<&str, f64> = HashMap::new();

    for line in contents.lines().map(str::trim) {
        if !line.starts_with("_cell_") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 2 {
            if let Some(tag) = CELL_TAGS.iter().find(|&&t| t == parts[0]) {
                params.insert(*tag, parse_cif_float(parts[1])?);
            }
        }
    }

    let get_param = |key: &str| -> Result<f64> {
        params.get(key).copied().ok_or_else(|| anyhow!("CIF missing tag: {}", key))
    };

    Ok(UnitCell::new(
        [get_param(CELL_TAGS[0])?, get_param(CELL_TAGS[1])?, get_param(CELL_TAGS[2])?],
        [get_param(CELL_TAGS[3])?, get_param(CELL_TAGS[4])?, get_param(CELL_TAGS[5])?],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALPHA0: &str = "\
data_alpha0
_symmetry_space_group_name_H-M 'P 1 21/c 1'
_cell_length_a   3.8672(3)
_cell_length_b   30.896(2)
_cell_length_c   6.0220(5)
_cell_angle_alpha   90
_cell_angle_beta    90.489(4)
_cell_angle_gamma   90
_cell_volume        719.5(1)
loop_
_atom_site_label
_atom_site_fract_x
Cl1 0.1234(2)
";

    #[test]
    fn test_reads_cell_with_uncertainties() {
        let cell = cell_from_cif_str(ALPHA0).unwrap();
        assert_eq!(cell, UnitCell::new([3.8672, 30.896, 6.0220], [90.0, 90.489, 90.0]));
    }

    #[test]
    fn test_missing_tag_is_named() {
        let text = ALPHA0.replace("_cell_angle_gamma   90\n", "");
        let err = cell_from_cif_str(&text).unwrap_err();
        assert!(err.to_string().contains("_cell_angle_gamma"));
    }

    #[test]
    fn test_bad_number_is_reported() {
        let text = ALPHA0.replace("3.8672(3)", "abc");
        assert!(cell_from_cif_str(&text).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(cell_from_cif(Path::new("does/not/exist.cif")).is_err());
    }
}

use serde::{Deserialize, Serialize};

/// The crystallographic frame a structure is expressed in.
///
/// Carried through completion, charge evaluation, and PDB export so fragments
/// keep the unit-cell context of the structure they were cut from. The default
/// frame is a P1 unit box, adequate for non-crystallographic inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrystalFrame {
    /// Unit-cell edge lengths (a, b, c) in Angstroms.
    pub lengths: [f64; 3],
    /// Unit-cell angles (alpha, beta, gamma) in degrees.
    pub angles: [f64; 3],
    /// Space-group symbol (e.g., "P 1").
    pub space_group: String,
}

impl CrystalFrame {
    pub fn new(lengths: [f64; 3], angles: [f64; 3], space_group: &str) -> Self {
        Self {
            lengths,
            angles,
            space_group: space_group.to_string(),
        }
    }
}

impl Default for CrystalFrame {
    fn default() -> Self {
        Self {
            lengths: [1.0, 1.0, 1.0],
            angles: [90.0, 90.0, 90.0],
            space_group: "P 1".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_frame_is_p1_unit_box() {
        let frame = CrystalFrame::default();
        assert_eq!(frame.lengths, [1.0, 1.0, 1.0]);
        assert_eq!(frame.angles, [90.0, 90.0, 90.0]);
        assert_eq!(frame.space_group, "P 1");
    }

    #[test]
    fn new_frame_stores_cell_parameters() {
        let frame = CrystalFrame::new([23.26, 22.914, 22.58], [90.0, 90.0, 90.0], "P 1");
        assert_eq!(frame.lengths[0], 23.26);
        assert_eq!(frame.space_group, "P 1");
    }
}

use super::ids::ResidueId;
use nalgebra::Point3;

/// Represents an atom in a molecular structure.
///
/// This struct encapsulates the identity and position of a single atom,
/// including the bookkeeping fields the fragmentation engine depends on:
/// the stable global serial (the index space all fragment selections are
/// expressed in) and the alternate-location tag distinguishing mutually
/// exclusive conformations of the same physical site.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The name of the atom (e.g., "CA", "N", "O").
    pub name: String,
    /// The chemical element symbol (e.g., "C", "N", "O").
    pub element: String,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// The stable, 1-based global serial of the atom.
    ///
    /// Serials define a total order over the atoms of a structure and are
    /// the currency of cross-structure selection translation: an atom of
    /// the base structure keeps its serial in the symmetry-expanded
    /// superstructure and in every alternate-location variant view.
    pub serial: u32,
    /// The alternate-location tag; `None` marks a primary/common atom
    /// present in every conformational variant.
    pub alt_loc: Option<char>,
    /// The crystallographic occupancy in `[0.0, 1.0]`.
    pub occupancy: f64,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    /// Creates a new `Atom` with default values for most fields.
    ///
    /// The atom starts as a primary (no altloc) atom at full occupancy;
    /// the remaining fields can be modified afterward as needed.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `residue_id` - The ID of the residue this atom belongs to.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(name: &str, residue_id: ResidueId, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            element: guess_element(name),
            residue_id,
            serial: 0,
            alt_loc: None,
            occupancy: 1.0,
            position,
        }
    }

    /// Returns `true` if this atom belongs to a specific alternate conformation.
    pub fn is_alternate(&self) -> bool {
        self.alt_loc.is_some()
    }
}

/// Derives the element symbol from a PDB-style atom name.
///
/// Follows the common convention that the element is the leading alphabetic
/// character of the name once digits are stripped, with two-letter elements
/// left to callers that have the full record available.
fn guess_element(name: &str) -> String {
    name.chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ids::ResidueId;
    use nalgebra::Point3;

    #[test]
    fn new_atom_has_expected_default_fields() {
        let residue_id = ResidueId::default();
        let atom = Atom::new("CA", residue_id, Point3::new(1.0, 2.0, 3.0));

        assert_eq!(atom.name, "CA");
        assert_eq!(atom.element, "C");
        assert_eq!(atom.residue_id, residue_id);
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.serial, 0);
        assert_eq!(atom.alt_loc, None);
        assert_eq!(atom.occupancy, 1.0);
    }

    #[test]
    fn primary_atom_is_not_alternate() {
        let atom = Atom::new("N", ResidueId::default(), Point3::origin());
        assert!(!atom.is_alternate());
    }

    #[test]
    fn tagged_atom_is_alternate() {
        let mut atom = Atom::new("CB", ResidueId::default(), Point3::origin());
        atom.alt_loc = Some('A');
        assert!(atom.is_alternate());
    }

    #[test]
    fn element_guess_strips_digits_and_uppercases() {
        let atom = Atom::new("1HB2", ResidueId::default(), Point3::origin());
        assert_eq!(atom.element, "H");
        let atom = Atom::new("og1", ResidueId::default(), Point3::origin());
        assert_eq!(atom.element, "O");
    }

    #[test]
    fn atom_equality_and_clone_works() {
        let mut atom1 = Atom::new("CA", ResidueId::default(), Point3::origin());
        atom1.alt_loc = Some('B');
        let atom2 = atom1.clone();
        assert_eq!(atom1, atom2);
    }
}

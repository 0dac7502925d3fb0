use crate::core::models::ids::{AtomId, ResidueId};
use crate::core::models::system::MolecularSystem;
use nalgebra::Point3;
use std::collections::HashMap;

/// A read-only view of one alternate-location realization of a structure.
///
/// A view keeps the common atoms plus (for a tagged view) the atoms of one
/// specific altloc. Atoms are re-indexed into a dense local space in serial
/// order; residues keep their global indices, since altloc filtering drops
/// atoms but never whole residues. The view is the index space the
/// pair-interaction oracle speaks; translation back to the global frame goes
/// through [`StructureView::to_serials`].
pub struct StructureView<'a> {
    system: &'a MolecularSystem,
    /// The altloc tag realized by this view; `None` for the single-variant view.
    pub tag: Option<char>,
    atoms: Vec<AtomId>,
    serials: Vec<u32>,
    residue_of_atom: Vec<usize>,
    residue_atoms: Vec<Vec<usize>>,
}

impl<'a> StructureView<'a> {
    /// A view over every atom of the system.
    pub fn full(system: &'a MolecularSystem) -> Self {
        Self::filtered(system, None)
    }

    /// A view over the common atoms plus the atoms tagged `tag`.
    pub fn for_altloc(system: &'a MolecularSystem, tag: char) -> Self {
        Self::filtered(system, Some(tag))
    }

    fn filtered(system: &'a MolecularSystem, tag: Option<char>) -> Self {
        let residue_index: HashMap<ResidueId, usize> = system
            .residues_iter()
            .enumerate()
            .map(|(index, (id, _))| (id, index))
            .collect();

        let mut atoms = Vec::new();
        let mut serials = Vec::new();
        let mut residue_of_atom = Vec::new();
        let mut residue_atoms = vec![Vec::new(); system.residue_count()];

        for (atom_id, atom) in system.atoms_iter() {
            let keep = match atom.alt_loc {
                None => true,
                Some(t) => tag == Some(t),
            };
            if !keep {
                continue;
            }
            let local = atoms.len();
            let residue = residue_index[&atom.residue_id];
            atoms.push(atom_id);
            serials.push(atom.serial);
            residue_of_atom.push(residue);
            residue_atoms[residue].push(local);
        }

        Self {
            system,
            tag,
            atoms,
            serials,
            residue_of_atom,
            residue_atoms,
        }
    }

    pub fn system(&self) -> &'a MolecularSystem {
        self.system
    }

    /// Number of atoms visible in this view.
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Number of residues (shared with the underlying system).
    pub fn residue_count(&self) -> usize {
        self.residue_atoms.len()
    }

    /// Position of a local atom.
    pub fn position(&self, local: usize) -> Point3<f64> {
        self.system
            .atom(self.atoms[local])
            .map(|a| a.position)
            .unwrap_or_else(Point3::origin)
    }

    /// Global serial of a local atom.
    pub fn serial(&self, local: usize) -> u32 {
        self.serials[local]
    }

    /// Global residue index of a local atom.
    pub fn residue_index(&self, local: usize) -> usize {
        self.residue_of_atom[local]
    }

    /// Local atoms of a residue (empty if the residue has no atom in this view).
    pub fn atoms_of_residue(&self, residue_index: usize) -> &[usize] {
        self.residue_atoms
            .get(residue_index)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Translates local atom indices into sorted global serials.
    pub fn to_serials(&self, locals: &[usize]) -> Vec<u32> {
        let mut serials: Vec<u32> = locals.iter().map(|&l| self.serials[l]).collect();
        serials.sort_unstable();
        serials
    }
}

/// Enumerates the alternate-location variants of a structure.
///
/// One view per distinct altloc tag, in tag order; a structure without
/// alternate locations yields exactly one full view. There are therefore
/// always `max(1, n_tags)` variants, with the first view acting as the
/// reconciliation reference.
pub fn altloc_variants(system: &MolecularSystem) -> Vec<StructureView<'_>> {
    let tags = system.altloc_tags();
    if tags.is_empty() {
        vec![StructureView::full(system)]
    } else {
        tags.into_iter()
            .map(|tag| StructureView::for_altloc(system, tag))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::chain::ChainType;
    use crate::core::models::residue::ResidueType;

    fn altloc_system() -> MolecularSystem {
        let mut system = MolecularSystem::new();
        let chain = system.add_chain('A', ChainType::Protein);
        let ser = system
            .add_residue(chain, 1, "SER", Some(ResidueType::Serine))
            .unwrap();
        let mut ca = Atom::new("CA", ser, Point3::new(0.0, 0.0, 0.0));
        ca.serial = 0;
        system.add_atom_to_residue(ser, ca).unwrap();
        for (tag, y) in [('A', 1.0), ('B', -1.0)] {
            let mut og = Atom::new("OG", ser, Point3::new(1.0, y, 0.0));
            og.alt_loc = Some(tag);
            system.add_atom_to_residue(ser, og).unwrap();
        }
        let gly = system
            .add_residue(chain, 2, "GLY", Some(ResidueType::Glycine))
            .unwrap();
        system
            .add_atom_to_residue(gly, Atom::new("CA", gly, Point3::new(3.0, 0.0, 0.0)))
            .unwrap();
        system
    }

    #[test]
    fn full_view_sees_every_atom() {
        let system = altloc_system();
        let view = StructureView::full(&system);
        assert_eq!(view.atom_count(), 4);
        assert_eq!(view.residue_count(), 2);
    }

    #[test]
    fn tagged_view_keeps_common_and_own_atoms_only() {
        let system = altloc_system();
        let view = StructureView::for_altloc(&system, 'A');
        assert_eq!(view.atom_count(), 3);
        assert_eq!(view.to_serials(&[0, 1, 2]), vec![1, 2, 4]);

        let view_b = StructureView::for_altloc(&system, 'B');
        assert_eq!(view_b.to_serials(&[0, 1, 2]), vec![1, 3, 4]);
    }

    #[test]
    fn residue_indices_stay_global_across_views() {
        let system = altloc_system();
        let view = StructureView::for_altloc(&system, 'B');
        assert_eq!(view.residue_count(), 2);
        assert_eq!(view.atoms_of_residue(0).len(), 2);
        assert_eq!(view.atoms_of_residue(1).len(), 1);
        let last_local = view.atoms_of_residue(1)[0];
        assert_eq!(view.residue_index(last_local), 1);
    }

    #[test]
    fn variant_enumeration_matches_tag_set() {
        let system = altloc_system();
        let variants = altloc_variants(&system);
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].tag, Some('A'));
        assert_eq!(variants[1].tag, Some('B'));
    }

    #[test]
    fn single_conformation_yields_one_full_variant() {
        let mut system = MolecularSystem::new();
        let chain = system.add_chain('A', ChainType::Protein);
        let gly = system
            .add_residue(chain, 1, "GLY", Some(ResidueType::Glycine))
            .unwrap();
        system
            .add_atom_to_residue(gly, Atom::new("CA", gly, Point3::origin()))
            .unwrap();

        let variants = altloc_variants(&system);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].tag, None);
        assert_eq!(variants[0].atom_count(), 1);
    }
}

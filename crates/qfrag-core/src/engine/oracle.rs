use crate::engine::error::EngineError;
use crate::engine::variants::StructureView;
use kiddo::{KdTree, SquaredEuclidean};
use std::collections::BTreeSet;

/// Default interatomic distance, in Angstroms, below which two residues are
/// considered to interact.
pub const DEFAULT_CONTACT_CUTOFF: f64 = 4.0;

/// The result of growing a residue seed into a buffered fragment.
///
/// All atom indices are local to the [`StructureView`] the oracle was given;
/// residue indices are global (views never drop residues).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interactions {
    /// Atoms strictly inside the seed residues.
    pub cluster_atoms: Vec<usize>,
    /// Atoms of the grown fragment: the seed plus one buffer shell.
    pub fragment_atoms: Vec<usize>,
    /// Residue-level membership of the grown fragment, used to seed a
    /// second buffer shell.
    pub fragment_residues: Vec<usize>,
}

/// The pair-interaction collaborator.
///
/// Implementations decide which atoms and residues of a structure interact.
/// The engine uses [`residue_pairs`](PairInteractionOracle::residue_pairs) to
/// build the clustering graph and [`grow`](PairInteractionOracle::grow) to
/// expand a cluster into its buffered fragment. The shipped
/// [`DistanceOracle`] is a geometric stand-in; sophisticated interaction
/// models plug in behind this trait without touching the engine.
pub trait PairInteractionOracle {
    /// Residue pairs that interact anywhere in the view, as undirected
    /// `(i, j)` index pairs with `i < j`.
    fn residue_pairs(&self, view: &StructureView) -> Result<Vec<(usize, usize)>, EngineError>;

    /// Grows `seed` (residue indices) into a fragment with one buffer shell.
    fn grow(&self, view: &StructureView, seed: &[usize]) -> Result<Interactions, EngineError>;
}

/// A purely geometric pair-interaction oracle.
///
/// Two residues interact when any of their atoms lie within
/// `contact_cutoff`. Buffer growth selects whole residues: every residue
/// with an atom within the cutoff of a seed atom joins the fragment.
#[derive(Debug, Clone)]
pub struct DistanceOracle {
    pub contact_cutoff: f64,
}

impl DistanceOracle {
    pub fn new(contact_cutoff: f64) -> Self {
        Self { contact_cutoff }
    }

    fn contact_tree(&self, view: &StructureView) -> KdTree<f64, 3> {
        let mut tree = KdTree::new();
        for local in 0..view.atom_count() {
            let p = view.position(local);
            tree.add(&[p.x, p.y, p.z], local as u64);
        }
        tree
    }

    /// Residues with any atom within the cutoff of any atom of `residues`.
    fn neighbor_residues(
        &self,
        view: &StructureView,
        tree: &KdTree<f64, 3>,
        residues: &BTreeSet<usize>,
    ) -> BTreeSet<usize> {
        let radius_sq = self.contact_cutoff * self.contact_cutoff;
        let mut neighbors = residues.clone();
        for &residue in residues {
            for &local in view.atoms_of_residue(residue) {
                let p = view.position(local);
                for hit in tree.within_unsorted::<SquaredEuclidean>(&[p.x, p.y, p.z], radius_sq) {
                    neighbors.insert(view.residue_index(hit.item as usize));
                }
            }
        }
        neighbors
    }
}

impl Default for DistanceOracle {
    fn default() -> Self {
        Self::new(DEFAULT_CONTACT_CUTOFF)
    }
}

impl PairInteractionOracle for DistanceOracle {
    fn residue_pairs(&self, view: &StructureView) -> Result<Vec<(usize, usize)>, EngineError> {
        let tree = self.contact_tree(view);
        let radius_sq = self.contact_cutoff * self.contact_cutoff;
        let mut pairs = BTreeSet::new();

        for local in 0..view.atom_count() {
            let residue_a = view.residue_index(local);
            let p = view.position(local);
            for hit in tree.within_unsorted::<SquaredEuclidean>(&[p.x, p.y, p.z], radius_sq) {
                let residue_b = view.residue_index(hit.item as usize);
                if residue_a < residue_b {
                    pairs.insert((residue_a, residue_b));
                } else if residue_b < residue_a {
                    pairs.insert((residue_b, residue_a));
                }
            }
        }
        Ok(pairs.into_iter().collect())
    }

    fn grow(&self, view: &StructureView, seed: &[usize]) -> Result<Interactions, EngineError> {
        for &residue in seed {
            if residue >= view.residue_count() {
                return Err(EngineError::Oracle(format!(
                    "seed residue index {residue} out of range ({} residues)",
                    view.residue_count()
                )));
            }
        }

        let seed_set: BTreeSet<usize> = seed.iter().copied().collect();
        let tree = self.contact_tree(view);
        let fragment_residues = self.neighbor_residues(view, &tree, &seed_set);

        let atoms_of = |residues: &BTreeSet<usize>| -> Vec<usize> {
            let mut atoms: Vec<usize> = residues
                .iter()
                .flat_map(|&r| view.atoms_of_residue(r).iter().copied())
                .collect();
            atoms.sort_unstable();
            atoms
        };

        Ok(Interactions {
            cluster_atoms: atoms_of(&seed_set),
            fragment_atoms: atoms_of(&fragment_residues),
            fragment_residues: fragment_residues.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::chain::ChainType;
    use crate::core::models::system::MolecularSystem;
    use nalgebra::Point3;

    /// Three single-atom residues on a line at x = 0, 3, 20.
    fn line_system() -> MolecularSystem {
        let mut system = MolecularSystem::new();
        let chain = system.add_chain('A', ChainType::Protein);
        for (number, x) in [(1, 0.0), (2, 3.0), (3, 20.0)] {
            let residue = system.add_residue(chain, number, "UNK", None).unwrap();
            system
                .add_atom_to_residue(residue, Atom::new("X", residue, Point3::new(x, 0.0, 0.0)))
                .unwrap();
        }
        system
    }

    #[test]
    fn residue_pairs_respect_the_cutoff() {
        let system = line_system();
        let view = StructureView::full(&system);
        let oracle = DistanceOracle::default();
        assert_eq!(oracle.residue_pairs(&view).unwrap(), vec![(0, 1)]);
    }

    #[test]
    fn grow_adds_one_shell_of_whole_residues() {
        let system = line_system();
        let view = StructureView::full(&system);
        let oracle = DistanceOracle::default();

        let grown = oracle.grow(&view, &[0]).unwrap();
        assert_eq!(grown.cluster_atoms, vec![0]);
        assert_eq!(grown.fragment_atoms, vec![0, 1]);
        assert_eq!(grown.fragment_residues, vec![0, 1]);
    }

    #[test]
    fn second_seeding_reaches_the_next_shell() {
        let system = line_system();
        let view = StructureView::full(&system);
        let oracle = DistanceOracle::new(17.5);

        let first = oracle.grow(&view, &[0]).unwrap();
        let second = oracle.grow(&view, &first.fragment_residues).unwrap();
        assert_eq!(second.fragment_residues, vec![0, 1, 2]);
    }

    #[test]
    fn out_of_range_seed_is_an_oracle_error() {
        let system = line_system();
        let view = StructureView::full(&system);
        let oracle = DistanceOracle::default();
        assert!(matches!(
            oracle.grow(&view, &[7]),
            Err(EngineError::Oracle(_))
        ));
    }
}

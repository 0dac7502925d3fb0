use super::atom::Atom;
use super::chain::{Chain, ChainType};
use super::ids::{AtomId, ChainId, ResidueId};
use super::residue::{Residue, ResidueType};
use slotmap::SlotMap;
use std::collections::{BTreeSet, HashMap};

/// Maximum C–N distance for two chain-consecutive residues to be considered
/// peptide-bonded, in Angstroms.
const PEPTIDE_BOND_CUTOFF: f64 = 1.8;

/// Represents a complete molecular system with atoms, residues, and chains.
///
/// This struct is the central data structure of the library. Beyond plain
/// storage it maintains the two ordered index spaces the fragmentation
/// invariants are stated in:
///
/// - the **serial order** of atoms (1-based, stable across variant views and
///   the symmetry-expanded superstructure), and
/// - the **residue order** (0-based, the node space of the interaction graph
///   and of every cluster).
#[derive(Debug, Clone, Default)]
pub struct MolecularSystem {
    /// Primary storage for atoms using a slot map for efficient ID management.
    atoms: SlotMap<AtomId, Atom>,
    /// Primary storage for residues using a slot map for efficient ID management.
    residues: SlotMap<ResidueId, Residue>,
    /// Primary storage for chains using a slot map for efficient ID management.
    chains: SlotMap<ChainId, Chain>,
    /// Atoms in serial order.
    atom_order: Vec<AtomId>,
    /// Lookup map for finding atoms by their global serial.
    serial_map: HashMap<u32, AtomId>,
    /// Residues in insertion order; position is the global residue index.
    residue_order: Vec<ResidueId>,
    /// Lookup map for finding residues by chain ID and residue number.
    residue_id_map: HashMap<(ChainId, isize), ResidueId>,
    /// Lookup map for finding chains by their single-character identifier.
    chain_id_map: HashMap<char, ChainId>,
}

impl MolecularSystem {
    /// Creates a new, empty molecular system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves an immutable reference to an atom by its ID.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Retrieves a mutable reference to an atom by its ID.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Returns an iterator over all atoms in serial order.
    ///
    /// # Return
    ///
    /// An iterator yielding `(AtomId, &Atom)` pairs, ordered by serial.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atom_order.iter().map(|&id| (id, &self.atoms[id]))
    }

    /// The number of atoms in the system.
    pub fn atom_count(&self) -> usize {
        self.atom_order.len()
    }

    /// Retrieves an immutable reference to a residue by its ID.
    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    /// Returns an iterator over all residues in insertion order.
    pub fn residues_iter(&self) -> impl Iterator<Item = (ResidueId, &Residue)> {
        self.residue_order
            .iter()
            .map(|&id| (id, &self.residues[id]))
    }

    /// The number of residues in the system.
    pub fn residue_count(&self) -> usize {
        self.residue_order.len()
    }

    /// The residue at a given global residue index.
    pub fn residue_by_index(&self, index: usize) -> Option<&Residue> {
        self.residue_order
            .get(index)
            .and_then(|&id| self.residues.get(id))
    }

    /// The global residue index of a residue ID.
    pub fn residue_index_of(&self, id: ResidueId) -> Option<usize> {
        self.residue_order.iter().position(|&r| r == id)
    }

    /// Retrieves an immutable reference to a chain by its ID.
    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id)
    }

    /// Returns an iterator over all chains in the system.
    pub fn chains_iter(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chains.iter()
    }

    /// Finds a chain ID by its single-character identifier.
    pub fn find_chain_by_id(&self, id: char) -> Option<ChainId> {
        self.chain_id_map.get(&id).copied()
    }

    /// Finds a residue ID by its chain ID and residue number.
    pub fn find_residue_by_id(
        &self,
        chain_id: ChainId,
        residue_number: isize,
    ) -> Option<ResidueId> {
        self.residue_id_map
            .get(&(chain_id, residue_number))
            .copied()
    }

    /// Finds an atom by its 1-based global serial.
    pub fn find_atom_by_serial(&self, serial: u32) -> Option<(AtomId, &Atom)> {
        let id = *self.serial_map.get(&serial)?;
        Some((id, &self.atoms[id]))
    }

    /// Adds a new chain to the system or returns the existing one.
    ///
    /// This method is idempotent; if a chain with the given ID already exists,
    /// it returns the existing chain ID without creating a duplicate.
    pub fn add_chain(&mut self, id: char, chain_type: ChainType) -> ChainId {
        *self.chain_id_map.entry(id).or_insert_with(|| {
            let chain = Chain::new(id, chain_type);
            self.chains.insert(chain)
        })
    }

    /// Adds a new residue to the system or returns the existing one.
    ///
    /// This method is idempotent; if a residue with the given chain ID and
    /// residue number already exists, it returns the existing residue ID.
    ///
    /// # Return
    ///
    /// Returns `Some(ResidueId)` if successful, otherwise `None` (e.g., if the
    /// chain doesn't exist).
    pub fn add_residue(
        &mut self,
        chain_id: ChainId,
        residue_number: isize,
        name: &str,
        residue_type: Option<ResidueType>,
    ) -> Option<ResidueId> {
        let chain = self.chains.get_mut(chain_id)?;
        let key = (chain_id, residue_number);

        let residue_id = *self.residue_id_map.entry(key).or_insert_with(|| {
            let residue = Residue::new(residue_number, name, residue_type, chain_id);
            let id = self.residues.insert(residue);
            self.residue_order.push(id);
            id
        });

        if !chain.residues.contains(&residue_id) {
            chain.residues.push(residue_id);
        }

        Some(residue_id)
    }

    /// Adds an atom to a specific residue.
    ///
    /// The atom is appended to the serial order; if its `serial` field is zero
    /// it is assigned the next serial in sequence. Selections built from an
    /// existing system keep their original serials, so a sub-system's serial
    /// space may be sparse.
    ///
    /// # Return
    ///
    /// Returns `Some(AtomId)` if successful, otherwise `None` (e.g., if the
    /// residue doesn't exist).
    pub fn add_atom_to_residue(&mut self, residue_id: ResidueId, mut atom: Atom) -> Option<AtomId> {
        if !self.residues.contains_key(residue_id) {
            return None;
        }

        if atom.serial == 0 {
            atom.serial = self.atom_order.len() as u32 + 1;
        }
        atom.residue_id = residue_id;
        let name = atom.name.clone();

        let serial = atom.serial;
        let atom_id = self.atoms.insert(atom);
        self.atom_order.push(atom_id);
        self.serial_map.insert(serial, atom_id);

        let residue = self.residues.get_mut(residue_id).unwrap();
        residue.add_atom(&name, atom_id);

        Some(atom_id)
    }

    /// The sorted, distinct alternate-location tags present in the system.
    ///
    /// An empty result means the structure is single-conformation and the
    /// engine will process exactly one variant.
    pub fn altloc_tags(&self) -> Vec<char> {
        let tags: BTreeSet<char> = self
            .atoms_iter()
            .filter_map(|(_, atom)| atom.alt_loc)
            .collect();
        tags.into_iter().collect()
    }

    /// IDs of all atoms carrying a non-empty alternate-location tag.
    pub fn altloc_atom_ids(&self) -> Vec<AtomId> {
        self.atoms_iter()
            .filter(|(_, atom)| atom.is_alternate())
            .map(|(id, _)| id)
            .collect()
    }

    /// Derives peptide-backbone connections between chain-consecutive residues.
    ///
    /// Two residues adjacent in a chain are connected when any `C` atom of the
    /// first lies within covalent range of any `N` atom of the second. The
    /// result is expressed in global residue indices, ready to be merged into
    /// the interaction graph so a sparse contact map can never sever a chain.
    pub fn backbone_connections(&self) -> Vec<(usize, usize)> {
        let index_of: HashMap<ResidueId, usize> = self
            .residue_order
            .iter()
            .enumerate()
            .map(|(index, &id)| (id, index))
            .collect();
        let mut connections = Vec::new();
        for (_, chain) in self.chains.iter() {
            for pair in chain.residues().windows(2) {
                let (prev_id, next_id) = (pair[0], pair[1]);
                let prev = &self.residues[prev_id];
                let next = &self.residues[next_id];
                if self.residues_are_peptide_bonded(prev, next) {
                    connections.push((index_of[&prev_id], index_of[&next_id]));
                }
            }
        }
        connections
    }

    fn residues_are_peptide_bonded(&self, prev: &Residue, next: &Residue) -> bool {
        let carbons = prev.get_atom_ids_by_name("C").unwrap_or(&[]);
        let nitrogens = next.get_atom_ids_by_name("N").unwrap_or(&[]);
        for &c_id in carbons {
            for &n_id in nitrogens {
                let c = &self.atoms[c_id];
                let n = &self.atoms[n_id];
                if (c.position - n.position).norm() < PEPTIDE_BOND_CUTOFF {
                    return true;
                }
            }
        }
        false
    }

    /// Builds a new system containing only the atoms selected by `mask`.
    ///
    /// `mask` is indexed by serial order (`mask[i]` selects the atom with
    /// serial `i + 1`). Selected atoms keep their names, serials, altloc tags,
    /// occupancies and positions; chains and residues are recreated as needed
    /// and empty ones are not carried over.
    pub fn select_by_mask(&self, mask: &[bool]) -> MolecularSystem {
        let mut selected = MolecularSystem::new();
        for (index, &atom_id) in self.atom_order.iter().enumerate() {
            if !mask.get(index).copied().unwrap_or(false) {
                continue;
            }
            let atom = &self.atoms[atom_id];
            let residue = &self.residues[atom.residue_id];
            let chain = &self.chains[residue.chain_id];

            let chain_id = selected.add_chain(chain.id, chain.chain_type);
            let residue_id = selected
                .add_residue(
                    chain_id,
                    residue.residue_number,
                    &residue.name,
                    residue.residue_type,
                )
                .unwrap();
            selected.add_atom_to_residue(residue_id, atom.clone());
        }
        selected
    }
}

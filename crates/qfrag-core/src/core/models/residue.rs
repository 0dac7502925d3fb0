use super::ids::{AtomId, ChainId};
use std::collections::HashMap;
use std::str::FromStr;

/// Classifies the twenty standard amino acids.
///
/// The classification drives the chemistry-aware parts of the engine:
/// glycine's exemption from the backbone pairing invariant, and the
/// formal-charge table used by the reference charge service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResidueType {
    // --- Aliphatic, Nonpolar ---
    Alanine,
    Glycine,
    Isoleucine,
    Leucine,
    Proline,
    Valine,

    // --- Aromatic ---
    Phenylalanine,
    Tryptophan,
    Tyrosine,

    // --- Polar, Uncharged ---
    Asparagine,
    Cysteine,
    Glutamine,
    Serine,
    Threonine,
    Methionine,

    // --- Positively Charged (Basic) ---
    Arginine,
    Lysine,
    HistidineProtonated, // Doubly-protonated Histidine (HIP/HSP), carries +1

    // --- Negatively Charged (Acidic) ---
    AsparticAcid,
    GlutamicAcid,

    // --- Neutral Histidine ---
    Histidine,
}

static RESIDUE_TYPES: phf::Map<&'static str, ResidueType> = phf::phf_map! {
    "ALA" => ResidueType::Alanine,
    "GLY" => ResidueType::Glycine,
    "ILE" => ResidueType::Isoleucine,
    "LEU" => ResidueType::Leucine,
    "PRO" => ResidueType::Proline,
    "VAL" => ResidueType::Valine,
    "PHE" => ResidueType::Phenylalanine,
    "TRP" => ResidueType::Tryptophan,
    "TYR" => ResidueType::Tyrosine,
    "ASN" => ResidueType::Asparagine,
    "CYS" => ResidueType::Cysteine,
    "CYX" => ResidueType::Cysteine,
    "GLN" => ResidueType::Glutamine,
    "SER" => ResidueType::Serine,
    "THR" => ResidueType::Threonine,
    "MET" => ResidueType::Methionine,
    "ARG" => ResidueType::Arginine,
    "LYS" => ResidueType::Lysine,
    "ASP" => ResidueType::AsparticAcid,
    "GLU" => ResidueType::GlutamicAcid,
    "HIS" => ResidueType::Histidine,
    "HSE" => ResidueType::Histidine,
    "HSD" => ResidueType::Histidine,
    "HIP" => ResidueType::HistidineProtonated,
    "HSP" => ResidueType::HistidineProtonated,
};

/// Three-letter codes of nucleic-acid residues. Nucleotide chemistry is not
/// supported by the fragmentation engine and is rejected during validation.
static NUCLEOTIDE_NAMES: phf::Set<&'static str> = phf::phf_set! {
    "A", "C", "G", "U", "I",
    "DA", "DC", "DG", "DT", "DI",
};

static WATER_NAMES: phf::Set<&'static str> = phf::phf_set! {
    "HOH", "WAT", "H2O", "TIP", "TIP3", "SOL", "DOD",
};

impl ResidueType {
    /// Looks up a residue type from its three-letter code (case-insensitive).
    pub fn from_three_letter(code: &str) -> Option<Self> {
        RESIDUE_TYPES
            .get(code.trim().to_ascii_uppercase().as_str())
            .copied()
    }

    /// The formal charge of the residue's side chain at physiological pH.
    pub fn formal_charge(&self) -> i32 {
        match self {
            ResidueType::Arginine | ResidueType::Lysine | ResidueType::HistidineProtonated => 1,
            ResidueType::AsparticAcid | ResidueType::GlutamicAcid => -1,
            _ => 0,
        }
    }
}

impl FromStr for ResidueType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResidueType::from_three_letter(s).ok_or(())
    }
}

/// Returns `true` if the residue name denotes a nucleic-acid residue.
pub fn is_nucleotide_name(name: &str) -> bool {
    NUCLEOTIDE_NAMES.contains(name.trim().to_ascii_uppercase().as_str())
}

/// Returns `true` if the residue name denotes a water molecule.
pub fn is_water_name(name: &str) -> bool {
    WATER_NAMES.contains(name.trim().to_ascii_uppercase().as_str())
}

/// Represents a residue: an ordered group of atoms sharing chain/sequence identity.
///
/// A residue may hold several atoms with the same name when alternate
/// conformations are present (e.g., `CB` with altlocs `A` and `B`), so the
/// name lookup is a multimap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    /// Residue sequence number from the source file.
    pub residue_number: isize,
    /// Name of the residue (e.g., "ALA", "GLY").
    pub name: String,
    /// Classification of the residue, if it is a standard amino acid.
    pub residue_type: Option<ResidueType>,
    /// ID of the parent chain.
    pub chain_id: ChainId,
    /// Atoms belonging to this residue, in insertion order.
    pub(crate) atoms: Vec<AtomId>,
    atom_name_map: HashMap<String, Vec<AtomId>>,
}

impl Residue {
    pub(crate) fn new(
        residue_number: isize,
        name: &str,
        residue_type: Option<ResidueType>,
        chain_id: ChainId,
    ) -> Self {
        Self {
            residue_number,
            name: name.to_string(),
            residue_type,
            chain_id,
            atoms: Vec::new(),
            atom_name_map: HashMap::new(),
        }
    }

    pub(crate) fn add_atom(&mut self, atom_name: &str, atom_id: AtomId) {
        self.atoms.push(atom_id);
        self.atom_name_map
            .entry(atom_name.to_string())
            .or_default()
            .push(atom_id);
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    /// All atom IDs registered under `name` (several when altlocs exist).
    pub fn get_atom_ids_by_name(&self, name: &str) -> Option<&[AtomId]> {
        self.atom_name_map.get(name).map(|v| v.as_slice())
    }

    pub fn get_first_atom_id_by_name(&self, name: &str) -> Option<AtomId> {
        self.atom_name_map
            .get(name)
            .and_then(|v| v.first())
            .copied()
    }

    /// Returns `true` if the residue is glycine, which has no Cβ and is
    /// exempt from the backbone pairing invariant.
    pub fn is_glycine(&self) -> bool {
        matches!(self.residue_type, Some(ResidueType::Glycine))
    }
}

use crate::core::models::residue::is_nucleotide_name;
use crate::core::models::system::MolecularSystem;
use crate::engine::error::EngineError;
use std::collections::{BTreeSet, HashMap};

/// Validates a structure before any clustering begins.
///
/// Rejects unsupported residue chemistry (nucleotides) and residues whose
/// alternate-location depth is inconsistent: every altloc-split atom of a
/// residue must carry the same set of tags, otherwise the variant views
/// would realize chimeric conformations.
pub fn validate_structure(system: &MolecularSystem) -> Result<(), EngineError> {
    for (_, residue) in system.residues_iter() {
        if is_nucleotide_name(&residue.name) {
            return Err(EngineError::Validation(format!(
                "unsupported residue chemistry: nucleotide {} {}",
                residue.name, residue.residue_number
            )));
        }

        let mut tags_by_name: HashMap<&str, BTreeSet<char>> = HashMap::new();
        for &atom_id in residue.atoms() {
            let atom = system
                .atom(atom_id)
                .ok_or_else(|| EngineError::Integrity("residue references a dead atom".into()))?;
            if let Some(tag) = atom.alt_loc {
                tags_by_name.entry(&atom.name).or_default().insert(tag);
            }
        }
        let mut depth_sets = tags_by_name.values();
        if let Some(first) = depth_sets.next() {
            if depth_sets.any(|set| set != first) {
                return Err(EngineError::Validation(format!(
                    "inconsistent alternate-location depth in residue {} {}",
                    residue.name, residue.residue_number
                )));
            }
        }
    }
    Ok(())
}

/// Checks the backbone pairing invariant over a selection of atom serials.
///
/// Every non-glycine residue must contribute either zero or exactly two of
/// its {Cα, Cβ} atoms to the selection. A violation means the interaction
/// graph produced a chemically inconsistent split and aborts the run.
pub fn check_backbone_pairing(system: &MolecularSystem, serials: &[u32]) -> Result<(), EngineError> {
    let mut pair_counts: HashMap<(char, isize, String), usize> = HashMap::new();

    for &serial in serials {
        let Some((_, atom)) = system.find_atom_by_serial(serial) else {
            return Err(EngineError::Integrity(format!(
                "selection references unknown atom serial {serial}"
            )));
        };
        if atom.name != "CA" && atom.name != "CB" {
            continue;
        }
        let residue = system
            .residue(atom.residue_id)
            .ok_or_else(|| EngineError::Integrity("atom references a dead residue".into()))?;
        if residue.is_glycine() {
            continue;
        }
        let chain = system
            .chain(residue.chain_id)
            .ok_or_else(|| EngineError::Integrity("residue references a dead chain".into()))?;
        *pair_counts
            .entry((chain.id, residue.residue_number, residue.name.clone()))
            .or_insert(0) += 1;
    }

    for ((chain, number, name), count) in pair_counts {
        if count != 2 {
            return Err(EngineError::Integrity(format!(
                "backbone pairing violated in {name} {chain}{number}: {count} of {{CA, CB}} selected"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::chain::ChainType;
    use crate::core::models::ids::ResidueId;
    use crate::core::models::residue::ResidueType;
    use nalgebra::Point3;

    fn add_residue_with_atoms(
        system: &mut MolecularSystem,
        number: isize,
        name: &str,
        atoms: &[(&str, Option<char>)],
    ) -> ResidueId {
        let chain = system.add_chain('A', ChainType::Protein);
        let residue = system
            .add_residue(chain, number, name, ResidueType::from_three_letter(name))
            .unwrap();
        for &(atom_name, tag) in atoms {
            let mut atom = Atom::new(atom_name, residue, Point3::origin());
            atom.alt_loc = tag;
            system.add_atom_to_residue(residue, atom).unwrap();
        }
        residue
    }

    #[test]
    fn clean_protein_passes_validation() {
        let mut system = MolecularSystem::new();
        add_residue_with_atoms(&mut system, 1, "ALA", &[("CA", None), ("CB", None)]);
        add_residue_with_atoms(
            &mut system,
            2,
            "SER",
            &[("CA", None), ("CB", None), ("OG", Some('A')), ("OG", Some('B'))],
        );
        assert!(validate_structure(&system).is_ok());
    }

    #[test]
    fn nucleotides_are_rejected() {
        let mut system = MolecularSystem::new();
        add_residue_with_atoms(&mut system, 1, "DA", &[("P", None)]);
        let result = validate_structure(&system);
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn inconsistent_altloc_depth_is_rejected() {
        let mut system = MolecularSystem::new();
        add_residue_with_atoms(
            &mut system,
            1,
            "SER",
            &[
                ("CA", None),
                ("OG", Some('A')),
                ("OG", Some('B')),
                ("CB", Some('A')), // CB is missing its B alternate
            ],
        );
        let result = validate_structure(&system);
        assert!(matches!(result, Err(EngineError::Validation(_))));
    }

    #[test]
    fn paired_ca_cb_selection_passes_the_integrity_check() {
        let mut system = MolecularSystem::new();
        add_residue_with_atoms(&mut system, 1, "ALA", &[("N", None), ("CA", None), ("CB", None)]);
        assert!(check_backbone_pairing(&system, &[1, 2, 3]).is_ok());
        // Selecting neither backbone atom is also consistent.
        assert!(check_backbone_pairing(&system, &[1]).is_ok());
    }

    #[test]
    fn lone_ca_selection_is_an_integrity_error() {
        let mut system = MolecularSystem::new();
        add_residue_with_atoms(&mut system, 1, "ALA", &[("N", None), ("CA", None), ("CB", None)]);
        let result = check_backbone_pairing(&system, &[1, 2]);
        assert!(matches!(result, Err(EngineError::Integrity(_))));
    }

    #[test]
    fn glycine_is_exempt_from_pairing() {
        let mut system = MolecularSystem::new();
        add_residue_with_atoms(&mut system, 1, "GLY", &[("N", None), ("CA", None)]);
        assert!(check_backbone_pairing(&system, &[1, 2]).is_ok());
    }

    #[test]
    fn unknown_serial_is_an_integrity_error() {
        let system = MolecularSystem::new();
        let result = check_backbone_pairing(&system, &[42]);
        assert!(matches!(result, Err(EngineError::Integrity(_))));
    }
}

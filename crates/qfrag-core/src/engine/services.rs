use crate::core::models::frame::CrystalFrame;
use crate::core::models::residue::is_water_name;
use crate::core::models::system::MolecularSystem;
use crate::engine::config::EmbeddingKind;
use crate::engine::error::EngineError;
use nalgebra::Point3;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Atoms closer than this to a charge-scaling position are treated as that
/// position and get their charge zeroed, in Angstroms.
const SCALING_POSITION_EPSILON: f64 = 1e-4;

/// The structure-completion collaborator.
///
/// Given a fragment cut out of a larger structure, an implementation returns
/// a valence-complete geometry: hydrogens added and dangling bonds capped.
/// Real capping chemistry lives outside this crate; the engine only requires
/// that the returned structure is self-contained and chargeable.
pub trait CompletionService {
    fn complete(
        &self,
        fragment: &MolecularSystem,
        frame: &CrystalFrame,
        capping: bool,
        reference: Option<&Path>,
    ) -> Result<MolecularSystem, EngineError>;
}

/// The identity completion service.
///
/// Returns the fragment unchanged. Suitable for pipelines whose inputs are
/// already protonated, and for tests; an explicit stand-in, not a capping
/// implementation.
pub struct PassthroughCompletion;

impl CompletionService for PassthroughCompletion {
    fn complete(
        &self,
        fragment: &MolecularSystem,
        _frame: &CrystalFrame,
        _capping: bool,
        _reference: Option<&Path>,
    ) -> Result<MolecularSystem, EngineError> {
        Ok(fragment.clone())
    }
}

/// The charge-evaluation collaborator.
///
/// Produces a fragment's net formal charge and, for electrostatic embedding,
/// writes the background point-charge file a QM driver consumes.
pub trait ChargeService {
    fn total_charge(
        &self,
        system: &MolecularSystem,
        frame: &CrystalFrame,
    ) -> Result<f64, EngineError>;

    /// Writes one point-charge row per background atom. Atoms at a scaling
    /// position get charge zero; water residues are skipped when
    /// `exclude_water` is set.
    fn write_embedding_file(
        &self,
        kind: EmbeddingKind,
        path: &Path,
        background: &MolecularSystem,
        exclude_water: bool,
        scaling_positions: &[Point3<f64>],
    ) -> Result<(), EngineError>;
}

/// A residue-table charge service.
///
/// The net charge is the sum of side-chain formal charges at physiological
/// pH over all classified residues; embedding charges distribute each
/// residue's formal charge evenly over its atoms. Electronic-structure
/// charge models plug in behind [`ChargeService`] instead.
pub struct ResidueTableCharges;

impl ResidueTableCharges {
    fn atom_charge(system: &MolecularSystem, atom: &crate::core::models::atom::Atom) -> f64 {
        let Some(residue) = system.residue(atom.residue_id) else {
            return 0.0;
        };
        let formal = residue
            .residue_type
            .map(|t| t.formal_charge())
            .unwrap_or(0);
        if formal == 0 || residue.atoms().is_empty() {
            0.0
        } else {
            formal as f64 / residue.atoms().len() as f64
        }
    }
}

impl ChargeService for ResidueTableCharges {
    fn total_charge(
        &self,
        system: &MolecularSystem,
        _frame: &CrystalFrame,
    ) -> Result<f64, EngineError> {
        let total: i32 = system
            .residues_iter()
            .filter_map(|(_, residue)| residue.residue_type)
            .map(|t| t.formal_charge())
            .sum();
        Ok(total as f64)
    }

    fn write_embedding_file(
        &self,
        kind: EmbeddingKind,
        path: &Path,
        background: &MolecularSystem,
        exclude_water: bool,
        scaling_positions: &[Point3<f64>],
    ) -> Result<(), EngineError> {
        let mut writer = BufWriter::new(File::create(path)?);

        for (_, atom) in background.atoms_iter() {
            let residue = background
                .residue(atom.residue_id)
                .ok_or_else(|| EngineError::Charge("atom references a dead residue".into()))?;
            if exclude_water && is_water_name(&residue.name) {
                continue;
            }

            let scaled_out = scaling_positions
                .iter()
                .any(|p| (p - atom.position).norm() < SCALING_POSITION_EPSILON);
            let charge = if scaled_out {
                0.0
            } else {
                Self::atom_charge(background, atom)
            };

            let p = atom.position;
            match kind {
                EmbeddingKind::Xyzq => writeln!(
                    writer,
                    "{:14.8} {:14.8} {:14.8} {:12.8}",
                    p.x, p.y, p.z, charge
                )?,
                EmbeddingKind::Qxyz => writeln!(
                    writer,
                    "{:12.8} {:14.8} {:14.8} {:14.8}",
                    charge, p.x, p.y, p.z
                )?,
            }
        }
        Ok(())
    }
}

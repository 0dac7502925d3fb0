use crate::core::io::pdb::write_pdb;
use crate::core::models::frame::CrystalFrame;
use crate::core::models::system::MolecularSystem;
use crate::engine::config::{EmbeddingKind, FragmentationConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::reconcile::FragmentSet;
use crate::engine::services::{ChargeService, CompletionService};
use crate::engine::validate::check_backbone_pairing;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Background atoms within this distance of a fragment atom sit on a cut
/// bond; their embedding charges are scaled to zero, in Angstroms.
const EDGE_CONTACT_CUTOFF: f64 = 1.8;

/// Everything downstream QM/MM orchestration needs for one fragment.
#[derive(Debug, Clone)]
pub struct FragmentExtract {
    /// Position of this fragment in the reconciled set.
    pub index: usize,
    /// Cluster atoms as a mask over the base structure.
    pub cluster_selection: Vec<bool>,
    /// Fragment atoms as a mask over the base structure.
    pub fragment_selection: Vec<bool>,
    /// Buffer atoms: fragment minus cluster, over the base structure.
    pub buffer_selection: Vec<bool>,
    /// Fragment atoms as a mask over the symmetry-expanded superstructure.
    pub fragment_super_selection: Vec<bool>,
    /// Per-atom energy-accounting weights, parallel to the fragment's
    /// base-structure atoms in serial order.
    pub scales: Vec<f64>,
    /// The valence-complete fragment geometry.
    pub capped: MolecularSystem,
    /// Net formal charge of the capped fragment.
    pub charge: f64,
    /// The point-charge file for electrostatic embedding, when requested.
    pub embedding_file: Option<PathBuf>,
}

/// Converts a sorted serial list into a boolean mask of `size` entries.
///
/// Serials beyond `size` are naturally excluded, which is exactly how
/// superstructure-only buffer atoms drop out of base-structure masks.
fn selection_mask(size: usize, serials: &[u32]) -> Vec<bool> {
    let mut mask = vec![false; size];
    for &serial in serials {
        let index = serial as usize;
        if (1..=size).contains(&index) {
            mask[index - 1] = true;
        }
    }
    mask
}

/// The Fragment Finalizer.
///
/// Turns each reconciled `(cluster, fragment, scales)` triple into a
/// [`FragmentExtract`]: selection masks over both structures, a capped
/// geometry from the completion service, and a net charge from the charge
/// service. Artifact writing (per-fragment directories, snapshot PDBs,
/// embedding files) is driven entirely by explicit configuration flags.
pub struct Finalizer<'a> {
    base: &'a MolecularSystem,
    superstructure: &'a MolecularSystem,
    frame: &'a CrystalFrame,
    completion: &'a dyn CompletionService,
    charges: &'a dyn ChargeService,
    config: &'a FragmentationConfig,
}

impl<'a> Finalizer<'a> {
    pub fn new(
        base: &'a MolecularSystem,
        superstructure: &'a MolecularSystem,
        frame: &'a CrystalFrame,
        completion: &'a dyn CompletionService,
        charges: &'a dyn ChargeService,
        config: &'a FragmentationConfig,
    ) -> Self {
        Self {
            base,
            superstructure,
            frame,
            completion,
            charges,
            config,
        }
    }

    #[instrument(skip_all, name = "fragment_finalize_task", fields(fragments = fragments.len()))]
    pub fn run(
        &self,
        fragments: &FragmentSet,
        reporter: &ProgressReporter,
    ) -> Result<Vec<FragmentExtract>, EngineError> {
        let needs_workdir =
            self.config.save_fragments || self.config.save_clusters || self.config.charge_embedding;
        if needs_workdir && self.config.make_working_dir {
            std::fs::create_dir_all(&self.config.working_dir)?;
        }

        reporter.report(Progress::TaskStart {
            total_steps: fragments.len() as u64,
        });
        let mut extracts = Vec::with_capacity(fragments.len());
        for index in 0..fragments.len() {
            extracts.push(self.finalize_one(index, fragments)?);
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);

        if self.config.save_clusters {
            self.write_snapshots(fragments)?;
        }

        info!(fragments = extracts.len(), "Fragment finalization complete.");
        Ok(extracts)
    }

    fn finalize_one(
        &self,
        index: usize,
        fragments: &FragmentSet,
    ) -> Result<FragmentExtract, EngineError> {
        let cluster = &fragments.cluster_atoms[index];
        let fragment = &fragments.fragment_atoms[index];

        let cluster_selection = selection_mask(self.base.atom_count(), cluster);
        let fragment_selection = selection_mask(self.base.atom_count(), fragment);
        let buffer_selection: Vec<bool> = fragment_selection
            .iter()
            .zip(&cluster_selection)
            .map(|(&in_fragment, &in_cluster)| in_fragment && !in_cluster)
            .collect();
        let fragment_super_selection = selection_mask(self.superstructure.atom_count(), fragment);

        check_backbone_pairing(self.superstructure, fragment)?;
        let sub_structure = self.superstructure.select_by_mask(&fragment_super_selection);
        let capped = self
            .completion
            .complete(&sub_structure, self.frame, true, None)?;
        let charge = self.charges.total_charge(&capped, self.frame)?;
        debug!(index, charge, atoms = fragment.len(), "Fragment finalized.");

        if self.config.save_fragments {
            let dir = self.fragment_dir(index)?;
            write_pdb(&sub_structure, self.frame, &dir.join(format!("{index}.pdb")))?;
            write_pdb(&capped, self.frame, &dir.join(format!("{index}_capping.pdb")))?;
        }

        let embedding_file = if self.config.charge_embedding {
            Some(self.write_embedding(index, fragment, &fragment_super_selection)?)
        } else {
            None
        };

        Ok(FragmentExtract {
            index,
            cluster_selection,
            fragment_selection,
            buffer_selection,
            fragment_super_selection,
            scales: fragments.scales[index].clone(),
            capped,
            charge,
            embedding_file,
        })
    }

    fn fragment_dir(&self, index: usize) -> Result<PathBuf, EngineError> {
        let dir = self.config.working_dir.join(index.to_string());
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Selects the embedding background and writes the point-charge file.
    ///
    /// The background is every superstructure atom within `charge_cutoff` of
    /// the fragment that is not itself part of it, restricted to the
    /// fragment's own alternate-location realization. Background atoms on a
    /// cut bond become charge-scaling positions.
    fn write_embedding(
        &self,
        index: usize,
        fragment: &[u32],
        fragment_mask: &[bool],
    ) -> Result<PathBuf, EngineError> {
        let kind = self
            .config
            .qm_engine
            .and_then(|engine| engine.embedding_kind())
            .ok_or_else(|| {
                EngineError::Configuration(
                    "electrostatic embedding requested, but no point-charge file can be produced \
                     for the configured engine"
                        .to_string(),
                )
            })?;

        // The variant the fragment realizes: its own tag if it has one, the
        // first tag of the structure otherwise.
        let fragment_tags: BTreeSet<char> = fragment
            .iter()
            .filter_map(|&serial| self.superstructure.find_atom_by_serial(serial))
            .filter_map(|(_, atom)| atom.alt_loc)
            .collect();
        let effective_tag = fragment_tags
            .first()
            .copied()
            .or_else(|| self.superstructure.altloc_tags().first().copied());

        let mut tree: KdTree<f64, 3> = KdTree::new();
        for &serial in fragment {
            if let Some((_, atom)) = self.superstructure.find_atom_by_serial(serial) {
                let p = atom.position;
                tree.add(&[p.x, p.y, p.z], serial as u64);
            }
        }

        let cutoff_sq = self.config.charge_cutoff * self.config.charge_cutoff;
        let edge_sq = EDGE_CONTACT_CUTOFF * EDGE_CONTACT_CUTOFF;
        let mut background_mask = vec![false; self.superstructure.atom_count()];
        let mut scaling_positions: Vec<Point3<f64>> = Vec::new();

        for (order, (_, atom)) in self.superstructure.atoms_iter().enumerate() {
            if fragment_mask.get(order).copied().unwrap_or(false) {
                continue;
            }
            if atom.alt_loc.is_some() && atom.alt_loc != effective_tag {
                continue;
            }
            let p = atom.position;
            let hits = tree.within_unsorted::<SquaredEuclidean>(&[p.x, p.y, p.z], cutoff_sq);
            if hits.is_empty() {
                continue;
            }
            background_mask[order] = true;
            if hits.iter().any(|hit| hit.distance < edge_sq) {
                scaling_positions.push(p);
            }
        }

        let background = self.superstructure.select_by_mask(&background_mask);
        let dir = self.fragment_dir(index)?;
        let suffix = match kind {
            EmbeddingKind::Xyzq => "xyzq",
            EmbeddingKind::Qxyz => "qxyz",
        };
        let path = dir.join(format!("{index}_{suffix}.dat"));
        self.charges
            .write_embedding_file(kind, &path, &background, false, &scaling_positions)?;
        Ok(path)
    }

    /// Writes the snapshot set: per-fragment cluster, fragment and capped
    /// PDBs in a fresh directory, plus the plain-text summary.
    fn write_snapshots(&self, fragments: &FragmentSet) -> Result<(), EngineError> {
        let dir = self.config.working_dir.join("clusters");
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;

        for index in 0..fragments.len() {
            let cluster_mask =
                selection_mask(self.base.atom_count(), &fragments.cluster_atoms[index]);
            let super_mask = selection_mask(
                self.superstructure.atom_count(),
                &fragments.fragment_atoms[index],
            );
            let cluster_structure = self.base.select_by_mask(&cluster_mask);
            let fragment_structure = self.superstructure.select_by_mask(&super_mask);
            let capped = self
                .completion
                .complete(&fragment_structure, self.frame, true, None)?;

            write_pdb(
                &cluster_structure,
                self.frame,
                &dir.join(format!("{index}_cluster.pdb")),
            )?;
            write_pdb(
                &fragment_structure,
                self.frame,
                &dir.join(format!("{index}_frag.pdb")),
            )?;
            write_pdb(&capped, self.frame, &dir.join(format!("{index}_capped0.pdb")))?;
        }

        self.write_summary(&dir.join("fragment_info.txt"), fragments)?;
        Ok(())
    }

    fn write_summary(&self, path: &Path, fragments: &FragmentSet) -> Result<(), EngineError> {
        use itertools::Itertools;
        use std::io::Write as _;
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        let cluster_sizes = fragments.cluster_atoms.iter().map(|c| c.len()).join(", ");
        let fragment_sizes = fragments.fragment_atoms.iter().map(|f| f.len()).join(", ");
        writeln!(file, "~  # clusters  :  {}", fragments.len())?;
        writeln!(file, "~  list of atoms per cluster:")?;
        writeln!(file, "~   [{cluster_sizes}]")?;
        writeln!(file, "~  list of atoms per fragment:")?;
        writeln!(file, "~   [{fragment_sizes}]")?;
        Ok(())
    }
}

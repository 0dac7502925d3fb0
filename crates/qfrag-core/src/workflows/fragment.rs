use crate::core::graph::clustering::{Cluster, betweenness_centrality_clustering};
use crate::core::graph::interaction::InteractionGraph;
use crate::core::models::frame::CrystalFrame;
use crate::core::models::system::MolecularSystem;
use crate::engine::config::FragmentationConfig;
use crate::engine::error::EngineError;
use crate::engine::finalize::{Finalizer, FragmentExtract};
use crate::engine::growth;
use crate::engine::oracle::PairInteractionOracle;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::reconcile::{
    AltlocBondPredicate, DistanceBondPredicate, FragmentSet, NeverBonded, reconcile,
};
use crate::engine::services::{ChargeService, CompletionService};
use crate::engine::validate::validate_structure;
use crate::engine::variants::{StructureView, altloc_variants};
use tracing::{info, instrument};

/// The external collaborators a fragmentation run is wired to.
///
/// An explicit bond predicate overrides the configuration-driven default
/// (distance heuristic or none).
pub struct Collaborators<'a> {
    pub oracle: &'a (dyn PairInteractionOracle + Sync),
    pub completion: &'a dyn CompletionService,
    pub charges: &'a dyn ChargeService,
    pub bond_predicate: Option<&'a dyn AltlocBondPredicate>,
}

/// The complete output of a fragmentation run.
#[derive(Debug, Clone)]
pub struct FragmentationResult {
    /// The residue partition, sorted largest-first.
    pub clusters: Vec<Cluster>,
    /// Reconciled `(cluster, fragment, scale)` triples.
    pub fragments: FragmentSet,
    /// Finalized extracts, one per triple; empty in `clusters_only` mode.
    pub extracts: Vec<FragmentExtract>,
}

/// Runs the full fragmentation pipeline.
///
/// Stages: validation, interaction-graph construction (oracle contacts plus
/// backbone connections), betweenness-centrality clustering, per-variant
/// fragment growth, cross-variant overlap reconciliation, and finalization.
/// Each stage is a pure function over the previous stage's value; the run
/// owns no mutable state beyond the values flowing between stages.
///
/// `superstructure` is the symmetry-expanded neighborhood supplying buffer
/// atoms beyond the asymmetric unit. It must extend `base`: same residues in
/// the same order, with any expansion atoms carrying higher serials. Passing
/// `None` uses `base` itself, appropriate for non-periodic systems.
#[instrument(skip_all, name = "fragmentation_workflow")]
pub fn run(
    base: &MolecularSystem,
    superstructure: Option<&MolecularSystem>,
    frame: &CrystalFrame,
    collaborators: &Collaborators,
    config: &FragmentationConfig,
    reporter: &ProgressReporter,
) -> Result<FragmentationResult, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Validation" });
    info!(
        atoms = base.atom_count(),
        residues = base.residue_count(),
        "Validating input structure."
    );
    validate_structure(base)?;
    let superstructure = superstructure.unwrap_or(base);
    check_superstructure_extends_base(base, superstructure)?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Clustering" });
    let base_view = StructureView::full(base);
    let mut pairs = collaborators.oracle.residue_pairs(&base_view)?;
    pairs.extend(base.backbone_connections());
    let graph = InteractionGraph::from_pairs(base.residue_count(), pairs);
    let clusters = betweenness_centrality_clustering(
        &graph,
        config.max_residues_per_cluster,
        config.centrality_threshold,
    );
    info!(clusters = clusters.len(), "Residue partition computed.");
    reporter.report(Progress::PhaseFinish);

    let system_size = base.atom_count() as u32;
    if config.clusters_only {
        return Ok(FragmentationResult {
            clusters,
            fragments: FragmentSet {
                system_size,
                cluster_atoms: Vec::new(),
                fragment_atoms: Vec::new(),
                scales: Vec::new(),
            },
            extracts: Vec::new(),
        });
    }

    reporter.report(Progress::PhaseStart {
        name: "Fragment Growth",
    });
    let views = altloc_variants(superstructure);
    info!(variants = views.len(), "Growing fragments per variant.");
    let mut variants = Vec::with_capacity(views.len());
    for view in &views {
        variants.push(growth::run(
            view,
            &clusters,
            collaborators.oracle,
            config.two_buffers,
            reporter,
        )?);
    }
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Reconciliation",
    });
    let distance_predicate;
    let predicate: &dyn AltlocBondPredicate = match collaborators.bond_predicate {
        Some(predicate) => predicate,
        None if config.bond_with_altloc => {
            distance_predicate = DistanceBondPredicate::new(base, config.altloc_bond_cutoff);
            &distance_predicate
        }
        None => &NeverBonded,
    };
    let fragments = reconcile(
        superstructure,
        &variants,
        system_size,
        config.altloc_policy,
        predicate,
    )?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Finalization",
    });
    let finalizer = Finalizer::new(
        base,
        superstructure,
        frame,
        collaborators.completion,
        collaborators.charges,
        config,
    );
    let extracts = finalizer.run(&fragments, reporter)?;
    reporter.report(Progress::PhaseFinish);

    info!(
        clusters = clusters.len(),
        fragments = fragments.len(),
        "Fragmentation complete."
    );
    Ok(FragmentationResult {
        clusters,
        fragments,
        extracts,
    })
}

/// The superstructure must realize the base structure as a prefix: same
/// residues in the same order, and at least as many atoms.
fn check_superstructure_extends_base(
    base: &MolecularSystem,
    superstructure: &MolecularSystem,
) -> Result<(), EngineError> {
    if superstructure.atom_count() < base.atom_count() {
        return Err(EngineError::Validation(
            "superstructure has fewer atoms than the base structure".to_string(),
        ));
    }
    if superstructure.residue_count() < base.residue_count() {
        return Err(EngineError::Validation(
            "superstructure has fewer residues than the base structure".to_string(),
        ));
    }
    for index in 0..base.residue_count() {
        let expected = base.residue_by_index(index);
        let found = superstructure.residue_by_index(index);
        let matches = match (expected, found) {
            (Some(a), Some(b)) => a.name == b.name && a.residue_number == b.residue_number,
            _ => false,
        };
        if !matches {
            return Err(EngineError::Validation(format!(
                "superstructure does not extend the base structure: residue order diverges at index {index}"
            )));
        }
    }
    Ok(())
}

use crate::core::graph::clustering::Cluster;
use crate::engine::error::EngineError;
use crate::engine::oracle::PairInteractionOracle;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::validate::check_backbone_pairing;
use crate::engine::variants::StructureView;
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// The fragments grown for every cluster within one alternate-location variant.
///
/// Atom lists hold sorted global serials; index `i` corresponds to cluster
/// `i` of the partition, for every variant alike, which is what lets the
/// reconciler compare variants positionally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantFragments {
    /// The altloc tag this variant realizes; `None` for a single-conformation run.
    pub tag: Option<char>,
    /// Per cluster: atoms strictly inside the cluster.
    pub cluster_atoms: Vec<Vec<u32>>,
    /// Per cluster: atoms of the buffered fragment.
    pub fragment_atoms: Vec<Vec<u32>>,
}

/// Grows every cluster of the partition into a buffered fragment within one
/// variant view.
///
/// Each cluster is seeded into the oracle; the returned local indices are
/// translated to global serials through the view. With `two_buffers` the
/// first shell's residue membership re-seeds the oracle, producing a second
/// shell. Every cluster selection must satisfy the backbone pairing
/// invariant; a violation aborts with [`EngineError::Integrity`].
///
/// Clusters are independent, so growth runs in parallel when the `parallel`
/// feature is enabled; results are collected back in cluster order.
#[instrument(skip_all, name = "fragment_growth_task", fields(variant = ?view.tag, clusters = clusters.len()))]
pub fn run(
    view: &StructureView,
    clusters: &[Cluster],
    oracle: &(dyn PairInteractionOracle + Sync),
    two_buffers: bool,
    reporter: &ProgressReporter,
) -> Result<VariantFragments, EngineError> {
    reporter.report(Progress::TaskStart {
        total_steps: clusters.len() as u64,
    });

    let grow_one = |cluster: &Cluster| -> Result<(Vec<u32>, Vec<u32>), EngineError> {
        let grown = oracle.grow(view, cluster)?;
        let cluster_serials = view.to_serials(&grown.cluster_atoms);
        check_backbone_pairing(view.system(), &cluster_serials)?;

        let fragment_serials = if two_buffers {
            let widened = oracle.grow(view, &grown.fragment_residues)?;
            view.to_serials(&widened.fragment_atoms)
        } else {
            view.to_serials(&grown.fragment_atoms)
        };

        reporter.report(Progress::TaskIncrement);
        Ok((cluster_serials, fragment_serials))
    };

    #[cfg(not(feature = "parallel"))]
    let results: Result<Vec<_>, EngineError> = clusters.iter().map(grow_one).collect();

    #[cfg(feature = "parallel")]
    let results: Result<Vec<_>, EngineError> = clusters.par_iter().map(grow_one).collect();

    let grown = results?;
    reporter.report(Progress::TaskFinish);
    debug!(variant = ?view.tag, "Fragment growth complete.");

    let (cluster_atoms, fragment_atoms) = grown.into_iter().unzip();
    Ok(VariantFragments {
        tag: view.tag,
        cluster_atoms,
        fragment_atoms,
    })
}

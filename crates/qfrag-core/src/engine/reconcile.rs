use crate::core::models::system::MolecularSystem;
use crate::engine::config::AltlocPolicy;
use crate::engine::error::EngineError;
use crate::engine::growth::VariantFragments;
use crate::engine::validate::check_backbone_pairing;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Decides whether an atom is chemically bonded to another conformation.
///
/// The reconciler treats such atoms differently from ordinary shared atoms:
/// they belong fully to every conformation they are bonded into rather than
/// having their weight divided. The trait keeps the decision pluggable so the
/// distance heuristic can be replaced by true bond-topology lookup.
pub trait AltlocBondPredicate {
    fn bonded_across_altloc(&self, serial: u32) -> bool;
}

/// The reference predicate: an atom is bonded across alternate locations
/// when it lies within a flat distance cutoff of any atom carrying a
/// different alternate-location tag. This is a stand-in for bond topology.
pub struct DistanceBondPredicate<'a> {
    system: &'a MolecularSystem,
    cutoff: f64,
    altloc_atoms: Vec<crate::core::models::ids::AtomId>,
}

impl<'a> DistanceBondPredicate<'a> {
    /// `system` is the base structure; `cutoff` is in Angstroms (1.7 in the
    /// reference configuration).
    pub fn new(system: &'a MolecularSystem, cutoff: f64) -> Self {
        Self {
            system,
            cutoff,
            altloc_atoms: system.altloc_atom_ids(),
        }
    }
}

impl AltlocBondPredicate for DistanceBondPredicate<'_> {
    fn bonded_across_altloc(&self, serial: u32) -> bool {
        let Some((_, atom)) = self.system.find_atom_by_serial(serial) else {
            return false;
        };
        self.altloc_atoms.iter().any(|&id| {
            self.system.atom(id).is_some_and(|other| {
                other.serial != serial
                    && other.alt_loc != atom.alt_loc
                    && (other.position - atom.position).norm() < self.cutoff
            })
        })
    }
}

/// Disables the altloc bond correction entirely.
pub struct NeverBonded;

impl AltlocBondPredicate for NeverBonded {
    fn bonded_across_altloc(&self, _serial: u32) -> bool {
        false
    }
}

/// The reconciled output: one `(cluster, fragment, scales)` triple per entry.
///
/// Scale vectors are parallel to each fragment's atoms restricted to the
/// base structure (`serial <= system_size`); superstructure-only buffer
/// atoms carry no scale.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentSet {
    pub system_size: u32,
    pub cluster_atoms: Vec<Vec<u32>>,
    pub fragment_atoms: Vec<Vec<u32>>,
    pub scales: Vec<Vec<f64>>,
}

impl FragmentSet {
    pub fn len(&self) -> usize {
        self.cluster_atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cluster_atoms.is_empty()
    }

    /// The base-structure atoms of a fragment, paired with their scales.
    pub fn scaled_base_atoms(&self, index: usize) -> Vec<(u32, f64)> {
        self.fragment_atoms[index]
            .iter()
            .copied()
            .filter(|&serial| serial <= self.system_size)
            .zip(self.scales[index].iter().copied())
            .collect()
    }

    fn full_scales(&self, fragment: &[u32]) -> Vec<f64> {
        fragment
            .iter()
            .filter(|&&serial| serial <= self.system_size)
            .map(|_| 1.0)
            .collect()
    }

    /// Appends one variant's cluster/fragment pair at full scale.
    fn push_full(&mut self, variant: &VariantFragments, cluster: usize) {
        let scales = self.full_scales(&variant.fragment_atoms[cluster]);
        self.cluster_atoms.push(variant.cluster_atoms[cluster].clone());
        self.fragment_atoms
            .push(variant.fragment_atoms[cluster].clone());
        self.scales.push(scales);
    }
}

/// Intersection of two ascending serial lists.
fn intersect_sorted(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut result = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                result.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    result
}

/// How many of the given variants' cluster-atom lists claim each serial.
fn claim_frequency(
    variants: &[VariantFragments],
    cluster: usize,
    claimants: &[usize],
) -> HashMap<u32, usize> {
    let mut frequency = HashMap::new();
    for &v in claimants {
        for &serial in &variants[v].cluster_atoms[cluster] {
            *frequency.entry(serial).or_insert(0) += 1;
        }
    }
    frequency
}

/// Reconciles per-variant fragments into one consolidated fragment set.
///
/// Variant 0 is the reference: its triples are emitted first, one per
/// cluster, at full scale. For every further variant whose fragment differs,
/// the cluster-level overlap decides the correction:
///
/// - **Subtract** always emits the variant's own triple at full scale and, on
///   a non-empty overlap, one correction triple over exactly the overlapping
///   region at flat scale -1.0, so the double-counted atoms cancel exactly
///   once.
/// - **Average** emits non-overlapping variants independently and divides
///   each shared atom's weight evenly across the variants that claim it,
///   rescaling the reference triple in place. Atoms bonded across alternate
///   locations (per the injectable predicate) keep full weight.
///
/// The cross-variant overlap table is built in one pass and consumed
/// immutably afterwards. `system` is the superstructure, used for the
/// integrity check on overlap selections.
#[instrument(skip_all, fields(variants = variants.len(), policy = ?policy))]
pub fn reconcile(
    system: &MolecularSystem,
    variants: &[VariantFragments],
    system_size: u32,
    policy: AltlocPolicy,
    predicate: &dyn AltlocBondPredicate,
) -> Result<FragmentSet, EngineError> {
    let n_clusters = variants.first().map(|v| v.cluster_atoms.len()).unwrap_or(0);
    let mut set = FragmentSet {
        system_size,
        cluster_atoms: Vec::new(),
        fragment_atoms: Vec::new(),
        scales: Vec::new(),
    };

    // The reference variant contributes every cluster unconditionally.
    for i in 0..n_clusters {
        set.push_full(&variants[0], i);
    }

    if variants.len() < 2 {
        return Ok(set);
    }

    // Cluster index -> variants whose overlap is averaged rather than
    // collected independently (average policy only).
    let mut averaging_table: Vec<(usize, Vec<usize>)> = Vec::new();

    for i in 0..n_clusters {
        let differing: Vec<usize> = (1..variants.len())
            .filter(|&j| variants[j].fragment_atoms[i] != variants[0].fragment_atoms[i])
            .collect();
        if differing.is_empty() {
            continue;
        }

        let mut averaged_members = Vec::new();

        for &j in &differing {
            let overlap_cluster =
                intersect_sorted(&variants[0].cluster_atoms[i], &variants[j].cluster_atoms[i]);

            match policy {
                AltlocPolicy::Subtract => {
                    set.push_full(&variants[j], i);
                    if overlap_cluster.is_empty() {
                        continue;
                    }
                    let overlap_fragment = intersect_sorted(
                        &variants[0].fragment_atoms[i],
                        &variants[j].fragment_atoms[i],
                    );
                    check_backbone_pairing(system, &overlap_fragment)?;

                    // The overlap was counted once per claiming variant; a
                    // flat -1.0 subtracts it back out exactly once.
                    let scales: Vec<f64> = overlap_fragment
                        .iter()
                        .filter(|&&serial| serial <= system_size)
                        .map(|_| -1.0)
                        .collect();

                    set.cluster_atoms.push(overlap_cluster);
                    set.fragment_atoms.push(overlap_fragment);
                    set.scales.push(scales);
                }
                AltlocPolicy::Average => {
                    if overlap_cluster.is_empty() {
                        set.push_full(&variants[j], i);
                    } else {
                        averaged_members.push(j);
                    }
                }
            }
        }

        if !averaged_members.is_empty() {
            averaging_table.push((i, averaged_members));
        }
    }

    // Consume the averaging table: rescale the reference triples in place,
    // then append each member's triple with divided weights.
    for (i, members) in &averaging_table {
        let mut claimants = vec![0];
        claimants.extend(members.iter().copied());
        let frequency = claim_frequency(variants, *i, &claimants);

        let divided_scale = |cluster: &[u32], serial: u32, base: f64| -> f64 {
            let shared = cluster.binary_search(&serial).is_ok();
            if shared && !predicate.bonded_across_altloc(serial) {
                1.0 / frequency[&serial] as f64
            } else {
                base
            }
        };

        let reference_cluster = &variants[0].cluster_atoms[*i];
        for (position, &serial) in variants[0].fragment_atoms[*i]
            .iter()
            .filter(|&&serial| serial <= system_size)
            .enumerate()
        {
            set.scales[*i][position] = divided_scale(reference_cluster, serial, set.scales[*i][position]);
        }

        for &j in members {
            let cluster = &variants[j].cluster_atoms[*i];
            let scales: Vec<f64> = variants[j].fragment_atoms[*i]
                .iter()
                .filter(|&&serial| serial <= system_size)
                .map(|&serial| divided_scale(cluster, serial, 1.0))
                .collect();
            set.cluster_atoms.push(cluster.clone());
            set.fragment_atoms.push(variants[j].fragment_atoms[*i].clone());
            set.scales.push(scales);
        }
    }

    debug!(triples = set.len(), "Overlap reconciliation complete.");
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::chain::ChainType;
    use crate::core::models::system::MolecularSystem;
    use nalgebra::Point3;

    struct AlwaysBonded;

    impl AltlocBondPredicate for AlwaysBonded {
        fn bonded_across_altloc(&self, _serial: u32) -> bool {
            true
        }
    }

    /// A system of `n` single-atom residues with neutral names, so the
    /// backbone integrity check is trivially satisfied.
    fn plain_system(n: usize) -> MolecularSystem {
        let mut system = MolecularSystem::new();
        let chain = system.add_chain('A', ChainType::Protein);
        for number in 1..=n {
            let residue = system.add_residue(chain, number as isize, "UNK", None).unwrap();
            system
                .add_atom_to_residue(
                    residue,
                    Atom::new("X", residue, Point3::new(number as f64, 0.0, 0.0)),
                )
                .unwrap();
        }
        system
    }

    fn variant(tag: char, cluster: Vec<u32>, fragment: Vec<u32>) -> VariantFragments {
        VariantFragments {
            tag: Some(tag),
            cluster_atoms: vec![cluster],
            fragment_atoms: vec![fragment],
        }
    }

    /// Sum of scale-weighted cluster membership over all triples.
    fn cluster_weight(set: &FragmentSet, serial: u32) -> f64 {
        (0..set.len())
            .map(|t| {
                if !set.cluster_atoms[t].contains(&serial) {
                    return 0.0;
                }
                set.scaled_base_atoms(t)
                    .iter()
                    .find(|(s, _)| *s == serial)
                    .map(|(_, w)| *w)
                    .unwrap_or(0.0)
            })
            .sum()
    }

    #[test]
    fn single_variant_keeps_unit_scales() {
        let system = plain_system(8);
        let variants = vec![VariantFragments {
            tag: None,
            cluster_atoms: vec![vec![1, 2, 3], vec![4, 5]],
            fragment_atoms: vec![vec![1, 2, 3, 4], vec![3, 4, 5, 6]],
        }];

        let set = reconcile(&system, &variants, 8, AltlocPolicy::Average, &NeverBonded).unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.scales.iter().flatten().all(|&s| s == 1.0));
        for serial in 1..=5 {
            assert_eq!(cluster_weight(&set, serial), 1.0);
        }
    }

    #[test]
    fn identical_fragments_need_no_correction() {
        let system = plain_system(6);
        let variants = vec![
            variant('A', vec![1, 2], vec![1, 2, 3]),
            variant('B', vec![1, 2], vec![1, 2, 3]),
        ];

        let set = reconcile(&system, &variants, 6, AltlocPolicy::Subtract, &AlwaysBonded).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.scales[0].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn subtract_cancels_a_four_atom_overlap_exactly() {
        let system = plain_system(12);
        // Two conformations share atoms 1-4; each adds its own tail.
        let variants = vec![
            variant('A', vec![1, 2, 3, 4, 5, 6], vec![1, 2, 3, 4, 5, 6, 7, 8]),
            variant('B', vec![1, 2, 3, 4, 9, 10], vec![1, 2, 3, 4, 9, 10, 11]),
        ];

        let set = reconcile(&system, &variants, 12, AltlocPolicy::Subtract, &AlwaysBonded).unwrap();

        // Reference triple, variant B's triple, and one correction.
        assert_eq!(set.len(), 3);
        assert_eq!(set.cluster_atoms[2], vec![1, 2, 3, 4]);
        assert_eq!(set.fragment_atoms[2], vec![1, 2, 3, 4]);
        assert_eq!(set.scales[2], vec![-1.0; 4]);

        for serial in [1, 2, 3, 4] {
            assert_eq!(cluster_weight(&set, serial), 1.0, "overlap atom {serial}");
        }
        for serial in [5, 6, 9, 10] {
            assert_eq!(cluster_weight(&set, serial), 1.0, "exclusive atom {serial}");
        }
    }

    #[test]
    fn subtract_cancels_unbonded_overlap_atoms_too() {
        let system = plain_system(12);
        let variants = vec![
            variant('A', vec![1, 2, 5], vec![1, 2, 5, 6]),
            variant('B', vec![1, 2, 9], vec![1, 2, 9, 10]),
        ];

        let set = reconcile(&system, &variants, 12, AltlocPolicy::Subtract, &NeverBonded).unwrap();

        // The correction is a flat -1.0 whether or not the overlap atoms are
        // bonded across alternate locations.
        assert_eq!(set.len(), 3);
        assert_eq!(set.cluster_atoms[2], vec![1, 2]);
        assert_eq!(set.scales[2], vec![-1.0, -1.0]);

        for serial in [1, 2] {
            assert_eq!(cluster_weight(&set, serial), 1.0, "overlap atom {serial}");
        }
        for serial in [5, 9] {
            assert_eq!(cluster_weight(&set, serial), 1.0, "exclusive atom {serial}");
        }
    }

    #[test]
    fn average_divides_shared_atoms_by_frequency() {
        let system = plain_system(12);
        let variants = vec![
            variant('A', vec![1, 2, 3, 4, 5, 6], vec![1, 2, 3, 4, 5, 6, 7, 8]),
            variant('B', vec![1, 2, 3, 4, 9, 10], vec![1, 2, 3, 4, 9, 10, 11]),
        ];

        let set = reconcile(&system, &variants, 12, AltlocPolicy::Average, &NeverBonded).unwrap();

        // No correction triple: the reference is rescaled, the member added.
        assert_eq!(set.len(), 2);
        assert_eq!(set.scales[0], vec![0.5, 0.5, 0.5, 0.5, 1.0, 1.0, 1.0, 1.0]);
        assert_eq!(set.scales[1], vec![0.5, 0.5, 0.5, 0.5, 1.0, 1.0, 1.0]);

        for serial in [1, 2, 3, 4, 5, 6, 9, 10] {
            assert_eq!(cluster_weight(&set, serial), 1.0, "atom {serial}");
        }
    }

    #[test]
    fn average_keeps_bonded_atoms_at_full_weight() {
        let system = plain_system(12);
        let variants = vec![
            variant('A', vec![1, 2, 5], vec![1, 2, 5]),
            variant('B', vec![1, 2, 9], vec![1, 2, 9]),
        ];

        let set = reconcile(&system, &variants, 12, AltlocPolicy::Average, &AlwaysBonded).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.scales[0].iter().all(|&s| s == 1.0));
        assert!(set.scales[1].iter().all(|&s| s == 1.0));
    }

    #[test]
    fn average_with_empty_overlap_collects_independently() {
        let system = plain_system(12);
        let variants = vec![
            variant('A', vec![1, 2], vec![1, 2, 3]),
            variant('B', vec![5, 6], vec![5, 6, 7]),
        ];

        let set = reconcile(&system, &variants, 12, AltlocPolicy::Average, &NeverBonded).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.cluster_atoms[1], vec![5, 6]);
        assert!(set.scales.iter().flatten().all(|&s| s == 1.0));
    }

    #[test]
    fn superstructure_buffer_atoms_carry_no_scale() {
        let system = plain_system(6);
        // Serials 7 and 8 lie beyond the base structure.
        let variants = vec![VariantFragments {
            tag: None,
            cluster_atoms: vec![vec![1, 2]],
            fragment_atoms: vec![vec![1, 2, 3, 7, 8]],
        }];

        let set = reconcile(&system, &variants, 6, AltlocPolicy::Average, &NeverBonded).unwrap();
        assert_eq!(set.scales[0].len(), 3);
        assert_eq!(set.scaled_base_atoms(0), vec![(1, 1.0), (2, 1.0), (3, 1.0)]);
    }

    #[test]
    fn distance_predicate_uses_the_cutoff() {
        let mut system = MolecularSystem::new();
        let chain = system.add_chain('A', ChainType::Protein);
        let residue = system.add_residue(chain, 1, "SER", None).unwrap();
        system
            .add_atom_to_residue(residue, Atom::new("X", residue, Point3::new(0.0, 0.0, 0.0)))
            .unwrap();
        system
            .add_atom_to_residue(residue, Atom::new("Y", residue, Point3::new(10.0, 0.0, 0.0)))
            .unwrap();
        let mut tagged = Atom::new("Z", residue, Point3::new(1.0, 0.0, 0.0));
        tagged.alt_loc = Some('A');
        system.add_atom_to_residue(residue, tagged).unwrap();

        let predicate = DistanceBondPredicate::new(&system, 1.7);
        assert!(predicate.bonded_across_altloc(1), "1.0 A from the alternate");
        assert!(!predicate.bonded_across_altloc(2), "9 A away");

        let never = NeverBonded;
        assert!(!never.bonded_across_altloc(1));
    }
}

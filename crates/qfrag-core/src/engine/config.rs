use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// How overlapping alternate-conformation fragments are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AltlocPolicy {
    /// Collect every variant's fragment at full weight and subtract the
    /// double-counted overlap back out with a correction fragment.
    Subtract,
    /// Divide each shared atom's weight evenly across the variants that
    /// claim it instead of emitting an explicit correction.
    Average,
}

/// Quantum-chemistry backends a fragment extract may be handed to.
///
/// The engine never talks to these programs; the variant only selects the
/// electrostatic-embedding file format their drivers expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QmEngine {
    Turbomole,
    Terachem,
    Xtb,
    Mopac,
    Orca,
    Gaussian,
}

/// Layout of a point-charge file for electrostatic embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingKind {
    /// One `x y z q` row per background atom.
    Xyzq,
    /// One `q x y z` row per background atom.
    Qxyz,
}

impl QmEngine {
    /// The embedding file layout this engine's driver consumes, or `None`
    /// when the engine has no point-charge input format.
    pub fn embedding_kind(&self) -> Option<EmbeddingKind> {
        match self {
            QmEngine::Turbomole => Some(EmbeddingKind::Xyzq),
            QmEngine::Terachem | QmEngine::Xtb | QmEngine::Mopac => Some(EmbeddingKind::Qxyz),
            QmEngine::Orca | QmEngine::Gaussian => None,
        }
    }
}

/// Parameters governing a fragmentation run.
///
/// The defaults reproduce the reference behavior: clusters of at most 20
/// residues, a centrality floor of 9 shortest paths, one buffer shell, and
/// averaging of alternate-location overlap.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FragmentationConfig {
    /// Hard upper bound on residues per cluster.
    pub max_residues_per_cluster: usize,
    /// Edge-betweenness floor below which a component is not split further.
    pub centrality_threshold: f64,
    /// Overlap reconciliation policy for alternate conformations.
    pub altloc_policy: AltlocPolicy,
    /// Grow a second buffer shell around every fragment.
    pub two_buffers: bool,
    /// Stop after clustering; no fragments are grown or finalized.
    pub clusters_only: bool,
    /// Treat atoms near another conformation's atoms as bonded across
    /// alternate locations during overlap correction.
    pub bond_with_altloc: bool,
    /// Distance cutoff for the altloc bond heuristic, in Angstroms.
    pub altloc_bond_cutoff: f64,
    /// Produce a point-charge file for electrostatic embedding per fragment.
    pub charge_embedding: bool,
    /// Radius around a fragment selecting the embedding background, in Angstroms.
    pub charge_cutoff: f64,
    /// Target quantum-chemistry backend, if any.
    pub qm_engine: Option<QmEngine>,
    /// Directory for per-fragment working files.
    pub working_dir: PathBuf,
    /// Create the working directory if it does not exist.
    pub make_working_dir: bool,
    /// Write per-fragment structure files (`<i>.pdb`, `<i>_capping.pdb`).
    pub save_fragments: bool,
    /// Write the cluster/fragment/capped snapshot set and the plain-text summary.
    pub save_clusters: bool,
}

impl Default for FragmentationConfig {
    fn default() -> Self {
        Self {
            max_residues_per_cluster: 20,
            centrality_threshold: 9.0,
            altloc_policy: AltlocPolicy::Average,
            two_buffers: false,
            clusters_only: false,
            bond_with_altloc: true,
            altloc_bond_cutoff: 1.7,
            charge_embedding: false,
            charge_cutoff: 8.0,
            qm_engine: None,
            working_dir: PathBuf::from("qfrag"),
            make_working_dir: true,
            save_fragments: false,
            save_clusters: false,
        }
    }
}

impl FragmentationConfig {
    pub fn builder() -> FragmentationConfigBuilder {
        FragmentationConfigBuilder::default()
    }

    /// Parses a configuration from TOML text and validates it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::InvalidParameter {
            name: "config",
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field consistency. Called by the builder and by loaders
    /// that deserialize a configuration directly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_residues_per_cluster == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "max_residues_per_cluster",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.altloc_bond_cutoff <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "altloc_bond_cutoff",
                reason: "must be positive".to_string(),
            });
        }
        if self.charge_embedding && self.qm_engine.is_none() {
            return Err(ConfigError::MissingParameter("qm_engine"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FragmentationConfigBuilder {
    config: FragmentationConfig,
}

impl FragmentationConfigBuilder {
    pub fn max_residues_per_cluster(mut self, n: usize) -> Self {
        self.config.max_residues_per_cluster = n;
        self
    }
    pub fn centrality_threshold(mut self, threshold: f64) -> Self {
        self.config.centrality_threshold = threshold;
        self
    }
    pub fn altloc_policy(mut self, policy: AltlocPolicy) -> Self {
        self.config.altloc_policy = policy;
        self
    }
    pub fn two_buffers(mut self, enabled: bool) -> Self {
        self.config.two_buffers = enabled;
        self
    }
    pub fn clusters_only(mut self, enabled: bool) -> Self {
        self.config.clusters_only = enabled;
        self
    }
    pub fn bond_with_altloc(mut self, enabled: bool) -> Self {
        self.config.bond_with_altloc = enabled;
        self
    }
    pub fn altloc_bond_cutoff(mut self, cutoff: f64) -> Self {
        self.config.altloc_bond_cutoff = cutoff;
        self
    }
    pub fn charge_embedding(mut self, enabled: bool) -> Self {
        self.config.charge_embedding = enabled;
        self
    }
    pub fn charge_cutoff(mut self, cutoff: f64) -> Self {
        self.config.charge_cutoff = cutoff;
        self
    }
    pub fn qm_engine(mut self, engine: QmEngine) -> Self {
        self.config.qm_engine = Some(engine);
        self
    }
    pub fn working_dir(mut self, dir: PathBuf) -> Self {
        self.config.working_dir = dir;
        self
    }
    pub fn make_working_dir(mut self, enabled: bool) -> Self {
        self.config.make_working_dir = enabled;
        self
    }
    pub fn save_fragments(mut self, enabled: bool) -> Self {
        self.config.save_fragments = enabled;
        self
    }
    pub fn save_clusters(mut self, enabled: bool) -> Self {
        self.config.save_clusters = enabled;
        self
    }

    pub fn build(self) -> Result<FragmentationConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behavior() {
        let config = FragmentationConfig::default();
        assert_eq!(config.max_residues_per_cluster, 20);
        assert_eq!(config.centrality_threshold, 9.0);
        assert_eq!(config.altloc_policy, AltlocPolicy::Average);
        assert!(!config.two_buffers);
        assert!(config.bond_with_altloc);
        assert_eq!(config.altloc_bond_cutoff, 1.7);
        assert_eq!(config.charge_cutoff, 8.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_overrides_and_validates() {
        let config = FragmentationConfig::builder()
            .max_residues_per_cluster(5)
            .altloc_policy(AltlocPolicy::Subtract)
            .two_buffers(true)
            .build()
            .unwrap();
        assert_eq!(config.max_residues_per_cluster, 5);
        assert_eq!(config.altloc_policy, AltlocPolicy::Subtract);
        assert!(config.two_buffers);
    }

    #[test]
    fn zero_cluster_bound_is_rejected() {
        let result = FragmentationConfig::builder()
            .max_residues_per_cluster(0)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "max_residues_per_cluster",
                ..
            })
        ));
    }

    #[test]
    fn embedding_without_engine_is_rejected() {
        let result = FragmentationConfig::builder().charge_embedding(true).build();
        assert_eq!(result, Err(ConfigError::MissingParameter("qm_engine")));
    }

    #[test]
    fn embedding_kinds_follow_engine_conventions() {
        assert_eq!(
            QmEngine::Turbomole.embedding_kind(),
            Some(EmbeddingKind::Xyzq)
        );
        assert_eq!(QmEngine::Xtb.embedding_kind(), Some(EmbeddingKind::Qxyz));
        assert_eq!(QmEngine::Orca.embedding_kind(), None);
    }

    #[test]
    fn config_deserializes_from_toml() {
        let config: FragmentationConfig = toml::from_str(
            r#"
            max_residues_per_cluster = 12
            altloc_policy = "subtract"
            qm_engine = "turbomole"
            charge_embedding = true
            "#,
        )
        .unwrap();
        assert_eq!(config.max_residues_per_cluster, 12);
        assert_eq!(config.altloc_policy, AltlocPolicy::Subtract);
        assert_eq!(config.qm_engine, Some(QmEngine::Turbomole));
        assert!(config.validate().is_ok());
    }
}

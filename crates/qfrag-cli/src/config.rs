use crate::cli::{AltlocMethodArg, FragmentArgs, QmEngineArg};
use crate::error::{CliError, Result};
use qfrag::engine::config::{AltlocPolicy, FragmentationConfig, QmEngine};
use tracing::info;

/// Builds the final engine configuration: the TOML file (or defaults) with
/// command-line overrides applied on top, validated as a whole.
pub fn build_config(args: &FragmentArgs) -> Result<FragmentationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            let text = std::fs::read_to_string(path)?;
            FragmentationConfig::from_toml_str(&text)
                .map_err(|e| CliError::Config(e.to_string()))?
        }
        None => FragmentationConfig::default(),
    };

    if let Some(n) = args.max_residues {
        config.max_residues_per_cluster = n;
    }
    if let Some(threshold) = args.centrality_threshold {
        config.centrality_threshold = threshold;
    }
    if let Some(method) = args.altloc_method {
        config.altloc_policy = match method {
            AltlocMethodArg::Subtract => AltlocPolicy::Subtract,
            AltlocMethodArg::Average => AltlocPolicy::Average,
        };
    }
    if let Some(engine) = args.qm_engine {
        config.qm_engine = Some(match engine {
            QmEngineArg::Turbomole => QmEngine::Turbomole,
            QmEngineArg::Terachem => QmEngine::Terachem,
            QmEngineArg::Xtb => QmEngine::Xtb,
            QmEngineArg::Mopac => QmEngine::Mopac,
            QmEngineArg::Orca => QmEngine::Orca,
            QmEngineArg::Gaussian => QmEngine::Gaussian,
        });
    }
    if let Some(dir) = &args.working_dir {
        config.working_dir = dir.clone();
    }
    if args.two_buffers {
        config.two_buffers = true;
    }
    if args.clusters_only {
        config.clusters_only = true;
    }
    if args.charge_embedding {
        config.charge_embedding = true;
    }
    if args.save_fragments {
        config.save_fragments = true;
    }
    if args.save_clusters {
        config.save_clusters = true;
    }

    config
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(config)
}

use crate::cli::FragmentArgs;
use crate::config::build_config;
use crate::error::{CliError, Result};
use crate::utils::progress::ProgressBridge;
use qfrag::core::io::pdb::read_pdb;
use qfrag::engine::oracle::{DEFAULT_CONTACT_CUTOFF, DistanceOracle};
use qfrag::engine::progress::ProgressReporter;
use qfrag::engine::services::{PassthroughCompletion, ResidueTableCharges};
use qfrag::workflows;
use qfrag::workflows::fragment::{Collaborators, FragmentationResult};
use tracing::info;

pub fn run(args: FragmentArgs) -> Result<()> {
    let config = build_config(&args)?;

    info!("Loading input structure from {:?}", &args.input);
    let (system, frame) = read_pdb(&args.input).map_err(|e| CliError::FileParsing {
        path: args.input.clone(),
        source: e,
    })?;
    info!(
        atoms = system.atom_count(),
        residues = system.residue_count(),
        "Input structure loaded."
    );

    let expansion = match &args.expansion {
        Some(path) => {
            info!("Loading superstructure from {:?}", path);
            let (superstructure, _) = read_pdb(path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e,
            })?;
            Some(superstructure)
        }
        None => None,
    };

    let bridge = ProgressBridge::new();
    let reporter = ProgressReporter::with_callback(bridge.callback());
    let oracle = DistanceOracle::new(args.contact_cutoff.unwrap_or(DEFAULT_CONTACT_CUTOFF));
    let collaborators = Collaborators {
        oracle: &oracle,
        completion: &PassthroughCompletion,
        charges: &ResidueTableCharges,
        bond_predicate: None,
    };

    println!("Starting fragmentation...");
    let result = workflows::fragment::run(
        &system,
        expansion.as_ref(),
        &frame,
        &collaborators,
        &config,
        &reporter,
    )?;

    print_report(&result, config.clusters_only);
    Ok(())
}

fn print_report(result: &FragmentationResult, clusters_only: bool) {
    println!(
        "Partitioned into {} cluster(s) (largest: {} residues).",
        result.clusters.len(),
        result.clusters.first().map(|c| c.len()).unwrap_or(0)
    );
    if clusters_only {
        for (index, cluster) in result.clusters.iter().enumerate() {
            println!("  cluster {index}: {} residue(s)", cluster.len());
        }
        return;
    }

    println!("Emitted {} fragment(s):", result.extracts.len());
    for extract in &result.extracts {
        let cluster_atoms = result.fragments.cluster_atoms[extract.index].len();
        let fragment_atoms = result.fragments.fragment_atoms[extract.index].len();
        let embedding = extract
            .embedding_file
            .as_ref()
            .map(|path| format!(", embedding: {}", path.display()))
            .unwrap_or_default();
        println!(
            "  fragment {:>3}: {:>5} cluster atoms, {:>5} fragment atoms, charge {:+.1}{}",
            extract.index, cluster_atoms, fragment_atoms, extract.charge, embedding
        );
    }
}

use crate::core::io::pdb::PdbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Unsupported chemistry or malformed input, detected before clustering.
    #[error("Input validation failed: {0}")]
    Validation(String),

    /// A chemically inconsistent selection produced by the graph/oracle
    /// interaction. Indicates a bug, never recoverable by retrying.
    #[error("Internal consistency violated: {0}")]
    Integrity(String),

    /// A requested output cannot be produced with the given configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Pair-interaction oracle failed: {0}")]
    Oracle(String),

    #[error("Structure completion failed: {0}")]
    Completion(String),

    #[error("Charge evaluation failed: {0}")]
    Charge(String),

    #[error("Structure export failed: {source}")]
    Export {
        #[from]
        source: PdbError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! # Engine Module
//!
//! This module implements the fragmentation engine for QFRAG: the stateful
//! layer that turns a clustered residue partition into finalized, QM-ready
//! fragment extracts.
//!
//! ## Overview
//!
//! The engine orchestrates the stages between a molecular system and its
//! fragment extracts. Each stage is a pure function over the previous stage's
//! value; the pluggable collaborator seams (pair-interaction oracle,
//! completion service, charge service, altloc bond predicate) are traits with
//! reference implementations shipped alongside.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Fragmentation parameters and policies
//! - **Error Handling** ([`error`]) - Engine-specific error taxonomy
//! - **Progress Monitoring** ([`progress`]) - Progress reporting callbacks
//! - **Collaborator Seams** ([`oracle`], [`services`]) - External interfaces
//!   and their reference implementations
//! - **Variant Views** ([`variants`]) - Alternate-location structure views
//! - **Validation** ([`validate`]) - Input validation and integrity checks
//! - **Fragment Growth** ([`growth`]) - Cluster-to-fragment expansion
//! - **Overlap Reconciliation** ([`reconcile`]) - Cross-variant scale accounting
//! - **Finalization** ([`finalize`]) - Selection masks, capping, charges, artifacts

pub mod config;
pub mod error;
pub mod finalize;
pub mod growth;
pub mod oracle;
pub mod progress;
pub mod reconcile;
pub mod services;
pub mod validate;
pub mod variants;

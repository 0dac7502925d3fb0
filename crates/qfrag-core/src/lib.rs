//! # QFRAG Core Library
//!
//! A graph-based fragmentation library for macromolecular structures, producing
//! bounded-size, chemically valid sub-structures suitable for independent
//! quantum-mechanical evaluation while preserving full-system energy accounting.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a clear
//! separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models (`MolecularSystem`),
//!   pure graph algorithms (interaction graphs, betweenness-centrality clustering),
//!   and minimal structure I/O.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer orchestrates fragmentation.
//!   It defines the pluggable collaborator seams (`PairInteractionOracle`,
//!   `CompletionService`, `ChargeService`), grows clusters into buffered fragments,
//!   reconciles alternate-conformation overlap, and finalizes per-fragment extracts.
//!
//! - **[`workflows`]: The Public API.** This is the highest-level, user-facing layer.
//!   It ties the `engine` and `core` together into the complete pipeline:
//!   structure → clusters → per-variant fragments → reconciled fragments →
//!   finalized extracts.

pub mod core;
pub mod engine;
pub mod workflows;

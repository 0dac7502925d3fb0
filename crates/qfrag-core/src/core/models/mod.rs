//! # Core Models Module
//!
//! This module contains the fundamental data structures used to represent
//! molecular systems in QFRAG, providing the foundation for all fragmentation
//! operations.
//!
//! ## Overview
//!
//! The models module defines the core abstractions for representing molecular
//! structures, including atoms, residues, chains, and their relationships.
//! These models are designed to:
//!
//! - **Represent molecular structure** - Coordinates, identity, and membership
//! - **Track alternate locations** - Per-atom altloc tags and occupancies, the
//!   basis of the engine's variant bookkeeping
//! - **Preserve stable ordering** - Atom serials and residue order define the
//!   global index spaces the fragmentation invariants are stated in
//! - **Maintain type safety** - Slotmap-keyed identifiers for all components
//!
//! ## Key Components
//!
//! - [`atom`] - Individual atom representation with serial, element, and altloc tag
//! - [`residue`] - Residue structure, classification, and formal charges
//! - [`chain`] - Chain organization and type metadata
//! - [`system`] - Complete molecular system with ordered index spaces
//! - [`frame`] - Crystallographic frame carried through completion and export
//! - [`ids`] - Unique identifier types for atoms, residues, and chains

pub mod atom;
pub mod chain;
pub mod frame;
pub mod ids;
pub mod residue;
pub mod system;

//! # I/O Module
//!
//! Minimal structure I/O for QFRAG: a fixed-column PDB `ATOM`/`HETATM`
//! reader and writer, enough to ingest a driver's input and to persist
//! per-fragment artifacts. Full crystallographic I/O (symmetry records,
//! anisotropic fields, mmCIF) is an external concern.

pub mod pdb;

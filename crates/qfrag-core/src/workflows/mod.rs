//! # Workflows Module
//!
//! The public, user-facing layer of QFRAG. A workflow ties the `core` and
//! `engine` layers together into a complete scientific procedure; today that
//! is [`fragment`], the full fragmentation pipeline from a molecular system
//! to finalized, QM-ready fragment extracts.

pub mod fragment;

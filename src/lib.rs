//! bandcost — negative-cost equity position tracker.
//!
//! Folds a chronological trade ledger into per-stock and portfolio
//! financial state and derives rule-based trading suggestions. Hexagonal
//! architecture: calculation engine in [`domain`], port traits in
//! [`ports`], concrete collaborators in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;

//! Gantry: demand-driven station graph for transport simulation analytics.
//!
//! Stations hold tool registries and are wired supplier-to-manager. A root
//! requirement map pulls only what is asked for down the graph; stations are
//! then built deepest first, each reading the artifacts its suppliers cached.

pub mod cli;
pub mod core;
pub mod provenance;
pub mod stations;

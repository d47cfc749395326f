//! Station graph engine: wiring, validation, depth, resolution, execution.

pub mod error;
pub mod executor;
pub mod graph;
pub mod parser;
pub mod planner;
pub mod registry;
pub mod resolver;
pub mod types;
pub mod validate;

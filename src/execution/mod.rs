//! Execution engine module.
//!
//! This module runs the per-pixel loop over an ordered graph.

pub mod engine;

pub use engine::{ExecutionEngine, ExecutionOptions, ExecutionStats};

//! Operator module.
//!
//! Contains the operator registry and built-in operator implementations.

pub mod registry;
pub mod builtin;

pub use registry::{OperatorFactory, OperatorRegistry};

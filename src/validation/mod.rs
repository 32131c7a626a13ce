//! Validation module for pre-execution checking.
//!
//! The validation pipeline runs before execution to catch errors early.
//! Execution never runs it implicitly.

pub mod pipeline;
pub mod stages;

pub use pipeline::{validate, ValidationPipeline};
pub use stages::{BindingValidation, ReachabilityValidation, StructuralValidation, ValidationStage};

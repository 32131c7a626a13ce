//! Validation pipeline implementation.

use crate::core::error::ValidationReport;
use crate::graph::structure::Graph;
use crate::validation::stages::{
    BindingValidation, ReachabilityValidation, StructuralValidation, ValidationStage,
};

/// Multi-stage validation pipeline.
///
/// Runs a series of validation stages on a graph to check for errors
/// before execution begins. Every stage runs; the report collects all of
/// their findings.
pub struct ValidationPipeline {
    stages: Vec<Box<dyn ValidationStage>>,
}

impl ValidationPipeline {
    /// Create a new pipeline with the given stages.
    pub fn new(stages: Vec<Box<dyn ValidationStage>>) -> Self {
        Self { stages }
    }

    /// Create the default validation pipeline with all standard stages.
    pub fn default_pipeline() -> Self {
        Self {
            stages: vec![
                Box::new(StructuralValidation),
                Box::new(BindingValidation),
                Box::new(ReachabilityValidation),
            ],
        }
    }

    /// Add a custom validation stage.
    pub fn add_stage(&mut self, stage: Box<dyn ValidationStage>) {
        self.stages.push(stage);
    }

    /// Validate a graph through all stages.
    pub fn validate(&self, graph: &Graph) -> ValidationReport {
        let mut report = ValidationReport::new();

        for stage in &self.stages {
            match stage.validate(graph) {
                Ok(warnings) => warnings.into_iter().for_each(|w| report.add_warning(w)),
                Err(errors) => {
                    log::debug!("{} found {} error(s)", stage.name(), errors.len());
                    errors.into_iter().for_each(|e| report.add_error(e));
                }
            }
        }

        report
    }

    /// Quick validation - just check if the graph can be executed.
    pub fn can_execute(&self, graph: &Graph) -> bool {
        self.validate(graph).can_execute()
    }
}

impl Default for ValidationPipeline {
    fn default() -> Self {
        Self::default_pipeline()
    }
}

/// Run the default pipeline over `graph`.
pub fn validate(graph: &Graph) -> ValidationReport {
    ValidationPipeline::default_pipeline().validate(graph)
}

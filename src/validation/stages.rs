//! Individual validation stages.
//!
//! Each stage checks for a specific category of errors.

use crate::core::error::{GraphError, ValidationError, ValidationWarning};
use crate::core::port::InputFallback;
use crate::graph::structure::Graph;
use crate::graph::topology::TopologyAnalyzer;

/// Trait for validation stages.
pub trait ValidationStage: Send + Sync {
    /// Name of this validation stage.
    fn name(&self) -> &str;

    /// Validate the graph.
    ///
    /// Returns Ok with warnings, or Err with errors.
    fn validate(&self, graph: &Graph) -> Result<Vec<ValidationWarning>, Vec<ValidationError>>;
}

/// Structural validation - checks graph structure.
///
/// Verifies:
/// - No registration or bind has failed
/// - A sink is registered
/// - Graph is a DAG (no cycles)
pub struct StructuralValidation;

impl ValidationStage for StructuralValidation {
    fn name(&self) -> &str {
        "Structural Validation"
    }

    fn validate(&self, graph: &Graph) -> Result<Vec<ValidationWarning>, Vec<ValidationError>> {
        // Empty graph: only the missing sink matters
        if graph.is_empty() {
            return Err(vec![ValidationError::MissingSinkNode]);
        }

        let mut errors = Vec::new();
        if !graph.is_valid() {
            errors.push(ValidationError::InvalidGraph);
        }
        if graph.sink().is_none() {
            errors.push(ValidationError::MissingSinkNode);
        }
        let order = TopologyAnalyzer::new(graph).topological_sort();
        if let Err(GraphError::CyclicGraph { nodes }) = order {
            errors.push(ValidationError::CycleDetected(nodes));
        }

        if errors.is_empty() {
            Ok(Vec::new())
        } else {
            Err(errors)
        }
    }
}

/// Binding validation - every `Required` input must be bound.
///
/// Inputs with a runtime fallback may stay unbound.
pub struct BindingValidation;

impl ValidationStage for BindingValidation {
    fn name(&self) -> &str {
        "Binding Validation"
    }

    fn validate(&self, graph: &Graph) -> Result<Vec<ValidationWarning>, Vec<ValidationError>> {
        let errors: Vec<ValidationError> = graph
            .nodes()
            .flat_map(|node| {
                node.ports()
                    .inputs()
                    .filter(|(_, port)| {
                        !port.is_bound() && port.fallback() == InputFallback::Required
                    })
                    .map(move |(name, _)| ValidationError::UnboundInput {
                        node: node.name().to_string(),
                        port: name.to_string(),
                    })
            })
            .collect();

        if errors.is_empty() {
            Ok(Vec::new())
        } else {
            Err(errors)
        }
    }
}

/// Reachability validation - warns about nodes whose results never reach
/// the sink. They are still computed for every pixel.
pub struct ReachabilityValidation;

impl ValidationStage for ReachabilityValidation {
    fn name(&self) -> &str {
        "Reachability Validation"
    }

    fn validate(&self, graph: &Graph) -> Result<Vec<ValidationWarning>, Vec<ValidationError>> {
        if graph.is_empty() {
            return Ok(vec![ValidationWarning::EmptyGraph]);
        }
        Ok(TopologyAnalyzer::new(graph)
            .unused_nodes()
            .into_iter()
            .map(ValidationWarning::UnusedNode)
            .collect())
    }
}

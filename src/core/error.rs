//! Error types for pixgraph.
//!
//! Uses thiserror for structured errors with context. Errors are grouped by
//! the lifecycle phase that raises them:
//! - [`GraphError`]: building and ordering (structural problems)
//! - [`ExecutionError`]: the per-pixel evaluation loop
//! - [`ValidationError`]: the optional pre-flight report

use crate::core::types::PortType;
use thiserror::Error;

/// Top-level error type for pixgraph.
///
/// This enum encompasses all error categories and enables automatic
/// conversion between specific error types.
#[derive(Error, Debug)]
pub enum PixGraphError {
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors related to graph structure, raised while building or ordering.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("A node named '{0}' already exists")]
    DuplicateName(String),

    #[error("Node '{0}' not found")]
    UnknownNode(String),

    #[error("Port '{port}' not found on node '{node}'")]
    UnknownPort { node: String, port: String },

    #[error("Port '{port}' is declared twice on node '{node}'")]
    DuplicatePort { node: String, port: String },

    #[error("Cannot bind {found} output to {expected} input '{port}' on node '{node}'")]
    TypeMismatch {
        node: String,
        port: String,
        expected: PortType,
        found: PortType,
    },

    #[error("Input '{port}' on node '{node}' is already bound")]
    PortAlreadyBound { node: String, port: String },

    #[error("Cycle detected in graph involving nodes: {nodes:?}")]
    CyclicGraph { nodes: Vec<String> },

    #[error("Unknown operator kind '{0}'")]
    UnknownOperatorKind(String),

    #[error("Invalid attribute '{attribute}' on node '{node}': {reason}")]
    InvalidAttribute {
        node: String,
        attribute: String,
        reason: String,
    },

    #[error("Graph already has a sink node '{existing}'; cannot add '{node}'")]
    DuplicateSink { existing: String, node: String },

    #[error("Sink node '{node}' must expose a Color output named '{port}'")]
    InvalidSink { node: String, port: String },
}

impl GraphError {
    /// Shorthand used by parameter parsing.
    pub fn invalid_attribute(
        node: impl Into<String>,
        attribute: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        GraphError::InvalidAttribute {
            node: node.into(),
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }
}

/// Errors during graph execution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Graph has no sink node")]
    MissingSinkNode,

    #[error("Graph is marked invalid after a failed registration or bind")]
    InvalidGraph,

    #[error("Input '{port}' on node '{node}' is not bound and has no fallback")]
    UnboundInput { node: String, port: String },

    #[error("Node '{node}' has no port '{port}'")]
    UnknownPort { node: String, port: String },

    #[error("Port '{port}' on node '{node}' holds {found}, expected {expected}")]
    TypeMismatch {
        node: String,
        port: String,
        expected: PortType,
        found: PortType,
    },

    #[error("Graph structure error: {0}")]
    Structure(#[from] GraphError),

    #[error("Could not build worker pool: {0}")]
    ThreadPool(String),
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Result type for execution operations.
pub type ExecutionResult<T> = Result<T, ExecutionError>;

/// Errors reported by the pre-flight validation pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Graph is marked invalid")]
    InvalidGraph,

    #[error("Graph has no sink node")]
    MissingSinkNode,

    #[error("Cycle detected involving nodes: {0:?}")]
    CycleDetected(Vec<String>),

    #[error("Required input '{port}' on node '{node}' is not bound")]
    UnboundInput { node: String, port: String },
}

impl ValidationError {
    /// Get a suggested fix for this error.
    pub fn suggested_fix(&self) -> Option<String> {
        match self {
            ValidationError::MissingSinkNode => {
                Some("Add an 'output' node that declares the raster size".to_string())
            }
            ValidationError::UnboundInput { node, port } => Some(format!(
                "Bind an output to input '{}' of node '{}'",
                port, node
            )),
            ValidationError::CycleDetected(_) => {
                Some("Remove one of the links that closes the loop".to_string())
            }
            ValidationError::InvalidGraph => None,
        }
    }
}

/// Non-fatal findings of the pre-flight validation pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationWarning {
    /// Node output never reaches the sink.
    UnusedNode(String),
    /// Graph contains no nodes at all.
    EmptyGraph,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationWarning::UnusedNode(node) => {
                write!(f, "Node '{}' does not contribute to the sink", node)
            }
            ValidationWarning::EmptyGraph => write!(f, "Graph is empty"),
        }
    }
}

/// Result of the pre-flight validation pass.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Errors that would make execution fail.
    pub errors: Vec<ValidationError>,
    /// Warnings that do not block execution.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error.
    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Add a warning.
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Whether the graph can be executed.
    pub fn can_execute(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_suggestions() {
        let error = ValidationError::UnboundInput {
            node: "sampler".to_string(),
            port: "Tex".to_string(),
        };
        let fix = error.suggested_fix().unwrap();
        assert!(fix.contains("Tex"));
        assert!(fix.contains("sampler"));
    }

    #[test]
    fn test_validation_report() {
        let mut report = ValidationReport::new();
        assert!(report.can_execute());

        report.add_warning(ValidationWarning::EmptyGraph);
        assert!(report.can_execute());

        report.add_error(ValidationError::MissingSinkNode);
        assert!(!report.can_execute());
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_graph_error_converts_to_top_level() {
        let error: PixGraphError = GraphError::UnknownNode("a".to_string()).into();
        assert!(error.to_string().contains("'a'"));
    }
}

//! Operator registry for managing available operator kinds.

use crate::core::error::{GraphError, GraphResult};
use crate::core::node::{Category, NodeMetadata, Operator, Parameters};
use crate::core::port::Attribute;
use indexmap::IndexMap;
use std::sync::Arc;

/// Factory function for creating unconfigured operator instances.
pub type OperatorFactory = Arc<dyn Fn() -> Box<dyn Operator> + Send + Sync>;

/// Registry entry containing metadata and factory.
#[derive(Clone)]
pub struct RegistryEntry {
    /// Factory function to create instances.
    pub factory: OperatorFactory,
    /// Cached metadata (avoids creating instance just to get metadata).
    pub metadata: NodeMetadata,
}

/// Registry of all operator kinds a graph can instantiate.
///
/// Kinds are looked up by id (`"sample_texture"`) or, failing that, by
/// display name ignoring ASCII case (`"Sample Texture"`), which is how scene
/// files usually name them.
pub struct OperatorRegistry {
    /// Operators indexed by their unique ID.
    operators: IndexMap<String, RegistryEntry>,
}

impl OperatorRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            operators: IndexMap::new(),
        }
    }

    /// Create a registry pre-populated with built-in operators.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::filters::builtin::register_all(&mut registry);
        registry
    }

    /// Register an operator kind. A later registration with the same id wins.
    pub fn register<F>(&mut self, factory: F)
    where
        F: Fn() -> Box<dyn Operator> + Send + Sync + 'static,
    {
        // Create a temporary instance to get metadata
        let metadata = factory().metadata();
        log::trace!("Registering operator kind '{}'", metadata.id);

        self.operators.insert(
            metadata.id.clone(),
            RegistryEntry {
                factory: Arc::new(factory),
                metadata,
            },
        );
    }

    /// Find the entry for an id or display name.
    pub fn resolve(&self, kind: &str) -> Option<&RegistryEntry> {
        self.operators.get(kind).or_else(|| {
            self.operators
                .values()
                .find(|entry| entry.metadata.name.eq_ignore_ascii_case(kind))
        })
    }

    /// Create and configure an operator for node `node`.
    ///
    /// Named attributes match parameters by name ignoring ASCII case;
    /// unnamed ones fill parameters in declaration order. Parameters with no
    /// attribute keep their defaults.
    pub fn create(
        &self,
        kind: &str,
        node: &str,
        attributes: &[Attribute],
    ) -> GraphResult<Box<dyn Operator>> {
        let entry = self
            .resolve(kind)
            .ok_or_else(|| GraphError::UnknownOperatorKind(kind.to_string()))?;
        let definitions = &entry.metadata.parameters;
        let mut params = Parameters::from_defaults(node, definitions);

        let mut position = 0;
        for attribute in attributes {
            let definition = match &attribute.name {
                Some(name) => entry.metadata.get_parameter(name).ok_or_else(|| {
                    GraphError::invalid_attribute(
                        node,
                        name.as_str(),
                        format!("'{}' has no such parameter", entry.metadata.id),
                    )
                })?,
                None => {
                    let definition = definitions.get(position).ok_or_else(|| {
                        GraphError::invalid_attribute(
                            node,
                            format!("#{}", position),
                            format!(
                                "'{}' takes {} parameter(s)",
                                entry.metadata.id,
                                definitions.len()
                            ),
                        )
                    })?;
                    position += 1;
                    definition
                }
            };

            let value = definition
                .parse(&attribute.value)
                .map_err(|reason| GraphError::invalid_attribute(node, &definition.name, reason))?;
            params.set(definition.name.clone(), value);
        }

        let mut operator = (entry.factory)();
        operator.configure(&params)?;
        Ok(operator)
    }

    /// Get metadata for an operator without creating an instance.
    pub fn get_metadata(&self, kind: &str) -> Option<&NodeMetadata> {
        self.resolve(kind).map(|e| &e.metadata)
    }

    /// Check if an id or display name is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.resolve(kind).is_some()
    }

    /// Get all registered operator ids.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.operators.keys().map(|s| s.as_str())
    }

    /// Search operators by id, name or description.
    pub fn search(&self, query: &str) -> Vec<&str> {
        let query = query.to_lowercase();

        self.operators
            .iter()
            .filter(|(_, entry)| {
                entry.metadata.id.to_lowercase().contains(&query)
                    || entry.metadata.name.to_lowercase().contains(&query)
                    || entry.metadata.description.to_lowercase().contains(&query)
            })
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Get the total number of registered operators.
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Get operators grouped by category, in category display order.
    pub fn grouped_by_category(&self) -> IndexMap<Category, Vec<&NodeMetadata>> {
        let mut grouped: IndexMap<Category, Vec<&NodeMetadata>> = Category::all()
            .iter()
            .map(|category| (*category, Vec::new()))
            .collect();

        for entry in self.operators.values() {
            grouped
                .entry(entry.metadata.category)
                .or_default()
                .push(&entry.metadata);
        }

        grouped.retain(|_, operators| !operators.is_empty());
        for operators in grouped.values_mut() {
            operators.sort_by(|a, b| a.name.cmp(&b.name));
        }

        grouped
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

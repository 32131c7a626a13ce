//! Graph structure and node management.
//!
//! The [`Graph`] owns every named node, records bindings between their ports,
//! caches one execution order and drives evaluation against its single sink.
//!
//! Lifecycle: `Building` (nodes and bindings may be added) -> `Ordered`
//! (execution order cached) -> `Executed` (pixel loop has run; may run
//! again). Any structural edit drops back to `Building`.

use crate::core::context::{NodeContext, RuntimeContext};
use crate::core::error::{ExecutionResult, GraphError, GraphResult};
use crate::core::node::{Operator, Sink};
use crate::core::port::{Attribute, PortSource, PortTable, PortValues, SlotId};
use crate::core::texture::Texture;
use crate::core::types::{PortType, Value};
use crate::execution::engine::{ExecutionEngine, ExecutionStats};
use crate::filters::registry::OperatorRegistry;
use crate::graph::connection::{Connection, Endpoint};
use crate::graph::topology;
use indexmap::IndexMap;
use rand::rngs::StdRng;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

/// What happens when an already-bound input is bound again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindPolicy {
    /// Fail with `PortAlreadyBound`.
    #[default]
    Reject,
    /// Replace the previous source.
    Replace,
}

/// Graph-wide settings.
#[derive(Debug, Clone, Default)]
pub struct GraphOptions {
    /// Policy for rebinding an input.
    pub bind_policy: BindPolicy,
}

impl GraphOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rebinding policy.
    pub fn with_bind_policy(mut self, policy: BindPolicy) -> Self {
        self.bind_policy = policy;
        self
    }
}

/// Lifecycle state of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    Building,
    Ordered,
    Executed,
}

/// A named operator instance in the graph.
pub struct GraphNode {
    name: String,
    kind: String,
    deterministic: bool,
    operator: Box<dyn Operator>,
    ports: PortTable,
    /// Nodes this node feeds.
    feeds: BTreeSet<String>,
    /// Nodes feeding this node.
    depends_on: BTreeSet<String>,
}

impl std::fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphNode")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("ports", &self.ports)
            .field("feeds", &self.feeds)
            .field("depends_on", &self.depends_on)
            .finish()
    }
}

impl GraphNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Operator kind id, e.g. `"sample_texture"`.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Whether this node always computes the same outputs for the same inputs.
    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    pub fn ports(&self) -> &PortTable {
        &self.ports
    }

    /// The sink capability, if this node is the sink.
    pub fn as_sink(&self) -> Option<&dyn Sink> {
        self.operator.as_sink()
    }

    /// Names of the nodes this node feeds.
    pub fn feeds(&self) -> &BTreeSet<String> {
        &self.feeds
    }

    /// Names of the nodes feeding this node.
    pub fn depends_on(&self) -> &BTreeSet<String> {
        &self.depends_on
    }

    /// Run the operator for one pixel.
    pub(crate) fn compute(
        &self,
        values: &mut PortValues,
        runtime: RuntimeContext,
        rng: &mut StdRng,
    ) -> ExecutionResult<()> {
        let mut ctx = NodeContext::new(&self.ports, values, runtime, rng);
        self.operator.compute(&mut ctx)
    }
}

/// The processing graph.
///
/// Uses IndexMap so iteration follows registration order; execution order
/// does not depend on it.
pub struct Graph {
    nodes: IndexMap<String, GraphNode>,
    connections: Vec<Connection>,
    sink: Option<String>,
    order: Option<Vec<String>>,
    state: GraphState,
    valid: bool,
    slot_defaults: Vec<Value>,
    registry: Arc<OperatorRegistry>,
    options: GraphOptions,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("connections", &self.connections)
            .field("sink", &self.sink)
            .field("state", &self.state)
            .field("valid", &self.valid)
            .finish()
    }
}

impl Graph {
    /// Create an empty graph backed by the built-in operators.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(OperatorRegistry::with_builtins()))
    }

    /// Create an empty graph resolving kinds through `registry`.
    pub fn with_registry(registry: Arc<OperatorRegistry>) -> Self {
        Self {
            nodes: IndexMap::new(),
            connections: Vec::new(),
            sink: None,
            order: None,
            state: GraphState::Building,
            valid: true,
            slot_defaults: Vec::new(),
            registry,
            options: GraphOptions::default(),
        }
    }

    /// Replace the graph options.
    pub fn with_options(mut self, options: GraphOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    pub fn registry(&self) -> &Arc<OperatorRegistry> {
        &self.registry
    }

    // ========================================================================
    // Node Management
    // ========================================================================

    /// Create a node of a registered kind and add it under `name`.
    ///
    /// `kind` may be an operator id or its display name. Any failure leaves
    /// the graph without the node and clears the validity flag.
    pub fn register_node(
        &mut self,
        name: impl Into<String>,
        kind: &str,
        attributes: &[Attribute],
    ) -> GraphResult<()> {
        let name = name.into();
        let result = if self.nodes.contains_key(&name) {
            Err(GraphError::DuplicateName(name.clone()))
        } else {
            let registry = Arc::clone(&self.registry);
            registry
                .create(kind, &name, attributes)
                .and_then(|operator| self.add_node(name.clone(), operator))
        };

        if let Err(ref error) = result {
            log::warn!("Failed to register node '{}' ({}): {}", name, kind, error);
            self.valid = false;
        }
        result
    }

    /// Add a configured operator under `name` and declare its ports.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        operator: Box<dyn Operator>,
    ) -> GraphResult<()> {
        let name = name.into();
        let result = self.insert_node(name.clone(), operator);
        if result.is_err() {
            self.valid = false;
        }
        result
    }

    fn insert_node(&mut self, name: String, operator: Box<dyn Operator>) -> GraphResult<()> {
        if self.nodes.contains_key(&name) {
            return Err(GraphError::DuplicateName(name));
        }

        let metadata = operator.metadata();
        let mut ports = PortTable::new(name.clone());
        let mut new_slots = Vec::new();

        for port in &metadata.inputs {
            ports.declare_input(port.name.clone(), port.port_type, port.fallback)?;
        }
        for port in &metadata.outputs {
            let slot = SlotId(self.slot_defaults.len() + new_slots.len());
            ports.declare_output(port.name.clone(), port.port_type, slot)?;
            new_slots.push(port.port_type.default_value());
        }

        if let Some(sink) = operator.as_sink() {
            if let Some(existing) = &self.sink {
                return Err(GraphError::DuplicateSink {
                    existing: existing.clone(),
                    node: name,
                });
            }
            let color_port = sink.color_port();
            if ports.output(color_port).map(|p| p.port_type()) != Some(PortType::Color) {
                return Err(GraphError::InvalidSink {
                    node: name,
                    port: color_port.to_string(),
                });
            }
            let (width, height) = sink.raster_size();
            if width == 0 || height == 0 {
                return Err(GraphError::invalid_attribute(
                    name,
                    "width/height",
                    format!("raster size {}x{} must be positive", width, height),
                ));
            }
            self.sink = Some(name.clone());
        }

        log::debug!(
            "Registered node '{}' ({}) with {} inputs, {} outputs",
            name,
            metadata.id,
            metadata.inputs.len(),
            metadata.outputs.len()
        );

        self.slot_defaults.extend(new_slots);
        self.nodes.insert(
            name.clone(),
            GraphNode {
                name,
                kind: metadata.id,
                deterministic: metadata.deterministic,
                operator,
                ports,
                feeds: BTreeSet::new(),
                depends_on: BTreeSet::new(),
            },
        );
        self.invalidate_order();
        Ok(())
    }

    /// Get a reference to a node.
    pub fn node(&self, name: &str) -> GraphResult<&GraphNode> {
        self.nodes
            .get(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))
    }

    /// Check if a node exists.
    pub fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Get all nodes in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Get all node names in registration order.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The sink node, if one is registered.
    pub fn sink(&self) -> Option<&GraphNode> {
        self.sink.as_ref().and_then(|name| self.nodes.get(name))
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Bind `src_node.src_port` (an output) to `dst_node.dst_port` (an input).
    ///
    /// Adds a dependency edge `src_node -> dst_node`. Any failure clears the
    /// validity flag.
    pub fn bind(
        &mut self,
        src_node: &str,
        src_port: &str,
        dst_node: &str,
        dst_port: &str,
    ) -> GraphResult<()> {
        let result = self.try_bind(src_node, src_port, dst_node, dst_port);
        if let Err(ref error) = result {
            log::warn!(
                "Failed to bind {}.{} -> {}.{}: {}",
                src_node,
                src_port,
                dst_node,
                dst_port,
                error
            );
            self.valid = false;
        }
        result
    }

    fn try_bind(
        &mut self,
        src_node: &str,
        src_port: &str,
        dst_node: &str,
        dst_port: &str,
    ) -> GraphResult<()> {
        let source = self.node(src_node)?;
        let output = source
            .ports
            .output(src_port)
            .ok_or_else(|| GraphError::UnknownPort {
                node: src_node.to_string(),
                port: src_port.to_string(),
            })?;
        let (source_type, slot) = (output.port_type(), output.slot());

        let target = self.node(dst_node)?;
        if target.ports.input(dst_port).is_none() {
            return Err(GraphError::UnknownPort {
                node: dst_node.to_string(),
                port: dst_port.to_string(),
            });
        }
        if target.ports.is_bound(dst_port) && self.options.bind_policy == BindPolicy::Reject {
            return Err(GraphError::PortAlreadyBound {
                node: dst_node.to_string(),
                port: dst_port.to_string(),
            });
        }

        let target = self
            .nodes
            .get_mut(dst_node)
            .ok_or_else(|| GraphError::UnknownNode(dst_node.to_string()))?;
        let previous = target.ports.bind_input(
            dst_port,
            PortSource {
                node: src_node.to_string(),
                port: src_port.to_string(),
                slot,
            },
            source_type,
        )?;

        if let Some(previous) = previous {
            log::debug!(
                "Replacing binding {}.{} -> {}.{}",
                previous.node,
                previous.port,
                dst_node,
                dst_port
            );
            self.connections
                .retain(|c| !(c.to.node == dst_node && c.to.port == dst_port));
            self.drop_edge_if_unused(&previous.node, dst_node);
        }

        self.connections.push(Connection::new(
            Endpoint::new(src_node, src_port),
            Endpoint::new(dst_node, dst_port),
        ));
        if let Some(node) = self.nodes.get_mut(src_node) {
            node.feeds.insert(dst_node.to_string());
        }
        if let Some(node) = self.nodes.get_mut(dst_node) {
            node.depends_on.insert(src_node.to_string());
        }

        log::debug!("Bound {}.{} -> {}.{}", src_node, src_port, dst_node, dst_port);
        self.invalidate_order();
        Ok(())
    }

    /// Remove the node-level edge once no connection uses it.
    fn drop_edge_if_unused(&mut self, src_node: &str, dst_node: &str) {
        if self.connections.iter().any(|c| c.links(src_node, dst_node)) {
            return;
        }
        if let Some(node) = self.nodes.get_mut(src_node) {
            node.feeds.remove(dst_node);
        }
        if let Some(node) = self.nodes.get_mut(dst_node) {
            node.depends_on.remove(src_node);
        }
    }

    /// Whether an input port is bound.
    pub fn is_bound(&self, node: &str, port: &str) -> GraphResult<bool> {
        let graph_node = self.node(node)?;
        graph_node
            .ports
            .input(port)
            .map(|p| p.is_bound())
            .ok_or_else(|| GraphError::UnknownPort {
                node: node.to_string(),
                port: port.to_string(),
            })
    }

    /// Get all connections.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Get the number of connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get all nodes the given node depends on, directly or transitively.
    pub fn get_upstream(&self, name: &str) -> GraphResult<BTreeSet<String>> {
        let mut result = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.extend(self.node(name)?.depends_on.iter().map(|s| s.as_str()));

        while let Some(current) = queue.pop_front() {
            if result.insert(current.to_string()) {
                if let Some(node) = self.nodes.get(current) {
                    queue.extend(node.depends_on.iter().map(|s| s.as_str()));
                }
            }
        }

        Ok(result)
    }

    // ========================================================================
    // Ordering & Execution
    // ========================================================================

    /// Compute and cache the execution order.
    pub fn compute_order(&mut self) -> GraphResult<&[String]> {
        let order = topology::execution_order(self)?;
        log::debug!("Execution order: {:?}", order);
        self.state = GraphState::Ordered;
        Ok(self.order.insert(order).as_slice())
    }

    /// The cached execution order, if computed since the last edit.
    pub fn execution_order(&self) -> Option<&[String]> {
        self.order.as_deref()
    }

    /// Render the sink's raster into a new image with default options.
    pub fn execute(&mut self) -> ExecutionResult<Texture> {
        ExecutionEngine::new().execute(self).map(|(image, _)| image)
    }

    /// Render into `dest` with default options.
    pub fn execute_into(&mut self, dest: &mut Texture) -> ExecutionResult<ExecutionStats> {
        ExecutionEngine::new().execute_into(self, dest)
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    /// Whether every node is deterministic, so repeated runs give identical images.
    pub fn is_deterministic(&self) -> bool {
        self.nodes.values().all(GraphNode::is_deterministic)
    }

    /// False once any registration or bind has failed.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub(crate) fn mark_executed(&mut self) {
        self.state = GraphState::Executed;
    }

    /// Default value of every output slot, indexed by slot.
    pub(crate) fn slot_defaults(&self) -> Arc<[Value]> {
        Arc::from(self.slot_defaults.clone())
    }

    fn invalidate_order(&mut self) {
        self.order = None;
        self.state = GraphState::Building;
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

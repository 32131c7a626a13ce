//! Scene descriptions: the JSON form of a graph.
//!
//! A scene lists nodes (name, operator kind, attributes) and links between
//! their ports. Port listings and editor positions are carried along for
//! round trips but play no part in building the graph; ports always come
//! from the operator's own declaration.

use crate::core::error::{GraphResult, PixGraphError};
use crate::core::port::{Attribute, AttributeValue};
use crate::filters::registry::OperatorRegistry;
use crate::graph::structure::{Graph, GraphOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Position of a node in an editor canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// A node attribute as written in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneAttribute {
    /// Parameter name; empty or missing binds positionally.
    #[serde(default)]
    pub name: String,
    /// Declared type tag, informational only.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
    pub value: AttributeValue,
}

impl SceneAttribute {
    fn to_attribute(&self) -> Attribute {
        if self.name.is_empty() {
            Attribute::positional(self.value.clone())
        } else {
            Attribute::named(self.name.clone(), self.value.clone())
        }
    }
}

/// A port listing as written in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenePort {
    pub name: String,
    #[serde(rename = "type", default)]
    pub type_tag: String,
    #[serde(default)]
    pub is_in: bool,
}

/// A node in a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneNode {
    pub name: String,
    /// Operator kind id or display name.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default)]
    pub attributes: Vec<SceneAttribute>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub in_ports: Vec<ScenePort>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub out_ports: Vec<ScenePort>,
}

impl SceneNode {
    /// Create a node with no attributes.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            position: None,
            attributes: Vec::new(),
            in_ports: Vec::new(),
            out_ports: Vec::new(),
        }
    }

    /// Add a named attribute.
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.push(SceneAttribute {
            name: name.into(),
            type_tag: None,
            value: value.into(),
        });
        self
    }
}

/// A link from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneLink {
    pub out_node: String,
    pub out_port: String,
    pub in_node: String,
    pub in_port: String,
}

impl SceneLink {
    pub fn new(
        out_node: impl Into<String>,
        out_port: impl Into<String>,
        in_node: impl Into<String>,
        in_port: impl Into<String>,
    ) -> Self {
        Self {
            out_node: out_node.into(),
            out_port: out_port.into(),
            in_node: in_node.into(),
            in_port: in_port.into(),
        }
    }
}

/// Serializable representation of a complete graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<SceneNode>,
    #[serde(default)]
    pub links: Vec<SceneLink>,
}

impl SceneDescription {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a scene file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PixGraphError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from_json(&json)?)
    }

    /// Write a scene file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PixGraphError> {
        std::fs::write(path.as_ref(), self.to_json()?)?;
        Ok(())
    }

    /// Build a fresh graph from this scene.
    pub fn build(&self, registry: Arc<OperatorRegistry>) -> GraphResult<Graph> {
        self.build_with_options(registry, GraphOptions::default())
    }

    /// Build a fresh graph with the given options.
    pub fn build_with_options(
        &self,
        registry: Arc<OperatorRegistry>,
        options: GraphOptions,
    ) -> GraphResult<Graph> {
        let mut graph = Graph::with_registry(registry).with_options(options);
        self.load_into(&mut graph)?;
        Ok(graph)
    }

    /// Register every node, then bind every link, in file order.
    ///
    /// Stops at the first error; the graph keeps whatever was added before it.
    pub fn load_into(&self, graph: &mut Graph) -> GraphResult<()> {
        log::info!(
            "Loading scene '{}' ({} nodes, {} links)",
            self.name,
            self.nodes.len(),
            self.links.len()
        );

        for node in &self.nodes {
            let attributes: Vec<Attribute> =
                node.attributes.iter().map(SceneAttribute::to_attribute).collect();
            graph.register_node(node.name.clone(), &node.kind, &attributes)?;
        }
        for link in &self.links {
            graph.bind(&link.out_node, &link.out_port, &link.in_node, &link.in_port)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::GraphError;

    const SCENE: &str = r#"{
        "name": "untitled",
        "nodes": [
            {"name": "m", "type": "Matrix3", "position": {"x": 292, "y": 487},
             "attributes": [{"name": "Mat", "type": "3x3",
                             "value": ["0","0","0","0","1","0","0","0","0"]}],
             "inPorts": [], "outPorts": [{"name": "Out", "type": "3x3", "isIn": false}]},
            {"name": "conv", "type": "Matrix Sample",
             "attributes": [{"name": "default_mat",
                             "value": ["0","0","0","0","0","0","0","0","0"]}]},
            {"name": "out", "type": "Output", "attributes": [{"name": "width", "value": "4"}]}
        ],
        "links": [
            {"outNode": "m", "outPort": "Out", "inNode": "conv", "inPort": "Mat"},
            {"outNode": "conv", "outPort": "Out", "inNode": "out", "inPort": "In"}
        ]
    }"#;

    #[test]
    fn test_parse_scene() {
        let scene = SceneDescription::from_json(SCENE).unwrap();
        assert_eq!(scene.name, "untitled");
        assert_eq!(scene.nodes.len(), 3);
        assert_eq!(scene.nodes[0].kind, "Matrix3");
        assert_eq!(scene.nodes[0].position, Some(Position { x: 292.0, y: 487.0 }));
        assert!(matches!(
            scene.nodes[1].attributes[0].value,
            AttributeValue::List(ref items) if items.len() == 9
        ));
        assert_eq!(
            scene.links[1],
            SceneLink::new("conv", "Out", "out", "In")
        );
    }

    #[test]
    fn test_build_scene() {
        let scene = SceneDescription::from_json(SCENE).unwrap();
        let graph = scene
            .build(Arc::new(OperatorRegistry::with_builtins()))
            .unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.node("conv").unwrap().kind(), "matrix_sample");
        assert!(graph.is_bound("conv", "Mat").unwrap());
        assert!(!graph.is_bound("conv", "Tex").unwrap());
        assert_eq!(graph.sink().unwrap().as_sink().unwrap().raster_size(), (4, 512));
    }

    #[test]
    fn test_build_stops_at_first_error() {
        let mut scene = SceneDescription::new("broken");
        scene.nodes.push(SceneNode::new("a", "invert"));
        scene.nodes.push(SceneNode::new("b", "warp_drive"));
        scene.nodes.push(SceneNode::new("c", "invert"));

        let result = scene.build(Arc::new(OperatorRegistry::with_builtins()));
        assert!(matches!(result, Err(GraphError::UnknownOperatorKind(ref k)) if k == "warp_drive"));
    }

    #[test]
    fn test_json_uses_wire_names() {
        let mut scene = SceneDescription::new("s");
        scene
            .nodes
            .push(SceneNode::new("n", "invert").with_attribute("amount", "1"));
        scene.links.push(SceneLink::new("a", "Out", "b", "In"));

        let json = scene.to_json().unwrap();
        assert!(json.contains("\"type\": \"invert\""));
        assert!(json.contains("\"outNode\""));
        assert!(json.contains("\"inPort\""));
        assert_eq!(SceneDescription::from_json(&json).unwrap(), scene);
    }
}

//=========================================================================
// Graph Definitions
//=========================================================================
//
// Declarative RON description of a graph. Every entry maps onto exactly
// one GraphBuilder call, so a definition is validated by the same rules
// as a graph built in code.
//
// Example:
//   (
//       name: "door",
//       inputs: [(name: "open", ty: Bool)],
//       nodes: [
//           (id: "gate", kind: "logic.and", constants: {1: Bool(true)}),
//       ],
//       bindings: [(input: "open", node: "gate", port: 0)],
//       outputs: [(name: "result", node: "gate", port: 0)],
//   )
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

//=== Internal Dependencies ===============================================

use super::graph::{Graph, GraphBuilder, NodeId};
use super::system::EventSystem;
use super::value::{PortType, PortValue};
use crate::core::error::DefinitionError;

//=== Definition Types ====================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<InputDefinition>,
    pub nodes: Vec<NodeDefinition>,
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,
    #[serde(default)]
    pub bindings: Vec<BindingDefinition>,
    #[serde(default)]
    pub outputs: Vec<OutputDefinition>,
}

/// Graph-level input declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDefinition {
    pub name: String,
    pub ty: PortType,
}

/// A node, labelled for reference by edges, bindings and outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub id: String,
    /// Qualified `module.node` reference.
    pub kind: String,
    /// Constant values keyed by input port.
    #[serde(default)]
    pub constants: BTreeMap<usize, PortValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    pub from: String,
    pub output: usize,
    pub to: String,
    pub input: usize,
}

/// Feeds a graph input into a node input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingDefinition {
    pub input: String,
    pub node: String,
    pub port: usize,
}

/// Exposes a node output as a graph output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDefinition {
    pub name: String,
    pub node: String,
    pub port: usize,
}

//=== GraphDefinition =====================================================

impl GraphDefinition {
    /// Parses a definition from RON text.
    pub fn from_ron(source: &str) -> Result<Self, DefinitionError> {
        ron::from_str(source).map_err(|e| DefinitionError::Parse(e.to_string()))
    }

    /// Resolves node kinds against `system` and seals the graph.
    pub fn build(&self, system: &EventSystem) -> Result<Graph, DefinitionError> {
        let mut builder = GraphBuilder::new(self.name.as_str());
        let mut labels: HashMap<&str, NodeId> = HashMap::with_capacity(self.nodes.len());

        for node in &self.nodes {
            let kind = system.resolve(&node.kind)?;
            let id = builder.add_node(&kind);
            if labels.insert(node.id.as_str(), id).is_some() {
                return Err(DefinitionError::DuplicateNodeLabel(node.id.clone()));
            }
            for (&port, value) in &node.constants {
                builder.set_constant(id, port, value.clone())?;
            }
        }

        let lookup = |label: &str| {
            labels
                .get(label)
                .copied()
                .ok_or_else(|| DefinitionError::UnknownNodeLabel(label.to_owned()))
        };

        for edge in &self.edges {
            builder.connect(lookup(&edge.from)?, edge.output, lookup(&edge.to)?, edge.input)?;
        }

        for input in &self.inputs {
            builder.add_input(&input.name, input.ty)?;
        }
        for binding in &self.bindings {
            builder.bind_input(&binding.input, lookup(&binding.node)?, binding.port)?;
        }

        for output in &self.outputs {
            builder.expose_output(&output.name, lookup(&output.node)?, output.port)?;
        }

        builder.seal()
    }
}

impl EventSystem {
    /// Builds a graph from a declarative definition.
    pub fn load_graph(&self, definition: &GraphDefinition) -> Result<Graph, DefinitionError> {
        definition.build(self)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

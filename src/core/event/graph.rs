//=========================================================================
// Graphs
//=========================================================================
//
// Graph topology: node instances bound to kinds, typed edges between
// their ports, and named graph-level inputs/outputs.
//
// Lifecycle:
//   GraphBuilder ──add_node/connect/bind──> GraphBuilder
//        │
//        └──seal()──> Graph (immutable, topologically ordered)
//                       │
//                       └──rebuild()──> GraphBuilder (copy)
//
// All validation happens here, at construction time: unknown nodes,
// out-of-range ports, type mismatches and cycles never reach evaluation.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;

use indexmap::IndexMap;
use log::debug;

//=== Internal Dependencies ===============================================

use super::node::NodeKind;
use super::value::{PortType, PortValue};
use crate::core::error::{DefinitionError, PortDirection};

//=== Identifiers =========================================================

/// Index of a node within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//=== Bindings ============================================================

/// Where a node input takes its value from each tick.
#[derive(Debug, Clone, PartialEq)]
pub enum InputBinding {
    /// The default declared by the node kind's signature.
    Default,

    /// A fixed value set while building the graph.
    Constant(PortValue),

    /// An output port of an upstream node, computed earlier in the tick.
    Node { node: NodeId, port: usize },

    /// A graph-level input, by declaration index.
    GraphInput(usize),
}

/// Directed connection from an output port to an input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub from_port: usize,
    pub to: NodeId,
    pub to_port: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct GraphNode {
    pub(crate) kind: NodeKind,
    pub(crate) inputs: Vec<InputBinding>,
}

/// Graph-level output proxying an interior output port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphOutput {
    pub node: NodeId,
    pub port: usize,
    pub ty: PortType,
}

//=== GraphBuilder ========================================================

/// Mutable, unsealed graph under construction.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    name: String,
    nodes: Vec<GraphNode>,
    edges: Vec<Edge>,
    inputs: IndexMap<String, PortType>,
    outputs: IndexMap<String, GraphOutput>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    //--- Nodes ------------------------------------------------------------

    /// Adds an instance of `kind`. All inputs start bound to their default.
    pub fn add_node(&mut self, kind: &NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(GraphNode {
            kind: kind.clone(),
            inputs: vec![InputBinding::Default; kind.signature().inputs().len()],
        });
        id
    }

    //--- Edges ------------------------------------------------------------

    /// Connects output `from_port` of `from` to input `to_port` of `to`.
    ///
    /// # Errors
    ///
    /// - [`DefinitionError::UnknownNodeId`] if either node does not exist
    /// - [`DefinitionError::PortOutOfRange`] if either port is undeclared
    /// - [`DefinitionError::TypeMismatch`] if the port types differ
    /// - [`DefinitionError::InputAlreadyBound`] if the input has a source
    pub fn connect(
        &mut self,
        from: NodeId,
        from_port: usize,
        to: NodeId,
        to_port: usize,
    ) -> Result<(), DefinitionError> {
        let found = self.output_type(from, from_port)?;
        self.check_bindable(to, to_port, found)?;

        self.nodes[to.0].inputs[to_port] = InputBinding::Node {
            node: from,
            port: from_port,
        };
        self.edges.push(Edge {
            from,
            from_port,
            to,
            to_port,
        });
        Ok(())
    }

    /// Binds input `port` of `node` to a constant value.
    pub fn set_constant(
        &mut self,
        node: NodeId,
        port: usize,
        value: impl Into<PortValue>,
    ) -> Result<(), DefinitionError> {
        let value = value.into();
        self.check_bindable(node, port, value.port_type())?;
        self.nodes[node.0].inputs[port] = InputBinding::Constant(value);
        Ok(())
    }

    //--- Graph Ports ------------------------------------------------------

    /// Declares a graph-level input of type `ty`.
    pub fn add_input(&mut self, name: &str, ty: PortType) -> Result<(), DefinitionError> {
        if self.inputs.contains_key(name) {
            return Err(self.duplicate_port(name));
        }
        self.inputs.insert(name.to_owned(), ty);
        Ok(())
    }

    /// Feeds graph input `name` into input `port` of `node`.
    pub fn bind_input(&mut self, name: &str, node: NodeId, port: usize) -> Result<(), DefinitionError> {
        let (index, _, &ty) = self
            .inputs
            .get_full(name)
            .ok_or_else(|| self.unknown_port(name))?;
        self.check_bindable(node, port, ty)?;
        self.nodes[node.0].inputs[port] = InputBinding::GraphInput(index);
        Ok(())
    }

    /// Exposes output `port` of `node` as graph output `name`.
    pub fn expose_output(&mut self, name: &str, node: NodeId, port: usize) -> Result<(), DefinitionError> {
        if self.outputs.contains_key(name) {
            return Err(self.duplicate_port(name));
        }
        let ty = self.output_type(node, port)?;
        self.outputs.insert(name.to_owned(), GraphOutput { node, port, ty });
        Ok(())
    }

    //--- Sealing ----------------------------------------------------------

    /// Seals the graph, computing its evaluation order.
    ///
    /// Independent nodes are ordered by insertion.
    ///
    /// # Errors
    ///
    /// [`DefinitionError::CycleDetected`] if the edges form a cycle. Nothing
    /// is produced in that case.
    pub fn seal(self) -> Result<Graph, DefinitionError> {
        self.seal_with_tiebreak(|_| {})
    }

    /// Seals the graph, letting `tiebreak` reorder the set of nodes that
    /// are ready to run before each pick (the first entry is taken).
    ///
    /// Any permutation yields a valid topological order; this exists so
    /// node implementations can be tested against arbitrary sibling order.
    pub fn seal_with_tiebreak<F>(self, mut tiebreak: F) -> Result<Graph, DefinitionError>
    where
        F: FnMut(&mut [NodeId]),
    {
        let count = self.nodes.len();
        let mut pending = vec![0usize; count];
        let mut dependents: Vec<Vec<NodeId>> = vec![Vec::new(); count];

        for edge in &self.edges {
            pending[edge.to.0] += 1;
            dependents[edge.from.0].push(edge.to);
        }

        let mut ready: Vec<NodeId> = (0..count)
            .filter(|&i| pending[i] == 0)
            .map(NodeId)
            .collect();
        let mut order = Vec::with_capacity(count);

        while !ready.is_empty() {
            tiebreak(&mut ready);
            let next = ready.remove(0);
            order.push(next);

            for &dependent in &dependents[next.0] {
                pending[dependent.0] -= 1;
                if pending[dependent.0] == 0 {
                    ready.push(dependent);
                }
            }
        }

        if order.len() < count {
            let nodes = cycle_members(&dependents, &pending);
            return Err(DefinitionError::CycleDetected {
                graph: self.name,
                nodes,
            });
        }

        debug!(
            target: "events",
            "Sealed graph `{}` ({} nodes, {} edges)",
            self.name,
            count,
            self.edges.len()
        );

        Ok(Graph {
            builder: self,
            order,
        })
    }

    //--- Validation Helpers -----------------------------------------------

    fn node(&self, id: NodeId) -> Result<&GraphNode, DefinitionError> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| DefinitionError::UnknownNodeId(id, self.name.clone()))
    }

    fn output_type(&self, id: NodeId, port: usize) -> Result<PortType, DefinitionError> {
        let node = self.node(id)?;
        let signature = node.kind.signature();
        signature
            .output(port)
            .ok_or_else(|| DefinitionError::PortOutOfRange {
                node: id,
                kind: node.kind.name().to_owned(),
                direction: PortDirection::Output,
                port,
                declared: signature.outputs().len(),
            })
    }

    fn check_bindable(&self, id: NodeId, port: usize, found: PortType) -> Result<(), DefinitionError> {
        let node = self.node(id)?;
        let signature = node.kind.signature();
        let input = signature
            .input(port)
            .ok_or_else(|| DefinitionError::PortOutOfRange {
                node: id,
                kind: node.kind.name().to_owned(),
                direction: PortDirection::Input,
                port,
                declared: signature.inputs().len(),
            })?;

        if input.ty != found {
            return Err(DefinitionError::TypeMismatch {
                node: id,
                port,
                expected: input.ty,
                found,
            });
        }

        if node.inputs[port] != InputBinding::Default {
            return Err(DefinitionError::InputAlreadyBound { node: id, port });
        }

        Ok(())
    }

    fn duplicate_port(&self, name: &str) -> DefinitionError {
        DefinitionError::DuplicateGraphPort {
            graph: self.name.clone(),
            name: name.to_owned(),
        }
    }

    fn unknown_port(&self, name: &str) -> DefinitionError {
        DefinitionError::UnknownGraphPort {
            graph: self.name.clone(),
            name: name.to_owned(),
        }
    }
}

//--- Cycle Reporting -----------------------------------------------------

/// Nodes left unsorted by Kahn's pass that lie on a cycle.
///
/// Leftovers also include nodes merely downstream of a cycle; a node is
/// kept only if it can reach itself through other leftovers.
fn cycle_members(dependents: &[Vec<NodeId>], pending: &[usize]) -> Vec<NodeId> {
    let leftover = |id: &NodeId| pending[id.0] > 0;

    (0..pending.len())
        .map(NodeId)
        .filter(leftover)
        .filter(|&start| {
            let mut visited = vec![false; pending.len()];
            let mut stack: Vec<NodeId> = dependents[start.0].iter().copied().filter(leftover).collect();

            while let Some(next) = stack.pop() {
                if next == start {
                    return true;
                }
                if visited[next.0] {
                    continue;
                }
                visited[next.0] = true;
                stack.extend(dependents[next.0].iter().copied().filter(leftover));
            }
            false
        })
        .collect()
}

//=== Graph ===============================================================

/// Sealed, immutable, acyclic graph.
///
/// Share it between instances with `Arc<Graph>`. To change the topology,
/// call [`Graph::rebuild`] and seal the edited copy.
#[derive(Debug, Clone)]
pub struct Graph {
    builder: GraphBuilder,
    order: Vec<NodeId>,
}

impl Graph {
    pub fn name(&self) -> &str {
        &self.builder.name
    }

    pub fn node_count(&self) -> usize {
        self.builder.nodes.len()
    }

    /// Evaluation order computed at seal time.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    pub fn edges(&self) -> &[Edge] {
        &self.builder.edges
    }

    pub fn node_kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.builder.nodes.get(id.0).map(|n| &n.kind)
    }

    pub fn binding(&self, id: NodeId, port: usize) -> Option<&InputBinding> {
        self.builder.nodes.get(id.0)?.inputs.get(port)
    }

    /// Graph-level inputs in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = (&str, PortType)> {
        self.builder.inputs.iter().map(|(name, &ty)| (name.as_str(), ty))
    }

    /// Graph-level outputs in declaration order.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &GraphOutput)> {
        self.builder.outputs.iter().map(|(name, out)| (name.as_str(), out))
    }

    /// Returns an unsealed copy for copy-and-rebuild edits.
    pub fn rebuild(&self) -> GraphBuilder {
        self.builder.clone()
    }

    pub(crate) fn nodes(&self) -> &[GraphNode] {
        &self.builder.nodes
    }

    pub(crate) fn input_index(&self, name: &str) -> Option<(usize, PortType)> {
        self.builder
            .inputs
            .get_full(name)
            .map(|(index, _, &ty)| (index, ty))
    }

    pub(crate) fn output(&self, name: &str) -> Option<&GraphOutput> {
        self.builder.outputs.get(name)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

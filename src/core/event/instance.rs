//=========================================================================
// Graph Instances
//=========================================================================
//
// Per-instance runtime state of a sealed graph: the node objects, their
// output slots, and the current graph-level input values.
//
// Evaluation (one tick):
//   for node in graph.order():
//     gather inputs  (upstream outputs / graph inputs / defaults)
//     reset outputs  (type defaults, outputs never carry over)
//     node.execute(inputs, outputs, ctx)
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Arc;

use log::trace;

//=== Internal Dependencies ===============================================

use super::context::{GraphToggles, NodeContext};
use super::graph::{Graph, InputBinding, NodeId};
use super::io::{Inputs, Outputs};
use super::node::Node;
use super::system::GraphId;
use super::value::PortValue;
use super::world::{CommandSender, WorldAccess};
use crate::core::error::DefinitionError;

//=== TickEnv =============================================================

/// Everything a graph evaluation borrows from the event system.
pub(crate) struct TickEnv<'a> {
    pub(crate) graph: GraphId,
    pub(crate) delta_time: f64,
    pub(crate) tick: u64,
    pub(crate) toggles: &'a mut GraphToggles,
    pub(crate) world: &'a mut dyn WorldAccess,
    pub(crate) commands: &'a CommandSender,
}

//=== GraphInstance =======================================================

/// Runnable instance of a sealed [`Graph`].
pub struct GraphInstance {
    graph: Arc<Graph>,
    nodes: Vec<Box<dyn Node>>,
    outputs: Vec<Vec<PortValue>>,
    graph_inputs: Vec<PortValue>,
    scratch: Vec<PortValue>,
}

impl GraphInstance {
    /// Creates node objects for every node of `graph`.
    pub fn new(graph: Arc<Graph>) -> Self {
        let nodes = graph.nodes().iter().map(|n| n.kind.create()).collect();
        let outputs = graph
            .nodes()
            .iter()
            .map(|n| n.kind.signature().default_outputs())
            .collect();
        let graph_inputs = graph.inputs().map(|(_, ty)| ty.default_value()).collect();

        Self {
            graph,
            nodes,
            outputs,
            graph_inputs,
            scratch: Vec::new(),
        }
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    //--- Graph Inputs -----------------------------------------------------

    /// Sets graph input `name`. The value persists until set again.
    pub fn set_input(&mut self, name: &str, value: impl Into<PortValue>) -> Result<(), DefinitionError> {
        let value = value.into();
        let (index, ty) = self
            .graph
            .input_index(name)
            .ok_or_else(|| DefinitionError::UnknownGraphPort {
                graph: self.graph.name().to_owned(),
                name: name.to_owned(),
            })?;

        if value.port_type() != ty {
            return Err(DefinitionError::GraphInputType {
                graph: self.graph.name().to_owned(),
                name: name.to_owned(),
                expected: ty,
                found: value.port_type(),
            });
        }

        self.graph_inputs[index] = value;
        Ok(())
    }

    pub fn input(&self, name: &str) -> Option<&PortValue> {
        let (index, _) = self.graph.input_index(name)?;
        self.graph_inputs.get(index)
    }

    //--- Outputs ----------------------------------------------------------

    /// Value of graph output `name` as of the last evaluation.
    pub fn output(&self, name: &str) -> Option<&PortValue> {
        let out = self.graph.output(name)?;
        self.node_output(out.node, out.port)
    }

    /// Value of output `port` of `node` as of the last evaluation.
    pub fn node_output(&self, node: NodeId, port: usize) -> Option<&PortValue> {
        self.outputs.get(node.index())?.get(port)
    }

    //--- Evaluation -------------------------------------------------------

    /// Runs every node once, in topological order.
    pub(crate) fn evaluate(&mut self, env: &mut TickEnv<'_>) {
        let Self {
            graph,
            nodes,
            outputs,
            graph_inputs,
            scratch,
        } = self;

        for &id in graph.order() {
            let graph_node = &graph.nodes()[id.index()];
            let kind = &graph_node.kind;
            let signature = kind.signature();

            scratch.clear();
            for (port, binding) in graph_node.inputs.iter().enumerate() {
                let value = match binding {
                    InputBinding::Default => signature.inputs()[port].default_value(),
                    InputBinding::Constant(value) => value.clone(),
                    InputBinding::Node { node, port } => outputs[node.index()][*port].clone(),
                    InputBinding::GraphInput(index) => graph_inputs[*index].clone(),
                };
                scratch.push(value);
            }

            let slots = &mut outputs[id.index()];
            for (slot, ty) in slots.iter_mut().zip(signature.outputs()) {
                *slot = ty.default_value();
            }

            trace!(target: "events", "Executing {} `{}` in graph {}", id, kind.name(), env.graph);

            let mut ctx = NodeContext {
                delta_time: env.delta_time,
                tick: env.tick,
                graph: env.graph,
                toggles: &mut *env.toggles,
                world: &mut *env.world,
                commands: env.commands,
            };
            let inputs = Inputs::new(kind.name(), scratch.as_slice());
            let mut node_outputs = Outputs::new(kind.name(), slots.as_mut_slice());

            nodes[id.index()].execute(&inputs, &mut node_outputs, &mut ctx);
        }
    }
}

impl std::fmt::Debug for GraphInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphInstance")
            .field("graph", &self.graph.name())
            .field("nodes", &self.nodes.len())
            .field("graph_inputs", &self.graph_inputs)
            .finish()
    }
}

//=========================================================================
// Event System
//=========================================================================
//
// Typed dataflow graphs evaluated once per tick on the update thread.
//
// Architecture:
//   EventSystem
//     ├─ modules: Module ("logic", "math", ...)
//     │    └─ NodeKind (signature + factory)
//     └─ graphs: GraphInstance
//          ├─ Arc<Graph>   (sealed topology, shared)
//          └─ Box<dyn Node> per graph node
//
// Flow:
//   GraphBuilder::add_node / connect → seal() → Graph
//   EventSystem::instantiate(&graph) → GraphId
//   EventSystem::update(dt) → Node::execute (topological order)
//
//=========================================================================

//=== Module Declarations =================================================

mod context;
mod definition;
mod graph;
mod instance;
mod io;
mod module;
mod node;
mod signature;
mod system;
mod value;
mod world;

//=== Public API ==========================================================

pub use context::NodeContext;
pub use definition::{
    BindingDefinition, EdgeDefinition, GraphDefinition, InputDefinition, NodeDefinition,
    OutputDefinition,
};
pub use graph::{Edge, Graph, GraphBuilder, GraphOutput, InputBinding, NodeId};
pub use instance::GraphInstance;
pub use io::{Inputs, Outputs};
pub use module::Module;
pub use node::{Node, NodeKind};
pub use signature::{DefaultPolicy, InputPort, NodeSignature, SignatureBuilder};
pub use system::{EventSystem, GraphId};
pub use value::{PortData, PortType, PortValue};
pub use world::{Command, CommandSender, EntityId, RecordStore, WorldAccess};

//=========================================================================
// Nodes and Node Kinds
//=========================================================================
//
// A node is one unit of computation inside a graph. A node kind is the
// factory that produces node instances, together with the signature
// declared once at registration time.
//
// Flow:
//   Module::register_node::<N>(name)
//     └─ N::on_register(&mut SignatureBuilder)   (once per kind)
//   GraphInstance::new
//     └─ NodeKind::create()                      (once per graph node)
//   EventSystem::update
//     └─ Node::execute(inputs, outputs, ctx)     (once per tick)
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::sync::Arc;

//=== Internal Dependencies ===============================================

use super::context::NodeContext;
use super::io::{Inputs, Outputs};
use super::signature::{NodeSignature, SignatureBuilder};

//=== Node Trait ==========================================================

/// A unit of computation with declared, typed ports.
///
/// # Minimal Implementation
///
/// ```
/// use lumen_engine::core::event::{Inputs, Node, NodeContext, Outputs, SignatureBuilder};
///
/// #[derive(Default)]
/// struct Negate;
///
/// impl Node for Negate {
///     fn on_register(sig: &mut SignatureBuilder) {
///         sig.add_input::<f64>().add_output::<f64>();
///     }
///
///     fn execute(&mut self, inputs: &Inputs, outputs: &mut Outputs, _ctx: &mut NodeContext) {
///         outputs.set(0, -inputs.get::<f64>(0));
///     }
/// }
/// ```
///
/// Nodes must not depend on the execution order of sibling nodes that are
/// not connected to them, and must not assume their outputs survive from
/// the previous tick. State that has to persist lives in the node itself.
pub trait Node: Send {
    /// Declares the node kind's ports. Called exactly once per kind.
    fn on_register(sig: &mut SignatureBuilder)
    where
        Self: Sized;

    /// Reads declared inputs and writes declared outputs for one tick.
    fn execute(&mut self, inputs: &Inputs, outputs: &mut Outputs, ctx: &mut NodeContext);
}

//=== NodeKind ============================================================

type NodeFactory = dyn Fn() -> Box<dyn Node> + Send + Sync;

/// Registered node kind: a qualified name, a signature and a factory.
///
/// Kinds are cheap to clone and shared between every graph that uses them.
#[derive(Clone)]
pub struct NodeKind {
    name: Arc<str>,
    signature: Arc<NodeSignature>,
    factory: Arc<NodeFactory>,
}

impl NodeKind {
    pub(crate) fn new(
        name: String,
        signature: NodeSignature,
        factory: impl Fn() -> Box<dyn Node> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            signature: Arc::new(signature),
            factory: Arc::new(factory),
        }
    }

    /// Fully qualified `module.node` name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &NodeSignature {
        &self.signature
    }

    /// Produces a fresh node instance.
    pub fn create(&self) -> Box<dyn Node> {
        (self.factory)()
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeKind")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

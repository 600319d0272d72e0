//=========================================================================
// Node Context
//=========================================================================
//
// Per-execution access to everything outside the node's own ports:
// tick timing, the graph being evaluated, deferred graph toggles, the
// world record store and the command channel.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::system::GraphId;
use super::world::{Command, CommandSender, WorldAccess};

//=== GraphToggles ========================================================

/// Pending enable/disable requests.
///
/// Requests are applied at the start of the next tick, so a graph disabled
/// while it is being evaluated still finishes the current tick.
#[derive(Debug, Default)]
pub(crate) struct GraphToggles {
    pending: Vec<(GraphId, bool)>,
}

impl GraphToggles {
    pub(crate) fn push(&mut self, graph: GraphId, enabled: bool) {
        self.pending.push((graph, enabled));
    }

    pub(crate) fn take(&mut self) -> Vec<(GraphId, bool)> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

//=== NodeContext =========================================================

/// Context passed to [`Node::execute`](super::Node::execute).
pub struct NodeContext<'a> {
    pub(crate) delta_time: f64,
    pub(crate) tick: u64,
    pub(crate) graph: GraphId,
    pub(crate) toggles: &'a mut GraphToggles,
    pub(crate) world: &'a mut dyn WorldAccess,
    pub(crate) commands: &'a CommandSender,
}

impl<'a> NodeContext<'a> {
    /// Seconds elapsed since the previous tick.
    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    /// Index of the tick currently being evaluated (starts at 1).
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The graph instance this node belongs to.
    pub fn graph(&self) -> GraphId {
        self.graph
    }

    /// Requests `graph` to stop running from the next tick on.
    pub fn disable_graph(&mut self, graph: GraphId) {
        self.toggles.push(graph, false);
    }

    /// Requests `graph` to run from the next tick on.
    pub fn enable_graph(&mut self, graph: GraphId) {
        self.toggles.push(graph, true);
    }

    /// Shared access to the world record store.
    pub fn world(&self) -> &dyn WorldAccess {
        &*self.world
    }

    /// Mutable access to the world record store.
    pub fn world_mut(&mut self) -> &mut dyn WorldAccess {
        &mut *self.world
    }

    /// Issues a fire-and-forget command.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command)
    }
}

//=========================================================================
// Error Types
//=========================================================================
//
// Error taxonomy shared by the event system, the frame handoff and the
// engine runtime.
//
// Categories:
//   DefinitionError  construction-time failures (modules, graphs, states)
//   HandoffError     frame handoff shut down while a side was waiting
//   EngineError      fatal runtime/startup failures
//
// Contract violations (wrong-type reads, bad output writes) are not
// represented here: they panic in debug builds and are logged otherwise.
//
//=========================================================================

//=== External Dependencies ===============================================

use thiserror::Error;

//=== Internal Dependencies ===============================================

use crate::core::event::{NodeId, PortType};

//=== DefinitionError =====================================================

/// Failure while building a module, graph or state machine.
///
/// Every variant carries enough context (module, node, port) to locate the
/// offending content. Definition errors abort building the affected object;
/// the object is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("module `{0}` is already registered")]
    DuplicateModule(String),

    #[error("node kind `{module}.{node}` is already registered")]
    DuplicateNode { module: String, node: String },

    #[error("unknown module `{0}`")]
    UnknownModule(String),

    #[error("unknown node kind `{module}.{node}`")]
    UnknownNode { module: String, node: String },

    #[error("node reference `{0}` must have the form `module.node`")]
    MalformedNodeRef(String),

    #[error("node {0} does not exist in graph `{1}`")]
    UnknownNodeId(NodeId, String),

    #[error("{direction} port {port} is out of range on node {node} (`{kind}` declares {declared})")]
    PortOutOfRange {
        node: NodeId,
        kind: String,
        direction: PortDirection,
        port: usize,
        declared: usize,
    },

    #[error("type mismatch at node {node} input {port}: expected {expected}, found {found}")]
    TypeMismatch {
        node: NodeId,
        port: usize,
        expected: PortType,
        found: PortType,
    },

    #[error("input {port} of node {node} is already bound")]
    InputAlreadyBound { node: NodeId, port: usize },

    #[error("default value for input {port} of `{kind}` has type {found}, port declares {expected}")]
    InvalidDefault {
        kind: String,
        port: usize,
        expected: PortType,
        found: PortType,
    },

    #[error("graph `{graph}` declares `{name}` more than once")]
    DuplicateGraphPort { graph: String, name: String },

    #[error("graph `{graph}` has no input or output named `{name}`")]
    UnknownGraphPort { graph: String, name: String },

    #[error("graph `{graph}` contains a cycle; unresolved nodes {nodes:?}")]
    CycleDetected { graph: String, nodes: Vec<NodeId> },

    #[error("graph input `{name}` of `{graph}` has type {expected}, got {found}")]
    GraphInputType {
        graph: String,
        name: String,
        expected: PortType,
        found: PortType,
    },

    #[error("graph definition references unknown node label `{0}`")]
    UnknownNodeLabel(String),

    #[error("graph definition declares node label `{0}` more than once")]
    DuplicateNodeLabel(String),

    #[error("state machine has no state registered for `{0}`")]
    MissingState(String),

    #[error("failed to parse graph definition: {0}")]
    Parse(String),
}

/// Direction of a port, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

//=== HandoffError ========================================================

/// Frame handoff failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandoffError {
    /// The handoff was closed; no further frames will be exchanged.
    #[error("frame handoff closed")]
    Closed,
}

//=== EngineError =========================================================

/// Fatal engine runtime errors.
///
/// There is no recovery path for any of these: the engine must not run
/// without both worker threads properly synchronized.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A worker thread could not be started.
    #[error("failed to spawn {thread} thread: {source}")]
    ThreadSpawn {
        thread: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked.
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),

    /// Engine systems failed to initialize.
    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

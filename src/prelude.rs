//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use lumen_engine::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Engine core
pub use crate::engine::{Engine, EngineBuilder, EngineSystems, ExitFlag, Presenter, UpdateContext};

// Errors
pub use crate::core::error::{DefinitionError, EngineError, HandoffError};

// Event system
pub use crate::core::event::{
    Command, EntityId, EventSystem, Graph, GraphBuilder, GraphDefinition, GraphId, GraphInstance,
    Inputs, Node, NodeContext, NodeId, Outputs, PortType, PortValue, SignatureBuilder, WorldAccess,
};
pub use crate::core::modules::register_builtin_modules;

// State system
pub use crate::core::state::{State, StateKey, StateMachine, Transitions};

// Host bridge and synchronization
pub use crate::core::host_bridge::{HostEvent, HostHandle};
pub use crate::core::sync::FrameHandoff;

//=========================================================================
// Host Bridge Interface
//=========================================================================
//
// Host-to-update-thread interface types (events, handle and errors).
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{Sender, TrySendError};
use thiserror::Error;

//=== Internal Dependencies ===============================================

use crate::core::event::{GraphId, PortValue};

//=== HostEvent ===========================================================

/// Events sent from the controlling thread to the update thread.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Stop the engine after the current frame.
    Quit,

    /// Enable or disable a graph instance from the next tick on.
    SetGraphEnabled { graph: GraphId, enabled: bool },

    /// Set a graph-level input of a graph instance.
    SetGraphInput {
        graph: GraphId,
        name: String,
        value: PortValue,
    },
}

//=== HostError ===========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HostError {
    /// The update thread is not keeping up with host events.
    #[error("host event channel is full")]
    Full,

    /// The engine has shut down.
    #[error("engine is no longer running")]
    Disconnected,
}

//=== HostHandle ==========================================================

/// Cloneable sender of [`HostEvent`]s. Never blocks.
#[derive(Debug, Clone)]
pub struct HostHandle {
    sender: Sender<HostEvent>,
}

impl HostHandle {
    pub(crate) fn new(sender: Sender<HostEvent>) -> Self {
        Self { sender }
    }

    pub fn send(&self, event: HostEvent) -> Result<(), HostError> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => HostError::Full,
            TrySendError::Disconnected(_) => HostError::Disconnected,
        })
    }

    pub fn quit(&self) -> Result<(), HostError> {
        self.send(HostEvent::Quit)
    }

    pub fn set_graph_enabled(&self, graph: GraphId, enabled: bool) -> Result<(), HostError> {
        self.send(HostEvent::SetGraphEnabled { graph, enabled })
    }

    pub fn set_graph_input(
        &self,
        graph: GraphId,
        name: impl Into<String>,
        value: impl Into<PortValue>,
    ) -> Result<(), HostError> {
        self.send(HostEvent::SetGraphInput {
            graph,
            name: name.into(),
            value: value.into(),
        })
    }
}

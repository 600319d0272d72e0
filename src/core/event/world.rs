//=========================================================================
// World Bridge
//=========================================================================
//
// Seams between graph nodes and the collaborators that live outside the
// event system: entity record storage and fire-and-forget commands.
//
// Architecture:
//   Node::execute ──read/write──> dyn WorldAccess (e.g. RecordStore)
//                 ──send───────> CommandSender ──channel──> host
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;
use std::fmt;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use log::warn;
use serde::{Deserialize, Serialize};

//=== Internal Dependencies ===============================================

use super::value::PortValue;

//=== EntityId ============================================================

/// Stable identifier of an entity record in the world layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

//=== WorldAccess =========================================================

/// Synchronous accessor for named record fields.
///
/// Accesses happen on the update thread during node execution and must not
/// block. Effects are local to the current tick from the engine's point of
/// view.
pub trait WorldAccess: Send {
    /// Reads `field` of `entity`, or `None` if the record has no such field.
    fn read(&self, entity: EntityId, field: &str) -> Option<PortValue>;

    /// Writes `field` of `entity`, creating it if needed.
    fn write(&mut self, entity: EntityId, field: &str, value: PortValue);
}

//=== RecordStore =========================================================

/// In-memory [`WorldAccess`] keyed by `(entity, field)`.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    fields: HashMap<(EntityId, String), PortValue>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored fields across all entities.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl WorldAccess for RecordStore {
    fn read(&self, entity: EntityId, field: &str) -> Option<PortValue> {
        self.fields.get(&(entity, field.to_owned())).cloned()
    }

    fn write(&mut self, entity: EntityId, field: &str, value: PortValue) {
        self.fields.insert((entity, field.to_owned()), value);
    }
}

//=== Command =============================================================

/// One-shot request to an excluded subsystem (audio, effects, ...).
///
/// Commands are fire-and-forget: no result is awaited within the tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Command name, e.g. `"play_sound"`.
    pub name: String,

    /// Optional argument, e.g. the sound identifier.
    pub payload: Option<PortValue>,
}

impl Command {
    pub fn new(name: impl Into<String>, payload: Option<PortValue>) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

//=== CommandSender =======================================================

/// Sending half of the command channel handed to nodes.
///
/// Sends never block the update thread: when the channel is full or the
/// receiver is gone the command is dropped with a warning.
#[derive(Debug, Clone)]
pub struct CommandSender {
    sender: Sender<Command>,
}

impl CommandSender {
    /// Creates a bounded command channel.
    pub fn bounded(capacity: usize) -> (Self, Receiver<Command>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        (Self { sender }, receiver)
    }

    /// Issues a command. Returns `false` if it was dropped.
    pub fn send(&self, command: Command) -> bool {
        match self.sender.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(cmd)) => {
                warn!(target: "events", "Command channel full, dropping `{}`", cmd.name);
                false
            }
            Err(TrySendError::Disconnected(cmd)) => {
                warn!(target: "events", "Command receiver gone, dropping `{}`", cmd.name);
                false
            }
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_store_reads_back_writes() {
        let mut store = RecordStore::new();
        let e = EntityId(7);

        assert_eq!(store.read(e, "health"), None);
        store.write(e, "health", PortValue::Float(80.0));
        assert_eq!(store.read(e, "health"), Some(PortValue::Float(80.0)));
        assert_eq!(store.read(EntityId(8), "health"), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn command_sender_delivers() {
        let (sender, receiver) = CommandSender::bounded(4);
        assert!(sender.send(Command::new("play_sound", Some("pop".into()))));

        let cmd = receiver.try_recv().unwrap();
        assert_eq!(cmd.name, "play_sound");
        assert_eq!(cmd.payload, Some(PortValue::Text("pop".into())));
    }

    #[test]
    fn command_sender_drops_when_full() {
        let (sender, _receiver) = CommandSender::bounded(1);
        assert!(sender.send(Command::new("a", None)));
        assert!(!sender.send(Command::new("b", None)));
    }

    #[test]
    fn command_sender_drops_when_disconnected() {
        let (sender, receiver) = CommandSender::bounded(1);
        drop(receiver);
        assert!(!sender.send(Command::new("a", None)));
    }
}

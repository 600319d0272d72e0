//=========================================================================
// Event Collector
//=========================================================================
//
// Host event collector with bounded polling and shutdown detection.
//
// Architecture:
//   Receiver<HostEvent> → collect_frame() → EventSystem → TickControl
//
// Bounded polling prevents starvation. Pacing is left to the update loop.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{Receiver, TryRecvError};
use log::warn;

//=== Internal Dependencies ===============================================

use super::HostEvent;
use crate::core::event::EventSystem;

//=== TickControl =========================================================

/// Update loop control signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickControl {
    Continue,
    Exit,
}

//=== EventCollector ======================================================

/// Drains host events at the start of each frame.
pub(crate) struct EventCollector {
    receiver: Receiver<HostEvent>,
    max_events: usize,
}

impl EventCollector {
    pub(crate) fn new(receiver: Receiver<HostEvent>, max_events: usize) -> Self {
        Self {
            receiver,
            max_events,
        }
    }

    /// Applies pending host events to `events` (bounded to prevent
    /// starvation).
    pub(crate) fn collect_frame(&mut self, events: &mut EventSystem) -> TickControl {
        let mut drained = 0;

        while drained < self.max_events {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if Self::handle_event(event, events) == TickControl::Exit {
                        return TickControl::Exit;
                    }
                    drained += 1;
                }
                Err(TryRecvError::Disconnected) => return TickControl::Exit,
                Err(TryRecvError::Empty) => break,
            }
        }

        if drained >= self.max_events {
            warn!(target: "engine", "Host event backlog: drained {} events this frame", drained);
        }

        TickControl::Continue
    }

    fn handle_event(event: HostEvent, events: &mut EventSystem) -> TickControl {
        match event {
            HostEvent::Quit => return TickControl::Exit,
            HostEvent::SetGraphEnabled { graph, enabled } => events.set_enabled(graph, enabled),
            HostEvent::SetGraphInput { graph, name, value } => match events.graph_mut(graph) {
                Some(instance) => {
                    if let Err(e) = instance.set_input(&name, value) {
                        warn!(target: "engine", "Ignoring host input for {}: {}", graph, e);
                    }
                }
                None => warn!(target: "engine", "Host input for unknown {}", graph),
            },
        }
        TickControl::Continue
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::event::{GraphBuilder, GraphId, PortType, PortValue};
    use crate::core::host_bridge::HostHandle;
    use crate::core::modules::register_builtin_modules;
    use crossbeam_channel::unbounded;

    fn system_with_gate() -> (EventSystem, GraphId) {
        let mut system = EventSystem::new();
        register_builtin_modules(&mut system).unwrap();

        let mut builder = GraphBuilder::new("gate");
        let node = builder.add_node(&system.resolve("logic.or").unwrap());
        builder.add_input("a", PortType::Bool).unwrap();
        builder.bind_input("a", node, 0).unwrap();
        builder.expose_output("out", node, 0).unwrap();
        let graph = Arc::new(builder.seal().unwrap());
        let id = system.instantiate(&graph);
        (system, id)
    }

    #[test]
    fn collect_handles_empty_queue() {
        let (_tx, rx) = unbounded::<HostEvent>();
        let mut collector = EventCollector::new(rx, 100);
        let mut system = EventSystem::new();

        assert_eq!(collector.collect_frame(&mut system), TickControl::Continue);
    }

    #[test]
    fn collect_applies_graph_events() {
        let (tx, rx) = unbounded();
        let handle = HostHandle::new(tx);
        let mut collector = EventCollector::new(rx, 100);
        let (mut system, id) = system_with_gate();

        handle.set_graph_input(id, "a", true).unwrap();
        handle.set_graph_enabled(id, false).unwrap();
        assert_eq!(collector.collect_frame(&mut system), TickControl::Continue);

        assert_eq!(system.graph(id).unwrap().input("a"), Some(&PortValue::Bool(true)));
        system.update(0.0);
        assert_eq!(system.is_enabled(id), Some(false));
    }

    #[test]
    fn invalid_inputs_are_ignored() {
        let (tx, rx) = unbounded();
        let handle = HostHandle::new(tx);
        let mut collector = EventCollector::new(rx, 100);
        let (mut system, id) = system_with_gate();

        handle.set_graph_input(id, "a", 3_i64).unwrap();
        handle.set_graph_input(id, "missing", true).unwrap();
        assert_eq!(collector.collect_frame(&mut system), TickControl::Continue);
        assert_eq!(system.graph(id).unwrap().input("a"), Some(&PortValue::Bool(false)));
    }

    #[test]
    fn collect_returns_exit_on_quit() {
        let (tx, rx) = unbounded();
        let mut collector = EventCollector::new(rx, 100);
        HostHandle::new(tx).quit().unwrap();

        assert_eq!(collector.collect_frame(&mut EventSystem::new()), TickControl::Exit);
    }

    #[test]
    fn collect_is_bounded_per_frame() {
        let (tx, rx) = unbounded();
        let handle = HostHandle::new(tx);
        let mut collector = EventCollector::new(rx, 2);
        let (mut system, id) = system_with_gate();

        handle.set_graph_enabled(id, true).unwrap();
        handle.set_graph_enabled(id, true).unwrap();
        handle.quit().unwrap();

        assert_eq!(collector.collect_frame(&mut system), TickControl::Continue);
        assert_eq!(collector.collect_frame(&mut system), TickControl::Exit);
    }

    #[test]
    fn collect_returns_exit_on_disconnect() {
        let (tx, rx) = unbounded::<HostEvent>();
        let mut collector = EventCollector::new(rx, 100);
        drop(tx);

        assert_eq!(collector.collect_frame(&mut EventSystem::new()), TickControl::Exit);
    }
}

//=========================================================================
// Core Systems
//
// Engine subsystems running on the update thread, plus the frame
// handoff shared with the render thread.
//
// Components:
// - `event`: typed dataflow graphs, modules and per-tick evaluation
// - `modules`: built-in node kinds (logic, math, world)
// - `state`: closed-set state machine for game flow
// - `sync`: double-buffered update/render frame handoff
// - `host_bridge`: host → update thread events
// - `error`: error types shared by all of the above
//
//=========================================================================

pub mod error;
pub mod event;
pub mod host_bridge;
pub mod modules;
pub mod state;
pub mod sync;

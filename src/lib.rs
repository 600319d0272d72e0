//=========================================================================
// Lumen Engine: Library Root
//
// This crate defines the public API surface of the Lumen Engine.
//
// Responsibilities:
// - Expose the engine runtime (`Engine`, `EngineBuilder`)
// - Expose the event system for building and evaluating node graphs
// - Expose the state machine and frame handoff used by the runtime
//
// Typical usage:
// ```no_run
// use lumen_engine::prelude::*;
//
// EngineBuilder::<Flow, Frame>::new(Flow::Intro)
//     .build()
//     .init(|systems| { /* modules, graphs, states */ Ok(()) })?
//     .run(|frame: &Frame| { /* draw */ })?;
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` contains the engine systems (events, states, synchronization).
// It is exposed publicly for extensibility (custom nodes, modules and
// states), while the runtime lives behind the top-level facade.
//
pub mod core;
pub mod prelude;

//--- Internal Modules ----------------------------------------------------
//
// `engine` defines the hosting loop and thread management.
//
mod engine;

//--- Public Exports ------------------------------------------------------

pub use engine::{Engine, EngineBuilder, EngineSystems, ExitFlag, Presenter, UpdateContext};

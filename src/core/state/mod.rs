//=========================================================================
// State System
//=========================================================================
//
// Closed-set state machine driving high-level game flow (loading, intro,
// gameplay, pause, ...).
//
// Architecture:
//   StateMachine
//     ├─ states: HashMap<K, Box<dyn State>>
//     └─ current: K
//
// Flow:
//   update() → resolve pending transition → State::update()
//
//=========================================================================

//=== Module Declarations =================================================

mod machine;

//=== Public API ==========================================================

pub use machine::{StateKey, StateMachine, StateMachineBuilder, Transitions};

//=== State Trait =========================================================

/// Defines state behavior with lifecycle hooks and update logic.
///
/// States are registered once per key and live as long as the machine,
/// keeping their own data between activations. `C` is the context the
/// host passes to every callback.
///
/// # Minimal Implementation
///
/// Only `update()` is required. Lifecycle hooks default to doing nothing:
///
/// ```rust
/// # use lumen_engine::prelude::*;
/// # #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// # enum Flow { Intro, Gameplay }
/// # impl StateKey for Flow { const ALL: &'static [Self] = &[Flow::Intro, Flow::Gameplay]; }
/// struct Intro {
///     remaining: f64,
/// }
///
/// impl State<Flow, ()> for Intro {
///     fn update(&mut self, dt: f64, _ctx: &mut (), transitions: &mut Transitions<Flow>) {
///         self.remaining -= dt;
///         if self.remaining <= 0.0 {
///             transitions.request(Flow::Gameplay);
///         }
///     }
/// }
/// ```
pub trait State<K: StateKey, C>: Send {
    /// Called when the state becomes active.
    fn on_enter(&mut self, _context: &mut C) {}

    /// Called when the state stops being active.
    fn on_exit(&mut self, _context: &mut C) {}

    /// Called once per update while the state is active.
    ///
    /// A transition requested here takes effect at the start of the next
    /// update; this state is not updated again before exiting.
    fn update(&mut self, delta_time: f64, context: &mut C, transitions: &mut Transitions<K>);
}

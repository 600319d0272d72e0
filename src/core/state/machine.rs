//=========================================================================
// State Machine
//=========================================================================
//
// Closed-set state machine with one active state.
//
// Architecture:
//   StateMachine<K, C>
//     ├─ states: HashMap<K, Box<dyn State<K, C>>>   (one per K::ALL)
//     ├─ current: K
//     └─ transitions: Transitions<K>               (pending request)
//
// Flow (per update):
//   first update → current.on_enter()
//   pending?     → current.on_exit() → current = next → next.on_enter()
//   always       → current.update()   (exactly one)
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use log::{debug, error, info, warn};

//=== Internal Dependencies ===============================================

use super::State;
use crate::core::error::DefinitionError;

//=== State Key Trait =====================================================

/// Identifier of a state in a closed set.
///
/// Typically implemented by a fieldless enum, listing every variant in
/// `ALL`.
pub trait StateKey: Clone + Copy + Eq + Hash + Debug + Send + 'static {
    /// Every key of the set.
    const ALL: &'static [Self];
}

//=== Transitions =========================================================

/// Pending transition request.
///
/// Only one transition is performed per update. If several are requested
/// before it is resolved, the last request wins.
#[derive(Debug)]
pub struct Transitions<K: StateKey> {
    pending: Option<K>,
}

impl<K: StateKey> Transitions<K> {
    pub(crate) fn new() -> Self {
        Self { pending: None }
    }

    /// Requests a switch to `key` at the start of the next update.
    pub fn request(&mut self, key: K) {
        if let Some(previous) = self.pending.replace(key) {
            warn!(
                target: "state",
                "Transition to {:?} overrides pending transition to {:?}",
                key,
                previous
            );
        }
    }

    /// The currently pending target, if any.
    pub fn pending(&self) -> Option<K> {
        self.pending
    }

    pub(crate) fn take(&mut self) -> Option<K> {
        self.pending.take()
    }
}

//=== StateMachineBuilder =================================================

/// Collects one state per key, then checks the set is complete.
pub struct StateMachineBuilder<K: StateKey, C> {
    states: HashMap<K, Box<dyn State<K, C>>>,
}

impl<K: StateKey, C> StateMachineBuilder<K, C> {
    pub fn new() -> Self {
        Self {
            states: HashMap::with_capacity(K::ALL.len()),
        }
    }

    /// Registers the state for `key`, replacing any earlier registration.
    pub fn register<T>(&mut self, key: K, state: T) -> &mut Self
    where
        T: State<K, C> + 'static,
    {
        if self.states.insert(key, Box::new(state)).is_some() {
            warn!(target: "state", "State {:?} was already registered and has been replaced", key);
        }
        self
    }

    /// Whether a state is registered for `key`.
    pub fn is_registered(&self, key: K) -> bool {
        self.states.contains_key(&key)
    }

    /// Builds the machine with `initial` as the active state.
    ///
    /// `on_enter` of the initial state runs on the first update.
    ///
    /// # Errors
    ///
    /// [`DefinitionError::MissingState`] naming the first key of
    /// `K::ALL`, or `initial`, without a registered state.
    pub fn build(self, initial: K) -> Result<StateMachine<K, C>, DefinitionError> {
        if let Some(missing) = K::ALL
            .iter()
            .chain(std::iter::once(&initial))
            .find(|key| !self.states.contains_key(key))
        {
            return Err(DefinitionError::MissingState(format!("{:?}", missing)));
        }

        debug!(target: "state", "Built state machine with {} states, initial {:?}", self.states.len(), initial);

        Ok(StateMachine {
            states: self.states,
            current: initial,
            started: false,
            transitions: Transitions::new(),
        })
    }
}

impl<K: StateKey, C> Default for StateMachineBuilder<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

//=== StateMachine ========================================================

/// Fixed-state-set controller dispatching enter/update/exit.
///
/// There is no terminal state. Shutdown is driven by the host.
pub struct StateMachine<K: StateKey, C> {
    states: HashMap<K, Box<dyn State<K, C>>>,
    current: K,
    started: bool,
    transitions: Transitions<K>,
}

impl<K: StateKey, C> StateMachine<K, C> {
    pub fn builder() -> StateMachineBuilder<K, C> {
        StateMachineBuilder::new()
    }

    /// The active state's key.
    pub fn current(&self) -> K {
        self.current
    }

    /// Requests a transition from outside any state.
    pub fn request_transition(&mut self, key: K) {
        self.transitions.request(key);
    }

    //--- Update Loop ------------------------------------------------------

    /// Resolves a pending transition, then updates the active state once.
    pub fn update(&mut self, delta_time: f64, context: &mut C) {
        if !self.started {
            self.started = true;
            info!(target: "state", "Entering initial state {:?}", self.current);
            self.state_mut(self.current).on_enter(context);
        }

        if let Some(next) = self.transitions.take().filter(|next| self.accepts(*next)) {
            info!(target: "state", "Transition {:?} -> {:?}", self.current, next);
            self.state_mut(self.current).on_exit(context);
            self.current = next;
            self.state_mut(next).on_enter(context);
        }

        let current = self.current;
        let Self {
            states,
            transitions,
            ..
        } = self;
        match states.get_mut(&current) {
            Some(state) => state.update(delta_time, context, transitions),
            None => unreachable!("state {:?} checked at build time", current),
        }
    }

    fn accepts(&self, next: K) -> bool {
        let registered = self.states.contains_key(&next);
        if !registered {
            error!(target: "state", "Dropped transition to unregistered state {:?}", next);
        }
        registered
    }

    fn state_mut(&mut self, key: K) -> &mut dyn State<K, C> {
        match self.states.get_mut(&key) {
            Some(state) => state.as_mut(),
            None => unreachable!("state {:?} checked at build time", key),
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

//=========================================================================
// Host Bridge
//=========================================================================
//
// Bridges the controlling (host) thread with the update thread.
//
// Components:
// - `interface`: event types, the sending handle and errors
// - `event_collector`: update-side bounded draining
//
//=========================================================================

//=== Module Declarations =================================================

pub(crate) mod event_collector;
pub(crate) mod interface;

//=== Public API ==========================================================

pub use interface::{HostError, HostEvent, HostHandle};

pub(crate) use event_collector::{EventCollector, TickControl};

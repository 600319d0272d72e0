//=========================================================================
// Game Synchronization
//=========================================================================
//
// Per-frame rendezvous between the update and render threads.
//
//=========================================================================

//=== Module Declarations =================================================

mod frame_handoff;

//=== Public API ==========================================================

pub use frame_handoff::FrameHandoff;

//! Ridgeline Session - the per-peer challenge coordination runtime
//!
//! Everything a peer runs to keep the optional challenge ruleset consistent
//! across a session:
//! - [`SyncCoordinator`]: replicated selection and the start handshake
//! - [`SceneGate`]: lazily-attached scene-load fan-out for effects
//! - [`ports`]: the contracts the embedding game provides (transport, scene
//!   loader, next-level service, scene notifications)
//!
//! The crate is single-threaded by design: the embedder drains network
//! messages on its simulation loop and calls into the coordinator from
//! there. Cross-peer consistency comes from the protocol's idempotency, not
//! from locks.

pub mod gate;
pub mod infrastructure;
pub mod ports;
pub mod sync;

#[cfg(test)]
mod e2e_tests;

pub use gate::{is_gameplay_scene, ListenerId, LoadMode, SceneGate};
pub use infrastructure::ThreadRngIntervals;
pub use ports::{NextLevelResolver, SceneEventSource, SceneLoader, SessionTransport};
pub use sync::{StartFailure, SyncConfig, SyncCoordinator, SyncEvent, SyncState};

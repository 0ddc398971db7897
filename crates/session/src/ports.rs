//! Outbound ports - interfaces for external collaborators
//!
//! These ports define the contracts the embedding game must satisfy for the
//! challenge sync core to run, allowing the coordinator and the scene gate to
//! interact with the transport, the scene loader, and the level service
//! without depending on concrete implementations.
//!
//! All ports are object-safe and take `&self`; implementations use interior
//! mutability where they need it. Nothing here may block: sends are
//! fire-and-forget against a reliable, peer-ordered transport.

use ridgeline_shared::SyncMessage;

/// The session/transport layer: reliable messaging, the session-wide
/// property store, and membership facts.
///
/// `broadcast` delivers to every peer in the session *including the sender*;
/// the coordinator relies on its own messages looping back rather than
/// applying them twice.
pub trait SessionTransport {
    /// Whether a multi-peer session exists at all. False means solo mode.
    fn in_session(&self) -> bool;

    /// Whether the local peer is the session's coordinating authority.
    fn is_authority(&self) -> bool;

    /// Reliable broadcast to all peers, including the local one.
    fn broadcast(&self, message: &SyncMessage);

    /// Reliable unicast to the authority peer.
    fn send_to_authority(&self, message: &SyncMessage);

    /// Writes a session property. `None` clears the key; a cleared or absent
    /// key reads back as `None`. Writes replicate to every peer and surface
    /// there as a property-change notification.
    fn set_property(&self, key: &str, value: Option<&str>);

    /// Reads a session property.
    fn property(&self, key: &str) -> Option<String>;
}

/// The external scene loader. Must be invoked with identical arguments on
/// every peer after a confirmed start; everything past this call (loading
/// screens, asset streaming) is outside the core.
pub trait SceneLoader {
    fn begin_load(&self, scene: &str, difficulty: i32);
}

/// The "next level" service the authority consults when deciding which scene
/// a confirmed start loads.
pub trait NextLevelResolver {
    /// Precomputed level index for the upcoming run, if the service has one.
    fn precomputed_level_index(&self) -> Option<u32>;

    /// Maps a level index to a scene name.
    fn scene_for_level(&self, index: u32) -> Option<String>;

    /// True when running disconnected from the level service's backend.
    fn is_offline(&self) -> bool;
}

/// The external scene-transition notification source the gate lazily
/// attaches to. `hook`/`unhook` are idempotent from the gate's point of
/// view: the gate never calls `hook` twice without an `unhook` in between.
///
/// Implementations must not call back into the gate from inside these
/// methods.
#[cfg_attr(test, mockall::automock)]
pub trait SceneEventSource {
    fn hook(&self);
    fn unhook(&self);
}

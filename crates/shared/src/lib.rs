//! Ridgeline Shared - contracts every peer agrees on
//!
//! This crate contains the types shared across the peer boundary:
//! - The three sync messages of the challenge coordination protocol
//! - The session property keys used for late-join recovery
//! - The replicated selection value object
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - serde, serde_json, thiserror
//! 2. **No business logic** - pure data types and serialization
//! 3. **Raw wire types** - payloads carry plain strings; domain id
//!    conversion happens at the application edge

pub mod keys;
pub mod messages;
pub mod selection;

pub use messages::{PayloadError, PeerId, SyncMessage};
pub use selection::SessionSelection;

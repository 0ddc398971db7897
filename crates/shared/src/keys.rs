//! Session property keys
//!
//! The replicated selection is mirrored into the session-wide property store
//! under these keys so a peer joining after the live broadcast still learns
//! the selection. The authority writes empty values to clear them when the
//! session returns to the staging scene.

/// Currently selected ruleset id.
pub const SELECTED_RULESET: &str = "selected.ruleset";

/// Currently selected difficulty.
pub const SELECTED_DIFFICULTY: &str = "selected.difficulty";

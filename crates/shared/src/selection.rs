//! Replicated session selection
//!
//! The session-scoped value every peer converges on: which ruleset is
//! selected and at what difficulty. Any peer may propose it; the authority's
//! confirmation is canonical for the start handshake.

use ridgeline_domain::RulesetId;
use serde::{Deserialize, Serialize};

/// The replicated selection. Application is last-write-wins and idempotent:
/// applying the same value twice leaves the same state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSelection {
    pub ruleset: Option<RulesetId>,
    pub difficulty: Option<i32>,
}

impl SessionSelection {
    pub fn new(ruleset: Option<RulesetId>, difficulty: Option<i32>) -> Self {
        Self {
            ruleset,
            difficulty,
        }
    }

    /// Builds a selection from wire values. Empty ruleset strings mean "no
    /// selection", matching how the property store represents a cleared key.
    pub fn from_wire(ruleset: Option<&str>, difficulty: Option<i32>) -> Self {
        let ruleset = ruleset
            .filter(|id| !id.is_empty())
            .and_then(|id| RulesetId::new(id).ok());
        Self {
            ruleset,
            difficulty,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ruleset.is_none() && self.difficulty.is_none()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_is_idempotent() {
        let once = SessionSelection::from_wire(Some("frostbite"), Some(5));
        let twice = SessionSelection::from_wire(Some("frostbite"), Some(5));
        assert_eq!(once, twice);
        assert_eq!(once.ruleset.as_ref().map(|id| id.as_str()), Some("frostbite"));
    }

    #[test]
    fn test_empty_ruleset_string_clears_selection() {
        let selection = SessionSelection::from_wire(Some(""), None);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_difficulty_without_ruleset_is_not_empty() {
        let selection = SessionSelection::from_wire(None, Some(3));
        assert!(!selection.is_empty());
    }
}

//! Challenge ruleset registry
//!
//! The registry is the single catalog of known rulesets and their enablement
//! state. It is an explicit context object: construct one at startup and
//! thread it through the session coordinator, the scene gate, and the effect
//! handlers. There is no hidden global.
//!
//! Two enablement paths exist on purpose:
//! - [`RulesetRegistry::set_singular`] enforces exclusivity (the normal
//!   single-select flow, including force-all mode)
//! - [`RulesetRegistry::enable`] / [`RulesetRegistry::disable`] toggle one
//!   flag without touching the others
//!
//! Overlapping rulesets enabled through the raw path have no defined
//! combination semantics; the capability is kept, nothing composes them.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Selecting this id switches the registry into force-all mode.
pub const FORCE_ALL_ID: &str = "hell";

// =============================================================================
// Identity and definition
// =============================================================================

/// Stable, case-sensitive ruleset identifier. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RulesetId(String);

impl RulesetId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::invalid_id("ruleset id must not be empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the synthetic force-all id.
    pub fn is_force_all(&self) -> bool {
        self.0 == FORCE_ALL_ID
    }
}

impl AsRef<str> for RulesetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RulesetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Presentation-only difficulty tier. Ordering is for display sorting; no
/// gameplay logic branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    Light,
    Easy,
    Medium,
    Mediumcore,
    Hard,
    Hardcore,
}

impl DifficultyTier {
    pub fn display_name(&self) -> &'static str {
        match self {
            DifficultyTier::Light => "LIGHT",
            DifficultyTier::Easy => "EASY",
            DifficultyTier::Medium => "MEDIUM",
            DifficultyTier::Mediumcore => "MEDIUMCORE",
            DifficultyTier::Hard => "HARD",
            DifficultyTier::Hardcore => "HARDCORE",
        }
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A registered ruleset: identity plus display metadata and its stored
/// enablement flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesetDefinition {
    pub id: RulesetId,
    pub title: String,
    pub description: String,
    pub tier: DifficultyTier,
    /// Difficulty this ruleset forces when selected, if any.
    pub difficulty_override: Option<i32>,
    pub enabled: bool,
}

impl RulesetDefinition {
    pub fn new(
        id: RulesetId,
        title: impl Into<String>,
        description: impl Into<String>,
        tier: DifficultyTier,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            tier,
            difficulty_override: None,
            enabled: false,
        }
    }

    pub fn with_difficulty_override(mut self, difficulty: i32) -> Self {
        self.difficulty_override = Some(difficulty);
        self
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Handle returned by [`RulesetRegistry::subscribe`]; pass it back to
/// [`RulesetRegistry::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type RegistryObserver = dyn Fn(&RulesetRegistry);

/// Catalog of rulesets with insertion-order display listing, a force-all
/// flag, and synchronous change notification.
///
/// Observers fire after a mutation is fully applied and receive a shared
/// reference to re-query current state. They cannot mutate the registry from
/// inside a notification; add/remove of observers also happens outside
/// dispatch.
#[derive(Default)]
pub struct RulesetRegistry {
    entries: Vec<RulesetDefinition>,
    force_all: bool,
    observers: Vec<(ObserverId, Rc<RegistryObserver>)>,
    next_observer: u64,
}

impl RulesetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or updates a definition by id.
    ///
    /// Re-registration preserves the stored `enabled` flag, so reloading a
    /// catalog never resets a user's toggle. An insert always notifies; an
    /// update notifies only when the stored definition observably changed.
    pub fn register(&mut self, mut definition: RulesetDefinition) {
        match self.position(definition.id.as_str()) {
            Some(index) => {
                definition.enabled = self.entries[index].enabled;
                if self.entries[index] == definition {
                    return;
                }
                tracing::debug!(id = %definition.id, "ruleset re-registered");
                self.entries[index] = definition;
            }
            None => {
                tracing::debug!(id = %definition.id, "ruleset registered");
                self.entries.push(definition);
            }
        }
        self.notify_observers();
    }

    /// Whether the given id currently reports enabled. Force-all mode makes
    /// every id enabled, registered or not; otherwise unknown ids are
    /// disabled.
    pub fn is_enabled(&self, id: &str) -> bool {
        if self.force_all {
            return true;
        }
        self.get(id).is_some_and(|definition| definition.enabled)
    }

    /// True if any of the listed ids reports enabled.
    pub fn any_of_enabled(&self, ids: &[&str]) -> bool {
        ids.iter().any(|id| self.is_enabled(id))
    }

    /// Selects exactly one ruleset, disabling the rest.
    ///
    /// The force-all id instead switches every ruleset on. Unknown ids are
    /// accepted: the rest of the catalog is disabled and nothing new turns
    /// on (a selection may arrive before its definition is registered).
    /// Silently does nothing when no definitions exist or the resulting
    /// state equals the current one.
    pub fn set_singular(&mut self, id: &str) {
        if self.entries.is_empty() {
            return;
        }

        let force_all = id == FORCE_ALL_ID;
        let mut changed = self.force_all != force_all;
        self.force_all = force_all;

        for definition in &mut self.entries {
            let enable = force_all || definition.id.as_str() == id;
            if definition.enabled != enable {
                definition.enabled = enable;
                changed = true;
            }
        }

        if changed {
            tracing::debug!(id, force_all, "singular ruleset selection applied");
            self.notify_observers();
        }
    }

    /// Turns one stored flag on without touching the others. Unknown ids are
    /// accepted and ignored.
    pub fn enable(&mut self, id: &str) {
        self.set_flag(id, true);
    }

    /// Turns one stored flag off without touching the others. Unknown ids
    /// are accepted and ignored.
    pub fn disable(&mut self, id: &str) {
        self.set_flag(id, false);
    }

    fn set_flag(&mut self, id: &str, enabled: bool) {
        let Some(index) = self.position(id) else {
            tracing::debug!(id, "enable/disable on unregistered ruleset ignored");
            return;
        };
        if self.entries[index].enabled == enabled {
            return;
        }
        self.entries[index].enabled = enabled;
        tracing::debug!(id, enabled, "ruleset flag changed");
        self.notify_observers();
    }

    /// Clears force-all mode and disables every ruleset. No-op (and no
    /// notification) when already all-disabled.
    pub fn disable_all(&mut self) {
        let mut changed = self.force_all;
        self.force_all = false;

        for definition in &mut self.entries {
            if definition.enabled {
                definition.enabled = false;
                changed = true;
            }
        }

        if changed {
            tracing::debug!("all rulesets disabled");
            self.notify_observers();
        }
    }

    /// True if force-all is set or any stored flag is on. Gates the scene
    /// gate's subscription.
    pub fn any_active(&self) -> bool {
        self.force_all || self.entries.iter().any(|definition| definition.enabled)
    }

    pub fn force_all(&self) -> bool {
        self.force_all
    }

    pub fn get(&self, id: &str) -> Option<&RulesetDefinition> {
        self.entries
            .iter()
            .find(|definition| definition.id.as_str() == id)
    }

    /// Definitions in registration order, for display.
    pub fn iter(&self) -> impl Iterator<Item = &RulesetDefinition> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers a change observer. Observers run synchronously, in
    /// subscription order, after each observable mutation.
    pub fn subscribe(&mut self, observer: impl Fn(&RulesetRegistry) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        let observer: Rc<RegistryObserver> = Rc::new(observer);
        self.observers.push((id, observer));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) {
        self.observers.retain(|(observer_id, _)| *observer_id != id);
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|definition| definition.id.as_str() == id)
    }

    fn notify_observers(&mut self) {
        // Snapshot so dispatch never holds a borrow of the observer list.
        let observers: Vec<Rc<RegistryObserver>> = self
            .observers
            .iter()
            .map(|(_, observer)| Rc::clone(observer))
            .collect();
        for observer in observers {
            (*observer)(&*self);
        }
    }
}

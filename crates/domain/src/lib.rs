//! Ridgeline Domain - challenge ruleset registry and scheduled-effect timers
//!
//! Pure logic, no I/O: everything here is driven by the embedder's simulation
//! loop. The registry is an explicit context object constructed once at
//! startup and threaded through its consumers; randomness and the clock are
//! injected so every state machine is deterministic under test.

pub mod catalog;
pub mod error;
pub mod registry;
pub mod schedule;
pub mod sim_time;

pub use catalog::register_builtin_rulesets;
pub use error::DomainError;
pub use registry::{
    DifficultyTier, ObserverId, RulesetDefinition, RulesetId, RulesetRegistry, FORCE_ALL_ID,
};
pub use schedule::{EffectSchedule, EntitySlot, IntervalSource, ScheduleConfig};
pub use sim_time::SimTime;

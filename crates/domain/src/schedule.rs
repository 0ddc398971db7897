//! Scheduled-effect state machine
//!
//! Generic per-entity timer state for effects that fire at randomized
//! recurring intervals and need a short grace window during which a
//! synergistic second effect must hold off (e.g. the drowsiness knockout
//! suppressing the sudden-death ruleset right after it fires).
//!
//! One [`EffectSchedule`] is instantiated per effect type and ticked once per
//! simulation step for every entity the local peer authoritatively owns.
//! State lives in an arena keyed by stable [`EntitySlot`] indices; release a
//! slot when its entity is destroyed. Randomness is injected through
//! [`IntervalSource`] so tests drive the machine with scripted draws.

use crate::sim_time::SimTime;

/// Stable arena index identifying one entity to the effect subsystem.
///
/// Slots come from the embedder's entity table; they must not be recycled
/// while an entity is alive, and [`EffectSchedule::release`] must be called
/// when one is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntitySlot(u32);

impl EntitySlot {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Source of the randomized rearm intervals.
///
/// Draws must be uniform over the closed interval and independent of each
/// other. Production wires a thread-rng implementation; tests script exact
/// values.
pub trait IntervalSource {
    fn next_interval_secs(&mut self, min_secs: f64, max_secs: f64) -> f64;
}

/// Tunables for one effect's schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleConfig {
    pub min_interval_secs: f64,
    pub max_interval_secs: f64,
    pub grace_window_secs: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: 60.0,
            max_interval_secs: 360.0,
            grace_window_secs: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SlotState {
    next_trigger: SimTime,
    was_eligible: bool,
    grace_until: Option<SimTime>,
}

/// Per-entity timer state for one effect type.
#[derive(Debug)]
pub struct EffectSchedule {
    config: ScheduleConfig,
    slots: Vec<Option<SlotState>>,
}

impl EffectSchedule {
    pub fn new(config: ScheduleConfig) -> Self {
        Self {
            config,
            slots: Vec::new(),
        }
    }

    /// Advances one entity's timer by one simulation step.
    ///
    /// Returns true exactly when the effect fires this tick. While `enabled`
    /// is false every slot is dropped, so re-enabling starts fresh,
    /// unsynchronized timers. An eligibility drop rearms the timer; the
    /// effect can therefore never fire on the first eligible tick after a
    /// stretch of ineligibility.
    pub fn tick(
        &mut self,
        slot: EntitySlot,
        enabled: bool,
        eligible: bool,
        now: SimTime,
        intervals: &mut dyn IntervalSource,
    ) -> bool {
        if !enabled {
            if !self.slots.is_empty() {
                tracing::debug!("effect disabled, dropping all scheduled state");
                self.clear();
            }
            return false;
        }

        if self.slots.len() <= slot.index() {
            self.slots.resize(slot.index() + 1, None);
        }

        let config = self.config;
        let state = self.slots[slot.index()].get_or_insert_with(|| SlotState {
            next_trigger: now + draw(intervals, &config),
            was_eligible: eligible,
            grace_until: None,
        });

        if !eligible {
            if state.was_eligible {
                state.next_trigger = now + draw(intervals, &config);
            }
            state.was_eligible = false;
            return false;
        }
        state.was_eligible = true;

        if now < state.next_trigger {
            return false;
        }

        state.grace_until = Some(now + config.grace_window_secs);
        state.next_trigger = now + draw(intervals, &config);
        true
    }

    /// True while `now` is inside the grace window opened by the entity's
    /// most recent firing (inclusive at the boundary).
    pub fn is_in_grace_window(&self, slot: EntitySlot, now: SimTime) -> bool {
        self.slots
            .get(slot.index())
            .copied()
            .flatten()
            .and_then(|state| state.grace_until)
            .is_some_and(|grace_until| now <= grace_until)
    }

    /// Drops one entity's state (entity destroyed).
    pub fn release(&mut self, slot: EntitySlot) {
        if let Some(state) = self.slots.get_mut(slot.index()) {
            *state = None;
        }
    }

    /// Drops all state (effect disabled or session reset).
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn config(&self) -> ScheduleConfig {
        self.config
    }
}

fn draw(intervals: &mut dyn IntervalSource, config: &ScheduleConfig) -> f64 {
    intervals.next_interval_secs(config.min_interval_secs, config.max_interval_secs)
}

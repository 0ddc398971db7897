//! Builtin ruleset catalog
//!
//! The static catalog step: registers every shipped ruleset once at process
//! start. Registration is idempotent and never resets a stored toggle, so
//! running this again (e.g. after a content reload) is safe.

use crate::registry::{DifficultyTier, RulesetDefinition, RulesetId, RulesetRegistry, FORCE_ALL_ID};

fn definition(
    id: &str,
    title: &str,
    description: &str,
    tier: DifficultyTier,
    difficulty_override: i32,
) -> RulesetDefinition {
    // Ids here are compile-time literals; an empty one is a programming
    // error, not a runtime condition.
    let id = RulesetId::new(id).expect("builtin ids are non-empty");
    RulesetDefinition::new(id, title, description, tier)
        .with_difficulty_override(difficulty_override)
}

/// Registers all shipped rulesets, force-all last so it sorts to the bottom
/// of the display list.
pub fn register_builtin_rulesets(registry: &mut RulesetRegistry) {
    registry.register(definition(
        "frostbite",
        "Frostbite",
        " - Difficulty 5\n - It is always storming on the high slopes\n - It is always raining in the valley\n - The glacier route is forced\n",
        DifficultyTier::Mediumcore,
        5,
    ));
    registry.register(definition(
        "instagib",
        "Sudden Death",
        " - Difficulty 7\n - Going unconscious instantly kills you\n",
        DifficultyTier::Hard,
        7,
    ));
    registry.register(definition(
        "baggage",
        "Baggage Allowance",
        " - Difficulty 1\n - Only one item fits in your pack\n",
        DifficultyTier::Easy,
        1,
    ));
    registry.register(definition(
        "hunger",
        "The Hunger",
        " - Difficulty 3\n - Stamina only recovers after eating\n",
        DifficultyTier::Hardcore,
        3,
    ));
    registry.register(definition(
        "inversion",
        "Inversion",
        " - Difficulty 4\n - Natural status recovery is reversed\n",
        DifficultyTier::Hard,
        4,
    ));
    registry.register(definition(
        "narcolepsy",
        "Narcolepsy",
        " - Difficulty 4\n - Knocked out by drowsiness every 1-3 minutes\n",
        DifficultyTier::Medium,
        4,
    ));
    registry.register(definition(
        "affliction_roulette",
        "Affliction Roulette",
        " - Difficulty 5\n - Added statuses become random afflictions\n",
        DifficultyTier::Hard,
        5,
    ));
    registry.register(definition(
        "night_stalker",
        "Night Stalker",
        " - Difficulty Greenhorn (-1)\n - The stalker only hunts at night\n - It always goes for the closest climber\n",
        DifficultyTier::Medium,
        -1,
    ));
    registry.register(definition(
        "rough_landing",
        "Rough Landing",
        " - Difficulty Greenhorn (-1)\n - Start with 90% injury\n",
        DifficultyTier::Light,
        -1,
    ));
    // force-all always goes last
    registry.register(definition(
        FORCE_ALL_ID,
        "Hell",
        " - Difficulty 1337\n - All other rulesets are enabled\n",
        DifficultyTier::Hardcore,
        1337,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_registers_force_all_last() {
        let mut registry = RulesetRegistry::new();
        register_builtin_rulesets(&mut registry);

        assert!(registry.len() >= 2);
        let last = registry.iter().last().expect("catalog not empty");
        assert_eq!(last.id.as_str(), FORCE_ALL_ID);
    }

    #[test]
    fn test_catalog_reload_preserves_toggles() {
        let mut registry = RulesetRegistry::new();
        register_builtin_rulesets(&mut registry);
        registry.set_singular("narcolepsy");

        register_builtin_rulesets(&mut registry);
        assert!(registry.is_enabled("narcolepsy"));
        assert!(!registry.is_enabled("frostbite"));
    }

    #[test]
    fn test_catalog_defaults_disabled() {
        let mut registry = RulesetRegistry::new();
        register_builtin_rulesets(&mut registry);
        assert!(!registry.any_active());
    }
}

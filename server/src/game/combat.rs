//! Damage resolution for a single attack.
//!
//! [`resolve_attack`] is the only place the damage formula lives; the attack
//! preview and the authoritative commit both go through it. It is a pure
//! function of its inputs plus exactly one draw from the [`RollSource`].

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game::types::UnitStats;

/// Source of uniform draws in `[0, 1)` for critical rolls.
pub trait RollSource {
    fn roll(&mut self) -> f64;
}

impl<F> RollSource for F
where
    F: FnMut() -> f64,
{
    fn roll(&mut self) -> f64 {
        self()
    }
}

/// Fresh thread-local randomness for every draw; nothing shared between battles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRoll;

impl RollSource for ThreadRoll {
    fn roll(&mut self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Reproducible draws for simulations and tests.
#[derive(Debug, Clone)]
pub struct SeededRoll(StdRng);

impl SeededRoll {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RollSource for SeededRoll {
    fn roll(&mut self) -> f64 {
        self.0.random::<f64>()
    }
}

/// Defender snapshot as seen by the resolver.
#[derive(Debug, Clone, Copy)]
pub struct DefenderView<'a> {
    pub stats: &'a UnitStats,
    /// Runtime health, not the card's static max.
    pub current_health: u32,
}

/// Result of one resolved attack.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AttackOutcome {
    pub damage: u32,
    pub is_critical: bool,
    pub destroyed: bool,
    /// One human-readable line per resolution step.
    pub narrative: Vec<String>,
}

impl AttackOutcome {
    pub fn narrative_text(&self) -> String {
        self.narrative.join("; ")
    }
}

/// `round(value * pct / 100)` with halves rounded up, in exact integer math.
pub fn percent_of(value: u32, pct: u32) -> u32 {
    let scaled = (u64::from(value) * u64::from(pct) + 50) / 100;
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

/// Resolve `attacker` against `defender` (or the opposing player when `None`).
pub fn resolve_attack(
    attacker: &UnitStats,
    defender: Option<DefenderView<'_>>,
    roll: &mut impl RollSource,
) -> AttackOutcome {
    let mut narrative = Vec::with_capacity(4);

    // 1. critical roll
    let draw = roll.roll();
    let chance = attacker.critical_chance.min(100);
    let is_critical = draw * 100.0 < f64::from(chance);
    let mut damage = attacker.attack;
    if is_critical {
        let bonus = percent_of(attacker.attack, attacker.critical_damage);
        damage = damage.saturating_add(bonus);
        narrative.push(format!(
            "critical hit ({chance}% chance): {} + {bonus} bonus = {damage}",
            attacker.attack
        ));
    } else {
        narrative.push(format!("base attack {damage}"));
    }

    let Some(defender) = defender else {
        narrative.push(format!("direct hit on the opposing player for {damage}"));
        return AttackOutcome {
            damage,
            is_critical,
            destroyed: false,
            narrative,
        };
    };

    // 2. class resistance
    let resistance = defender.stats.resistance_against(attacker.class).min(100);
    let absorbed = percent_of(damage, resistance);
    damage = damage.saturating_sub(absorbed);
    narrative.push(format!(
        "{resistance}% {:?} resistance absorbs {absorbed}, {damage} left",
        attacker.class
    ));

    // 3. flat defense
    let blocked = defender.stats.defense.min(damage);
    damage -= blocked;
    narrative.push(format!("defense blocks {blocked}, {damage} dealt"));

    // 4. lethality
    let destroyed = damage >= defender.current_health;
    if destroyed {
        narrative.push(format!(
            "target destroyed ({damage} >= {} health)",
            defender.current_health
        ));
    } else {
        narrative.push(format!(
            "target survives with {} health",
            defender.current_health - damage
        ));
    }

    AttackOutcome {
        damage,
        is_critical,
        destroyed,
        narrative,
    }
}

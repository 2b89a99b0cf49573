pub mod adventure;
pub mod aggregate;
pub mod autosave;
pub mod catalog;
pub mod combatant;
pub mod conditions;
pub mod config;
pub mod content;
pub mod encounter;
pub mod error;
pub mod life;
pub mod loot;
pub mod player;
pub mod ports;
pub mod reconcile;
pub mod rules;
pub mod session;

pub use adventure::Adventure;
pub use combatant::{Combatant, CombatantId, CombatantKind};
pub use encounter::{Encounter, EncounterId, EncounterState, Transition};
pub use error::{SessionError, ValidationError};
pub use player::{Player, PlayerId};
pub use rules::{Ability, AbilityScores, ability_mod};
pub use session::{Action, Outcome, Session};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AdMode { Normal, Advantage, Disadvantage }

enum Source {
    Seeded(ChaCha8Rng),
    Scripted { rolls: Vec<i32>, next: usize },
}

/// Die source shared by every randomized rule (initiative auto-rolls, loot,
/// death saves). Scripted dice replay a fixed sequence, cycling when exhausted.
pub struct Dice { source: Source }

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self { source: Source::Seeded(ChaCha8Rng::seed_from_u64(seed)) }
    }

    pub fn from_entropy() -> Self {
        Self { source: Source::Seeded(ChaCha8Rng::from_entropy()) }
    }

    pub fn from_scripted(rolls: Vec<i32>) -> Self {
        Self { source: Source::Scripted { rolls, next: 0 } }
    }

    /// Roll one die with `sides` faces (1..=sides).
    pub fn roll(&mut self, sides: i32) -> i32 {
        match &mut self.source {
            Source::Seeded(rng) => rng.gen_range(1..=sides.max(1)),
            Source::Scripted { rolls, next } => {
                if rolls.is_empty() {
                    return 1;
                }
                let value = rolls[*next % rolls.len()];
                *next += 1;
                value
            }
        }
    }

    /// Sum of `count` rolls of a `sides`-faced die.
    pub fn roll_many(&mut self, count: u32, sides: i32) -> i32 {
        (0..count).map(|_| self.roll(sides)).sum()
    }

    pub fn d20(&mut self, mode: AdMode) -> i32 {
        match mode {
            AdMode::Normal => self.roll(20),
            AdMode::Advantage => { let a = self.roll(20); let b = self.roll(20); a.max(b) }
            AdMode::Disadvantage => { let a = self.roll(20); let b = self.roll(20); a.min(b) }
        }
    }

    /// Pick an index into a list of `len` entries.
    pub fn pick(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let roll = self.roll(len as i32).clamp(1, len as i32);
        Some(roll as usize - 1)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CheckInput {
    pub dc: i32,
    pub modifier: i32,
    pub mode: AdMode,
}

#[derive(Debug, Clone, Copy)]
pub struct CheckResult {
    pub roll: i32,
    pub total: i32,
    pub dc: i32,
    pub passed: bool,
}

/// Roll a d20 (with advantage/disadvantage), add modifier, compare vs DC.
pub fn check(dice: &mut Dice, input: CheckInput) -> CheckResult {
    let roll = dice.d20(input.mode);
    let total = roll + input.modifier;
    CheckResult { roll, total, dc: input.dc, passed: total >= input.dc }
}

use serde::{Deserialize, Serialize};

use crate::rules::concentration_dc;

pub const MAX_DEATH_SAVES: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeathSaves {
    pub successes: u8, // 0..=3
    pub failures: u8,  // 0..=3
}

impl DeathSaves {
    pub fn is_clear(&self) -> bool {
        self.successes == 0 && self.failures == 0
    }
}

/// Hit point bookkeeping for one combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vitals {
    #[serde(default)]
    pub current_hp: i32,
    #[serde(default)]
    pub max_hp: i32,
    #[serde(default)]
    pub temp_hp: i32,
    #[serde(default)]
    pub death_saves: DeathSaves,
}

impl Vitals {
    pub fn new(max_hp: i32) -> Self {
        let max_hp = max_hp.max(0);
        Self { current_hp: max_hp, max_hp, temp_hp: 0, death_saves: DeathSaves::default() }
    }

    pub fn is_down(&self) -> bool {
        self.current_hp <= 0
    }

    pub fn is_dead(&self) -> bool {
        self.death_saves.failures >= MAX_DEATH_SAVES
    }

    /// Set current HP directly (manual edit). Never above max; never below 0
    /// when `floor_at_zero` is set.
    pub fn set_current(&mut self, hp: i32, floor_at_zero: bool) {
        let hp = hp.min(self.max_hp);
        self.current_hp = if floor_at_zero { hp.max(0) } else { hp };
        if self.current_hp > 0 {
            self.death_saves = DeathSaves::default();
        }
    }

    /// Change max HP, pulling current HP down if it would exceed the new max.
    pub fn set_max(&mut self, max_hp: i32) {
        self.max_hp = max_hp.max(0);
        if self.current_hp > self.max_hp {
            self.current_hp = self.max_hp;
        }
    }

    pub fn set_temp(&mut self, temp_hp: i32) {
        self.temp_hp = temp_hp.max(0);
    }

    /// Temporary hit points don't stack; the larger pool wins.
    pub fn grant_temp(&mut self, amount: i32) {
        self.temp_hp = self.temp_hp.max(amount.max(0));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageOutcome {
    /// Damage soaked by temporary hit points.
    pub absorbed: i32,
    /// Damage that reached current HP.
    pub applied: i32,
    pub hp_before: i32,
    pub hp_after: i32,
    /// True if the creature went from above 0 to 0 or less on this hit.
    pub dropped: bool,
    /// DC of the concentration save to prompt, if one is owed.
    pub concentration_dc: Option<i32>,
}

/// Apply damage: temporary HP first, remainder to current HP. Non-positive
/// amounts are ignored.
pub fn apply_damage(
    name: &str,
    vitals: &mut Vitals,
    floor_at_zero: bool,
    concentrating: bool,
    dmg: i32,
    mut log: impl FnMut(String),
) -> DamageOutcome {
    let hp_before = vitals.current_hp;
    if dmg <= 0 {
        return DamageOutcome { hp_before, hp_after: hp_before, ..DamageOutcome::default() };
    }

    let absorbed = dmg.min(vitals.temp_hp);
    vitals.temp_hp -= absorbed;
    let applied = dmg - absorbed;

    let mut hp = hp_before.saturating_sub(applied);
    if floor_at_zero {
        hp = hp.max(0);
    }
    vitals.current_hp = hp;

    if absorbed > 0 {
        log(format!("[TEMP][{}] absorbs {} ({} temp left)", name, absorbed, vitals.temp_hp));
    }
    log(format!("[DMG][{}] {} → {} (−{})", name, hp_before, hp, applied));

    let dropped = hp_before > 0 && hp <= 0;
    if dropped {
        log(format!("[STATE][{}] drops to 0 HP", name));
    }

    let concentration_dc = concentrating.then(|| concentration_dc(dmg));
    if let Some(dc) = concentration_dc {
        log(format!("[CONC][{}] concentration save DC {}", name, dc));
    }

    DamageOutcome { absorbed, applied, hp_before, hp_after: hp, dropped, concentration_dc }
}

/// Healing, capped at max HP. Rising above 0 clears death saves. Returns the
/// HP actually restored.
pub fn heal(name: &str, vitals: &mut Vitals, amount: i32, mut log: impl FnMut(String)) -> i32 {
    if amount <= 0 {
        return 0;
    }
    let before = vitals.current_hp;
    vitals.current_hp = before
        .saturating_add(amount)
        .min(vitals.max_hp)
        .max(before.min(vitals.max_hp));
    let restored = vitals.current_hp.saturating_sub(before).max(0);
    if vitals.current_hp > 0 && !vitals.death_saves.is_clear() {
        vitals.death_saves = DeathSaves::default();
        log(format!(
            "[HEAL][{}] +{} HP ({} → {}) and regains consciousness",
            name, restored, before, vitals.current_hp
        ));
    } else {
        log(format!("[HEAL][{}] +{} HP ({} → {})", name, restored, before, vitals.current_hp));
    }
    restored
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathSaveResult {
    Success,
    Failure,
    /// Natural 20: the creature regains 1 HP.
    CriticalSuccess,
    /// Natural 1: counts as two failures.
    CriticalFailure,
}

impl DeathSaveResult {
    pub fn from_roll(roll: i32) -> Self {
        match roll {
            20.. => DeathSaveResult::CriticalSuccess,
            ..=1 => DeathSaveResult::CriticalFailure,
            10..=19 => DeathSaveResult::Success,
            _ => DeathSaveResult::Failure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathSaveOutcome {
    /// The creature is above 0 HP; nothing was recorded.
    NotDying,
    Pending(DeathSaves),
    /// Third success: back on their feet at 1 HP.
    Stabilized,
    /// Natural 20.
    Revived,
    /// Third failure. HP is left untouched; the caller reports the death.
    Died,
}

pub fn record_death_save(
    name: &str,
    vitals: &mut Vitals,
    result: DeathSaveResult,
    mut log: impl FnMut(String),
) -> DeathSaveOutcome {
    if vitals.current_hp > 0 {
        return DeathSaveOutcome::NotDying;
    }
    if vitals.is_dead() {
        return DeathSaveOutcome::Died;
    }

    if result == DeathSaveResult::CriticalSuccess {
        vitals.death_saves = DeathSaves::default();
        vitals.current_hp = vitals.max_hp.min(1);
        log(format!("[DEATHSAVE][{}] NAT20 → regain 1 HP", name));
        return DeathSaveOutcome::Revived;
    }

    let saves = &mut vitals.death_saves;
    match result {
        DeathSaveResult::Success => saves.successes = (saves.successes + 1).min(MAX_DEATH_SAVES),
        DeathSaveResult::Failure => saves.failures = (saves.failures + 1).min(MAX_DEATH_SAVES),
        DeathSaveResult::CriticalFailure => {
            saves.failures = (saves.failures + 2).min(MAX_DEATH_SAVES)
        }
        DeathSaveResult::CriticalSuccess => {}
    }

    if vitals.death_saves.failures >= MAX_DEATH_SAVES {
        log(format!(
            "[DEATHSAVE][{}] failure tally={}, success tally={} → DEAD",
            name, vitals.death_saves.failures, vitals.death_saves.successes
        ));
        return DeathSaveOutcome::Died;
    }
    if vitals.death_saves.successes >= MAX_DEATH_SAVES {
        vitals.death_saves = DeathSaves::default();
        vitals.current_hp = vitals.max_hp.min(1);
        log(format!("[DEATHSAVE][{}] 3 successes → stabilized at 1 HP", name));
        return DeathSaveOutcome::Stabilized;
    }

    log(format!(
        "[DEATHSAVE][{}] {:?} (S={}, F={})",
        name, result, vitals.death_saves.successes, vitals.death_saves.failures
    ));
    DeathSaveOutcome::Pending(vitals.death_saves)
}

/// Roll the death save with the supplied d20 and record it.
pub fn roll_death_save(
    name: &str,
    vitals: &mut Vitals,
    mut d20: impl FnMut() -> i32,
    log: impl FnMut(String),
) -> (i32, DeathSaveOutcome) {
    if vitals.current_hp > 0 {
        return (0, DeathSaveOutcome::NotDying);
    }
    let roll = d20();
    (roll, record_death_save(name, vitals, DeathSaveResult::from_roll(roll), log))
}

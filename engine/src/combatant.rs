use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{MonsterCatalog, MonsterEntry};
use crate::conditions::{toggle_condition, ConditionKind};
use crate::error::ValidationError;
use crate::life::{self, DamageOutcome, DeathSaveOutcome, DeathSaveResult, Vitals};
use crate::player::{Player, PlayerId, DEFAULT_AC};
use crate::rules::concentration_dc;
use crate::{check, AdMode, CheckInput, CheckResult, Dice};

pub const UNKNOWN_PLAYER: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombatantId(pub Uuid);

impl CombatantId {
    pub fn new() -> Self {
        CombatantId(Uuid::new_v4())
    }
}

impl Default for CombatantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Who a row in the turn order stands for. Player rows carry only the lookup
/// key; the name lives on the player record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CombatantKind {
    Player { player_id: PlayerId },
    Monster { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub kind: CombatantKind,
    #[serde(flatten)]
    pub vitals: Vitals,
    pub ac: i32,
    /// Challenge rating as typed ("1/4", "5"); empty when unknown.
    #[serde(default)]
    pub cr: String,
    #[serde(default)]
    pub initiative: i32,
    #[serde(default)]
    pub initiative_bonus: Option<i32>,
    #[serde(default)]
    pub dmg_accumulated: i32,
    #[serde(default)]
    pub heal_accumulated: i32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub conditions: BTreeSet<ConditionKind>,
    #[serde(default)]
    pub concentrating: bool,
    /// Monster or character page; doubles as the stat cache key.
    #[serde(default)]
    pub remote_ref: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Combatant {
    fn blank(kind: CombatantKind) -> Self {
        Self {
            id: CombatantId::new(),
            kind,
            vitals: Vitals::default(),
            ac: DEFAULT_AC,
            cr: String::new(),
            initiative: 0,
            initiative_bonus: None,
            dmg_accumulated: 0,
            heal_accumulated: 0,
            notes: String::new(),
            conditions: BTreeSet::new(),
            concentrating: false,
            remote_ref: None,
            avatar_url: None,
        }
    }

    /// Monster row with untouched stats, waiting for a lookup or manual entry.
    pub fn monster(name: impl Into<String>) -> Self {
        Self::blank(CombatantKind::Monster { name: name.into() })
    }

    /// Monster row seeded from a catalog entry. Only CR and the reference are
    /// copied; AC and HP arrive through reconciliation.
    pub fn from_catalog(name: impl Into<String>, entry: &MonsterEntry) -> Self {
        let mut combatant = Self::monster(name);
        combatant.cr = entry.cr.clone();
        combatant.remote_ref = entry.url.clone();
        combatant
    }

    /// Snapshot of a player's sheet at encounter creation or refresh time.
    pub fn from_player(player: &Player) -> Self {
        let mut combatant = Self::blank(CombatantKind::Player { player_id: player.id.clone() });
        combatant.vitals = Vitals::new(player.max_hp);
        combatant.ac = player.ac;
        combatant.initiative_bonus = Some(player.initiative_bonus);
        combatant.remote_ref = player.remote_profile_ref.clone();
        combatant
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, CombatantKind::Player { .. })
    }

    pub fn player_id(&self) -> Option<&PlayerId> {
        match &self.kind {
            CombatantKind::Player { player_id } => Some(player_id),
            CombatantKind::Monster { .. } => None,
        }
    }

    pub fn monster_name(&self) -> Option<&str> {
        match &self.kind {
            CombatantKind::Monster { name } => Some(name),
            CombatantKind::Player { .. } => None,
        }
    }

    /// Name shown in the turn order. Player rows whose player was deleted
    /// show as "Unknown".
    pub fn display_name<'a>(&'a self, players: &'a [Player]) -> &'a str {
        match &self.kind {
            CombatantKind::Monster { name } => name,
            CombatantKind::Player { player_id } => players
                .iter()
                .find(|p| &p.id == player_id)
                .map(|p| p.display_name.as_str())
                .unwrap_or(UNKNOWN_PLAYER),
        }
    }

    /// Stored CR, else the catalog entry for the name, else the catalog entry
    /// for the remote page. Players have no CR.
    pub fn resolve_cr(&self, catalog: &MonsterCatalog) -> Option<String> {
        let name = self.monster_name()?;
        if !self.cr.trim().is_empty() {
            return Some(self.cr.trim().to_string());
        }
        catalog
            .lookup(name)
            .or_else(|| self.remote_ref.as_deref().and_then(|r| catalog.lookup_ref(r)))
            .map(|(_, entry)| entry.cr.clone())
            .filter(|cr| !cr.is_empty())
    }

    /// Local AC unless it is still the untouched default and the catalog knows
    /// better.
    pub fn effective_ac(&self, catalog: &MonsterCatalog) -> i32 {
        if self.ac != DEFAULT_AC {
            return self.ac;
        }
        self.monster_name()
            .and_then(|name| catalog.lookup(name))
            .and_then(|(_, entry)| entry.ac)
            .unwrap_or(self.ac)
    }

    pub fn needs_stats(&self) -> bool {
        !self.is_player()
            && (self.ac == DEFAULT_AC
                || self.vitals.max_hp == 0
                || self.cr.trim().is_empty()
                || self.initiative_bonus.is_none())
    }

    pub fn take_damage(
        &mut self,
        label: &str,
        amount: i32,
        log: impl FnMut(String),
    ) -> DamageOutcome {
        let floor_at_zero = self.is_player();
        let outcome = life::apply_damage(
            label,
            &mut self.vitals,
            floor_at_zero,
            self.concentrating,
            amount,
            log,
        );
        self.dmg_accumulated = self.dmg_accumulated.saturating_add(amount.max(0));
        outcome
    }

    pub fn receive_healing(&mut self, label: &str, amount: i32, log: impl FnMut(String)) -> i32 {
        let restored = life::heal(label, &mut self.vitals, amount, log);
        self.heal_accumulated = self.heal_accumulated.saturating_add(restored);
        restored
    }

    /// Result of the concentration save owed after damage.
    pub fn resolve_concentration(&mut self, passed: bool) {
        if !passed {
            self.concentrating = false;
        }
    }

    /// Roll the concentration save for `damage` taken and apply the result.
    pub fn roll_concentration(
        &mut self,
        label: &str,
        dice: &mut Dice,
        damage: i32,
        modifier: i32,
        mut log: impl FnMut(String),
    ) -> CheckResult {
        let result = check(
            dice,
            CheckInput { dc: concentration_dc(damage), modifier, mode: AdMode::Normal },
        );
        log(format!(
            "[CONC][{}] d20={} total={} vs DC {} → {}",
            label,
            result.roll,
            result.total,
            result.dc,
            if result.passed { "holds" } else { "lost" }
        ));
        self.resolve_concentration(result.passed);
        result
    }

    pub fn roll_death_save(
        &mut self,
        label: &str,
        dice: &mut Dice,
        log: impl FnMut(String),
    ) -> (i32, DeathSaveOutcome) {
        life::roll_death_save(label, &mut self.vitals, || dice.roll(20), log)
    }

    pub fn record_death_save(
        &mut self,
        label: &str,
        result: DeathSaveResult,
        log: impl FnMut(String),
    ) -> DeathSaveOutcome {
        life::record_death_save(label, &mut self.vitals, result, log)
    }

    pub fn apply(&mut self, update: CombatantUpdate) -> Result<(), ValidationError> {
        match update {
            CombatantUpdate::Name(name) => match &mut self.kind {
                CombatantKind::Monster { name: current } => *current = name,
                CombatantKind::Player { .. } => return Err(ValidationError::PlayerNameIsDerived),
            },
            CombatantUpdate::Initiative(value) => self.initiative = value,
            CombatantUpdate::InitiativeBonus(bonus) => self.initiative_bonus = bonus,
            CombatantUpdate::CurrentHp(hp) => {
                let floor_at_zero = self.is_player();
                self.vitals.set_current(hp, floor_at_zero);
            }
            CombatantUpdate::MaxHp(hp) => {
                if hp < 0 {
                    return Err(ValidationError::OutOfRange {
                        field: "max HP",
                        value: hp,
                        min: 0,
                        max: i32::MAX,
                    });
                }
                // A row still at 0/0 starts at full health.
                let fresh = self.vitals.max_hp == 0 && self.vitals.current_hp == 0;
                self.vitals.set_max(hp);
                if fresh {
                    self.vitals.current_hp = hp;
                }
            }
            CombatantUpdate::TempHp(hp) => {
                if hp < 0 {
                    return Err(ValidationError::OutOfRange {
                        field: "temp HP",
                        value: hp,
                        min: 0,
                        max: i32::MAX,
                    });
                }
                self.vitals.set_temp(hp);
            }
            CombatantUpdate::Ac(ac) => {
                if ac < 0 {
                    return Err(ValidationError::OutOfRange {
                        field: "AC",
                        value: ac,
                        min: 0,
                        max: i32::MAX,
                    });
                }
                self.ac = ac;
            }
            CombatantUpdate::Cr(cr) => self.cr = cr.trim().to_string(),
            CombatantUpdate::Notes(notes) => self.notes = notes,
            CombatantUpdate::ToggleCondition(kind) => {
                toggle_condition(&mut self.conditions, kind);
            }
            CombatantUpdate::Concentrating(flag) => self.concentrating = flag,
            CombatantUpdate::RemoteRef(reference) => {
                self.remote_ref = reference.filter(|r| !r.trim().is_empty())
            }
        }
        Ok(())
    }
}

/// A single edit to one row of an encounter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombatantUpdate {
    Name(String),
    Initiative(i32),
    InitiativeBonus(Option<i32>),
    CurrentHp(i32),
    MaxHp(i32),
    TempHp(i32),
    Ac(i32),
    Cr(String),
    Notes(String),
    ToggleCondition(ConditionKind),
    Concentrating(bool),
    RemoteRef(Option<String>),
}

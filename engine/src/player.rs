use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::ports::CharacterDetails;
use crate::rules::{
    passive_score, proficiency_bonus, Ability, AbilityScores, PassiveSkill,
};

pub const DEFAULT_AC: i32 = 10;
pub const DEFAULT_SPEED: i32 = 30;

/// Stable player key. Derived from the remote profile when there is one so
/// re-importing the same character lands on the same id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn synthetic() -> Self {
        PlayerId(format!("player-{}", Uuid::new_v4()))
    }

    /// Last non-empty path segment of a profile URL, e.g.
    /// `.../profile/someone/characters/12345` → `character-12345`.
    pub fn from_profile_ref(reference: &str) -> Option<Self> {
        let segment = reference
            .trim()
            .trim_end_matches('/')
            .rsplit('/')
            .find(|s| !s.is_empty())?;
        Some(PlayerId(format!("character-{}", segment)))
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SkillProficiencies {
    #[serde(default)]
    pub perception: bool,
    #[serde(default)]
    pub insight: bool,
    #[serde(default)]
    pub investigation: bool,
}

impl SkillProficiencies {
    pub fn has(&self, skill: PassiveSkill) -> bool {
        match skill {
            PassiveSkill::Perception => self.perception,
            PassiveSkill::Insight => self.insight,
            PassiveSkill::Investigation => self.investigation,
        }
    }

    pub fn set(&mut self, skill: PassiveSkill, proficient: bool) {
        match skill {
            PassiveSkill::Perception => self.perception = proficient,
            PassiveSkill::Insight => self.insight = proficient,
            PassiveSkill::Investigation => self.investigation = proficient,
        }
    }
}

fn default_level() -> u32 {
    1
}

fn default_ac() -> i32 {
    DEFAULT_AC
}

fn default_speed() -> i32 {
    DEFAULT_SPEED
}

/// A player character. Passive skills and proficiency are derived on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub player_name: String,
    #[serde(default)]
    pub race: String,
    #[serde(default)]
    pub class: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub abilities: AbilityScores,
    #[serde(default)]
    pub proficiencies: SkillProficiencies,
    #[serde(default)]
    pub max_hp: i32,
    #[serde(default = "default_ac")]
    pub ac: i32,
    #[serde(default = "default_speed")]
    pub speed: i32,
    #[serde(default)]
    pub initiative_bonus: i32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub remote_profile_ref: Option<String>,
}

impl Player {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self::with_id(PlayerId::synthetic(), display_name)
    }

    pub fn with_id(id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            player_name: String::new(),
            race: String::new(),
            class: String::new(),
            level: 1,
            abilities: AbilityScores::default(),
            proficiencies: SkillProficiencies::default(),
            max_hp: 0,
            ac: DEFAULT_AC,
            speed: DEFAULT_SPEED,
            initiative_bonus: 0,
            notes: String::new(),
            remote_profile_ref: None,
        }
    }

    /// New player keyed by a remote character profile.
    pub fn from_profile(reference: impl Into<String>) -> Self {
        let reference = reference.into();
        let id = PlayerId::from_profile_ref(&reference).unwrap_or_else(PlayerId::synthetic);
        let mut player = Self::with_id(id, "");
        player.remote_profile_ref = Some(reference);
        player
    }

    pub fn ability_mod(&self, ability: Ability) -> i32 {
        self.abilities.mod_of(ability)
    }

    pub fn proficiency_bonus(&self) -> i32 {
        proficiency_bonus(self.level)
    }

    pub fn passive(&self, skill: PassiveSkill) -> i32 {
        passive_score(
            self.abilities.score(skill.ability()),
            self.proficiencies.has(skill),
            self.level,
        )
    }

    pub fn apply(&mut self, update: PlayerUpdate) -> Result<(), ValidationError> {
        match update {
            PlayerUpdate::DisplayName(name) => self.display_name = name,
            PlayerUpdate::PlayerName(name) => self.player_name = name,
            PlayerUpdate::Race(race) => self.race = race,
            PlayerUpdate::Class(class) => self.class = class,
            PlayerUpdate::Level(level) => {
                if level < 1 {
                    return Err(ValidationError::OutOfRange {
                        field: "level",
                        value: level as i32,
                        min: 1,
                        max: i32::MAX,
                    });
                }
                self.level = level;
            }
            PlayerUpdate::Ability(ability, score) => self.abilities.set(ability, score)?,
            PlayerUpdate::Proficiency(skill, proficient) => self.proficiencies.set(skill, proficient),
            PlayerUpdate::MaxHp(hp) => self.max_hp = non_negative("max HP", hp)?,
            PlayerUpdate::Ac(ac) => self.ac = non_negative("AC", ac)?,
            PlayerUpdate::Speed(speed) => self.speed = non_negative("speed", speed)?,
            PlayerUpdate::InitiativeBonus(bonus) => self.initiative_bonus = bonus,
            PlayerUpdate::Notes(notes) => self.notes = notes,
            PlayerUpdate::RemoteProfileRef(reference) => self.remote_profile_ref = reference,
        }
        Ok(())
    }

    /// Fill in fields still at their defaults from a remote character sheet.
    /// Returns the names of the fields that changed.
    pub fn merge_details(&mut self, details: &CharacterDetails) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(name) = details.name.as_ref().filter(|_| self.display_name.is_empty()) {
            self.display_name = name.clone();
            changed.push("display_name");
        }
        if let Some(race) = details.race.as_ref().filter(|_| self.race.is_empty()) {
            self.race = race.clone();
            changed.push("race");
        }
        if let Some(class) = details.class.as_ref().filter(|_| self.class.is_empty()) {
            self.class = class.clone();
            changed.push("class");
        }
        if let Some(level) = details.level.filter(|l| *l > 1 && self.level == 1) {
            self.level = level;
            changed.push("level");
        }
        if let Some(abilities) = details.abilities.filter(|a| !a.is_default() && self.abilities.is_default()) {
            self.abilities = abilities;
            changed.push("abilities");
        }
        if let Some(hp) = details.max_hp.filter(|hp| *hp > 0 && self.max_hp == 0) {
            self.max_hp = hp;
            changed.push("max_hp");
        }
        if let Some(ac) = details.ac.filter(|ac| *ac != DEFAULT_AC && self.ac == DEFAULT_AC) {
            self.ac = ac;
            changed.push("ac");
        }
        if let Some(speed) = details.speed.filter(|v| *v != DEFAULT_SPEED && self.speed == DEFAULT_SPEED) {
            self.speed = speed;
            changed.push("speed");
        }
        if let Some(bonus) = details.initiative_modifier.filter(|b| *b != 0 && self.initiative_bonus == 0) {
            self.initiative_bonus = bonus;
            changed.push("initiative_bonus");
        }
        changed
    }
}

fn non_negative(field: &'static str, value: i32) -> Result<i32, ValidationError> {
    if value < 0 {
        return Err(ValidationError::OutOfRange { field, value, min: 0, max: i32::MAX });
    }
    Ok(value)
}

/// A single edit from the player table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerUpdate {
    DisplayName(String),
    PlayerName(String),
    Race(String),
    Class(String),
    Level(u32),
    Ability(Ability, i32),
    Proficiency(PassiveSkill, bool),
    MaxHp(i32),
    Ac(i32),
    Speed(i32),
    InitiativeBonus(i32),
    Notes(String),
    RemoteProfileRef(Option<String>),
}

//! Static 5e lookup data: challenge ratings, XP, ability and proficiency math.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Challenge rating to XP, in ascending CR order.
pub const CR_XP_TABLE: [(&str, u32); 34] = [
    ("0", 10),
    ("1/8", 25),
    ("1/4", 50),
    ("1/2", 100),
    ("1", 200),
    ("2", 450),
    ("3", 700),
    ("4", 1100),
    ("5", 1800),
    ("6", 2300),
    ("7", 2900),
    ("8", 3900),
    ("9", 5000),
    ("10", 5900),
    ("11", 7200),
    ("12", 8400),
    ("13", 10000),
    ("14", 11500),
    ("15", 13000),
    ("16", 15000),
    ("17", 18000),
    ("18", 20000),
    ("19", 22000),
    ("20", 25000),
    ("21", 33000),
    ("22", 41000),
    ("23", 50000),
    ("24", 62000),
    ("25", 75000),
    ("26", 90000),
    ("27", 105000),
    ("28", 120000),
    ("29", 135000),
    ("30", 155000),
];

/// XP awarded for a single creature of the given CR; unknown CRs are worth 0.
pub fn xp_for_cr(cr: &str) -> u32 {
    let cr = cr.trim();
    CR_XP_TABLE
        .iter()
        .find(|(label, _)| *label == cr)
        .map(|(_, xp)| *xp)
        .unwrap_or(0)
}

/// Numeric value of a CR string ("1/4" → 0.25). Unparseable input is 0.
pub fn parse_cr(cr: &str) -> f64 {
    let cr = cr.trim();
    let value = match cr.split_once('/') {
        Some((num, den)) => match (num.trim().parse::<f64>(), den.trim().parse::<f64>()) {
            (Ok(n), Ok(d)) if d != 0.0 => n / d,
            _ => 0.0,
        },
        None => cr.parse::<f64>().unwrap_or(0.0),
    };
    if value.is_finite() { value } else { 0.0 }
}

/// Encounter XP multiplier by number of monsters.
pub fn encounter_multiplier(monster_count: usize) -> f64 {
    match monster_count {
        0 | 1 => 1.0,
        2 => 1.5,
        3..=6 => 2.0,
        7..=10 => 2.5,
        11..=14 => 3.0,
        _ => 4.0,
    }
}

/// Highest CR whose XP value does not exceed `xp`. Anything below the CR 0
/// threshold still reports "0".
pub fn xp_to_nearest_cr(xp: u32) -> &'static str {
    CR_XP_TABLE
        .iter()
        .rev()
        .find(|(_, threshold)| *threshold <= xp)
        .map(|(label, _)| *label)
        .unwrap_or("0")
}

/// D&D ability modifier = floor((score - 10) / 2) for integer scores.
pub fn ability_mod(score: i32) -> i32 {
    // `div_euclid` with positive divisor matches mathematical floor division.
    (score - 10).div_euclid(2)
}

/// Proficiency bonus by character level; levels below 1 count as 1.
pub fn proficiency_bonus(level: u32) -> i32 {
    2 + (level.max(1) as i32 - 1) / 4
}

/// DC of the Constitution save a concentrating creature makes after damage.
pub fn concentration_dc(damage: i32) -> i32 {
    (damage / 2).max(10)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability { Str, Dex, Con, Int, Wis, Cha }

impl Ability {
    pub const ALL: [Ability; 6] = [
        Ability::Str,
        Ability::Dex,
        Ability::Con,
        Ability::Int,
        Ability::Wis,
        Ability::Cha,
    ];
}

pub const MIN_ABILITY_SCORE: i32 = 1;
pub const MAX_ABILITY_SCORE: i32 = 30;
pub const DEFAULT_ABILITY_SCORE: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    #[serde(rename = "str", default = "default_score")]
    pub str_: i32,
    #[serde(default = "default_score")]
    pub dex: i32,
    #[serde(default = "default_score")]
    pub con: i32,
    #[serde(rename = "int", default = "default_score")]
    pub int_: i32,
    #[serde(default = "default_score")]
    pub wis: i32,
    #[serde(default = "default_score")]
    pub cha: i32,
}

fn default_score() -> i32 {
    DEFAULT_ABILITY_SCORE
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self {
            str_: DEFAULT_ABILITY_SCORE,
            dex: DEFAULT_ABILITY_SCORE,
            con: DEFAULT_ABILITY_SCORE,
            int_: DEFAULT_ABILITY_SCORE,
            wis: DEFAULT_ABILITY_SCORE,
            cha: DEFAULT_ABILITY_SCORE,
        }
    }
}

impl AbilityScores {
    pub fn score(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Str => self.str_,
            Ability::Dex => self.dex,
            Ability::Con => self.con,
            Ability::Int => self.int_,
            Ability::Wis => self.wis,
            Ability::Cha => self.cha,
        }
    }

    pub fn mod_of(&self, ability: Ability) -> i32 {
        ability_mod(self.score(ability))
    }

    pub fn set(&mut self, ability: Ability, score: i32) -> Result<(), ValidationError> {
        if !(MIN_ABILITY_SCORE..=MAX_ABILITY_SCORE).contains(&score) {
            return Err(ValidationError::OutOfRange {
                field: "ability score",
                value: score,
                min: MIN_ABILITY_SCORE,
                max: MAX_ABILITY_SCORE,
            });
        }
        let slot = match ability {
            Ability::Str => &mut self.str_,
            Ability::Dex => &mut self.dex,
            Ability::Con => &mut self.con,
            Ability::Int => &mut self.int_,
            Ability::Wis => &mut self.wis,
            Ability::Cha => &mut self.cha,
        };
        *slot = score;
        Ok(())
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Skills with a passive score shown on the player table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassiveSkill { Perception, Insight, Investigation }

impl PassiveSkill {
    pub fn ability(self) -> Ability {
        match self {
            PassiveSkill::Perception | PassiveSkill::Insight => Ability::Wis,
            PassiveSkill::Investigation => Ability::Int,
        }
    }
}

/// 10 + ability modifier + proficiency bonus when proficient.
pub fn passive_score(score: i32, proficient: bool, level: u32) -> i32 {
    10 + ability_mod(score) + if proficient { proficiency_bonus(level) } else { 0 }
}

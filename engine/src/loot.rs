//! Treasure rolled from the summed CR of an encounter's monsters.
//!
//! Each category is gated by a CR band and rolled at most once.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::total_cr;
use crate::catalog::MonsterCatalog;
use crate::encounter::Encounter;
use crate::Dice;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinRoll {
    pub count: u32,
    pub sides: i32,
    #[serde(default = "one")]
    pub multiplier: i32,
    pub unit: String,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinTier {
    /// Exclusive upper CR bound; the last tier has none.
    #[serde(default)]
    pub below: Option<f64>,
    pub rolls: Vec<CoinRoll>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatedTable {
    pub min_cr: f64,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagicTable {
    pub min_cr: f64,
    pub double_at_cr: f64,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MundaneTable {
    pub chance_percent: i32,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootTables {
    pub coins: Vec<CoinTier>,
    pub gems: GatedTable,
    pub art: GatedTable,
    pub magic_items: MagicTable,
    pub mundane: MundaneTable,
}

impl LootTables {
    pub fn builtin() -> anyhow::Result<Self> {
        crate::content::builtin_loot_tables()
    }

    fn coin_tier(&self, cr: f64) -> Option<&CoinTier> {
        self.coins
            .iter()
            .find(|tier| tier.below.map_or(true, |bound| cr < bound))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Treasure {
    pub coins: Vec<(i32, String)>,
    pub gems: Option<(i32, String)>,
    pub art: Option<String>,
    pub magic_items: Vec<String>,
    pub mundane: Option<String>,
}

impl Treasure {
    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
            && self.gems.is_none()
            && self.art.is_none()
            && self.magic_items.is_empty()
            && self.mundane.is_none()
    }

    /// Text suitable for the encounter's treasure field.
    pub fn describe(&self) -> String {
        if self.is_empty() {
            return "No treasure".to_string();
        }
        let mut parts = Vec::new();
        if !self.coins.is_empty() {
            let coins: Vec<String> =
                self.coins.iter().map(|(amount, unit)| format!("{} {}", amount, unit)).collect();
            parts.push(format!("Coins: {}", coins.join(", ")));
        }
        if let Some((count, gem)) = &self.gems {
            parts.push(format!("Gems: {} x {}", count, gem));
        }
        if let Some(art) = &self.art {
            parts.push(format!("Art: {}", art));
        }
        if !self.magic_items.is_empty() {
            parts.push(format!("Magic items: {}", self.magic_items.join(", ")));
        }
        if let Some(item) = &self.mundane {
            parts.push(format!("Gear: {}", item));
        }
        parts.join("; ")
    }
}

fn pick<'a>(dice: &mut Dice, items: &'a [String]) -> Option<&'a String> {
    dice.pick(items.len()).and_then(|i| items.get(i))
}

/// Roll treasure for a summed CR.
pub fn roll_treasure(cr: f64, tables: &LootTables, dice: &mut Dice) -> Treasure {
    let mut treasure = Treasure::default();

    if let Some(tier) = tables.coin_tier(cr) {
        treasure.coins = tier
            .rolls
            .iter()
            .map(|r| (dice.roll_many(r.count, r.sides) * r.multiplier, r.unit.clone()))
            .collect();
    }

    if cr >= tables.gems.min_cr {
        let count = dice.roll(4);
        treasure.gems = pick(dice, &tables.gems.items).map(|gem| (count, gem.clone()));
    }

    if cr >= tables.art.min_cr {
        treasure.art = pick(dice, &tables.art.items).cloned();
    }

    if cr >= tables.magic_items.min_cr {
        let picks = if cr >= tables.magic_items.double_at_cr { 2 } else { 1 };
        treasure.magic_items = (0..picks)
            .filter_map(|_| pick(dice, &tables.magic_items.items).cloned())
            .collect();
    }

    if dice.roll(100) <= tables.mundane.chance_percent {
        treasure.mundane = pick(dice, &tables.mundane.items).cloned();
    }

    debug!(cr, treasure = %treasure.describe(), "rolled treasure");
    treasure
}

pub fn generate_loot(
    encounter: &Encounter,
    catalog: &MonsterCatalog,
    tables: &LootTables,
    dice: &mut Dice,
) -> Treasure {
    roll_treasure(total_cr(encounter, catalog), tables, dice)
}

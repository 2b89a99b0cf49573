use anyhow::{Context, Result};
use indexmap::IndexMap;

use crate::catalog::MonsterEntry;
use crate::loot::LootTables;

pub fn builtin_monsters_json() -> &'static str {
    include_str!("../content/monsters.json")
}

pub fn builtin_loot_yaml() -> &'static str {
    include_str!("../content/loot.yaml")
}

pub fn parse_monsters(text: &str) -> Result<IndexMap<String, MonsterEntry>> {
    serde_json::from_str(text).context("failed to parse monster catalog JSON")
}

pub fn parse_loot_tables(text: &str) -> Result<LootTables> {
    serde_yaml::from_str(text).context("failed to parse loot tables YAML")
}

pub fn builtin_monsters() -> Result<IndexMap<String, MonsterEntry>> {
    parse_monsters(builtin_monsters_json()).context("built-in monster catalog is corrupt")
}

pub fn builtin_loot_tables() -> Result<LootTables> {
    parse_loot_tables(builtin_loot_yaml()).context("built-in loot tables are corrupt")
}

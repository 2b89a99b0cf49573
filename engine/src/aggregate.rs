//! Encounter-level derived values: XP, CR and the summary line.

use crate::catalog::MonsterCatalog;
use crate::encounter::{Encounter, EncounterState};
use crate::rules::{encounter_multiplier, parse_cr, xp_for_cr, xp_to_nearest_cr};

/// Monster XP with the group multiplier applied, ignoring any custom CR.
/// Monsters whose CR cannot be resolved count toward the group size but add
/// no XP.
pub fn auto_xp(encounter: &Encounter, catalog: &MonsterCatalog) -> u32 {
    let mut count = 0usize;
    let mut base = 0u32;
    for monster in encounter.monsters() {
        count += 1;
        base += monster.resolve_cr(catalog).map(|cr| xp_for_cr(&cr)).unwrap_or(0);
    }
    (base as f64 * encounter_multiplier(count)).round() as u32
}

/// A custom CR is authoritative: its XP is returned as-is.
pub fn total_xp(encounter: &Encounter, catalog: &MonsterCatalog) -> u32 {
    match encounter.custom_cr() {
        Some(cr) => xp_for_cr(cr),
        None => auto_xp(encounter, catalog),
    }
}

pub fn auto_cr(encounter: &Encounter, catalog: &MonsterCatalog) -> &'static str {
    xp_to_nearest_cr(auto_xp(encounter, catalog))
}

pub fn display_cr(encounter: &Encounter, catalog: &MonsterCatalog) -> String {
    match encounter.custom_cr() {
        Some(cr) => cr.to_string(),
        None => auto_cr(encounter, catalog).to_string(),
    }
}

/// Plain sum of monster CRs, no multiplier. Drives the loot bands.
pub fn total_cr(encounter: &Encounter, catalog: &MonsterCatalog) -> f64 {
    encounter
        .monsters()
        .filter_map(|m| m.resolve_cr(catalog))
        .map(|cr| parse_cr(&cr))
        .sum()
}

/// One-line status, e.g. `Ambush [in progress, round 2] XP 150 CR 1/2`.
pub fn summary(encounter: &Encounter, catalog: &MonsterCatalog) -> String {
    let state = match encounter.state {
        EncounterState::Unstarted => encounter.state.to_string(),
        _ => format!("{}, round {}", encounter.state, encounter.current_round),
    };
    let cr = match encounter.custom_cr() {
        Some(custom) => format!("{} (default {})", custom, auto_cr(encounter, catalog)),
        None => auto_cr(encounter, catalog).to_string(),
    };
    format!(
        "{} [{}] XP {} CR {}",
        encounter.name,
        state,
        total_xp(encounter, catalog),
        cr
    )
}

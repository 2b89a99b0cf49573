use dm_engine::aggregate::{auto_cr, auto_xp, display_cr, summary, total_cr, total_xp};
use dm_engine::catalog::MonsterCatalog;
use dm_engine::combatant::Combatant;
use dm_engine::encounter::Encounter;
use dm_engine::player::Player;

fn with_cr(name: &str, cr: &str) -> Combatant {
    let mut c = Combatant::monster(name);
    c.cr = cr.to_string();
    c
}

fn goblins() -> Encounter {
    let mut enc = Encounter::new("Ambush", "Chapter 1", &[]);
    enc.combatants.push(with_cr("Goblin 1", "1/4"));
    enc.combatants.push(with_cr("Goblin 2", "1/4"));
    enc
}

#[test]
fn two_goblins_are_worth_150() {
    let enc = goblins();
    assert_eq!(total_xp(&enc, &MonsterCatalog::empty()), 150);
}

#[test]
fn players_do_not_count_toward_xp() {
    let players = vec![Player::new("Fighter"), Player::new("Cleric")];
    let mut enc = Encounter::new("Ambush", "Chapter 1", &players);
    enc.combatants.push(with_cr("Goblin", "1/4"));
    assert_eq!(total_xp(&enc, &MonsterCatalog::empty()), 50);
}

#[test]
fn catalog_fills_missing_cr_by_base_name() {
    let catalog = MonsterCatalog::builtin().unwrap();
    let mut enc = Encounter::new("Ambush", "Chapter 1", &[]);
    enc.combatants.push(Combatant::monster("Goblin 1"));
    enc.combatants.push(Combatant::monster("goblin 2"));
    assert_eq!(total_xp(&enc, &catalog), 150);
}

#[test]
fn catalog_fills_missing_cr_by_reference() {
    let catalog = MonsterCatalog::builtin().unwrap();
    let mut enc = Encounter::new("Ambush", "Chapter 1", &[]);
    let mut odd = Combatant::monster("Sneaky Gob");
    odd.remote_ref = Some("https://www.dndbeyond.com/monsters/4775864-goblin".into());
    enc.combatants.push(odd);
    assert_eq!(total_xp(&enc, &catalog), 50);
}

#[test]
fn stored_cr_beats_catalog() {
    let catalog = MonsterCatalog::builtin().unwrap();
    let mut enc = Encounter::new("Ambush", "Chapter 1", &[]);
    enc.combatants.push(with_cr("Goblin", "1"));
    assert_eq!(total_xp(&enc, &catalog), 200);
}

#[test]
fn unresolved_monsters_still_raise_the_multiplier() {
    let mut enc = goblins();
    enc.combatants.push(Combatant::monster("Nameless Horror"));
    // 100 base XP, three monsters
    assert_eq!(auto_xp(&enc, &MonsterCatalog::empty()), 200);
}

#[test]
fn custom_cr_is_authoritative() {
    let catalog = MonsterCatalog::empty();
    let mut enc = goblins();
    enc.set_custom_cr(Some(" 3 ".into()));
    assert_eq!(total_xp(&enc, &catalog), 700);
    assert_eq!(display_cr(&enc, &catalog), "3");
    assert_eq!(auto_cr(&enc, &catalog), "1/2");

    enc.set_custom_cr(Some("   ".into()));
    assert_eq!(enc.custom_cr, None);
    assert_eq!(display_cr(&enc, &catalog), "1/2");
}

#[test]
fn total_cr_sums_without_multiplier() {
    let catalog = MonsterCatalog::builtin().unwrap();
    let mut enc = goblins();
    enc.combatants.push(Combatant::monster("Ogre"));
    assert_eq!(total_cr(&enc, &catalog), 2.5);
}

#[test]
fn empty_encounter_is_cr_zero() {
    let enc = Encounter::new("Nothing", "Chapter 1", &[]);
    let catalog = MonsterCatalog::empty();
    assert_eq!(total_xp(&enc, &catalog), 0);
    assert_eq!(display_cr(&enc, &catalog), "0");
    assert_eq!(total_cr(&enc, &catalog), 0.0);
}

#[test]
fn summary_lines() {
    let catalog = MonsterCatalog::empty();
    let mut enc = goblins();
    insta::assert_snapshot!(summary(&enc, &catalog), @"Ambush [not started] XP 150 CR 1/2");

    let _ = enc.start(&[]);
    let _ = enc.next_turn();
    let _ = enc.next_turn();
    insta::assert_snapshot!(summary(&enc, &catalog), @"Ambush [in progress, round 2] XP 150 CR 1/2");

    enc.set_custom_cr(Some("1".into()));
    let _ = enc.end();
    insta::assert_snapshot!(summary(&enc, &catalog), @"Ambush [complete, round 2] XP 200 CR 1 (default 1/2)");
}

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn console(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dm-console").unwrap();
    cmd.arg("--data-dir").arg(dir);
    cmd
}

fn ambush_with_goblins() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    console(dir.path()).args(["new", "Lost Mine"]).assert().success();
    console(dir.path())
        .args(["add-encounter", "Lost Mine", "Ambush"])
        .assert()
        .success();
    console(dir.path())
        .args(["add-monster", "Lost Mine", "Ambush", "Goblin", "--count", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ADD][Ambush] 2 x Goblin"));
    dir
}

#[test]
fn new_and_list() {
    let dir = tempfile::tempdir().unwrap();
    console(dir.path())
        .args(["new", "Lost Mine"])
        .assert()
        .success()
        .stdout(predicate::str::contains("created adventure Lost Mine"));
    assert!(dir.path().join("Lost Mine.json").exists());

    console(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::eq("Lost Mine\n"));

    console(dir.path())
        .args(["new", "Lost Mine"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn monsters_get_catalog_stats_and_xp() {
    let dir = ambush_with_goblins();
    console(dir.path())
        .args(["xp", "Lost Mine", "ambush"])
        .assert()
        .success()
        .stdout(predicate::eq("Ambush [not started] XP 150 CR 1/2\n"));

    console(dir.path())
        .args(["show", "Lost Mine"])
        .assert()
        .success()
        .stdout(predicate::str::contains("== Chapter 1 =="))
        .stdout(predicate::str::contains("Goblin 2"))
        .stdout(predicate::str::contains("HP 7/7  AC 15"));
}

#[test]
fn xp_as_json() {
    let dir = ambush_with_goblins();
    let out = console(dir.path())
        .args(["xp", "Lost Mine", "Ambush", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["xp"], 150);
    assert_eq!(report["cr"], "1/2");
    assert_eq!(report["total_cr"], 0.5);
}

#[test]
fn unknown_monsters_ask_for_manual_stats() {
    let dir = ambush_with_goblins();
    console(dir.path())
        .args(["add-monster", "Lost Mine", "Ambush", "Nameless Horror"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[STATS][Nameless Horror] stats unavailable, enter manually",
        ));
}

#[test]
fn turn_flow_and_illegal_transitions() {
    let dir = ambush_with_goblins();
    console(dir.path())
        .args(["add-player", "Lost Mine", "Fighter", "--hp", "20", "--ac", "16"])
        .assert()
        .success();
    console(dir.path())
        .args(["refresh-players", "Lost Mine", "Ambush"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fighter"));

    console(dir.path())
        .args(["next", "Lost Mine", "Ambush"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "cannot advance the turn while the encounter is not started",
        ));

    console(dir.path())
        .args(["start", "Lost Mine", "Ambush"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ROUND][Ambush] round 1 begins"));
    console(dir.path())
        .args(["start", "Lost Mine", "Ambush"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot start while the encounter is in progress"));

    for _ in 0..3 {
        console(dir.path()).args(["next", "Lost Mine", "Ambush"]).assert().success();
    }
    console(dir.path())
        .args(["xp", "Lost Mine", "Ambush"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[in progress, round 2]"));

    console(dir.path())
        .args(["end", "Lost Mine", "Ambush"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[END][Ambush] after 2 round(s)"));
}

#[test]
fn damage_and_heal_by_name() {
    let dir = ambush_with_goblins();
    console(dir.path())
        .args(["damage", "Lost Mine", "Ambush", "goblin 1", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[DMG][Goblin 1] 7 → 2 (−5)"));
    console(dir.path())
        .args(["heal", "Lost Mine", "Ambush", "Goblin 1", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[HEAL][Goblin 1] +5 HP (2 → 7)"));
    console(dir.path())
        .args(["damage", "Lost Mine", "Ambush", "Bugbear", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no combatant named"));
}

#[test]
fn loot_is_saved_with_the_encounter() {
    let dir = ambush_with_goblins();
    console(dir.path())
        .args(["--seed", "7", "loot", "Lost Mine", "Ambush"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[LOOT][Ambush] Coins:"));
    console(dir.path())
        .args(["show", "Lost Mine"])
        .assert()
        .success()
        .stdout(predicate::str::contains("treasure: Coins:"));
}

#[test]
fn files_with_a_byte_order_mark_load_and_are_repaired() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Old.json");
    fs::write(&path, "\u{feff}{\"name\": \"Old\"}").unwrap();

    console(dir.path())
        .args(["show", "Old"])
        .assert()
        .success()
        .stdout(predicate::str::contains("== Chapter 1 =="));

    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["chapters"][0], "Chapter 1");
}

#[test]
fn missing_adventures_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    console(dir.path())
        .args(["show", "Nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot open adventure"));
}

#[test]
fn seeded_rolls_repeat() {
    let dir = tempfile::tempdir().unwrap();
    let roll = || {
        console(dir.path())
            .args(["--seed", "42", "roll", "--adv", "advantage", "--rolls", "4"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone()
    };
    let first = roll();
    assert_eq!(first, roll());
    let text = String::from_utf8(first).unwrap();
    assert_eq!(text.lines().count(), 4);
    assert!(text.lines().all(|l| (1..=20).contains(&l.parse::<i32>().unwrap())));
}

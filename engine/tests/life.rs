use dm_engine::combatant::Combatant;
use dm_engine::life::*;
use proptest::prelude::*;

fn noop_log(_: String) {}

fn downed(max_hp: i32, successes: u8, failures: u8) -> Vitals {
    Vitals {
        current_hp: 0,
        max_hp,
        temp_hp: 0,
        death_saves: DeathSaves { successes, failures },
    }
}

#[test]
fn temp_hp_soaks_damage_first() {
    let mut v = Vitals::new(20);
    v.grant_temp(5);
    let out = apply_damage("Hero", &mut v, true, false, 8, noop_log);
    assert_eq!(out.absorbed, 5);
    assert_eq!(out.applied, 3);
    assert_eq!(v.temp_hp, 0);
    assert_eq!(v.current_hp, 17);
}

#[test]
fn temp_hp_does_not_stack() {
    let mut v = Vitals::new(20);
    v.grant_temp(8);
    v.grant_temp(5);
    assert_eq!(v.temp_hp, 8);
    v.grant_temp(10);
    assert_eq!(v.temp_hp, 10);
}

#[test]
fn players_floor_at_zero_monsters_do_not() {
    let mut player = Vitals::new(10);
    let out = apply_damage("Hero", &mut player, true, false, 25, noop_log);
    assert_eq!(player.current_hp, 0);
    assert!(out.dropped);
    assert!(player.is_down());

    let mut monster = Vitals::new(10);
    apply_damage("Goblin", &mut monster, false, false, 25, noop_log);
    assert_eq!(monster.current_hp, -15);
}

#[test]
fn huge_hits_and_heals_saturate() {
    let mut goblin = Combatant::monster("Goblin");
    goblin.vitals = Vitals::new(10);
    goblin.take_damage("Goblin", 20, noop_log);
    assert_eq!(goblin.vitals.current_hp, -10);
    assert!(goblin.vitals.is_down());

    let out = goblin.take_damage("Goblin", i32::MAX, noop_log);
    assert_eq!(out.hp_after, i32::MIN);
    assert_eq!(goblin.vitals.current_hp, i32::MIN);
    assert_eq!(goblin.dmg_accumulated, i32::MAX);

    let restored = goblin.receive_healing("Goblin", i32::MAX, noop_log);
    assert_eq!(goblin.vitals.current_hp, -1);
    assert_eq!(restored, i32::MAX);
    assert_eq!(goblin.heal_accumulated, i32::MAX);
    assert!(goblin.vitals.is_down());
}

#[test]
fn huge_heals_stop_at_max() {
    let mut orc = Combatant::monster("Orc");
    orc.vitals = Vitals::new(10);
    orc.vitals.current_hp = 7;
    orc.heal_accumulated = i32::MAX - 1;
    let restored = orc.receive_healing("Orc", i32::MAX, noop_log);
    assert_eq!(restored, 3);
    assert_eq!(orc.vitals.current_hp, 10);
    assert_eq!(orc.heal_accumulated, i32::MAX);
    assert!(!orc.vitals.is_down());
}

#[test]
fn non_positive_damage_is_ignored() {
    let mut v = Vitals::new(10);
    let out = apply_damage("Hero", &mut v, true, true, 0, noop_log);
    assert_eq!(v.current_hp, 10);
    assert_eq!(out.concentration_dc, None);
}

#[test]
fn concentration_dc_uses_the_whole_hit() {
    let mut v = Vitals::new(40);
    v.grant_temp(20);
    let out = apply_damage("Cleric", &mut v, true, true, 30, noop_log);
    assert_eq!(out.concentration_dc, Some(15));
    let out = apply_damage("Cleric", &mut v, true, false, 30, noop_log);
    assert_eq!(out.concentration_dc, None);
}

#[test]
fn healing_caps_at_max() {
    let mut v = Vitals::new(12);
    v.current_hp = 9;
    let restored = heal("Hero", &mut v, 10, noop_log);
    assert_eq!(restored, 3);
    assert_eq!(v.current_hp, 12);
}

#[test]
fn healing_resets_death_saves() {
    let mut v = downed(12, 2, 2);
    heal("Hero", &mut v, 6, noop_log);
    assert_eq!(v.current_hp, 6);
    assert!(v.death_saves.is_clear());
}

#[test]
fn setting_hp_above_zero_resets_death_saves() {
    let mut v = downed(12, 1, 2);
    v.set_current(50, true);
    assert_eq!(v.current_hp, 12);
    assert!(v.death_saves.is_clear());
}

#[test]
fn third_success_stabilizes_at_one_hp() {
    let mut v = downed(10, 2, 1);
    let outcome = record_death_save("Hero", &mut v, DeathSaveResult::Success, noop_log);
    assert_eq!(outcome, DeathSaveOutcome::Stabilized);
    assert_eq!(v.current_hp, 1);
    assert_eq!(v.death_saves, DeathSaves { successes: 0, failures: 0 });
}

#[test]
fn third_failure_reports_death_without_touching_hp() {
    let mut v = downed(10, 1, 2);
    v.current_hp = -3;
    let outcome = record_death_save("Hero", &mut v, DeathSaveResult::Failure, noop_log);
    assert_eq!(outcome, DeathSaveOutcome::Died);
    assert_eq!(v.current_hp, -3);
    assert!(v.is_dead());
}

#[test]
fn nat20_wakes_to_one_hp() {
    let mut v = downed(10, 0, 2);
    let (roll, outcome) = roll_death_save("Hero", &mut v, || 20, noop_log);
    assert_eq!(roll, 20);
    assert_eq!(outcome, DeathSaveOutcome::Revived);
    assert_eq!(v.current_hp, 1);
    assert!(v.death_saves.is_clear());
}

#[test]
fn nat1_counts_two_failures_and_can_kill() {
    let mut v = downed(10, 0, 1);
    let (_, outcome) = roll_death_save("Hero", &mut v, || 1, noop_log);
    assert_eq!(outcome, DeathSaveOutcome::Died);
    assert_eq!(v.death_saves.failures, 3);
}

#[test]
fn ordinary_rolls_tally() {
    let mut v = downed(10, 0, 0);
    let (_, outcome) = roll_death_save("Hero", &mut v, || 10, noop_log);
    assert_eq!(outcome, DeathSaveOutcome::Pending(DeathSaves { successes: 1, failures: 0 }));
    let (_, outcome) = roll_death_save("Hero", &mut v, || 9, noop_log);
    assert_eq!(outcome, DeathSaveOutcome::Pending(DeathSaves { successes: 1, failures: 1 }));
}

#[test]
fn conscious_creatures_skip_death_saves() {
    let mut v = Vitals::new(10);
    let (roll, outcome) = roll_death_save("Hero", &mut v, || panic!("no roll expected"), noop_log);
    assert_eq!(roll, 0);
    assert_eq!(outcome, DeathSaveOutcome::NotDying);
}

#[test]
fn log_lines_are_tagged() {
    let mut lines = Vec::new();
    let mut v = Vitals::new(10);
    apply_damage("Goblin 2", &mut v, false, false, 4, |l| lines.push(l));
    assert_eq!(lines, vec!["[DMG][Goblin 2] 10 → 6 (−4)".to_string()]);
}

#[derive(Debug, Clone)]
enum Step {
    Damage(i32),
    Heal(i32),
    Temp(i32),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0i32..40).prop_map(Step::Damage),
        (0i32..40).prop_map(Step::Heal),
        (0i32..15).prop_map(Step::Temp),
    ]
}

proptest! {
    #[test]
    fn player_hp_stays_in_bounds(max in 0i32..60, steps in prop::collection::vec(step(), 0..40)) {
        let mut v = Vitals::new(max);
        for s in steps {
            match s {
                Step::Damage(d) => {
                    let temp_before = v.temp_hp;
                    let out = apply_damage("P", &mut v, true, false, d, noop_log);
                    prop_assert_eq!(out.absorbed, d.min(temp_before).max(0));
                }
                Step::Heal(h) => {
                    heal("P", &mut v, h, noop_log);
                }
                Step::Temp(t) => v.grant_temp(t),
            }
            prop_assert!(v.current_hp >= 0);
            prop_assert!(v.current_hp <= v.max_hp);
            prop_assert!(v.temp_hp >= 0);
        }
    }
}

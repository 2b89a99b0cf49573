use dm_engine::adventure::{validate_pin, Adventure, DEFAULT_CHAPTER};
use dm_engine::{Player, ValidationError};

#[test]
fn new_adventures_have_one_chapter() {
    let adv = Adventure::new("Lost Mine");
    assert_eq!(adv.chapters, vec![DEFAULT_CHAPTER]);
    assert_eq!(adv.first_chapter(), "Chapter 1");
}

#[test]
fn chapter_names_are_unique_and_non_empty() {
    let mut adv = Adventure::new("Lost Mine");
    assert_eq!(adv.add_chapter("  Goblin Arrows "), Ok("Goblin Arrows".to_string()));
    assert_eq!(
        adv.add_chapter("Goblin Arrows"),
        Err(ValidationError::DuplicateChapter("Goblin Arrows".into()))
    );
    assert_eq!(adv.add_chapter("   "), Err(ValidationError::EmptyName));
    assert_eq!(adv.chapters.len(), 2);
}

#[test]
fn deleting_a_chapter_cascades() {
    let mut adv = Adventure::new("Lost Mine");
    adv.add_chapter("Phandalin").unwrap();
    adv.create_encounter("Ambush", "Chapter 1").unwrap();
    adv.create_encounter("Redbrands", "Phandalin").unwrap();
    adv.create_encounter("Manor", "Phandalin").unwrap();
    adv.set_chapter_notes("Phandalin", "Sildar waits at the inn".into()).unwrap();

    assert_eq!(adv.delete_chapter("Phandalin"), Ok(2));
    assert_eq!(adv.chapters, vec!["Chapter 1"]);
    assert_eq!(adv.encounters.len(), 1);
    assert_eq!(adv.chapter_notes("Phandalin"), "");
}

#[test]
fn the_last_chapter_cannot_be_deleted() {
    let mut adv = Adventure::new("Lost Mine");
    adv.create_encounter("Ambush", "Chapter 1").unwrap();
    assert_eq!(adv.delete_chapter("Chapter 1"), Err(ValidationError::LastChapter));
    assert_eq!(adv.encounters.len(), 1);
    assert_eq!(
        adv.delete_chapter("Nowhere"),
        Err(ValidationError::UnknownChapter("Nowhere".into()))
    );
}

#[test]
fn renaming_a_chapter_moves_its_encounters_and_notes() {
    let mut adv = Adventure::new("Lost Mine");
    let id = adv.create_encounter("Ambush", "Chapter 1").unwrap();
    adv.set_chapter_notes("Chapter 1", "Cart on the road".into()).unwrap();
    adv.rename_chapter("Chapter 1", "Goblin Arrows").unwrap();

    assert_eq!(adv.chapters, vec!["Goblin Arrows"]);
    assert_eq!(adv.encounter(id).unwrap().chapter, "Goblin Arrows");
    assert_eq!(adv.chapter_notes("Goblin Arrows"), "Cart on the road");
    assert_eq!(adv.encounters_in("Goblin Arrows").count(), 1);
}

#[test]
fn encounters_need_an_existing_chapter() {
    let mut adv = Adventure::new("Lost Mine");
    assert_eq!(
        adv.create_encounter("Ambush", "Chapter 9"),
        Err(ValidationError::UnknownChapter("Chapter 9".into()))
    );
    assert!(adv.encounters.is_empty());
}

#[test]
fn new_encounters_include_the_party() {
    let mut adv = Adventure::new("Lost Mine");
    adv.add_player(Player::new("Fighter"));
    adv.add_player(Player::new("Wizard"));
    let id = adv.create_encounter("Ambush", "Chapter 1").unwrap();
    assert_eq!(adv.encounter(id).unwrap().combatants.len(), 2);
}

#[test]
fn repair_restores_chapters_and_rehomes_orphans() {
    let json = r#"{
        "name": "Old Save",
        "encounters": [
            {"id": "6f1c1b50-6d0a-4a53-9a43-6b3b1e0b1e11", "name": "Ambush", "chapter": "Gone"}
        ]
    }"#;
    let mut adv: Adventure = serde_json::from_str(json).unwrap();
    let report = adv.repair();
    assert!(report.added_default_chapter);
    assert_eq!(report.reassigned_encounters, 1);
    assert_eq!(adv.chapters, vec!["Chapter 1"]);
    assert_eq!(adv.encounters[0].chapter, "Chapter 1");
    assert!(adv.encounters[0].is_minimized());
    assert!(adv.repair().is_clean());
}

#[test]
fn removing_a_player_leaves_unknown_rows() {
    let mut adv = Adventure::new("Lost Mine");
    let id = adv.add_player(Player::new("Fighter"));
    let enc = adv.create_encounter("Ambush", "Chapter 1").unwrap();
    adv.remove_player(&id).unwrap();
    let row = &adv.encounter(enc).unwrap().combatants[0];
    assert_eq!(row.display_name(&adv.players), "Unknown");
    assert_eq!(adv.remove_player(&id), Err(ValidationError::UnknownPlayer));
}

#[test]
fn pins_are_four_digits() {
    assert!(validate_pin("0420").is_ok());
    assert_eq!(validate_pin("420"), Err(ValidationError::InvalidPin));
    assert_eq!(validate_pin("04200"), Err(ValidationError::InvalidPin));
    assert_eq!(validate_pin("12a4"), Err(ValidationError::InvalidPin));
    assert_eq!(validate_pin("١٢٣٤"), Err(ValidationError::InvalidPin));
}

#[test]
fn changing_the_pin_bumps_its_version() {
    let mut adv = Adventure::new("Lost Mine");
    assert!(adv.pin_matches(None));
    adv.set_pin(Some("1234")).unwrap();
    assert_eq!(adv.pin_version, 1);
    assert!(adv.pin_matches(Some("1234")));
    assert!(!adv.pin_matches(Some("9999")));
    assert!(adv.set_pin(Some("12")).is_err());
    assert_eq!(adv.pin_version, 1);
    adv.set_pin(None).unwrap();
    assert_eq!(adv.pin_version, 2);
    assert!(adv.pin_matches(None));
}

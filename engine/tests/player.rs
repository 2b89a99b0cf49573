use dm_engine::player::{PlayerUpdate, DEFAULT_AC};
use dm_engine::ports::CharacterDetails;
use dm_engine::rules::{AbilityScores, PassiveSkill};
use dm_engine::{Ability, Player, PlayerId, ValidationError};

#[test]
fn passives_follow_wisdom_intelligence_and_proficiency() {
    let mut rogue = Player::new("Rogue");
    rogue.level = 5;
    rogue.abilities.wis = 14;
    rogue.abilities.int_ = 8;
    rogue.proficiencies.perception = true;

    assert_eq!(rogue.proficiency_bonus(), 3);
    assert_eq!(rogue.passive(PassiveSkill::Perception), 15);
    assert_eq!(rogue.passive(PassiveSkill::Insight), 12);
    assert_eq!(rogue.passive(PassiveSkill::Investigation), 9);
}

#[test]
fn edits_are_validated() {
    let mut p = Player::new("Bard");
    assert!(p.apply(PlayerUpdate::Ability(Ability::Cha, 18)).is_ok());
    assert_eq!(p.ability_mod(Ability::Cha), 4);

    assert_eq!(
        p.apply(PlayerUpdate::Ability(Ability::Cha, 31)),
        Err(ValidationError::OutOfRange { field: "ability score", value: 31, min: 1, max: 30 })
    );
    assert!(p.apply(PlayerUpdate::Level(0)).is_err());
    assert!(p.apply(PlayerUpdate::MaxHp(-1)).is_err());
    assert!(p.apply(PlayerUpdate::Ac(-3)).is_err());
    assert_eq!(p.abilities.cha, 18);
    assert_eq!(p.level, 1);
    assert_eq!(p.ac, DEFAULT_AC);

    p.apply(PlayerUpdate::Proficiency(PassiveSkill::Insight, true)).unwrap();
    assert_eq!(p.passive(PassiveSkill::Insight), 12);
}

#[test]
fn profile_links_give_stable_ids() {
    let a = Player::from_profile("https://www.dndbeyond.com/profile/someone/characters/12345/");
    let b = Player::from_profile("https://www.dndbeyond.com/characters/12345");
    assert_eq!(a.id, PlayerId("character-12345".into()));
    assert_eq!(a.id, b.id);
    assert!(a.display_name.is_empty());
    assert!(Player::new("X").id.0.starts_with("player-"));
}

#[test]
fn remote_sheet_fills_only_defaults() {
    let mut p = Player::new("Aria");
    p.max_hp = 30;
    let details = CharacterDetails {
        name: Some("Aria Moonwhisper".into()),
        race: Some("Elf".into()),
        class: Some("Wizard".into()),
        level: Some(4),
        abilities: Some(AbilityScores { int_: 17, ..AbilityScores::default() }),
        max_hp: Some(22),
        ac: Some(10),
        speed: Some(35),
        initiative_modifier: Some(2),
        avatar_url: None,
    };
    let changed = p.merge_details(&details);
    assert_eq!(
        changed,
        vec!["race", "class", "level", "abilities", "speed", "initiative_bonus"]
    );
    assert_eq!(p.display_name, "Aria");
    assert_eq!(p.max_hp, 30);
    assert_eq!(p.abilities.int_, 17);

    assert!(p.merge_details(&details).is_empty());
}

#[test]
fn players_deserialize_with_defaults() {
    let p: Player = serde_json::from_str(r#"{"id": "character-7", "display_name": "Tess"}"#).unwrap();
    assert_eq!(p.level, 1);
    assert_eq!(p.ac, 10);
    assert_eq!(p.speed, 30);
    assert_eq!(p.abilities, AbilityScores::default());
}

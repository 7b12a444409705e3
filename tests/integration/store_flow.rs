//! Integration tests for the entity store
//!
//! Adventures are loaded eagerly with their ordered quests and bundle;
//! deleting cascades through the link table.

use super::common::fixtures::{login_quests, map, TestDb};
use quest::{Bundle, Quest};

#[test]
fn test_adventure_loads_quests_in_order() {
    let db = TestDb::new();
    let adventure = db.adventure("api", login_quests(), &[("host", "localhost")]);

    let names: Vec<&str> = adventure.quests.iter().map(|q| q.name.as_str()).collect();
    assert_eq!(names, vec!["login", "me"]);
    assert_eq!(adventure.bundle.items, map(&[("host", "localhost")]));

    let by_adventure = db.quests.get_by_adventure(adventure.id).unwrap();
    assert_eq!(by_adventure, adventure.quests);
}

#[test]
fn test_same_quest_name_in_two_adventures() {
    let db = TestDb::new();
    let first = db.adventure("first", vec![Quest::new("ping", "GET", "http://a/")], &[]);
    let second = db.adventure("second", vec![Quest::new("ping", "GET", "http://b/")], &[]);

    let a = db.quests.get_by_name(first.id, "ping").unwrap().unwrap();
    let b = db.quests.get_by_name(second.id, "ping").unwrap().unwrap();
    assert_eq!(a.url, "http://a/");
    assert_eq!(b.url, "http://b/");
    assert_eq!(db.quests.get_all().unwrap().len(), 2);
}

#[test]
fn test_bundle_replace_and_update() {
    let db = TestDb::new();
    let adventure = db.adventure("api", Vec::new(), &[("a", "1")]);

    let replacement = Bundle::with_items(map(&[("b", "2")]));
    db.bundles.create(adventure.id, &replacement).unwrap();
    let mut bundle = db.bundles.get_by_adventure(adventure.id).unwrap().unwrap();
    assert_eq!(bundle, replacement);

    bundle.merge(map(&[("c", "3")]));
    db.bundles.update(&bundle).unwrap();
    let loaded = db.adventures.get_by_id(adventure.id).unwrap().unwrap();
    assert_eq!(loaded.bundle.items, map(&[("b", "2"), ("c", "3")]));
}

#[test]
fn test_spell_update_round_trips() {
    let db = TestDb::new();
    let adventure = db.adventure("api", login_quests(), &[]);

    let mut quest = adventure.quest("me").unwrap().clone();
    quest.spell = Some("[spell]\nseen = \"yes\"\n".to_string());
    db.quests.update(&quest).unwrap();

    let loaded = db.quests.get_by_id(quest.id).unwrap().unwrap();
    assert_eq!(loaded.spell, quest.spell);
}

#[test]
fn test_delete_adventure_and_quest() {
    let db = TestDb::new();
    let adventure = db.adventure("api", login_quests(), &[]);

    let login = adventure.quest("login").unwrap();
    db.quests.delete(login.id).unwrap();
    let reloaded = db.adventures.get_by_name("api").unwrap().unwrap();
    assert_eq!(reloaded.quests.len(), 1);

    db.adventures.delete(adventure.id).unwrap();
    assert!(db.adventures.get_by_name("api").unwrap().is_none());
    assert!(db.bundles.get_by_adventure(adventure.id).unwrap().is_none());
}

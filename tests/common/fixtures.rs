//! Database and adventure fixtures

use std::collections::BTreeMap;

use quest::{Adventure, AdventureStore, Bundle, BundleStore, Database, Quest, QuestStore};
use tempfile::TempDir;

/// A database in a temporary directory with all stores attached
pub struct TestDb {
    pub db: Database,
    pub quests: QuestStore,
    pub adventures: AdventureStore,
    pub bundles: BundleStore,
    _dir: TempDir,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open(dir.path().join("quest.db")).expect("Failed to open database");
        Self {
            quests: QuestStore::new(db.connection()),
            adventures: AdventureStore::new(db.connection()),
            bundles: BundleStore::new(db.connection()),
            db,
            _dir: dir,
        }
    }

    /// Persist an adventure with the given quests and bundle items
    pub fn adventure(&self, name: &str, quests: Vec<Quest>, items: &[(&str, &str)]) -> Adventure {
        let mut adventure = Adventure::new(name);
        adventure.bundle = Bundle::with_items(map(items));
        self.adventures
            .create(&adventure)
            .expect("Failed to create adventure");
        for quest in &quests {
            self.quests.create(quest).expect("Failed to create quest");
            self.adventures
                .add_quest(adventure.id, quest.id)
                .expect("Failed to add quest");
        }
        self.adventures
            .get_by_name(name)
            .expect("Failed to load adventure")
            .expect("Adventure missing")
    }
}

pub fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The login → profile chain used across tests
pub fn login_quests() -> Vec<Quest> {
    vec![
        Quest::new("login", "POST", "http://{{host}}/login")
            .with_data(map(&[("user", "{{user}}"), ("pass", "{{pass}}")]))
            .with_spell(
                "[spell]\ntoken = \"$response.header.X-Token\"\nsession = \"$response.body#/session/id\"\n",
            ),
        Quest::new("me", "GET", "http://{{host}}/me")
            .with_headers(map(&[("Authorization", "Bearer {{token}}")]))
            .with_spell("[spell]\nname = \"$response.body#/name\"\nstatus = \"$statusCode\"\n"),
    ]
}

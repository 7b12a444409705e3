//! Data models for quests, adventures and bundles

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::template;

/// Bundle format version written by this build
pub const BUNDLE_VERSION: &str = "0.1";

/// Shared variables threaded through an adventure's calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bundle {
    pub id: Uuid,
    pub version: String,
    pub items: BTreeMap<String, String>,
}

impl Default for Bundle {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            version: BUNDLE_VERSION.to_string(),
            items: BTreeMap::new(),
        }
    }
}

impl Bundle {
    pub fn with_items(items: BTreeMap<String, String>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// Merge items in, overwriting existing keys
    pub fn merge(&mut self, items: BTreeMap<String, String>) {
        self.items.extend(items);
    }
}

/// A named, reusable HTTP request template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quest {
    pub id: Uuid,
    pub name: String,
    /// URL template
    pub url: String,
    /// HTTP method, passed through as given
    pub method: String,
    /// Form payload; keys and values are templates
    pub data: Option<BTreeMap<String, String>>,
    /// Request headers; names and values are templates
    pub headers: Option<BTreeMap<String, String>>,
    /// Spell source applied to the response
    pub spell: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quest {
    pub fn new(name: impl Into<String>, method: impl Into<String>, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            url: url.into(),
            method: method.into(),
            data: None,
            headers: None,
            spell: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_data(mut self, data: BTreeMap<String, String>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn with_spell(mut self, spell: impl Into<String>) -> Self {
        self.spell = Some(spell.into());
        self
    }

    /// Bundle variables referenced anywhere in the quest's templates
    pub fn variables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let maps = self.data.iter().chain(self.headers.iter());
        let templates = std::iter::once(self.url.as_str()).chain(
            maps.flat_map(|map| map.iter())
                .flat_map(|(key, value)| [key.as_str(), value.as_str()]),
        );
        for template in templates {
            for name in template::variables(template) {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }
}

/// An ordered collection of quests sharing one bundle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Adventure {
    pub id: Uuid,
    pub name: String,
    pub quests: Vec<Quest>,
    pub bundle: Bundle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Adventure {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            quests: Vec::new(),
            bundle: Bundle::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Find a quest by name; the first match wins when names repeat
    pub fn quest(&self, name: &str) -> Option<&Quest> {
        self.quests.iter().find(|quest| quest.name == name)
    }
}

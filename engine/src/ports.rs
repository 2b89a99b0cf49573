//! Boundaries to the collaborators the console does not own: remote stat
//! lookups and adventure storage. Hosts implement these; the engine only
//! consumes them.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::adventure::Adventure;
use crate::catalog::MonsterEntry;
use crate::rules::AbilityScores;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("not found")]
    NotFound,
    /// Stored credentials for the remote site were rejected.
    #[error("authentication failed, refresh your credentials")]
    AuthFailed,
    #[error("lookup failed: {0}")]
    Transient(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("adventure not found: {0}")]
    NotFound(String),
    #[error("save rejected: {reason}")]
    Forbidden { reason: String },
    #[error("adventure already exists: {0}")]
    AlreadyExists(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Best-effort stat block for a monster page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterDetails {
    #[serde(default)]
    pub ac: Option<i32>,
    #[serde(default)]
    pub hp: Option<i32>,
    #[serde(default)]
    pub cr: Option<String>,
    #[serde(default)]
    pub initiative_modifier: Option<i32>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub abilities: Option<AbilityScores>,
}

impl MonsterDetails {
    pub fn is_empty(&self) -> bool {
        self.ac.is_none()
            && self.hp.is_none()
            && self.cr.is_none()
            && self.initiative_modifier.is_none()
            && self.avatar_url.is_none()
    }
}

/// Best-effort summary of a character sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub abilities: Option<AbilityScores>,
    #[serde(default)]
    pub max_hp: Option<i32>,
    #[serde(default)]
    pub ac: Option<i32>,
    #[serde(default)]
    pub speed: Option<i32>,
    #[serde(default)]
    pub initiative_modifier: Option<i32>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Remote monster/character lookup. Calls must be idempotent and safe to retry.
#[async_trait]
pub trait StatFetcher: Send + Sync {
    async fn fetch_monster(&self, reference: &str) -> Result<MonsterDetails, FetchError>;
    async fn fetch_character(&self, reference: &str) -> Result<CharacterDetails, FetchError>;
    /// Bulk monster list used to replace the built-in catalog.
    async fn fetch_catalog(&self) -> Result<IndexMap<String, MonsterEntry>, FetchError>;
}

#[async_trait]
pub trait AdventureStore: Send + Sync {
    async fn list(&self) -> Result<Vec<String>, StoreError>;
    async fn load(&self, name: &str) -> Result<Adventure, StoreError>;
    /// May answer `Forbidden` when the adventure PIN changed since load.
    async fn save(&self, name: &str, adventure: &Adventure) -> Result<(), StoreError>;
    async fn create(&self, name: &str) -> Result<(), StoreError>;
    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}

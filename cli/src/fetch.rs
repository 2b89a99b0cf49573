use async_trait::async_trait;
use indexmap::IndexMap;

use dm_engine::catalog::{MonsterCatalog, MonsterEntry};
use dm_engine::ports::{CharacterDetails, FetchError, MonsterDetails, StatFetcher};

/// Stat lookups answered from the local catalog. Character sheets and the
/// bulk catalog are never available offline.
pub struct OfflineFetcher {
    catalog: MonsterCatalog,
}

impl OfflineFetcher {
    pub fn new(catalog: MonsterCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl StatFetcher for OfflineFetcher {
    async fn fetch_monster(&self, reference: &str) -> Result<MonsterDetails, FetchError> {
        let (_, entry) = self.catalog.lookup_ref(reference).ok_or(FetchError::NotFound)?;
        Ok(MonsterDetails {
            ac: entry.ac,
            hp: entry.hp,
            cr: Some(entry.cr.clone()).filter(|cr| !cr.trim().is_empty()),
            ..MonsterDetails::default()
        })
    }

    async fn fetch_character(&self, _reference: &str) -> Result<CharacterDetails, FetchError> {
        Err(FetchError::NotFound)
    }

    async fn fetch_catalog(&self) -> Result<IndexMap<String, MonsterEntry>, FetchError> {
        Err(FetchError::Transient("offline".into()))
    }
}

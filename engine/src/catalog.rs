//! Name → stat dictionary used for CR/XP fallbacks and for seeding new
//! monster rows. Loaded from the remote catalog when available, otherwise
//! from the copy shipped with the crate.

use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::content;
use crate::ports::StatFetcher;
use crate::rules::parse_cr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterEntry {
    pub cr: String,
    #[serde(default)]
    pub ac: Option<i32>,
    #[serde(default)]
    pub hp: Option<i32>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    BuiltIn,
    Remote,
}

#[derive(Debug, Clone)]
pub struct MonsterCatalog {
    entries: IndexMap<String, MonsterEntry>,
    source: CatalogSource,
}

impl MonsterCatalog {
    pub fn new(entries: IndexMap<String, MonsterEntry>, source: CatalogSource) -> Self {
        Self { entries, source }
    }

    pub fn builtin() -> Result<Self> {
        Ok(Self::new(content::builtin_monsters()?, CatalogSource::BuiltIn))
    }

    pub fn empty() -> Self {
        Self::new(IndexMap::new(), CatalogSource::BuiltIn)
    }

    pub fn source(&self) -> CatalogSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact name first, then case-insensitive.
    pub fn get(&self, name: &str) -> Option<(&str, &MonsterEntry)> {
        let name = name.trim();
        if let Some((key, entry)) = self.entries.get_key_value(name) {
            return Some((key.as_str(), entry));
        }
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(key, entry)| (key.as_str(), entry))
    }

    /// Resolve an instance name such as "Goblin 2" by trying the full name and
    /// then the name without its trailing number.
    pub fn lookup(&self, instance_name: &str) -> Option<(&str, &MonsterEntry)> {
        self.get(instance_name).or_else(|| {
            let base = base_name(instance_name);
            (base != instance_name.trim()).then(|| self.get(base)).flatten()
        })
    }

    /// Resolve a remote reference: exact URL match, else the page slug.
    pub fn lookup_ref(&self, reference: &str) -> Option<(&str, &MonsterEntry)> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if let Some((key, entry)) = self
            .entries
            .iter()
            .find(|(_, entry)| entry.url.as_deref() == Some(reference))
        {
            return Some((key.as_str(), entry));
        }
        let slug = reference_slug(reference)?;
        self.entries
            .iter()
            .find(|(key, _)| slugify(key) == slug)
            .map(|(key, entry)| (key.as_str(), entry))
    }

    /// Case-insensitive substring search, ordered by CR then name.
    pub fn search(&self, term: &str) -> Vec<(&str, &MonsterEntry)> {
        let term = term.trim().to_lowercase();
        let mut hits: Vec<_> = self
            .entries
            .iter()
            .filter(|(name, _)| term.is_empty() || name.to_lowercase().contains(&term))
            .map(|(name, entry)| (name.as_str(), entry))
            .collect();
        hits.sort_by(|a, b| {
            parse_cr(&a.1.cr)
                .total_cmp(&parse_cr(&b.1.cr))
                .then_with(|| a.0.cmp(b.0))
        });
        hits
    }
}

/// Fetch the remote catalog, falling back to the built-in one on failure or
/// when the remote list comes back empty.
pub async fn load_catalog(fetcher: &dyn StatFetcher) -> Result<MonsterCatalog> {
    match fetcher.fetch_catalog().await {
        Ok(entries) if !entries.is_empty() => {
            info!(count = entries.len(), "loaded remote monster catalog");
            Ok(MonsterCatalog::new(entries, CatalogSource::Remote))
        }
        Ok(_) => {
            warn!("remote monster catalog was empty; using built-in catalog");
            MonsterCatalog::builtin()
        }
        Err(err) => {
            warn!(error = %err, "remote monster catalog unavailable; using built-in catalog");
            MonsterCatalog::builtin()
        }
    }
}

/// "Giant Rat 12" → "Giant Rat". Names without a trailing number come back
/// unchanged.
pub fn base_name(instance_name: &str) -> &str {
    let trimmed = instance_name.trim();
    match trimmed.rsplit_once(' ') {
        Some((base, suffix))
            if !base.is_empty() && !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base.trim_end()
        }
        _ => trimmed,
    }
}

/// ".../monsters/4775864-goblin" → "goblin".
pub fn reference_slug(reference: &str) -> Option<String> {
    let segment = reference
        .trim()
        .split(['?', '#'])
        .next()?
        .trim_end_matches('/')
        .rsplit('/')
        .next()?;
    let slug = segment.trim_start_matches(|c: char| c.is_ascii_digit()).trim_start_matches('-');
    (!slug.is_empty()).then(|| slug.to_lowercase())
}

fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::encounter::{Encounter, EncounterId};
use crate::error::ValidationError;
use crate::player::{Player, PlayerId};

pub const DEFAULT_CHAPTER: &str = "Chapter 1";
pub const PIN_LENGTH: usize = 4;

/// A campaign: chapters, the party and every encounter. Owns all of its
/// players and encounters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adventure {
    pub name: String,
    #[serde(default)]
    pub chapters: Vec<String>,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub encounters: Vec<Encounter>,
    #[serde(default)]
    pub chapter_notes: BTreeMap<String, String>,
    #[serde(default)]
    pub access_pin: Option<String>,
    #[serde(default)]
    pub pin_version: u32,
}

/// What [`Adventure::repair`] had to fix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub added_default_chapter: bool,
    pub reassigned_encounters: usize,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        !self.added_default_chapter && self.reassigned_encounters == 0
    }
}

pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    if pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPin)
    }
}

fn non_empty(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(name.to_string())
}

impl Adventure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chapters: vec![DEFAULT_CHAPTER.to_string()],
            players: Vec::new(),
            encounters: Vec::new(),
            chapter_notes: BTreeMap::new(),
            access_pin: None,
            pin_version: 0,
        }
    }

    /// Bring a freshly loaded adventure back in line: there is always at least
    /// one chapter and every encounter points at an existing one.
    pub fn repair(&mut self) -> RepairReport {
        let mut report = RepairReport::default();
        self.chapters.retain(|c| !c.trim().is_empty());
        if self.chapters.is_empty() {
            self.chapters.push(DEFAULT_CHAPTER.to_string());
            report.added_default_chapter = true;
        }
        let first = self.chapters[0].clone();
        for encounter in &mut self.encounters {
            if !self.chapters.contains(&encounter.chapter) {
                encounter.chapter = first.clone();
                report.reassigned_encounters += 1;
            }
        }
        if !report.is_clean() {
            warn!(adventure = %self.name, ?report, "repaired adventure on load");
        }
        report
    }

    pub fn first_chapter(&self) -> &str {
        self.chapters.first().map(String::as_str).unwrap_or(DEFAULT_CHAPTER)
    }

    pub fn has_chapter(&self, chapter: &str) -> bool {
        self.chapters.iter().any(|c| c == chapter)
    }

    fn require_chapter(&self, chapter: &str) -> Result<(), ValidationError> {
        if self.has_chapter(chapter) {
            Ok(())
        } else {
            Err(ValidationError::UnknownChapter(chapter.to_string()))
        }
    }

    pub fn add_chapter(&mut self, name: &str) -> Result<String, ValidationError> {
        let name = non_empty(name)?;
        if self.has_chapter(&name) {
            return Err(ValidationError::DuplicateChapter(name));
        }
        self.chapters.push(name.clone());
        Ok(name)
    }

    /// Rename a chapter; its encounters and notes follow it.
    pub fn rename_chapter(&mut self, from: &str, to: &str) -> Result<String, ValidationError> {
        self.require_chapter(from)?;
        let to = non_empty(to)?;
        if to == from {
            return Ok(to);
        }
        if self.has_chapter(&to) {
            return Err(ValidationError::DuplicateChapter(to));
        }
        for chapter in self.chapters.iter_mut().filter(|c| c.as_str() == from) {
            *chapter = to.clone();
        }
        for encounter in self.encounters.iter_mut().filter(|e| e.chapter == from) {
            encounter.chapter = to.clone();
        }
        if let Some(notes) = self.chapter_notes.remove(from) {
            self.chapter_notes.insert(to.clone(), notes);
        }
        Ok(to)
    }

    /// Delete a chapter together with its encounters and notes. Returns the
    /// number of encounters removed.
    pub fn delete_chapter(&mut self, chapter: &str) -> Result<usize, ValidationError> {
        self.require_chapter(chapter)?;
        if self.chapters.len() <= 1 {
            return Err(ValidationError::LastChapter);
        }
        let before = self.encounters.len();
        self.encounters.retain(|e| e.chapter != chapter);
        self.chapters.retain(|c| c != chapter);
        self.chapter_notes.remove(chapter);
        let removed = before - self.encounters.len();
        info!(adventure = %self.name, chapter, removed, "chapter deleted");
        Ok(removed)
    }

    pub fn chapter_notes(&self, chapter: &str) -> &str {
        self.chapter_notes.get(chapter).map(String::as_str).unwrap_or("")
    }

    pub fn set_chapter_notes(&mut self, chapter: &str, notes: String) -> Result<(), ValidationError> {
        self.require_chapter(chapter)?;
        if notes.is_empty() {
            self.chapter_notes.remove(chapter);
        } else {
            self.chapter_notes.insert(chapter.to_string(), notes);
        }
        Ok(())
    }

    pub fn encounters_in<'a>(&'a self, chapter: &'a str) -> impl Iterator<Item = &'a Encounter> + 'a {
        self.encounters.iter().filter(move |e| e.chapter == chapter)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    /// Add a player, replacing any existing player with the same id.
    pub fn add_player(&mut self, player: Player) -> PlayerId {
        let id = player.id.clone();
        match self.player_mut(&id) {
            Some(existing) => *existing = player,
            None => self.players.push(player),
        }
        id
    }

    /// Encounter rows for the removed player stay and show as unknown.
    pub fn remove_player(&mut self, id: &PlayerId) -> Result<Player, ValidationError> {
        let index = self
            .players
            .iter()
            .position(|p| &p.id == id)
            .ok_or(ValidationError::UnknownPlayer)?;
        Ok(self.players.remove(index))
    }

    pub fn encounter(&self, id: EncounterId) -> Option<&Encounter> {
        self.encounters.iter().find(|e| e.id == id)
    }

    pub fn encounter_mut(&mut self, id: EncounterId) -> Option<&mut Encounter> {
        self.encounters.iter_mut().find(|e| e.id == id)
    }

    /// Create an encounter in `chapter`, seeded with the current party.
    pub fn create_encounter(&mut self, name: &str, chapter: &str) -> Result<EncounterId, ValidationError> {
        let name = non_empty(name)?;
        self.require_chapter(chapter)?;
        let encounter = Encounter::new(name, chapter, &self.players);
        let id = encounter.id;
        self.encounters.push(encounter);
        Ok(id)
    }

    pub fn delete_encounter(&mut self, id: EncounterId) -> Result<Encounter, ValidationError> {
        let index = self
            .encounters
            .iter()
            .position(|e| e.id == id)
            .ok_or(ValidationError::UnknownEncounter)?;
        Ok(self.encounters.remove(index))
    }

    /// Set or clear the access PIN. Any change bumps `pin_version`, which
    /// invalidates sessions opened under the old PIN.
    pub fn set_pin(&mut self, pin: Option<&str>) -> Result<(), ValidationError> {
        if let Some(pin) = pin {
            validate_pin(pin)?;
        }
        self.access_pin = pin.map(str::to_string);
        self.pin_version += 1;
        Ok(())
    }

    pub fn pin_matches(&self, pin: Option<&str>) -> bool {
        match &self.access_pin {
            None => true,
            Some(expected) => pin == Some(expected.as_str()),
        }
    }
}

//! One encounter's turn order and the transitions that drive it.
//!
//! Transitions outside the legal set leave the encounter untouched and report
//! [`Transition::Ignored`]; callers decide whether that is worth a message.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::MonsterEntry;
use crate::combatant::{Combatant, CombatantId, CombatantKind};
use crate::player::Player;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncounterId(pub Uuid);

impl EncounterId {
    pub fn new() -> Self {
        EncounterId(Uuid::new_v4())
    }
}

impl Default for EncounterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EncounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterState {
    #[default]
    Unstarted,
    Started,
    Complete,
}

impl fmt::Display for EncounterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EncounterState::Unstarted => "not started",
            EncounterState::Started => "in progress",
            EncounterState::Complete => "complete",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Transition {
    Applied,
    Ignored,
}

impl Transition {
    pub fn applied(self) -> bool {
        self == Transition::Applied
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: EncounterId,
    pub name: String,
    pub chapter: String,
    #[serde(default)]
    pub combatants: Vec<Combatant>,
    #[serde(default)]
    pub state: EncounterState,
    #[serde(default)]
    pub current_turn: usize,
    /// 0 while unstarted, 1-based afterwards.
    #[serde(default)]
    pub current_round: u32,
    /// Whose turn it is, by identity rather than position.
    #[serde(default)]
    pub active: Option<CombatantId>,
    #[serde(default)]
    pub custom_cr: Option<String>,
    #[serde(default)]
    pub treasure: String,
    /// UI hint; unset means "minimized unless started".
    #[serde(default)]
    pub minimized: Option<bool>,
}

impl Encounter {
    /// New unstarted encounter with one row per player.
    pub fn new(name: impl Into<String>, chapter: impl Into<String>, players: &[Player]) -> Self {
        Self {
            id: EncounterId::new(),
            name: name.into(),
            chapter: chapter.into(),
            combatants: players.iter().map(Combatant::from_player).collect(),
            state: EncounterState::Unstarted,
            current_turn: 0,
            current_round: 0,
            active: None,
            custom_cr: None,
            treasure: String::new(),
            minimized: None,
        }
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized.unwrap_or(self.state != EncounterState::Started)
    }

    pub fn custom_cr(&self) -> Option<&str> {
        self.custom_cr.as_deref().map(str::trim).filter(|cr| !cr.is_empty())
    }

    pub fn set_custom_cr(&mut self, cr: Option<String>) {
        self.custom_cr = cr.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
    }

    pub fn find(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn find_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id == id)
    }

    pub fn active_combatant(&self) -> Option<&Combatant> {
        self.active.and_then(|id| self.find(id))
    }

    pub fn monsters(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter().filter(|c| !c.is_player())
    }

    /// Initiative desc, then initiative bonus desc (rows without one last),
    /// then display name. The sort is stable, so equal rows keep their order.
    pub fn sort_by_initiative(&mut self, players: &[Player]) {
        let mut keyed: Vec<(String, Combatant)> = self
            .combatants
            .drain(..)
            .map(|c| (c.display_name(players).to_string(), c))
            .collect();
        keyed.sort_by(|(a_name, a), (b_name, b)| {
            b.initiative
                .cmp(&a.initiative)
                .then_with(|| b.initiative_bonus.cmp(&a.initiative_bonus))
                .then_with(|| a_name.cmp(b_name))
        });
        self.combatants = keyed.into_iter().map(|(_, c)| c).collect();
    }

    pub fn start(&mut self, players: &[Player]) -> Transition {
        if self.state != EncounterState::Unstarted {
            return Transition::Ignored;
        }
        self.sort_by_initiative(players);
        self.state = EncounterState::Started;
        self.current_round = 1;
        self.current_turn = 0;
        self.active = self.combatants.first().map(|c| c.id);
        info!(encounter = %self.name, combatants = self.combatants.len(), "encounter started");
        Transition::Applied
    }

    pub fn next_turn(&mut self) -> Transition {
        let n = self.combatants.len();
        if self.state != EncounterState::Started || n == 0 {
            return Transition::Ignored;
        }
        self.current_turn = (self.current_turn.min(n - 1) + 1) % n;
        if self.current_turn == 0 {
            self.current_round += 1;
        }
        self.active = Some(self.combatants[self.current_turn].id);
        debug!(encounter = %self.name, turn = self.current_turn, round = self.current_round, "next turn");
        Transition::Applied
    }

    pub fn previous_turn(&mut self) -> Transition {
        let n = self.combatants.len();
        if self.state != EncounterState::Started || n == 0 {
            return Transition::Ignored;
        }
        self.current_turn = (self.current_turn.min(n - 1) + n - 1) % n;
        if self.current_turn == n - 1 {
            self.current_round = self.current_round.saturating_sub(1).max(1);
        }
        self.active = Some(self.combatants[self.current_turn].id);
        debug!(encounter = %self.name, turn = self.current_turn, round = self.current_round, "previous turn");
        Transition::Applied
    }

    /// Round count survives so the final tally stays visible.
    pub fn end(&mut self) -> Transition {
        if self.state != EncounterState::Started {
            return Transition::Ignored;
        }
        self.state = EncounterState::Complete;
        self.current_turn = 0;
        self.active = None;
        info!(encounter = %self.name, rounds = self.current_round, "encounter ended");
        Transition::Applied
    }

    /// Back to unstarted. Combatant order, HP and initiative are kept.
    pub fn reset(&mut self) -> Transition {
        if self.state == EncounterState::Unstarted {
            return Transition::Ignored;
        }
        self.clear_turns();
        debug!(encounter = %self.name, "encounter reset");
        Transition::Applied
    }

    fn clear_turns(&mut self) {
        self.state = EncounterState::Unstarted;
        self.current_turn = 0;
        self.current_round = 0;
        self.active = None;
    }

    /// Re-seed player rows from the live player list. Forces a reset first.
    /// Rows for players still present keep their id, initiative and notes;
    /// AC, max HP and initiative bonus are taken fresh and HP is restored.
    pub fn refresh_players(&mut self, players: &[Player]) {
        self.clear_turns();
        let mut previous: Vec<Combatant> = Vec::new();
        self.combatants.retain(|c| {
            if c.is_player() {
                previous.push(c.clone());
                false
            } else {
                true
            }
        });
        let seeded: Vec<Combatant> = players
            .iter()
            .map(|player| {
                let mut row = Combatant::from_player(player);
                if let Some(old) = previous.iter().find(|c| c.player_id() == Some(&player.id)) {
                    row.id = old.id;
                    row.initiative = old.initiative;
                    row.notes = old.notes.clone();
                }
                row
            })
            .collect();
        debug!(encounter = %self.name, players = seeded.len(), "player rows refreshed");
        self.combatants.splice(0..0, seeded);
    }

    /// Add `quantity` monsters named after `base`, numbering duplicates. Once
    /// a base has more than one row, existing unnumbered peers are numbered
    /// in row order after the highest number already taken.
    pub fn add_monsters(
        &mut self,
        base: &str,
        quantity: usize,
        entry: Option<&MonsterEntry>,
    ) -> Vec<CombatantId> {
        let base = base.trim();
        let quantity = quantity.max(1);
        let mut highest = 0u32;
        let mut unnumbered = 0u32;
        for name in self.combatants.iter().filter_map(Combatant::monster_name) {
            if name == base {
                unnumbered += 1;
            } else if let Some(n) = name
                .strip_prefix(base)
                .and_then(|rest| rest.strip_prefix(' '))
                .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|digits| digits.parse::<u32>().ok())
            {
                highest = highest.max(n);
            }
        }

        let numbered = quantity > 1 || highest > 0 || unnumbered > 0;
        if numbered {
            for row in self.combatants.iter_mut().filter(|c| c.monster_name() == Some(base)) {
                highest += 1;
                row.kind = CombatantKind::Monster { name: format!("{} {}", base, highest) };
            }
        }

        (0..quantity)
            .map(|i| {
                let name = if numbered {
                    format!("{} {}", base, highest as usize + i + 1)
                } else {
                    base.to_string()
                };
                let row = match entry {
                    Some(entry) => Combatant::from_catalog(name, entry),
                    None => Combatant::monster(name),
                };
                let id = row.id;
                self.combatants.push(row);
                id
            })
            .collect()
    }

    pub fn add_custom_combatant(&mut self, name: impl Into<String>) -> CombatantId {
        let row = Combatant::monster(name);
        let id = row.id;
        self.combatants.push(row);
        id
    }

    /// Remove a row, keeping the turn pointer on the same combatant when it
    /// survives and otherwise on whoever slid into its place.
    pub fn remove_combatant(&mut self, id: CombatantId) -> Option<Combatant> {
        let index = self.combatants.iter().position(|c| c.id == id)?;
        let removed = self.combatants.remove(index);
        if index < self.current_turn {
            self.current_turn -= 1;
        }
        if self.current_turn >= self.combatants.len() {
            self.current_turn = 0;
        }
        if self.state == EncounterState::Started {
            self.active = self.combatants.get(self.current_turn).map(|c| c.id);
        } else if self.active == Some(id) {
            self.active = None;
        }
        Some(removed)
    }
}

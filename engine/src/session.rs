//! The console's controller: one open adventure, the selected chapter, and a
//! single typed entry point ([`Session::dispatch`]) for every user action.

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{debug, info};

use crate::adventure::{Adventure, RepairReport};
use crate::autosave::Autosave;
use crate::catalog::MonsterCatalog;
use crate::combatant::{Combatant, CombatantId, CombatantUpdate};
use crate::config::ConsoleConfig;
use crate::encounter::{Encounter, EncounterId, EncounterState, Transition};
use crate::error::{SessionError, ValidationError};
use crate::life::{DamageOutcome, DeathSaveOutcome, DeathSaveResult};
use crate::loot::{generate_loot, LootTables, Treasure};
use crate::player::{Player, PlayerId, PlayerUpdate};
use crate::ports::{AdventureStore, CharacterDetails, FetchError, MonsterDetails, StatFetcher};
use crate::reconcile::{
    self, fetch_monsters_deduplicated, FetchOutcome, FetchTarget, FetchTicket, IdentityToken,
    Reconciler,
};
use crate::{CheckResult, Dice};

/// Every edit the console accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddChapter(String),
    RenameChapter { from: String, to: String },
    DeleteChapter(String),
    SelectChapter(String),
    SetChapterNotes { chapter: String, notes: String },

    AddPlayer(Player),
    UpdatePlayer { player: PlayerId, update: PlayerUpdate },
    RemovePlayer(PlayerId),

    /// `chapter` defaults to the selected one.
    CreateEncounter { name: String, chapter: Option<String> },
    DeleteEncounter(EncounterId),
    RenameEncounter { encounter: EncounterId, name: String },
    SetMinimized { encounter: EncounterId, minimized: bool },
    SetCustomCr { encounter: EncounterId, cr: Option<String> },
    SetTreasure { encounter: EncounterId, text: String },
    GenerateLoot(EncounterId),

    AddMonsters { encounter: EncounterId, name: String, quantity: usize },
    AddCustomCombatant { encounter: EncounterId, name: String },
    RemoveCombatant { encounter: EncounterId, combatant: CombatantId },
    UpdateCombatant { encounter: EncounterId, combatant: CombatantId, update: CombatantUpdate },

    Start(EncounterId),
    NextTurn(EncounterId),
    PreviousTurn(EncounterId),
    End(EncounterId),
    Reset(EncounterId),
    RefreshPlayers(EncounterId),

    Damage { encounter: EncounterId, combatant: CombatantId, amount: i32 },
    Heal { encounter: EncounterId, combatant: CombatantId, amount: i32 },
    GrantTempHp { encounter: EncounterId, combatant: CombatantId, amount: i32 },
    DeathSave { encounter: EncounterId, combatant: CombatantId, result: DeathSaveResult },
    RollDeathSave { encounter: EncounterId, combatant: CombatantId },
    ConcentrationSave { encounter: EncounterId, combatant: CombatantId, damage: i32, modifier: i32 },

    SetPin(Option<String>),
}

impl Action {
    fn edits_adventure(&self) -> bool {
        !matches!(self, Action::SelectChapter(_))
    }
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Done,
    Chapter(String),
    Player(PlayerId),
    Encounter(EncounterId),
    Combatants(Vec<CombatantId>),
    Removed(usize),
    Damage(DamageOutcome),
    Healed(i32),
    DeathSave { roll: Option<i32>, outcome: DeathSaveOutcome },
    Concentration(CheckResult),
    Loot(Treasure),
}

fn push_log(log: &mut VecDeque<String>, limit: usize, line: String) {
    debug!(target: "dm_engine::combat_log", "{}", line);
    log.push_back(line);
    while log.len() > limit.max(1) {
        log.pop_front();
    }
}

fn encounter_in(adventure: &mut Adventure, id: EncounterId) -> Result<&mut Encounter, SessionError> {
    adventure
        .encounter_mut(id)
        .ok_or(SessionError::Validation(ValidationError::UnknownEncounter))
}

fn transition(
    result: Transition,
    action: &'static str,
    state: EncounterState,
) -> Result<Outcome, SessionError> {
    match result {
        Transition::Applied => Ok(Outcome::Done),
        Transition::Ignored => Err(ValidationError::IllegalTransition { action, state }.into()),
    }
}

pub struct Session {
    adventure: Option<Adventure>,
    chapter: String,
    catalog: MonsterCatalog,
    loot: LootTables,
    dice: Dice,
    reconciler: Reconciler,
    autosave: Autosave,
    log: VecDeque<String>,
    log_limit: usize,
    generation: u64,
}

impl Session {
    pub fn new(config: &ConsoleConfig, catalog: MonsterCatalog, loot: LootTables, dice: Dice) -> Self {
        Self {
            adventure: None,
            chapter: String::new(),
            catalog,
            loot,
            dice,
            reconciler: Reconciler::new(),
            autosave: Autosave::new(config.autosave_quiet()),
            log: VecDeque::new(),
            log_limit: config.log_limit,
            generation: 0,
        }
    }

    /// Session over the built-in catalog and loot tables.
    pub fn from_config(config: &ConsoleConfig) -> anyhow::Result<Self> {
        let dice = match config.seed {
            Some(seed) => Dice::from_seed(seed),
            None => Dice::from_entropy(),
        };
        Ok(Self::new(config, MonsterCatalog::builtin()?, LootTables::builtin()?, dice))
    }

    pub fn adventure(&self) -> Option<&Adventure> {
        self.adventure.as_ref()
    }

    pub fn current_chapter(&self) -> Option<&str> {
        self.adventure.as_ref().map(|_| self.chapter.as_str())
    }

    pub fn catalog(&self) -> &MonsterCatalog {
        &self.catalog
    }

    pub fn set_catalog(&mut self, catalog: MonsterCatalog) {
        self.catalog = catalog;
    }

    pub fn dice(&mut self) -> &mut Dice {
        &mut self.dice
    }

    pub fn log(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }

    pub fn take_log(&mut self) -> Vec<String> {
        self.log.drain(..).collect()
    }

    pub fn autosave(&self) -> &Autosave {
        &self.autosave
    }

    /// Lookups currently outstanding.
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Identity of the currently open adventure load.
    pub fn identity(&self) -> Option<IdentityToken> {
        self.adventure.as_ref().map(|a| IdentityToken {
            adventure: a.name.clone(),
            generation: self.generation,
        })
    }

    /// Make `adventure` current. Anything in flight for the previous one
    /// becomes stale.
    pub fn open(&mut self, mut adventure: Adventure) -> RepairReport {
        let report = adventure.repair();
        self.chapter = adventure.first_chapter().to_string();
        info!(adventure = %adventure.name, "adventure opened");
        self.adventure = Some(adventure);
        self.generation += 1;
        self.reconciler.clear();
        self.autosave.reset();
        if !report.is_clean() {
            // Repairs are edits in their own right.
            self.autosave.mark_dirty(Instant::now());
        }
        report
    }

    pub async fn load(
        &mut self,
        store: &dyn AdventureStore,
        name: &str,
    ) -> Result<RepairReport, SessionError> {
        let adventure = store.load(name).await?;
        Ok(self.open(adventure))
    }

    pub fn close(&mut self) -> Option<Adventure> {
        self.generation += 1;
        self.reconciler.clear();
        self.autosave.reset();
        self.chapter.clear();
        self.adventure.take()
    }

    fn record(&mut self, line: String) {
        push_log(&mut self.log, self.log_limit, line);
    }

    /// Apply one action. Rejected actions leave everything untouched.
    pub fn dispatch(&mut self, action: Action, now: Instant) -> Result<Outcome, SessionError> {
        let edits = action.edits_adventure();
        let outcome = self.apply(action)?;
        if edits {
            self.autosave.mark_dirty(now);
        }
        Ok(outcome)
    }

    fn apply(&mut self, action: Action) -> Result<Outcome, SessionError> {
        let adventure = self.adventure.as_mut().ok_or(SessionError::NoAdventure)?;
        let log = &mut self.log;
        let limit = self.log_limit;
        let mut say = |line: String| push_log(log, limit, line);

        match action {
            Action::AddChapter(name) => {
                let name = adventure.add_chapter(&name)?;
                self.chapter = name.clone();
                Ok(Outcome::Chapter(name))
            }
            Action::RenameChapter { from, to } => {
                let to = adventure.rename_chapter(&from, &to)?;
                if self.chapter == from {
                    self.chapter = to.clone();
                }
                Ok(Outcome::Chapter(to))
            }
            Action::DeleteChapter(chapter) => {
                let removed = adventure.delete_chapter(&chapter)?;
                if self.chapter == chapter {
                    self.chapter = adventure.first_chapter().to_string();
                }
                Ok(Outcome::Removed(removed))
            }
            Action::SelectChapter(chapter) => {
                if !adventure.has_chapter(&chapter) {
                    return Err(ValidationError::UnknownChapter(chapter).into());
                }
                self.chapter = chapter.clone();
                Ok(Outcome::Chapter(chapter))
            }
            Action::SetChapterNotes { chapter, notes } => {
                adventure.set_chapter_notes(&chapter, notes)?;
                Ok(Outcome::Done)
            }

            Action::AddPlayer(player) => Ok(Outcome::Player(adventure.add_player(player))),
            Action::UpdatePlayer { player, update } => {
                let target = adventure.player_mut(&player).ok_or(ValidationError::UnknownPlayer)?;
                target.apply(update)?;
                Ok(Outcome::Player(player))
            }
            Action::RemovePlayer(id) => {
                adventure.remove_player(&id)?;
                Ok(Outcome::Done)
            }

            Action::CreateEncounter { name, chapter } => {
                let chapter = chapter.unwrap_or_else(|| self.chapter.clone());
                Ok(Outcome::Encounter(adventure.create_encounter(&name, &chapter)?))
            }
            Action::DeleteEncounter(id) => {
                adventure.delete_encounter(id)?;
                Ok(Outcome::Done)
            }
            Action::RenameEncounter { encounter, name } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(ValidationError::EmptyName.into());
                }
                encounter_in(adventure, encounter)?.name = name.to_string();
                Ok(Outcome::Done)
            }
            Action::SetMinimized { encounter, minimized } => {
                encounter_in(adventure, encounter)?.minimized = Some(minimized);
                Ok(Outcome::Done)
            }
            Action::SetCustomCr { encounter, cr } => {
                encounter_in(adventure, encounter)?.set_custom_cr(cr);
                Ok(Outcome::Done)
            }
            Action::SetTreasure { encounter, text } => {
                encounter_in(adventure, encounter)?.treasure = text;
                Ok(Outcome::Done)
            }
            Action::GenerateLoot(encounter) => {
                let target = encounter_in(adventure, encounter)?;
                let treasure = generate_loot(target, &self.catalog, &self.loot, &mut self.dice);
                target.treasure = treasure.describe();
                say(format!("[LOOT][{}] {}", target.name, target.treasure));
                Ok(Outcome::Loot(treasure))
            }

            Action::AddMonsters { encounter, name, quantity } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(ValidationError::EmptyName.into());
                }
                let target = encounter_in(adventure, encounter)?;
                let found = self.catalog.get(name);
                let base = found.map(|(key, _)| key).unwrap_or(name);
                let ids = target.add_monsters(base, quantity, found.map(|(_, entry)| entry));
                say(format!("[ADD][{}] {} x {}", target.name, ids.len(), base));
                Ok(Outcome::Combatants(ids))
            }
            Action::AddCustomCombatant { encounter, name } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(ValidationError::EmptyName.into());
                }
                let id = encounter_in(adventure, encounter)?.add_custom_combatant(name);
                Ok(Outcome::Combatants(vec![id]))
            }
            Action::RemoveCombatant { encounter, combatant } => {
                encounter_in(adventure, encounter)?
                    .remove_combatant(combatant)
                    .ok_or(ValidationError::UnknownCombatant)?;
                Ok(Outcome::Done)
            }
            Action::UpdateCombatant { encounter, combatant, update } => {
                encounter_in(adventure, encounter)?
                    .find_mut(combatant)
                    .ok_or(ValidationError::UnknownCombatant)?
                    .apply(update)?;
                Ok(Outcome::Done)
            }

            Action::Start(id) => {
                let Adventure { players, encounters, .. } = adventure;
                let target = encounters
                    .iter_mut()
                    .find(|e| e.id == id)
                    .ok_or(ValidationError::UnknownEncounter)?;
                let state = target.state;
                transition(target.start(players), "start", state)?;
                let first = target.active_combatant().map(|c| c.display_name(players).to_string());
                say(format!(
                    "[ROUND][{}] round 1 begins; {} acts first",
                    target.name,
                    first.as_deref().unwrap_or("nobody")
                ));
                Ok(Outcome::Done)
            }
            Action::NextTurn(id) => {
                let target = encounter_in(adventure, id)?;
                let state = target.state;
                transition(target.next_turn(), "advance the turn", state)
            }
            Action::PreviousTurn(id) => {
                let target = encounter_in(adventure, id)?;
                let state = target.state;
                transition(target.previous_turn(), "go back a turn", state)
            }
            Action::End(id) => {
                let target = encounter_in(adventure, id)?;
                let state = target.state;
                transition(target.end(), "end", state)?;
                say(format!("[END][{}] after {} round(s)", target.name, target.current_round));
                Ok(Outcome::Done)
            }
            Action::Reset(id) => {
                let target = encounter_in(adventure, id)?;
                let state = target.state;
                transition(target.reset(), "reset", state)
            }
            Action::RefreshPlayers(id) => {
                let Adventure { players, encounters, .. } = adventure;
                encounters
                    .iter_mut()
                    .find(|e| e.id == id)
                    .ok_or(ValidationError::UnknownEncounter)?
                    .refresh_players(players);
                Ok(Outcome::Done)
            }

            Action::Damage { encounter, combatant, amount } => {
                let Adventure { players, encounters, .. } = adventure;
                let row = combatant_in(encounters, encounter, combatant)?;
                let label = row.display_name(players).to_string();
                Ok(Outcome::Damage(row.take_damage(&label, amount, &mut say)))
            }
            Action::Heal { encounter, combatant, amount } => {
                let Adventure { players, encounters, .. } = adventure;
                let row = combatant_in(encounters, encounter, combatant)?;
                let label = row.display_name(players).to_string();
                Ok(Outcome::Healed(row.receive_healing(&label, amount, &mut say)))
            }
            Action::GrantTempHp { encounter, combatant, amount } => {
                let Adventure { players, encounters, .. } = adventure;
                let row = combatant_in(encounters, encounter, combatant)?;
                row.vitals.grant_temp(amount);
                say(format!("[TEMP][{}] {} temp HP", row.display_name(players), row.vitals.temp_hp));
                Ok(Outcome::Done)
            }
            Action::DeathSave { encounter, combatant, result } => {
                let Adventure { players, encounters, .. } = adventure;
                let row = combatant_in(encounters, encounter, combatant)?;
                let label = row.display_name(players).to_string();
                let outcome = row.record_death_save(&label, result, &mut say);
                Ok(Outcome::DeathSave { roll: None, outcome })
            }
            Action::RollDeathSave { encounter, combatant } => {
                let Adventure { players, encounters, .. } = adventure;
                let row = combatant_in(encounters, encounter, combatant)?;
                let label = row.display_name(players).to_string();
                let (roll, outcome) = row.roll_death_save(&label, &mut self.dice, &mut say);
                Ok(Outcome::DeathSave { roll: Some(roll), outcome })
            }
            Action::ConcentrationSave { encounter, combatant, damage, modifier } => {
                let Adventure { players, encounters, .. } = adventure;
                let row = combatant_in(encounters, encounter, combatant)?;
                let label = row.display_name(players).to_string();
                let result = row.roll_concentration(&label, &mut self.dice, damage, modifier, &mut say);
                Ok(Outcome::Concentration(result))
            }

            Action::SetPin(pin) => {
                adventure.set_pin(pin.as_deref())?;
                Ok(Outcome::Done)
            }
        }
    }

    pub fn is_save_due(&self, now: Instant) -> bool {
        self.adventure.is_some() && self.autosave.is_due(now)
    }

    /// Save if the quiet period has passed since the last edit.
    pub async fn flush_if_due(
        &mut self,
        store: &dyn AdventureStore,
        now: Instant,
    ) -> Result<bool, SessionError> {
        if !self.is_save_due(now) {
            return Ok(false);
        }
        self.flush_now(store).await
    }

    /// Save immediately if there are unsaved edits.
    pub async fn flush_now(&mut self, store: &dyn AdventureStore) -> Result<bool, SessionError> {
        let Some(adventure) = self.adventure.as_ref() else {
            return Ok(false);
        };
        self.autosave.flush(store, adventure).await
    }

    /// Call once the user has re-entered their PIN after a rejected save.
    pub fn resume_saving(&mut self) {
        self.autosave.resume();
    }

    /// Claim a stat lookup for one monster row. Rows without a link borrow
    /// the catalog's page for their name.
    pub fn begin_monster_fetch(
        &mut self,
        encounter: EncounterId,
        combatant: CombatantId,
    ) -> Result<FetchTicket, FetchOutcome> {
        let token = self.identity().ok_or(FetchOutcome::Stale)?;
        let Some(adventure) = self.adventure.as_mut() else {
            return Err(FetchOutcome::Stale);
        };
        let row = adventure
            .encounter_mut(encounter)
            .and_then(|e| e.find_mut(combatant))
            .ok_or(FetchOutcome::Stale)?;
        if row.is_player() {
            return Err(FetchOutcome::NoReference);
        }
        if row.remote_ref.is_none() {
            let linked = row
                .monster_name()
                .and_then(|name| self.catalog.lookup(name))
                .and_then(|(_, entry)| entry.url.clone());
            if let Some(url) = linked {
                row.remote_ref = Some(url);
                self.autosave.mark_dirty(Instant::now());
            }
        }
        let reference = row.remote_ref.clone();
        self.reconciler.begin(
            FetchTarget::Combatant { encounter, combatant },
            reference.as_deref(),
            token,
        )
    }

    /// Hand back a monster lookup. Always releases the in-flight claim.
    pub fn complete_monster_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<MonsterDetails, FetchError>,
    ) -> FetchOutcome {
        self.reconciler.finish(&ticket);
        let current = self.identity();
        let Some(adventure) = self.adventure.as_mut() else {
            return FetchOutcome::Stale;
        };
        let outcome = reconcile::complete_monster_fetch(
            &mut adventure.encounters,
            &ticket,
            current.as_ref(),
            result,
            &mut self.dice,
        );
        let label = match &ticket.target {
            FetchTarget::Combatant { encounter, combatant } => adventure
                .encounter(*encounter)
                .and_then(|e| e.find(*combatant))
                .map(|c| c.display_name(&adventure.players).to_string()),
            FetchTarget::Player(_) => None,
        };
        self.after_fetch(label, &outcome);
        outcome
    }

    fn after_fetch(&mut self, label: Option<String>, outcome: &FetchOutcome) {
        if matches!(outcome, FetchOutcome::Applied(report) if !report.is_empty()) {
            self.autosave.mark_dirty(Instant::now());
        }
        if let Some(message) = outcome.message() {
            let label = label.unwrap_or_else(|| "?".to_string());
            self.record(format!("[STATS][{}] {}", label, message));
        }
    }

    /// Fetch and merge stats for one monster row.
    pub async fn reconcile_combatant(
        &mut self,
        fetcher: &dyn StatFetcher,
        encounter: EncounterId,
        combatant: CombatantId,
    ) -> FetchOutcome {
        let ticket = match self.begin_monster_fetch(encounter, combatant) {
            Ok(ticket) => ticket,
            Err(outcome) => return outcome,
        };
        let result = fetcher.fetch_monster(&ticket.reference).await;
        self.complete_monster_fetch(ticket, result)
    }

    /// Look up every monster row still missing stats, one request per page.
    pub async fn reconcile_pending(&mut self, fetcher: &dyn StatFetcher) -> Vec<FetchOutcome> {
        self.reconcile_where(fetcher, |c| c.needs_stats()).await
    }

    /// Look up monsters whose CR is neither stored nor known to the catalog.
    pub async fn backfill_missing_cr(&mut self, fetcher: &dyn StatFetcher) -> Vec<FetchOutcome> {
        let catalog = self.catalog.clone();
        self.reconcile_where(fetcher, move |c| {
            !c.is_player() && c.cr.trim().is_empty() && c.resolve_cr(&catalog).is_none()
        })
        .await
    }

    async fn reconcile_where(
        &mut self,
        fetcher: &dyn StatFetcher,
        wanted: impl Fn(&Combatant) -> bool,
    ) -> Vec<FetchOutcome> {
        let Some(adventure) = &self.adventure else {
            return Vec::new();
        };
        let mut slots: Vec<(EncounterId, CombatantId)> = Vec::new();
        for encounter in &adventure.encounters {
            for combatant in &encounter.combatants {
                if wanted(combatant) {
                    slots.push((encounter.id, combatant.id));
                }
            }
        }
        let mut outcomes = Vec::new();
        let mut tickets = Vec::new();
        for (encounter, combatant) in slots {
            match self.begin_monster_fetch(encounter, combatant) {
                Ok(ticket) => tickets.push(ticket),
                Err(outcome) => outcomes.push(outcome),
            }
        }
        debug!(count = tickets.len(), "backfilling monster stats");
        for (ticket, result) in fetch_monsters_deduplicated(fetcher, tickets).await {
            outcomes.push(self.complete_monster_fetch(ticket, result));
        }
        outcomes
    }

    pub fn begin_player_fetch(&mut self, player: &PlayerId) -> Result<FetchTicket, FetchOutcome> {
        let token = self.identity().ok_or(FetchOutcome::Stale)?;
        let reference = self
            .adventure
            .as_ref()
            .and_then(|a| a.player(player))
            .ok_or(FetchOutcome::Stale)?
            .remote_profile_ref
            .clone();
        self.reconciler.begin(FetchTarget::Player(player.clone()), reference.as_deref(), token)
    }

    pub fn complete_player_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<CharacterDetails, FetchError>,
    ) -> FetchOutcome {
        self.reconciler.finish(&ticket);
        let current = self.identity();
        let Some(adventure) = self.adventure.as_mut() else {
            return FetchOutcome::Stale;
        };
        let outcome =
            reconcile::complete_player_fetch(&mut adventure.players, &ticket, current.as_ref(), result);
        let label = match &ticket.target {
            FetchTarget::Player(id) => adventure.player(id).map(|p| p.display_name.clone()),
            FetchTarget::Combatant { .. } => None,
        };
        self.after_fetch(label, &outcome);
        outcome
    }

    /// Pull a player's remote character sheet and fill in blank fields.
    pub async fn sync_player(&mut self, fetcher: &dyn StatFetcher, player: &PlayerId) -> FetchOutcome {
        let ticket = match self.begin_player_fetch(player) {
            Ok(ticket) => ticket,
            Err(outcome) => return outcome,
        };
        let result = fetcher.fetch_character(&ticket.reference).await;
        self.complete_player_fetch(ticket, result)
    }
}

fn combatant_in(
    encounters: &mut [Encounter],
    encounter: EncounterId,
    combatant: CombatantId,
) -> Result<&mut Combatant, SessionError> {
    encounters
        .iter_mut()
        .find(|e| e.id == encounter)
        .ok_or(ValidationError::UnknownEncounter)?
        .find_mut(combatant)
        .ok_or_else(|| ValidationError::UnknownCombatant.into())
}

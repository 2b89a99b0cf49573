//! Lazy merging of remote stat blocks into local records.
//!
//! A fetch is split in two halves so nothing is borrowed across the await:
//! [`Reconciler::begin`] claims the slot and captures an identity token, and
//! the caller hands the response back through one of the `complete_*`
//! functions, which drop stale answers and never overwrite a user edit.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use tracing::{debug, warn};

use crate::combatant::{Combatant, CombatantId};
use crate::encounter::{Encounter, EncounterId};
use crate::player::{Player, PlayerId, DEFAULT_AC};
use crate::ports::{CharacterDetails, FetchError, MonsterDetails, StatFetcher};
use crate::Dice;

/// What a fetch is filling in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchTarget {
    Combatant { encounter: EncounterId, combatant: CombatantId },
    Player(PlayerId),
}

/// Which adventure load a fetch was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityToken {
    pub adventure: String,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub target: FetchTarget,
    pub reference: String,
    pub token: IdentityToken,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub fields: Vec<&'static str>,
    /// d20 roll plus bonus, when initiative was rolled on arrival.
    pub rolled_initiative: Option<i32>,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied(MergeReport),
    NotFound,
    /// Credentials for the remote site need refreshing.
    AuthFailed,
    Transient(String),
    /// The answer arrived for an adventure or row that is no longer current.
    Stale,
    AlreadyInFlight,
    NoReference,
}

impl FetchOutcome {
    fn from_error(err: FetchError) -> Self {
        match err {
            FetchError::NotFound => FetchOutcome::NotFound,
            FetchError::AuthFailed => FetchOutcome::AuthFailed,
            FetchError::Transient(msg) => FetchOutcome::Transient(msg),
        }
    }

    /// Message for the user; `None` when there is nothing worth saying.
    pub fn message(&self) -> Option<String> {
        match self {
            FetchOutcome::Applied(report) if report.is_empty() => None,
            FetchOutcome::Applied(report) => Some(format!("updated {}", report.fields.join(", "))),
            FetchOutcome::NotFound => Some("stats unavailable, enter manually".to_string()),
            FetchOutcome::AuthFailed => {
                Some("remote login expired, refresh your credentials".to_string())
            }
            FetchOutcome::Transient(msg) => {
                Some(format!("stats unavailable ({}), enter manually", msg))
            }
            FetchOutcome::Stale | FetchOutcome::AlreadyInFlight | FetchOutcome::NoReference => None,
        }
    }
}

/// Tracks which slots have a fetch outstanding.
#[derive(Debug, Default)]
pub struct Reconciler {
    in_flight: HashSet<FetchTarget>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self, target: &FetchTarget) -> bool {
        self.in_flight.contains(target)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Claim `target`. Fails if it has no reference or is already claimed.
    pub fn begin(
        &mut self,
        target: FetchTarget,
        reference: Option<&str>,
        token: IdentityToken,
    ) -> Result<FetchTicket, FetchOutcome> {
        let reference = match reference.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => r.to_string(),
            None => return Err(FetchOutcome::NoReference),
        };
        if !self.in_flight.insert(target.clone()) {
            debug!(?target, "fetch already in flight");
            return Err(FetchOutcome::AlreadyInFlight);
        }
        Ok(FetchTicket { target, reference, token })
    }

    /// Release the slot. Always called, whatever the response was.
    pub fn finish(&mut self, ticket: &FetchTicket) {
        self.in_flight.remove(&ticket.target);
    }

    /// Forget every claim, e.g. when the adventure is closed.
    pub fn clear(&mut self) {
        self.in_flight.clear();
    }
}

/// Fill monster fields still at their untouched defaults. A newly known
/// initiative bonus on a row with initiative 0 triggers an auto-roll.
pub fn merge_monster_details(
    combatant: &mut Combatant,
    details: &MonsterDetails,
    dice: &mut Dice,
) -> MergeReport {
    let mut report = MergeReport::default();

    if let Some(ac) = details.ac.filter(|ac| *ac != DEFAULT_AC && combatant.ac == DEFAULT_AC) {
        combatant.ac = ac;
        report.fields.push("ac");
    }
    if let Some(hp) = details.hp.filter(|hp| *hp > 0 && combatant.vitals.max_hp == 0) {
        combatant.vitals.max_hp = hp;
        combatant.vitals.current_hp = hp;
        report.fields.push("max_hp");
    }
    if let Some(cr) = details
        .cr
        .as_deref()
        .map(str::trim)
        .filter(|cr| !cr.is_empty() && combatant.cr.trim().is_empty())
    {
        combatant.cr = cr.to_string();
        report.fields.push("cr");
    }
    if let Some(bonus) = details.initiative_modifier.filter(|_| combatant.initiative_bonus.is_none()) {
        combatant.initiative_bonus = Some(bonus);
        report.fields.push("initiative_bonus");
        if combatant.initiative == 0 {
            let roll = dice.roll(20);
            combatant.initiative = roll + bonus;
            report.rolled_initiative = Some(combatant.initiative);
            report.fields.push("initiative");
        }
    }
    if let Some(url) = details.avatar_url.as_ref().filter(|_| combatant.avatar_url.is_none()) {
        combatant.avatar_url = Some(url.clone());
        report.fields.push("avatar_url");
    }
    report
}

fn check_current(ticket: &FetchTicket, current: Option<&IdentityToken>) -> bool {
    if current != Some(&ticket.token) {
        warn!(reference = %ticket.reference, "discarding stale fetch response");
        return false;
    }
    true
}

/// Apply a monster lookup to the row the ticket was issued for.
pub fn complete_monster_fetch(
    encounters: &mut [Encounter],
    ticket: &FetchTicket,
    current: Option<&IdentityToken>,
    result: Result<MonsterDetails, FetchError>,
    dice: &mut Dice,
) -> FetchOutcome {
    if !check_current(ticket, current) {
        return FetchOutcome::Stale;
    }
    let FetchTarget::Combatant { encounter, combatant } = &ticket.target else {
        return FetchOutcome::Stale;
    };
    let row = encounters
        .iter_mut()
        .find(|e| e.id == *encounter)
        .and_then(|e| e.find_mut(*combatant));
    let Some(row) = row else {
        warn!(reference = %ticket.reference, "combatant gone before its stats arrived");
        return FetchOutcome::Stale;
    };
    if row.remote_ref.as_deref() != Some(ticket.reference.as_str()) {
        warn!(reference = %ticket.reference, "combatant link changed while fetching");
        return FetchOutcome::Stale;
    }
    match result {
        Ok(details) if details.is_empty() => {
            warn!(reference = %ticket.reference, "lookup returned no usable stats");
            FetchOutcome::NotFound
        }
        Ok(details) => {
            let report = merge_monster_details(row, &details, dice);
            debug!(reference = %ticket.reference, fields = ?report.fields, "merged monster stats");
            FetchOutcome::Applied(report)
        }
        Err(err) => {
            warn!(reference = %ticket.reference, error = %err, "monster lookup failed");
            FetchOutcome::from_error(err)
        }
    }
}

/// Apply a character sheet lookup to the player the ticket was issued for.
pub fn complete_player_fetch(
    players: &mut [Player],
    ticket: &FetchTicket,
    current: Option<&IdentityToken>,
    result: Result<CharacterDetails, FetchError>,
) -> FetchOutcome {
    if !check_current(ticket, current) {
        return FetchOutcome::Stale;
    }
    let FetchTarget::Player(id) = &ticket.target else {
        return FetchOutcome::Stale;
    };
    let Some(player) = players.iter_mut().find(|p| &p.id == id) else {
        return FetchOutcome::Stale;
    };
    match result {
        Ok(details) => {
            let fields = player.merge_details(&details);
            debug!(player = %player.id, ?fields, "merged character sheet");
            FetchOutcome::Applied(MergeReport { fields, rolled_initiative: None })
        }
        Err(err) => {
            warn!(reference = %ticket.reference, error = %err, "character lookup failed");
            FetchOutcome::from_error(err)
        }
    }
}

/// Run monster lookups in parallel, issuing one request per distinct
/// reference and sharing its answer among every ticket that asked for it.
pub async fn fetch_monsters_deduplicated(
    fetcher: &dyn StatFetcher,
    tickets: Vec<FetchTicket>,
) -> Vec<(FetchTicket, Result<MonsterDetails, FetchError>)> {
    let mut unique: Vec<String> = Vec::new();
    for ticket in &tickets {
        if !unique.contains(&ticket.reference) {
            unique.push(ticket.reference.clone());
        }
    }
    let responses = join_all(unique.iter().map(|r| fetcher.fetch_monster(r))).await;
    let by_reference: HashMap<String, Result<MonsterDetails, FetchError>> =
        unique.into_iter().zip(responses).collect();
    tickets
        .into_iter()
        .map(|ticket| {
            let result = by_reference
                .get(&ticket.reference)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::Transient("no response".to_string())));
            (ticket, result)
        })
        .collect()
}

use crate::encounter::EncounterState;
use crate::ports::{FetchError, StoreError};

/// Input the console refuses before touching any state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("cannot {action} while the encounter is {state}")]
    IllegalTransition { action: &'static str, state: EncounterState },

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange { field: &'static str, value: i32, min: i32, max: i32 },

    #[error("PIN must be exactly 4 digits")]
    InvalidPin,

    #[error("name must not be empty")]
    EmptyName,

    #[error("chapter already exists: {0}")]
    DuplicateChapter(String),

    #[error("chapter not found: {0}")]
    UnknownChapter(String),

    #[error("cannot delete the last chapter")]
    LastChapter,

    #[error("encounter not found")]
    UnknownEncounter,

    #[error("combatant not found")]
    UnknownCombatant,

    #[error("player not found")]
    UnknownPlayer,

    #[error("player combatants take their name from the player list")]
    PlayerNameIsDerived,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no adventure is open")]
    NoAdventure,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store refused a save because the PIN session changed since load.
    #[error("session expired, re-enter the adventure PIN to keep saving")]
    SessionExpired,

    #[error("storage error: {0}")]
    Store(StoreError),

    #[error("stat lookup failed: {0}")]
    Fetch(#[from] FetchError),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Forbidden { .. } => SessionError::SessionExpired,
            other => SessionError::Store(other),
        }
    }
}

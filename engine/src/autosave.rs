//! Debounced persistence. The host owns the timer: it calls
//! [`Autosave::mark_dirty`] on every edit and polls [`Autosave::is_due`]
//! (or flushes directly when leaving).

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::adventure::Adventure;
use crate::error::SessionError;
use crate::ports::{AdventureStore, StoreError};

/// Edit count captured when a save starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTicket {
    edits: u64,
}

#[derive(Debug)]
pub struct Autosave {
    quiet: Duration,
    last_edit: Option<Instant>,
    edits: u64,
    saved_edits: u64,
    suspended: bool,
}

impl Autosave {
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, last_edit: None, edits: 0, saved_edits: 0, suspended: false }
    }

    /// Each edit restarts the quiet period.
    pub fn mark_dirty(&mut self, now: Instant) {
        self.edits += 1;
        self.last_edit = Some(now);
    }

    pub fn is_dirty(&self) -> bool {
        self.edits != self.saved_edits
    }

    /// Saving stopped after the store rejected the session.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn is_due(&self, now: Instant) -> bool {
        !self.suspended
            && self.is_dirty()
            && self
                .last_edit
                .is_some_and(|at| now.saturating_duration_since(at) >= self.quiet)
    }

    pub fn begin_save(&self) -> SaveTicket {
        SaveTicket { edits: self.edits }
    }

    /// Record the store's answer. Edits made while the save was in flight
    /// keep the state dirty so the next save picks them up.
    pub fn finish_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<(), StoreError>,
    ) -> Result<(), SessionError> {
        match result {
            Ok(()) => {
                self.saved_edits = self.saved_edits.max(ticket.edits);
                if !self.is_dirty() {
                    self.last_edit = None;
                }
                Ok(())
            }
            Err(err @ StoreError::Forbidden { .. }) => {
                warn!(error = %err, "save rejected; autosave suspended until re-authentication");
                self.suspended = true;
                Err(err.into())
            }
            Err(err) => {
                warn!(error = %err, "save failed");
                Err(err.into())
            }
        }
    }

    /// Re-enable saving after the user re-authenticated.
    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Forget pending edits, e.g. after loading a different adventure.
    pub fn reset(&mut self) {
        self.last_edit = None;
        self.edits = 0;
        self.saved_edits = 0;
        self.suspended = false;
    }

    /// Save now if anything changed. Returns whether a save was issued.
    pub async fn flush(
        &mut self,
        store: &dyn AdventureStore,
        adventure: &Adventure,
    ) -> Result<bool, SessionError> {
        if !self.is_dirty() {
            return Ok(false);
        }
        if self.suspended {
            return Err(SessionError::SessionExpired);
        }
        let ticket = self.begin_save();
        debug!(adventure = %adventure.name, edits = ticket.edits, "saving adventure");
        let result = store.save(&adventure.name, adventure).await;
        self.finish_save(ticket, result)?;
        info!(adventure = %adventure.name, "adventure saved");
        Ok(true)
    }
}

//! In-memory confirmation store.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{ConfirmationDraft, ConfirmationSession, Quote, SessionId};
use crate::error::{Error, Result};
use crate::port::outbound::clock::{span, Clock};
use crate::port::outbound::store::{CleanableStore, ConfirmationSettings, ConfirmationStore};

/// Confirmation sessions held in a concurrent map.
#[derive(Debug)]
pub struct MemoryConfirmationStore {
    sessions: DashMap<SessionId, ConfirmationSession>,
    settings: ConfirmationSettings,
    clock: Arc<dyn Clock>,
}

impl MemoryConfirmationStore {
    #[must_use]
    pub fn new(settings: ConfirmationSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            settings,
            clock,
        }
    }

    /// Number of stored sessions, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn insert(&self, session: ConfirmationSession) -> Result<SessionId> {
        match self.sessions.entry(session.session_id.clone()) {
            Entry::Occupied(_) => Err(Error::SessionCollision),
            Entry::Vacant(slot) => {
                let id = session.session_id.clone();
                slot.insert(session);
                Ok(id)
            }
        }
    }
}

impl ConfirmationStore for MemoryConfirmationStore {
    fn store(&self, draft: ConfirmationDraft) -> Result<SessionId> {
        let now = self.clock.now();
        let session = ConfirmationSession::from_draft(
            SessionId::generate(),
            draft,
            now,
            now + span(self.settings.ttl),
        );
        self.insert(session)
    }

    fn get(&self, session_id: &SessionId) -> Result<Option<ConfirmationSession>> {
        let now = self.clock.now();
        Ok(self
            .sessions
            .get(session_id)
            .filter(|session| session.is_live(now))
            .map(|session| session.value().clone()))
    }

    fn consume(&self, session_id: &SessionId) -> Result<Option<ConfirmationSession>> {
        let now = self.clock.now();
        Ok(self
            .sessions
            .remove_if(session_id, |_, session| session.is_live(now))
            .map(|(_, session)| session))
    }

    fn update_quote(&self, session_id: &SessionId, quote: Quote) -> Result<bool> {
        let now = self.clock.now();
        let Some(mut session) = self.sessions.get_mut(session_id) else {
            return Ok(false);
        };
        if !session.is_live(now) || session.reconfirm_count >= self.settings.max_reconfirms {
            return Ok(false);
        }
        session.quote = quote;
        session.reconfirm_count += 1;
        session.expires_at = now + span(self.settings.ttl);
        Ok(true)
    }

    fn cancel(&self, session_id: &SessionId) -> Result<bool> {
        Ok(self.sessions.remove(session_id).is_some())
    }

    fn settings(&self) -> ConfirmationSettings {
        self.settings
    }
}

impl CleanableStore for MemoryConfirmationStore {
    fn delete_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.is_live(now));
        Ok(before.saturating_sub(self.sessions.len()))
    }

    fn store_name(&self) -> &'static str {
        "confirmations"
    }
}

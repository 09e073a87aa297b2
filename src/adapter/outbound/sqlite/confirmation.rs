//! SQLite confirmation store.

use std::str::FromStr;
use std::sync::Arc;

use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rust_decimal::Decimal;

use super::database::connection::{checkout, DbPool};
use super::database::model::{from_millis, to_millis, ConfirmationRow};
use super::database::schema::confirmation_sessions::dsl;
use crate::domain::{
    ConfirmationDraft, ConfirmationKind, ConfirmationSession, Quote, SessionId, SubjectId,
};
use crate::error::{Error, Result};
use crate::port::outbound::clock::{span, Clock};
use crate::port::outbound::store::{CleanableStore, ConfirmationSettings, ConfirmationStore};

/// Confirmation sessions persisted in SQLite.
pub struct SqliteConfirmationStore {
    pool: DbPool,
    settings: ConfirmationSettings,
    clock: Arc<dyn Clock>,
}

impl SqliteConfirmationStore {
    #[must_use]
    pub fn new(pool: DbPool, settings: ConfirmationSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            settings,
            clock,
        }
    }

    fn to_row(session: &ConfirmationSession) -> Result<ConfirmationRow> {
        Ok(ConfirmationRow {
            session_id: session.session_id.as_str().to_string(),
            subject_id: session.subject_id.as_str().to_string(),
            kind: session.kind.as_str().to_string(),
            amount: session.amount.to_string(),
            asset: session.asset.clone(),
            quote_json: serde_json::to_string(&session.quote)?,
            created_at: to_millis(session.created_at),
            expires_at: to_millis(session.expires_at),
            reconfirm_count: i32::try_from(session.reconfirm_count)
                .map_err(|e| Error::Database(e.to_string()))?,
        })
    }

    fn from_row(row: ConfirmationRow) -> Result<ConfirmationSession> {
        let kind = ConfirmationKind::from_str(&row.kind).map_err(Error::Database)?;
        let amount =
            Decimal::from_str(&row.amount).map_err(|e| Error::Database(e.to_string()))?;
        let quote: Quote = serde_json::from_str(&row.quote_json)?;
        Ok(ConfirmationSession {
            session_id: SessionId::from(row.session_id),
            subject_id: SubjectId::from(row.subject_id),
            kind,
            amount,
            asset: row.asset,
            quote,
            created_at: from_millis(row.created_at)?,
            expires_at: from_millis(row.expires_at)?,
            reconfirm_count: u32::try_from(row.reconfirm_count)
                .map_err(|e| Error::Database(e.to_string()))?,
        })
    }

    fn insert(&self, session: &ConfirmationSession) -> Result<SessionId> {
        let row = Self::to_row(session)?;
        let mut conn = checkout(&self.pool)?;
        match diesel::insert_into(dsl::confirmation_sessions)
            .values(&row)
            .execute(&mut conn)
        {
            Ok(_) => Ok(session.session_id.clone()),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(Error::SessionCollision)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl ConfirmationStore for SqliteConfirmationStore {
    fn store(&self, draft: ConfirmationDraft) -> Result<SessionId> {
        let now = self.clock.now();
        let session = ConfirmationSession::from_draft(
            SessionId::generate(),
            draft,
            now,
            now + span(self.settings.ttl),
        );
        self.insert(&session)
    }

    fn get(&self, session_id: &SessionId) -> Result<Option<ConfirmationSession>> {
        let now = to_millis(self.clock.now());
        let mut conn = checkout(&self.pool)?;
        let row: Option<ConfirmationRow> = dsl::confirmation_sessions
            .find(session_id.as_str())
            .filter(dsl::expires_at.gt(now))
            .first(&mut conn)
            .optional()?;
        row.map(Self::from_row).transpose()
    }

    fn consume(&self, session_id: &SessionId) -> Result<Option<ConfirmationSession>> {
        let now = to_millis(self.clock.now());
        let mut conn = checkout(&self.pool)?;
        let row = conn.immediate_transaction(|conn| {
            let row: Option<ConfirmationRow> = dsl::confirmation_sessions
                .find(session_id.as_str())
                .filter(dsl::expires_at.gt(now))
                .first(conn)
                .optional()?;
            if row.is_some() {
                diesel::delete(dsl::confirmation_sessions.find(session_id.as_str()))
                    .execute(conn)?;
            }
            Ok::<_, DieselError>(row)
        })?;
        row.map(Self::from_row).transpose()
    }

    fn update_quote(&self, session_id: &SessionId, quote: Quote) -> Result<bool> {
        let now = self.clock.now();
        let max = i32::try_from(self.settings.max_reconfirms).unwrap_or(i32::MAX);
        let quote_json = serde_json::to_string(&quote)?;
        let mut conn = checkout(&self.pool)?;
        let updated = diesel::update(
            dsl::confirmation_sessions
                .find(session_id.as_str())
                .filter(dsl::expires_at.gt(to_millis(now)))
                .filter(dsl::reconfirm_count.lt(max)),
        )
        .set((
            dsl::quote_json.eq(quote_json),
            dsl::reconfirm_count.eq(dsl::reconfirm_count + 1),
            dsl::expires_at.eq(to_millis(now + span(self.settings.ttl))),
        ))
        .execute(&mut conn)?;
        Ok(updated > 0)
    }

    fn cancel(&self, session_id: &SessionId) -> Result<bool> {
        let mut conn = checkout(&self.pool)?;
        let deleted = diesel::delete(dsl::confirmation_sessions.find(session_id.as_str()))
            .execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn settings(&self) -> ConfirmationSettings {
        self.settings
    }
}

impl CleanableStore for SqliteConfirmationStore {
    fn delete_expired(&self) -> Result<usize> {
        let now = to_millis(self.clock.now());
        let mut conn = checkout(&self.pool)?;
        Ok(
            diesel::delete(dsl::confirmation_sessions.filter(dsl::expires_at.le(now)))
                .execute(&mut conn)?,
        )
    }

    fn store_name(&self) -> &'static str {
        "confirmations"
    }
}

//! SQL implementation of [`Store`].
//!
//! Timestamps are stored as Unix milliseconds and ids as text because the
//! `Any` driver cannot decode chrono or uuid types. Every multi-row change
//! runs in one transaction guarded by conditional `UPDATE`s, so concurrent
//! writers on PostgreSQL or SQLite cannot overbook a slot.

use crate::client::{DbClient, DbTransaction};
use crate::error::DbError;
use chrono::{DateTime, Utc};
use meetsync_common::models::{
    Booking, BookingStatus, CalendarSyncStatus, Lead, Proposal, ProposalStatus, Slot,
    SlotSyncStatus,
};
use meetsync_common::{
    BookingFilter, BoxFuture, ClaimOutcome, ClaimRequest, SlotTransition, Store, StoreError,
};
use sqlx::any::AnyRow;
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info, warn};
use uuid::Uuid;

const SCHEMA: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS meeting_slots (
        id TEXT PRIMARY KEY,
        start_time BIGINT NOT NULL,
        end_time BIGINT NOT NULL,
        capacity BIGINT NOT NULL,
        claimed_count BIGINT NOT NULL DEFAULT 0,
        owner_calendar_id TEXT NOT NULL,
        remote_event_id TEXT,
        sync_status TEXT NOT NULL,
        last_synced_at BIGINT,
        created_at BIGINT NOT NULL,
        UNIQUE (owner_calendar_id, start_time, end_time)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS meeting_proposals (
        token TEXT PRIMARY KEY,
        lead_id TEXT NOT NULL,
        issued_at BIGINT NOT NULL,
        expires_at BIGINT NOT NULL,
        redeemed_at BIGINT,
        status TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS meeting_proposal_slots (
        token TEXT NOT NULL,
        slot_id TEXT NOT NULL,
        position BIGINT NOT NULL,
        PRIMARY KEY (token, slot_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS meeting_bookings (
        id TEXT PRIMARY KEY,
        slot_id TEXT NOT NULL,
        lead_id TEXT NOT NULL,
        token TEXT NOT NULL,
        status TEXT NOT NULL,
        calendar_sync_status TEXT NOT NULL,
        remote_event_id TEXT,
        join_link TEXT,
        agenda TEXT,
        created_at BIGINT NOT NULL,
        updated_at BIGINT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS leads (
        id TEXT PRIMARY KEY,
        contact_name TEXT NOT NULL,
        email TEXT NOT NULL,
        company_name TEXT,
        phone TEXT
    )
    "#,
];

const SLOT_COLUMNS: &str = "id, start_time, end_time, capacity, claimed_count, owner_calendar_id, \
     remote_event_id, sync_status, last_synced_at, created_at";

const BOOKING_COLUMNS: &str = "id, slot_id, lead_id, token, status, calendar_sync_status, \
     remote_event_id, join_link, agenda, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SqlStore {
    db_client: DbClient,
}

impl SqlStore {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    /// Creates the tables if they do not exist yet.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing meeting schema");
        for statement in SCHEMA {
            self.db_client.execute(statement).await?;
        }
        info!("Meeting schema initialized successfully");
        Ok(())
    }

    async fn fetch_booking(
        tx: &mut DbTransaction<'static>,
        id: Uuid,
    ) -> Result<Option<Booking>, DbError> {
        let query = format!("SELECT {BOOKING_COLUMNS} FROM meeting_bookings WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(&mut **tx)
            .await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    /// Distinguishes "no such booking" from "booking in the wrong state"
    /// after a guarded update touched no rows.
    async fn booking_state_error(
        tx: &mut DbTransaction<'static>,
        id: Uuid,
    ) -> Result<StoreError, DbError> {
        Ok(match Self::fetch_booking(tx, id).await? {
            Some(booking) => {
                StoreError::InvalidState(format!("booking {id} is {}", booking.status))
            }
            None => StoreError::NotFound(format!("booking {id}")),
        })
    }

    async fn release_claim(tx: &mut DbTransaction<'static>, slot_id: Uuid) -> Result<(), DbError> {
        let released = sqlx::query(
            "UPDATE meeting_slots SET claimed_count = claimed_count - 1 \
             WHERE id = $1 AND claimed_count > 0",
        )
        .bind(slot_id.to_string())
        .execute(&mut **tx)
        .await?;
        if released.rows_affected() == 0 {
            warn!(%slot_id, "No claim to release on slot");
        }
        Ok(())
    }

    async fn load_slot_ids(&self, token: &str) -> Result<Vec<Uuid>, DbError> {
        let rows = sqlx::query(
            "SELECT slot_id FROM meeting_proposal_slots WHERE token = $1 ORDER BY position",
        )
        .bind(token)
        .fetch_all(self.db_client.pool())
        .await?;
        rows.iter()
            .map(|row| parse_uuid(&row.try_get::<String, _>("slot_id")?))
            .collect()
    }

    async fn slots_where(&self, clause: &str, binds: &[i64]) -> Result<Vec<Slot>, DbError> {
        let query = format!(
            "SELECT {SLOT_COLUMNS} FROM meeting_slots WHERE {clause} ORDER BY start_time, id"
        );
        let mut q = sqlx::query(&query);
        for value in binds {
            q = q.bind(*value);
        }
        let rows = q.fetch_all(self.db_client.pool()).await?;
        rows.iter().map(slot_from_row).collect()
    }

    async fn claim(&self, request: ClaimRequest) -> Result<ClaimOutcome, DbError> {
        let now = to_millis(request.now);
        let slot_id = request.slot_id.to_string();
        let mut tx = self.db_client.begin().await?;

        let taken = sqlx::query(
            "UPDATE meeting_slots SET claimed_count = claimed_count + 1 \
             WHERE id = $1 AND claimed_count < capacity AND start_time > $2 \
             AND sync_status NOT IN ('BUSY', 'CANCELLED', 'ERROR')",
        )
        .bind(&slot_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        if taken.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(ClaimOutcome::SlotUnavailable);
        }

        let redeemed = sqlx::query(
            "UPDATE meeting_proposals SET status = 'REDEEMED', redeemed_at = $1 \
             WHERE token = $2 AND status = 'ACTIVE' AND expires_at > $3 \
             AND EXISTS (SELECT 1 FROM meeting_proposal_slots ps \
                         WHERE ps.token = $4 AND ps.slot_id = $5)",
        )
        .bind(now)
        .bind(&request.token)
        .bind(now)
        .bind(&request.token)
        .bind(&slot_id)
        .execute(&mut *tx)
        .await?;
        if redeemed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(ClaimOutcome::TokenNotRedeemable);
        }

        let booking = request.booking;
        let query = format!(
            "INSERT INTO meeting_bookings ({BOOKING_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&query)
            .bind(booking.id.to_string())
            .bind(&slot_id)
            .bind(&booking.lead_id)
            .bind(&booking.token)
            .bind(booking.status.as_str())
            .bind(booking.calendar_sync_status.as_str())
            .bind(booking.remote_event_id.clone())
            .bind(booking.join_link.clone())
            .bind(booking.agenda.clone())
            .bind(to_millis(booking.created_at))
            .bind(to_millis(booking.updated_at))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(booking_id = %booking.id, %slot_id, "Slot claimed");
        Ok(ClaimOutcome::Claimed(booking))
    }

    async fn update_booking(
        &self,
        booking_id: Uuid,
        guarded_update: &str,
        binds: Vec<Option<String>>,
        now: DateTime<Utc>,
        release: bool,
        reactivate_token: bool,
    ) -> Result<Result<Booking, StoreError>, DbError> {
        let mut tx = self.db_client.begin().await?;

        // Placeholders: $1.. for `binds`, then updated_at, then id.
        let mut q = sqlx::query(guarded_update);
        for value in binds {
            q = q.bind(value);
        }
        let updated = q
            .bind(to_millis(now))
            .bind(booking_id.to_string())
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            let err = Self::booking_state_error(&mut tx, booking_id).await?;
            tx.rollback().await?;
            return Ok(Err(err));
        }

        let booking = Self::fetch_booking(&mut tx, booking_id)
            .await?
            .ok_or_else(|| DbError::QueryError(format!("booking {booking_id} vanished")))?;

        if release {
            Self::release_claim(&mut tx, booking.slot_id).await?;
        }
        if reactivate_token {
            sqlx::query(
                "UPDATE meeting_proposals SET status = 'ACTIVE', redeemed_at = NULL \
                 WHERE token = $1 AND status = 'REDEEMED'",
            )
            .bind(&booking.token)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Ok(booking))
    }
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| DbError::DecodeError(format!("timestamp out of range: {ms}")))
}

fn opt_from_millis(ms: Option<i64>) -> Result<Option<DateTime<Utc>>, DbError> {
    ms.map(from_millis).transpose()
}

fn parse_uuid(raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::DecodeError(format!("invalid id {raw}: {e}")))
}

fn parse_status<T: FromStr>(raw: &str) -> Result<T, DbError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| DbError::DecodeError(e.to_string()))
}

fn to_u32(value: i64, column: &str) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|_| DbError::DecodeError(format!("{column} out of range: {value}")))
}

fn slot_from_row(row: &AnyRow) -> Result<Slot, DbError> {
    Ok(Slot {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        start_time: from_millis(row.try_get("start_time")?)?,
        end_time: from_millis(row.try_get("end_time")?)?,
        capacity: to_u32(row.try_get("capacity")?, "capacity")?,
        claimed_count: to_u32(row.try_get("claimed_count")?, "claimed_count")?,
        owner_calendar_id: row.try_get("owner_calendar_id")?,
        remote_event_id: row.try_get("remote_event_id")?,
        sync_status: parse_status::<SlotSyncStatus>(&row.try_get::<String, _>("sync_status")?)?,
        last_synced_at: opt_from_millis(row.try_get("last_synced_at")?)?,
        created_at: from_millis(row.try_get("created_at")?)?,
    })
}

fn booking_from_row(row: &AnyRow) -> Result<Booking, DbError> {
    Ok(Booking {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        slot_id: parse_uuid(&row.try_get::<String, _>("slot_id")?)?,
        lead_id: row.try_get("lead_id")?,
        token: row.try_get("token")?,
        status: parse_status::<BookingStatus>(&row.try_get::<String, _>("status")?)?,
        calendar_sync_status: parse_status::<CalendarSyncStatus>(
            &row.try_get::<String, _>("calendar_sync_status")?,
        )?,
        remote_event_id: row.try_get("remote_event_id")?,
        join_link: row.try_get("join_link")?,
        agenda: row.try_get("agenda")?,
        created_at: from_millis(row.try_get("created_at")?)?,
        updated_at: from_millis(row.try_get("updated_at")?)?,
    })
}

fn lead_from_row(row: &AnyRow) -> Result<Lead, DbError> {
    Ok(Lead {
        id: row.try_get("id")?,
        contact_name: row.try_get("contact_name")?,
        email: row.try_get("email")?,
        company_name: row.try_get("company_name")?,
        phone: row.try_get("phone")?,
    })
}

/// `$start, $start+1, ...` for `count` positional parameters.
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Store for SqlStore {
    fn insert_slot_if_absent(&self, slot: Slot) -> BoxFuture<'_, Option<Slot>, StoreError> {
        Box::pin(async move {
            let query = format!(
                "INSERT INTO meeting_slots ({SLOT_COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                 ON CONFLICT (owner_calendar_id, start_time, end_time) DO NOTHING"
            );
            let result = sqlx::query(&query)
                .bind(slot.id.to_string())
                .bind(to_millis(slot.start_time))
                .bind(to_millis(slot.end_time))
                .bind(i64::from(slot.capacity))
                .bind(i64::from(slot.claimed_count))
                .bind(&slot.owner_calendar_id)
                .bind(slot.remote_event_id.clone())
                .bind(slot.sync_status.as_str())
                .bind(slot.last_synced_at.map(to_millis))
                .bind(to_millis(slot.created_at))
                .execute(self.db_client.pool())
                .await
                .map_err(DbError::from)?;
            Ok((result.rows_affected() > 0).then_some(slot))
        })
    }

    fn get_slot(&self, id: Uuid) -> BoxFuture<'_, Option<Slot>, StoreError> {
        Box::pin(async move {
            let query = format!("SELECT {SLOT_COLUMNS} FROM meeting_slots WHERE id = $1");
            let row = sqlx::query(&query)
                .bind(id.to_string())
                .fetch_optional(self.db_client.pool())
                .await
                .map_err(DbError::from)?;
            Ok(row.as_ref().map(slot_from_row).transpose()?)
        })
    }

    fn get_slots<'a>(&'a self, ids: &'a [Uuid]) -> BoxFuture<'a, Vec<Slot>, StoreError> {
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let query = format!(
                "SELECT {SLOT_COLUMNS} FROM meeting_slots WHERE id IN ({})",
                placeholders(1, ids.len())
            );
            let mut q = sqlx::query(&query);
            for id in ids {
                q = q.bind(id.to_string());
            }
            let rows = q
                .fetch_all(self.db_client.pool())
                .await
                .map_err(DbError::from)?;
            let found = rows.iter().map(slot_from_row).collect::<Result<Vec<_>, _>>()?;
            Ok(ids
                .iter()
                .filter_map(|id| found.iter().find(|s| s.id == *id).cloned())
                .collect())
        })
    }

    fn list_slots(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<Slot>, StoreError> {
        Box::pin(async move {
            Ok(self
                .slots_where("start_time >= $1 AND start_time < $2", &[
                    to_millis(from),
                    to_millis(to),
                ])
                .await?)
        })
    }

    fn list_reconcilable_slots(&self, from: DateTime<Utc>) -> BoxFuture<'_, Vec<Slot>, StoreError> {
        Box::pin(async move {
            Ok(self
                .slots_where("start_time >= $1 AND sync_status <> 'CANCELLED'", &[
                    to_millis(from),
                ])
                .await?)
        })
    }

    fn transition_slot(&self, transition: SlotTransition) -> BoxFuture<'_, bool, StoreError> {
        Box::pin(async move {
            if transition.from.is_empty() {
                return Ok(false);
            }
            let query = format!(
                "UPDATE meeting_slots SET sync_status = $1, remote_event_id = $2, last_synced_at = $3 \
                 WHERE id = $4 AND sync_status IN ({})",
                placeholders(5, transition.from.len())
            );
            let slot_id = transition.slot_id.to_string();
            let mut q = sqlx::query(&query)
                .bind(transition.to.as_str())
                .bind(transition.remote_event_id.clone())
                .bind(to_millis(transition.synced_at))
                .bind(&slot_id);
            for status in &transition.from {
                q = q.bind(status.as_str());
            }
            let result = q
                .execute(self.db_client.pool())
                .await
                .map_err(DbError::from)?;
            if result.rows_affected() > 0 {
                return Ok(true);
            }

            let exists = sqlx::query("SELECT id FROM meeting_slots WHERE id = $1")
                .bind(&slot_id)
                .fetch_optional(self.db_client.pool())
                .await
                .map_err(DbError::from)?;
            match exists {
                Some(_) => Ok(false),
                None => Err(StoreError::NotFound(format!("slot {slot_id}"))),
            }
        })
    }

    fn insert_proposal(&self, proposal: Proposal) -> BoxFuture<'_, (), StoreError> {
        Box::pin(async move {
            let mut tx = self.db_client.begin().await?;
            let inserted = sqlx::query(
                "INSERT INTO meeting_proposals (token, lead_id, issued_at, expires_at, redeemed_at, status) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&proposal.token)
            .bind(&proposal.lead_id)
            .bind(to_millis(proposal.issued_at))
            .bind(to_millis(proposal.expires_at))
            .bind(proposal.redeemed_at.map(to_millis))
            .bind(proposal.status.as_str())
            .execute(&mut *tx)
            .await;
            if let Err(e) = inserted {
                return Err(match e {
                    sqlx::Error::Database(db) if db.is_unique_violation() => {
                        StoreError::Duplicate("proposal token".to_string())
                    }
                    other => DbError::from(other).into(),
                });
            }

            for (position, slot_id) in proposal.slot_ids.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO meeting_proposal_slots (token, slot_id, position) VALUES ($1, $2, $3)",
                )
                .bind(&proposal.token)
                .bind(slot_id.to_string())
                .bind(position as i64)
                .execute(&mut *tx)
                .await
                .map_err(DbError::from)?;
            }
            tx.commit().await.map_err(DbError::from)?;
            Ok(())
        })
    }

    fn get_proposal<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Option<Proposal>, StoreError> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT token, lead_id, issued_at, expires_at, redeemed_at, status \
                 FROM meeting_proposals WHERE token = $1",
            )
            .bind(token)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(DbError::from)?;
            let Some(row) = row else {
                return Ok(None);
            };

            let proposal = Proposal {
                token: row.try_get("token").map_err(DbError::from)?,
                lead_id: row.try_get("lead_id").map_err(DbError::from)?,
                slot_ids: self.load_slot_ids(token).await?,
                issued_at: from_millis(row.try_get("issued_at").map_err(DbError::from)?)?,
                expires_at: from_millis(row.try_get("expires_at").map_err(DbError::from)?)?,
                redeemed_at: opt_from_millis(row.try_get("redeemed_at").map_err(DbError::from)?)?,
                status: parse_status::<ProposalStatus>(
                    &row.try_get::<String, _>("status").map_err(DbError::from)?,
                )?,
            };
            Ok(Some(proposal))
        })
    }

    fn revoke_proposal<'a>(
        &'a self,
        token: &'a str,
        now: DateTime<Utc>,
    ) -> BoxFuture<'a, bool, StoreError> {
        Box::pin(async move {
            let result = sqlx::query(
                "UPDATE meeting_proposals SET status = 'REVOKED' \
                 WHERE token = $1 AND status = 'ACTIVE' AND expires_at > $2",
            )
            .bind(token)
            .bind(to_millis(now))
            .execute(self.db_client.pool())
            .await
            .map_err(DbError::from)?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn claim_slot(&self, request: ClaimRequest) -> BoxFuture<'_, ClaimOutcome, StoreError> {
        Box::pin(async move { Ok(self.claim(request).await?) })
    }

    fn confirm_booking(
        &self,
        booking_id: Uuid,
        remote_event_id: String,
        join_link: Option<String>,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Booking, StoreError> {
        Box::pin(async move {
            self.update_booking(
                booking_id,
                "UPDATE meeting_bookings SET status = 'CONFIRMED', calendar_sync_status = 'SYNCED', \
                 remote_event_id = $1, join_link = $2, updated_at = $3 \
                 WHERE id = $4 AND status = 'PENDING'",
                vec![Some(remote_event_id), join_link],
                now,
                false,
                false,
            )
            .await?
        })
    }

    fn compensate_booking(
        &self,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Booking, StoreError> {
        Box::pin(async move {
            self.update_booking(
                booking_id,
                "UPDATE meeting_bookings SET status = 'FAILED', calendar_sync_status = 'ERROR', \
                 updated_at = $1 WHERE id = $2 AND status = 'PENDING'",
                Vec::new(),
                now,
                true,
                true,
            )
            .await?
        })
    }

    fn cancel_booking(&self, booking_id: Uuid, now: DateTime<Utc>) -> BoxFuture<'_, Booking, StoreError> {
        Box::pin(async move {
            self.update_booking(
                booking_id,
                "UPDATE meeting_bookings SET status = 'CANCELLED', updated_at = $1 \
                 WHERE id = $2 AND status = 'CONFIRMED'",
                Vec::new(),
                now,
                true,
                false,
            )
            .await?
        })
    }

    fn get_booking(&self, id: Uuid) -> BoxFuture<'_, Option<Booking>, StoreError> {
        Box::pin(async move {
            let query = format!("SELECT {BOOKING_COLUMNS} FROM meeting_bookings WHERE id = $1");
            let row = sqlx::query(&query)
                .bind(id.to_string())
                .fetch_optional(self.db_client.pool())
                .await
                .map_err(DbError::from)?;
            Ok(row.as_ref().map(booking_from_row).transpose()?)
        })
    }

    fn list_bookings(&self, filter: BookingFilter) -> BoxFuture<'_, Vec<Booking>, StoreError> {
        Box::pin(async move {
            let mut clauses = Vec::new();
            let mut binds = Vec::new();
            if let Some(status) = filter.status {
                binds.push(status.as_str().to_string());
                clauses.push(format!("status = ${}", binds.len()));
            }
            if let Some(slot_id) = filter.slot_id {
                binds.push(slot_id.to_string());
                clauses.push(format!("slot_id = ${}", binds.len()));
            }
            let where_clause = if clauses.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", clauses.join(" AND "))
            };
            let query = format!(
                "SELECT {BOOKING_COLUMNS} FROM meeting_bookings {where_clause} ORDER BY created_at, id"
            );
            let mut q = sqlx::query(&query);
            for value in binds {
                q = q.bind(value);
            }
            let rows = q
                .fetch_all(self.db_client.pool())
                .await
                .map_err(DbError::from)?;
            Ok(rows.iter().map(booking_from_row).collect::<Result<_, _>>()?)
        })
    }

    fn list_stale_bookings(
        &self,
        older_than: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<Booking>, StoreError> {
        Box::pin(async move {
            let query = format!(
                "SELECT {BOOKING_COLUMNS} FROM meeting_bookings \
                 WHERE status = 'PENDING' AND updated_at < $1 ORDER BY created_at, id"
            );
            let rows = sqlx::query(&query)
                .bind(to_millis(older_than))
                .fetch_all(self.db_client.pool())
                .await
                .map_err(DbError::from)?;
            Ok(rows.iter().map(booking_from_row).collect::<Result<_, _>>()?)
        })
    }

    fn find_lead<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Option<Lead>, StoreError> {
        Box::pin(async move {
            let row = sqlx::query(
                "SELECT id, contact_name, email, company_name, phone FROM leads WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(DbError::from)?;
            Ok(row.as_ref().map(lead_from_row).transpose()?)
        })
    }

    fn upsert_lead(&self, lead: Lead) -> BoxFuture<'_, (), StoreError> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO leads (id, contact_name, email, company_name, phone) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (id) DO UPDATE SET contact_name = excluded.contact_name, \
                 email = excluded.email, company_name = excluded.company_name, phone = excluded.phone",
            )
            .bind(&lead.id)
            .bind(&lead.contact_name)
            .bind(&lead.email)
            .bind(lead.company_name.clone())
            .bind(lead.phone.clone())
            .execute(self.db_client.pool())
            .await
            .map_err(DbError::from)?;
            Ok(())
        })
    }
}

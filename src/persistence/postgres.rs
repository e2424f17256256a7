//! PostgreSQL implementation of the persistence layer.
//!
//! The decision path runs as a single transaction: token consumption
//! (conditional on `used = FALSE`) and the offer status update
//! (conditional on `status = 'pending'`) either both commit or neither
//! does, so two concurrent attempts yield exactly one success.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{DecisionOutcome, DecisionRequest};
use super::store::OfferStore;
use crate::domain::offer::{Offer, OfferStatus};
use crate::domain::offer_id::OfferId;
use crate::domain::rental::{Booking, RentalItem};
use crate::domain::token::IssuedToken;
use crate::error::ApiError;

/// Raw `offers` row as selected from the database.
type OfferRow = (
    Uuid,
    Uuid,
    Uuid,
    i64,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl OfferStore for PostgresStore {
    async fn insert_offer(&self, offer: &Offer) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO offers (id, order_id, user_id, amount_minor, description, status, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(Uuid::from(offer.id))
        .bind(offer.order_id)
        .bind(offer.user_id)
        .bind(offer.amount_minor)
        .bind(&offer.description)
        .bind(offer.status.as_str())
        .bind(offer.created_at)
        .bind(offer.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

        Ok(())
    }

    async fn fetch_offer(&self, offer_id: OfferId) -> Result<Option<Offer>, ApiError> {
        let row: Option<OfferRow> = sqlx::query_as(
            "SELECT id, order_id, user_id, amount_minor, description, status, rejection_reason, created_at, expires_at \
             FROM offers WHERE id = $1",
        )
        .bind(Uuid::from(offer_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

        row.map(map_offer_row).transpose()
    }

    // The caller's clock decided the deadline was hit, so the same
    // instant gates the write; re-checking against the database clock
    // could silently skip the sweep under skew.
    async fn mark_expired(&self, offer_id: OfferId, now: DateTime<Utc>) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE offers SET status = 'expired' \
             WHERE id = $1 AND status = 'pending' AND expires_at IS NOT NULL AND expires_at < $2",
        )
        .bind(Uuid::from(offer_id))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    // One statement, so list reads never report a stale `pending`.
    async fn expire_due_for_user(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let result = sqlx::query(
            "UPDATE offers SET status = 'expired' \
             WHERE user_id = $1 AND status = 'pending' AND expires_at IS NOT NULL AND expires_at < NOW()",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn list_offers_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Offer>, i64), ApiError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM offers WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

        let rows: Vec<OfferRow> = sqlx::query_as(
            "SELECT id, order_id, user_id, amount_minor, description, status, rejection_reason, created_at, expires_at \
             FROM offers WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

        let offers = rows
            .into_iter()
            .map(map_offer_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((offers, total))
    }

    async fn insert_token(&self, token: &IssuedToken) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO offer_tokens (id, token, offer_id, action, expires_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(token.id)
        .bind(&token.token)
        .bind(Uuid::from(token.offer_id))
        .bind(token.action.as_str())
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

        Ok(())
    }

    /// Runs an accept/reject decision as one transaction.
    ///
    /// Steps, all under `FOR UPDATE` row locks:
    /// 1. token path only: look up the token row by raw string, reject if
    ///    absent or already used, otherwise mark it used;
    /// 2. look up the offer, check ownership (session path) and status;
    /// 3. conditional `UPDATE ... WHERE status = 'pending'`.
    ///
    /// Any precondition failure rolls the transaction back, so a token is
    /// never burned by a request that did not change the offer.
    async fn decide(&self, req: &DecisionRequest) -> Result<DecisionOutcome, ApiError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

        if let Some(raw) = req.consume_token.as_deref() {
            let row: Option<(bool,)> =
                sqlx::query_as("SELECT used FROM offer_tokens WHERE token = $1 FOR UPDATE")
                    .bind(raw)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

            match row {
                None => {
                    rollback(tx).await?;
                    return Ok(DecisionOutcome::TokenMissing);
                }
                Some((true,)) => {
                    rollback(tx).await?;
                    return Ok(DecisionOutcome::TokenUsed);
                }
                Some((false,)) => {
                    sqlx::query("UPDATE offer_tokens SET used = TRUE WHERE token = $1 AND used = FALSE")
                        .bind(raw)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| ApiError::PersistenceError(e.to_string()))?;
                }
            }
        }

        let row: Option<(Uuid, String, Option<DateTime<Utc>>)> = sqlx::query_as(
            "SELECT user_id, status, expires_at FROM offers WHERE id = $1 FOR UPDATE",
        )
        .bind(Uuid::from(req.offer_id))
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

        let Some((owner, status, expires_at)) = row else {
            rollback(tx).await?;
            return Ok(DecisionOutcome::OfferMissing);
        };

        if let Some(expected) = req.expected_owner
            && owner != expected
        {
            rollback(tx).await?;
            return Ok(DecisionOutcome::NotOwner);
        }

        let status: OfferStatus = status.parse().map_err(ApiError::PersistenceError)?;

        if status == OfferStatus::Pending && expires_at.is_some_and(|d| d < Utc::now()) {
            rollback(tx).await?;
            return Ok(DecisionOutcome::DeadlinePassed);
        }
        if status != OfferStatus::Pending {
            rollback(tx).await?;
            return Ok(DecisionOutcome::AlreadyDecided(status));
        }

        let new_status = req.action.decided_status();
        let updated = sqlx::query(
            "UPDATE offers SET status = $2, rejection_reason = $3 \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(Uuid::from(req.offer_id))
        .bind(new_status.as_str())
        .bind(req.rejection_reason.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(|e| ApiError::PersistenceError(e.to_string()))?
        .rows_affected();

        if updated == 0 {
            // The row lock makes this unreachable, but fail safe.
            rollback(tx).await?;
            return Ok(DecisionOutcome::AlreadyDecided(status));
        }

        tx.commit()
            .await
            .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

        Ok(DecisionOutcome::Decided {
            new_status,
            rejection_reason: req.rejection_reason.clone(),
        })
    }
}

impl PostgresStore {
    /// Point lookup of a rental item by ID.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError::PersistenceError`] on database failure.
    pub async fn fetch_item(&self, item_id: Uuid) -> Result<Option<RentalItem>, ApiError> {
        let row: Option<(Uuid, Uuid, String, i64, bool)> = sqlx::query_as(
            "SELECT id, owner_id, name, hourly_rate_minor, active FROM rental_items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

        Ok(row.map(|(id, owner_id, name, hourly_rate_minor, active)| RentalItem {
            id,
            owner_id,
            name,
            hourly_rate_minor,
            active,
        }))
    }

    /// Inserts a booking. Returns `false` when the window collides with
    /// an existing active booking (the table's exclusion constraint
    /// raises `23P01`), which is the conflict signal, not an error.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError::PersistenceError`] on any other database
    /// failure.
    pub async fn insert_booking(&self, booking: &Booking) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "INSERT INTO rental_bookings (id, item_id, renter_id, starts_at, ends_at, billable_hours, total_minor, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(booking.id)
        .bind(booking.item_id)
        .bind(booking.renter_id)
        .bind(booking.starts_at)
        .bind(booking.ends_at)
        .bind(booking.billable_hours)
        .bind(booking.total_minor)
        .bind(booking.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23P01") => Ok(false),
            Err(e) => Err(ApiError::PersistenceError(e.to_string())),
        }
    }

    /// Marks a booking cancelled, freeing its window for new bookings.
    /// Returns `false` when the booking was already cancelled, so two
    /// racing cancellations resolve to one success.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError::PersistenceError`] on database failure.
    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<bool, ApiError> {
        let result =
            sqlx::query("UPDATE rental_bookings SET cancelled = TRUE WHERE id = $1 AND NOT cancelled")
                .bind(booking_id)
                .execute(&self.pool)
                .await
                .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetches a booking together with the item owner's ID, for
    /// visibility checks (renter or owner only).
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError::PersistenceError`] on database failure.
    pub async fn fetch_booking_with_owner(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<(Booking, Uuid)>, ApiError> {
        let row: Option<(
            Uuid,
            Uuid,
            Uuid,
            DateTime<Utc>,
            DateTime<Utc>,
            i64,
            i64,
            bool,
            DateTime<Utc>,
            Uuid,
        )> = sqlx::query_as(
            "SELECT b.id, b.item_id, b.renter_id, b.starts_at, b.ends_at, b.billable_hours, b.total_minor, b.cancelled, b.created_at, i.owner_id \
             FROM rental_bookings b JOIN rental_items i ON i.id = b.item_id \
             WHERE b.id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

        Ok(row.map(
            |(id, item_id, renter_id, starts_at, ends_at, billable_hours, total_minor, cancelled, created_at, owner_id)| {
                (
                    Booking {
                        id,
                        item_id,
                        renter_id,
                        starts_at,
                        ends_at,
                        billable_hours,
                        total_minor,
                        cancelled,
                        created_at,
                    },
                    owner_id,
                )
            },
        ))
    }
}

/// Rolls a transaction back, surfacing failures as persistence errors.
async fn rollback(tx: sqlx::Transaction<'_, sqlx::Postgres>) -> Result<(), ApiError> {
    tx.rollback()
        .await
        .map_err(|e| ApiError::PersistenceError(e.to_string()))
}

/// Maps a raw offers row into the domain type, rejecting unknown status
/// names as corruption rather than guessing.
fn map_offer_row(row: OfferRow) -> Result<Offer, ApiError> {
    let (id, order_id, user_id, amount_minor, description, status, rejection_reason, created_at, expires_at) =
        row;
    let status: OfferStatus = status.parse().map_err(ApiError::PersistenceError)?;

    Ok(Offer {
        id: OfferId::from_uuid(id),
        order_id,
        user_id,
        amount_minor,
        description,
        status,
        rejection_reason,
        created_at,
        expires_at,
    })
}

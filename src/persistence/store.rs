//! Storage abstraction for the offer lifecycle.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{DecisionOutcome, DecisionRequest};
use crate::domain::offer::Offer;
use crate::domain::offer_id::OfferId;
use crate::domain::token::IssuedToken;
use crate::error::ApiError;

/// Operations the offer service needs from its backing store.
///
/// [`super::postgres::PostgresStore`] is the production implementation;
/// the service tests substitute an in-memory store so the decision
/// semantics can be exercised without a database.
#[allow(async_fn_in_trait)]
pub trait OfferStore {
    /// Inserts a new pending offer row.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError::PersistenceError`] on storage failure.
    async fn insert_offer(&self, offer: &Offer) -> Result<(), ApiError>;

    /// Point lookup of an offer by ID.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError::PersistenceError`] on storage failure.
    async fn fetch_offer(&self, offer_id: OfferId) -> Result<Option<Offer>, ApiError>;

    /// Lazy-expiry write: flips a pending offer whose deadline lies
    /// before `now` to `expired`. Returns whether a row changed; `false`
    /// means the offer was already terminal or not yet due, which is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError::PersistenceError`] on storage failure.
    async fn mark_expired(&self, offer_id: OfferId, now: DateTime<Utc>) -> Result<bool, ApiError>;

    /// Expires every overdue pending offer belonging to `user_id`,
    /// returning how many rows changed.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError::PersistenceError`] on storage failure.
    async fn expire_due_for_user(&self, user_id: Uuid) -> Result<u64, ApiError>;

    /// Pages through a user's offers, newest first, returning the rows
    /// and the total count.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError::PersistenceError`] on storage failure.
    async fn list_offers_for_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Offer>, i64), ApiError>;

    /// Persists a freshly issued token record (`used = FALSE`).
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError::PersistenceError`] on storage failure.
    async fn insert_token(&self, token: &IssuedToken) -> Result<(), ApiError>;

    /// Runs an accept/reject decision atomically: every precondition
    /// failure leaves both the offer and any presented token unchanged.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError::PersistenceError`] on storage failure.
    async fn decide(&self, req: &DecisionRequest) -> Result<DecisionOutcome, ApiError>;
}

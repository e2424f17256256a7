//! Database-facing request and outcome types for offer decisions.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::action::OfferAction;
use crate::domain::offer::OfferStatus;
use crate::domain::offer_id::OfferId;

/// Input for creating a new offer row (always `pending`).
#[derive(Debug, Clone)]
pub struct NewOffer {
    /// Order the offer is attached to.
    pub order_id: Uuid,
    /// Offer recipient.
    pub user_id: Uuid,
    /// Proposed amount in integer minor-currency units.
    pub amount_minor: i64,
    /// Human-readable description of the proposal.
    pub description: String,
    /// Optional decision deadline.
    pub expires_at: Option<DateTime<Utc>>,
}

/// A fully validated accept/reject request, ready to run as one
/// database transaction.
///
/// Built by the service layer after input validation and, on the token
/// path, after cryptographic verification of the raw token string.
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    /// Offer being decided.
    pub offer_id: OfferId,
    /// Accept or reject.
    pub action: OfferAction,
    /// Reason to store; present exactly when `action` is reject.
    pub rejection_reason: Option<String>,
    /// Session identity that must own the offer. `None` on the token
    /// path, where possession of the signed link is the credential.
    pub expected_owner: Option<Uuid>,
    /// Raw token string to consume in the same transaction, if any.
    pub consume_token: Option<String>,
}

/// Outcome of a decision transaction.
///
/// Every non-`Decided` variant means the transaction rolled back with no
/// state change; the service layer maps them onto the error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// Offer moved to a terminal state and, on the token path, the token
    /// row was marked used in the same commit.
    Decided {
        /// The status the offer now holds.
        new_status: OfferStatus,
        /// Stored rejection reason, echoed back for the caller.
        rejection_reason: Option<String>,
    },
    /// No offer row with the requested ID.
    OfferMissing,
    /// Offer exists but belongs to someone else.
    NotOwner,
    /// Offer is already in the named terminal state.
    AlreadyDecided(OfferStatus),
    /// Offer is still stored as pending but its deadline has passed; the
    /// caller must run the lazy-expiry write before reporting.
    DeadlinePassed,
    /// No token row matches the presented string.
    TokenMissing,
    /// Token row exists but was already consumed.
    TokenUsed,
}

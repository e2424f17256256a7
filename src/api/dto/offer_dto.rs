//! Offer-related DTOs for creation, reads, token issuance, and decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::common_dto::PaginationMeta;
use crate::domain::action::OfferAction;
use crate::domain::offer::{Offer, OfferStatus};
use crate::domain::offer_id::OfferId;
use crate::domain::token::IssuedToken;
use crate::service::Decision;

/// Request body for `POST /admin/offers`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOfferRequest {
    /// Order the offer is attached to.
    pub order_id: Uuid,
    /// Offer recipient.
    pub user_id: Uuid,
    /// Proposed amount in integer minor-currency units (e.g. kobo).
    pub amount_minor: i64,
    /// Human-readable description of the proposal.
    pub description: String,
    /// Optional decision deadline.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Offer representation returned by every offer endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct OfferResponse {
    /// Offer identifier.
    #[schema(value_type = Uuid)]
    pub offer_id: OfferId,
    /// Order the offer is attached to.
    pub order_id: Uuid,
    /// Offer recipient.
    pub user_id: Uuid,
    /// Proposed amount in minor units.
    pub amount_minor: i64,
    /// Description of the proposal.
    pub description: String,
    /// Current status after lazy expiry.
    #[schema(value_type = String)]
    pub status: OfferStatus,
    /// Reason stored on rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Decision deadline, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Offer> for OfferResponse {
    fn from(offer: Offer) -> Self {
        Self {
            offer_id: offer.id,
            order_id: offer.order_id,
            user_id: offer.user_id,
            amount_minor: offer.amount_minor,
            description: offer.description,
            status: offer.status,
            rejection_reason: offer.rejection_reason,
            created_at: offer.created_at,
            expires_at: offer.expires_at,
        }
    }
}

/// Paginated list response for `GET /offers`.
#[derive(Debug, Serialize, ToSchema)]
pub struct OfferListResponse {
    /// Offers on this page, newest first.
    pub data: Vec<OfferResponse>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Optional body for accept/reject endpoints.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DecisionBody {
    /// Reason for rejecting; required when the action is `reject`.
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// Query parameters for the token-link action endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    /// The raw action token from the emailed link.
    #[serde(default)]
    pub token: Option<String>,
}

/// Response body for a successful accept/reject.
#[derive(Debug, Serialize, ToSchema)]
pub struct DecisionResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// Offer that was decided.
    #[schema(value_type = Uuid)]
    pub offer_id: OfferId,
    /// The terminal status the offer now holds.
    #[schema(value_type = String)]
    pub new_status: OfferStatus,
    /// Stored rejection reason, echoed back for rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl From<Decision> for DecisionResponse {
    fn from(decision: Decision) -> Self {
        Self {
            message: format!("offer {}", decision.new_status),
            offer_id: decision.offer_id,
            new_status: decision.new_status,
            rejection_reason: decision.rejection_reason,
        }
    }
}

/// Request body for `POST /admin/offers/:id/tokens`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueTokenRequest {
    /// The action the token will authorize.
    #[schema(value_type = String)]
    pub action: OfferAction,
    /// Token lifetime in minutes; defaults to the configured value
    /// (60) when omitted.
    #[serde(default)]
    pub ttl_minutes: Option<i64>,
}

/// Response body for `POST /admin/offers/:id/tokens`.
///
/// The raw token is returned exactly once, for the notifier to embed in
/// the emailed link; it is never readable again through the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct IssueTokenResponse {
    /// Token record identifier.
    pub token_id: Uuid,
    /// The raw encoded token.
    pub token: String,
    /// Offer the token acts on.
    #[schema(value_type = Uuid)]
    pub offer_id: OfferId,
    /// Action the token authorizes.
    #[schema(value_type = String)]
    pub action: OfferAction,
    /// Token expiry.
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedToken> for IssueTokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token_id: issued.id,
            token: issued.token,
            offer_id: issued.offer_id,
            action: issued.action,
            expires_at: issued.expires_at,
        }
    }
}

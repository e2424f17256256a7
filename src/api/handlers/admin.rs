//! Back-office handlers: offer creation and action-token issuance.
//!
//! These routes are mounted behind the platform's admin proxy, which
//! performs its own authentication; this service only implements the
//! state-machine operations the back-office invokes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{
    CreateOfferRequest, IssueTokenRequest, IssueTokenResponse, OfferResponse,
};
use crate::app_state::AppState;
use crate::domain::offer_id::OfferId;
use crate::error::{ApiError, ErrorResponse};
use crate::persistence::models::NewOffer;

/// `POST /admin/offers` — Create a new pending offer for an order.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] on invalid fields.
#[utoipa::path(
    post,
    path = "/api/v1/admin/offers",
    tag = "Admin",
    summary = "Create an offer",
    description = "Creates a pending custom offer for an order. Dispatching the notification (and its action tokens) is a separate step.",
    request_body = CreateOfferRequest,
    responses(
        (status = 201, description = "Offer created", body = OfferResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
    )
)]
pub async fn create_offer(
    State(state): State<AppState>,
    Json(req): Json<CreateOfferRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = state
        .offer_service
        .create_offer(NewOffer {
            order_id: req.order_id,
            user_id: req.user_id,
            amount_minor: req.amount_minor,
            description: req.description,
            expires_at: req.expires_at,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(OfferResponse::from(offer))))
}

/// `POST /admin/offers/:id/tokens` — Issue a single-use action token.
///
/// The raw token appears in this response exactly once; the caller
/// embeds it in the emailed link.
///
/// # Errors
///
/// Fails when the offer is missing, already decided, or expired.
#[utoipa::path(
    post,
    path = "/api/v1/admin/offers/{id}/tokens",
    tag = "Admin",
    summary = "Issue an action token",
    description = "Generates an HMAC-signed, single-use, time-limited token authorizing one action on the offer. Lifetime defaults to the configured TTL unless ttl_minutes is supplied.",
    params(
        ("id" = Uuid, Path, description = "Offer UUID"),
    ),
    request_body = IssueTokenRequest,
    responses(
        (status = 201, description = "Token issued", body = IssueTokenResponse),
        (status = 404, description = "Offer not found", body = ErrorResponse),
        (status = 409, description = "Offer already decided", body = ErrorResponse),
        (status = 410, description = "Offer expired", body = ErrorResponse),
    )
)]
pub async fn issue_token(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<IssueTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issued = state
        .offer_service
        .issue_token(OfferId::from_uuid(id), req.action, req.ttl_minutes)
        .await?;

    Ok((StatusCode::CREATED, Json(IssueTokenResponse::from(issued))))
}

/// Back-office routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/offers", post(create_offer))
        .route("/admin/offers/{id}/tokens", post(issue_token))
}

//! Customer-facing offer handlers: reads and accept/reject decisions.
//!
//! The two decision endpoints are the HTTP faces of the single offer
//! action entry point: one authenticates via the session header, the
//! other via the signed link token. Both return the same response shape
//! and error taxonomy.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::auth::SessionUser;
use crate::api::dto::{
    DecisionBody, DecisionResponse, OfferListResponse, OfferResponse, PaginationMeta,
    PaginationParams, TokenQuery,
};
use crate::app_state::AppState;
use crate::domain::action::OfferAction;
use crate::domain::offer_id::OfferId;
use crate::error::{ApiError, ErrorResponse};

/// `GET /offers` — List the session user's offers, newest first.
///
/// Overdue pending offers are expired before the page is read, so the
/// reported statuses are never stale.
///
/// # Errors
///
/// Returns [`ApiError`] on missing session or internal failures.
#[utoipa::path(
    get,
    path = "/api/v1/offers",
    tag = "Offers",
    summary = "List my offers",
    description = "Returns a paginated list of the session user's offers with lazy expiry applied.",
    params(PaginationParams),
    responses(
        (status = 200, description = "Paginated offer list", body = OfferListResponse),
        (status = 401, description = "No session", body = ErrorResponse),
    )
)]
pub async fn list_offers(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let params = params.clamped();
    let (offers, total) = state
        .offer_service
        .list_offers(user_id, params.limit(), params.offset())
        .await?;

    let total = u32::try_from(total).unwrap_or(u32::MAX);
    Ok(Json(OfferListResponse {
        data: offers.into_iter().map(OfferResponse::from).collect(),
        pagination: PaginationMeta::from_params(&params, total),
    }))
}

/// `GET /offers/:id` — Offer detail for its recipient.
///
/// # Errors
///
/// Returns [`ApiError::OfferNotFound`] if absent, [`ApiError::Forbidden`]
/// for anyone but the recipient.
#[utoipa::path(
    get,
    path = "/api/v1/offers/{id}",
    tag = "Offers",
    summary = "Get offer details",
    description = "Returns a single offer. A pending offer past its deadline is persisted as expired before being reported.",
    params(
        ("id" = Uuid, Path, description = "Offer UUID"),
    ),
    responses(
        (status = 200, description = "Offer details", body = OfferResponse),
        (status = 403, description = "Not the offer recipient", body = ErrorResponse),
        (status = 404, description = "Offer not found", body = ErrorResponse),
    )
)]
pub async fn get_offer(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let offer = state
        .offer_service
        .get_offer(user_id, OfferId::from_uuid(id))
        .await?;
    Ok(Json(OfferResponse::from(offer)))
}

/// `POST /offers/:id/:action` — Accept or reject in-app.
///
/// # Errors
///
/// Returns [`ApiError`] per the decision error taxonomy.
#[utoipa::path(
    post,
    path = "/api/v1/offers/{id}/{action}",
    tag = "Offers",
    summary = "Decide an offer in-app",
    description = "Accepts or rejects a pending offer on behalf of the authenticated session. Rejection requires a non-empty reason in the body.",
    params(
        ("id" = Uuid, Path, description = "Offer UUID"),
        ("action" = String, Path, description = "`accept` or `reject`"),
    ),
    request_body = DecisionBody,
    responses(
        (status = 200, description = "Offer decided", body = DecisionResponse),
        (status = 400, description = "Missing rejection reason", body = ErrorResponse),
        (status = 401, description = "No session", body = ErrorResponse),
        (status = 403, description = "Not the offer recipient", body = ErrorResponse),
        (status = 404, description = "Offer not found", body = ErrorResponse),
        (status = 409, description = "Offer already decided", body = ErrorResponse),
        (status = 410, description = "Offer expired", body = ErrorResponse),
    )
)]
pub async fn decide_in_app(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path((id, action)): Path<(Uuid, OfferAction)>,
    body: Option<Json<DecisionBody>>,
) -> Result<impl IntoResponse, ApiError> {
    let reason = body.and_then(|Json(b)| b.rejection_reason);
    let decision = state
        .offer_service
        .decide_in_app(user_id, OfferId::from_uuid(id), action, reason)
        .await?;
    Ok(Json(DecisionResponse::from(decision)))
}

/// `POST /offer-action/:id/:action?token=...` — Accept or reject via the
/// signed link token, without a session.
///
/// # Errors
///
/// Returns [`ApiError::MissingToken`] when no token is supplied, the 401
/// token variants for invalid/expired/reused tokens, and otherwise the
/// same taxonomy as the in-app endpoint.
#[utoipa::path(
    post,
    path = "/api/v1/offer-action/{id}/{action}",
    tag = "Offers",
    summary = "Decide an offer via an emailed link token",
    description = "Verifies the HMAC-signed single-use token and performs the embedded action. The token is consumed atomically with the status change.",
    params(
        ("id" = Uuid, Path, description = "Offer UUID"),
        ("action" = String, Path, description = "`accept` or `reject`"),
        ("token" = String, Query, description = "Raw action token from the link"),
    ),
    request_body = DecisionBody,
    responses(
        (status = 200, description = "Offer decided", body = DecisionResponse),
        (status = 400, description = "Missing token or rejection reason", body = ErrorResponse),
        (status = 401, description = "Invalid, expired, or already-used token", body = ErrorResponse),
        (status = 404, description = "Offer not found", body = ErrorResponse),
        (status = 409, description = "Offer already decided", body = ErrorResponse),
        (status = 410, description = "Offer expired", body = ErrorResponse),
    )
)]
pub async fn offer_action(
    State(state): State<AppState>,
    Path((id, action)): Path<(Uuid, OfferAction)>,
    Query(query): Query<TokenQuery>,
    body: Option<Json<DecisionBody>>,
) -> Result<impl IntoResponse, ApiError> {
    let token = query.token.ok_or(ApiError::MissingToken)?;
    let reason = body.and_then(|Json(b)| b.rejection_reason);
    let decision = state
        .offer_service
        .decide_with_token(&token, OfferId::from_uuid(id), action, reason)
        .await?;
    Ok(Json(DecisionResponse::from(decision)))
}

/// Customer-facing offer routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/offers", get(list_offers))
        .route("/offers/{id}", get(get_offer))
        .route("/offers/{id}/{action}", post(decide_in_app))
        .route("/offer-action/{id}/{action}", post(offer_action))
}

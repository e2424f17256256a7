//! Rental marketplace handlers: quotes and bookings.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::auth::SessionUser;
use crate::api::dto::{BookingResponse, RentalQuoteResponse, RentalWindowRequest};
use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};

/// `POST /rentals/:item_id/quote` — Price a rental window.
///
/// # Errors
///
/// Returns [`ApiError::ItemNotFound`] or [`ApiError::InvalidRequest`].
#[utoipa::path(
    post,
    path = "/api/v1/rentals/{item_id}/quote",
    tag = "Rentals",
    summary = "Quote a rental window",
    description = "Computes the price for renting an item over a window, billed per started hour, without reserving anything.",
    params(
        ("item_id" = Uuid, Path, description = "Rental item UUID"),
    ),
    request_body = RentalWindowRequest,
    responses(
        (status = 200, description = "Price quote", body = RentalQuoteResponse),
        (status = 400, description = "Invalid window", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse),
    )
)]
pub async fn quote(
    State(state): State<AppState>,
    SessionUser(_user_id): SessionUser,
    Path(item_id): Path<Uuid>,
    Json(req): Json<RentalWindowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (item, quote, window) = state
        .rental_service
        .quote(item_id, req.starts_at, req.ends_at)
        .await?;

    Ok(Json(RentalQuoteResponse::new(
        item.id,
        item.name,
        &quote,
        window.starts_at,
        window.ends_at,
    )))
}

/// `POST /rentals/:item_id/bookings` — Book an item for a window.
///
/// # Errors
///
/// Everything the quote endpoint returns, plus 403 for booking your own
/// item and 409 when the window overlaps an existing booking.
#[utoipa::path(
    post,
    path = "/api/v1/rentals/{item_id}/bookings",
    tag = "Rentals",
    summary = "Book a rental item",
    description = "Reserves the item for the window at the current hourly rate. Overlapping active bookings are rejected.",
    params(
        ("item_id" = Uuid, Path, description = "Rental item UUID"),
    ),
    request_body = RentalWindowRequest,
    responses(
        (status = 201, description = "Booking created", body = BookingResponse),
        (status = 400, description = "Invalid window", body = ErrorResponse),
        (status = 403, description = "Owners cannot book their own items", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse),
        (status = 409, description = "Window overlaps an existing booking", body = ErrorResponse),
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(item_id): Path<Uuid>,
    Json(req): Json<RentalWindowRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state
        .rental_service
        .book(user_id, item_id, req.starts_at, req.ends_at)
        .await?;

    Ok((StatusCode::CREATED, Json(BookingResponse::from(booking))))
}

/// `GET /rentals/bookings/:id` — Booking detail for renter or owner.
///
/// # Errors
///
/// Returns [`ApiError::BookingNotFound`] or [`ApiError::Forbidden`].
#[utoipa::path(
    get,
    path = "/api/v1/rentals/bookings/{id}",
    tag = "Rentals",
    summary = "Get booking details",
    params(
        ("id" = Uuid, Path, description = "Booking UUID"),
    ),
    responses(
        (status = 200, description = "Booking details", body = BookingResponse),
        (status = 403, description = "Not the renter or item owner", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
    )
)]
pub async fn get_booking(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state.rental_service.get_booking(user_id, id).await?;
    Ok(Json(BookingResponse::from(booking)))
}

/// `POST /rentals/bookings/:id/cancel` — Cancel a booking.
///
/// # Errors
///
/// Returns [`ApiError::BookingNotFound`], [`ApiError::Forbidden`] for
/// anyone but the renter or item owner, or
/// [`ApiError::BookingAlreadyCancelled`].
#[utoipa::path(
    post,
    path = "/api/v1/rentals/bookings/{id}/cancel",
    tag = "Rentals",
    summary = "Cancel a booking",
    description = "Cancels the booking, freeing its window for new bookings. Allowed for the renter or the item owner.",
    params(
        ("id" = Uuid, Path, description = "Booking UUID"),
    ),
    responses(
        (status = 200, description = "Booking cancelled", body = BookingResponse),
        (status = 403, description = "Not the renter or item owner", body = ErrorResponse),
        (status = 404, description = "Booking not found", body = ErrorResponse),
        (status = 409, description = "Booking already cancelled", body = ErrorResponse),
    )
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    SessionUser(user_id): SessionUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let booking = state.rental_service.cancel(user_id, id).await?;
    Ok(Json(BookingResponse::from(booking)))
}

/// Rental marketplace routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rentals/{item_id}/quote", post(quote))
        .route("/rentals/{item_id}/bookings", post(create_booking))
        .route("/rentals/bookings/{id}", get(get_booking))
        .route("/rentals/bookings/{id}/cancel", post(cancel_booking))
}

//! Service error types with HTTP status code mapping.
//!
//! [`ApiError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::offer::OfferStatus;
use crate::domain::offer_id::OfferId;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 3101,
///     "message": "offer already decided: accepted",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`ApiError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category         | HTTP Status                      |
/// |-----------|------------------|----------------------------------|
/// | 1000–1999 | Input validation | 400 Bad Request                  |
/// | 2000–2999 | Auth / token     | 401 Unauthorized / 403 Forbidden |
/// | 3000–3999 | Resource state   | 404 / 409 / 410                  |
/// | 4000–4999 | Server           | 500 Internal Server Error        |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The `token` query parameter was not supplied on the link path.
    #[error("missing token query parameter")]
    MissingToken,

    /// Token failed decoding, had a malformed payload, or its signature
    /// did not match.
    #[error("invalid token")]
    InvalidToken,

    /// Token signature was valid but its embedded expiry has passed.
    #[error("token expired")]
    TokenExpired,

    /// Token was already consumed by a previous request.
    #[error("token already used")]
    TokenAlreadyUsed,

    /// No session identity was supplied on an authenticated route.
    #[error("authentication required")]
    Unauthenticated,

    /// The acting identity does not own the target resource.
    #[error("not allowed to act on this resource")]
    Forbidden,

    /// Offer with the given ID was not found.
    #[error("offer not found: {0}")]
    OfferNotFound(OfferId),

    /// Rental item with the given ID was not found or is inactive.
    #[error("rental item not found: {0}")]
    ItemNotFound(uuid::Uuid),

    /// Rental booking with the given ID was not found.
    #[error("booking not found: {0}")]
    BookingNotFound(uuid::Uuid),

    /// Offer is already in a terminal state; names the current status so
    /// clients can render "already accepted" rather than a generic error.
    #[error("offer already decided: {0}")]
    AlreadyDecided(OfferStatus),

    /// Offer deadline has passed. Distinct from [`Self::AlreadyDecided`]
    /// so the client can show an "expired" message.
    #[error("offer expired: {0}")]
    OfferExpired(OfferId),

    /// Requested rental window overlaps an existing booking.
    #[error("rental window overlaps an existing booking")]
    BookingConflict,

    /// Booking was already cancelled.
    #[error("booking already cancelled")]
    BookingAlreadyCancelled,

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MissingToken => 1002,
            Self::InvalidToken => 2001,
            Self::TokenExpired => 2002,
            Self::TokenAlreadyUsed => 2003,
            Self::Unauthenticated => 2004,
            Self::Forbidden => 2005,
            Self::OfferNotFound(_) => 3001,
            Self::ItemNotFound(_) => 3002,
            Self::BookingNotFound(_) => 3003,
            Self::AlreadyDecided(_) => 3101,
            Self::BookingConflict => 3102,
            Self::BookingAlreadyCancelled => 3103,
            Self::OfferExpired(_) => 3201,
            Self::PersistenceError(_) => 4001,
            Self::Internal(_) => 4000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::MissingToken => StatusCode::BAD_REQUEST,
            Self::InvalidToken
            | Self::TokenExpired
            | Self::TokenAlreadyUsed
            | Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::OfferNotFound(_) | Self::ItemNotFound(_) | Self::BookingNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::AlreadyDecided(_) | Self::BookingConflict | Self::BookingAlreadyCancelled => {
                StatusCode::CONFLICT
            }
            Self::OfferExpired(_) => StatusCode::GONE,
            Self::PersistenceError(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ApiError::MissingToken.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidToken.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::TokenAlreadyUsed.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::AlreadyDecided(OfferStatus::Accepted).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::BookingAlreadyCancelled.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::OfferExpired(OfferId::new()).status_code(),
            StatusCode::GONE
        );
    }

    #[test]
    fn conflict_message_names_current_status() {
        let err = ApiError::AlreadyDecided(OfferStatus::Rejected);
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn error_codes_are_unique() {
        let codes = [
            ApiError::InvalidRequest(String::new()).error_code(),
            ApiError::MissingToken.error_code(),
            ApiError::InvalidToken.error_code(),
            ApiError::TokenExpired.error_code(),
            ApiError::TokenAlreadyUsed.error_code(),
            ApiError::Unauthenticated.error_code(),
            ApiError::Forbidden.error_code(),
            ApiError::OfferNotFound(OfferId::new()).error_code(),
            ApiError::AlreadyDecided(OfferStatus::Expired).error_code(),
            ApiError::OfferExpired(OfferId::new()).error_code(),
            ApiError::BookingConflict.error_code(),
            ApiError::BookingAlreadyCancelled.error_code(),
            ApiError::PersistenceError(String::new()).error_code(),
            ApiError::Internal(String::new()).error_code(),
        ];
        let mut seen = std::collections::HashSet::new();
        for code in codes {
            assert!(seen.insert(code), "duplicate error code {code}");
        }
    }
}

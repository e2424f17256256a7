//! Rental quote and booking DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::rental::{Booking, RentalQuote};

/// Request body for quote and booking endpoints: the desired window.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RentalWindowRequest {
    /// Window start (must be in the future).
    pub starts_at: DateTime<Utc>,
    /// Window end (exclusive, after the start).
    pub ends_at: DateTime<Utc>,
}

/// Response body for `POST /rentals/:item_id/quote`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RentalQuoteResponse {
    /// Item being priced.
    pub item_id: Uuid,
    /// Item display name.
    pub item_name: String,
    /// Hourly rate applied, in minor units.
    pub hourly_rate_minor: i64,
    /// Whole started hours billed.
    pub billable_hours: i64,
    /// Total price in minor units.
    pub total_minor: i64,
    /// Echoed window start.
    pub starts_at: DateTime<Utc>,
    /// Echoed window end.
    pub ends_at: DateTime<Utc>,
}

/// Booking representation returned by the booking endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingResponse {
    /// Booking identifier.
    pub booking_id: Uuid,
    /// Item being rented.
    pub item_id: Uuid,
    /// Renting customer.
    pub renter_id: Uuid,
    /// Window start.
    pub starts_at: DateTime<Utc>,
    /// Window end (exclusive).
    pub ends_at: DateTime<Utc>,
    /// Hours billed.
    pub billable_hours: i64,
    /// Total price in minor units at booking time.
    pub total_minor: i64,
    /// Whether the booking has been cancelled.
    pub cancelled: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            booking_id: booking.id,
            item_id: booking.item_id,
            renter_id: booking.renter_id,
            starts_at: booking.starts_at,
            ends_at: booking.ends_at,
            billable_hours: booking.billable_hours,
            total_minor: booking.total_minor,
            cancelled: booking.cancelled,
            created_at: booking.created_at,
        }
    }
}

impl RentalQuoteResponse {
    /// Assembles the response from the priced parts.
    #[must_use]
    pub fn new(
        item_id: Uuid,
        item_name: String,
        quote: &RentalQuote,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id,
            item_name,
            hourly_rate_minor: quote.hourly_rate_minor,
            billable_hours: quote.billable_hours,
            total_minor: quote.total_minor,
            starts_at,
            ends_at,
        }
    }
}

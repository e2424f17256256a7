//! Rental service: quotes and time-window bookings for hardware items.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::rental::{Booking, RentalItem, RentalQuote, RentalWindow};
use crate::error::ApiError;
use crate::persistence::postgres::PostgresStore;

/// Orchestration layer for the rental marketplace flow.
#[derive(Debug, Clone)]
pub struct RentalService {
    store: PostgresStore,
}

impl RentalService {
    /// Creates a new `RentalService`.
    #[must_use]
    pub fn new(store: PostgresStore) -> Self {
        Self { store }
    }

    /// Prices a rental window against an item without reserving anything.
    ///
    /// # Errors
    ///
    /// [`ApiError::ItemNotFound`] for missing or inactive items,
    /// [`ApiError::InvalidRequest`] for a bad window.
    pub async fn quote(
        &self,
        item_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<(RentalItem, RentalQuote, RentalWindow), ApiError> {
        let item = self.active_item(item_id).await?;
        let window =
            RentalWindow::new(starts_at, ends_at, Utc::now()).map_err(ApiError::InvalidRequest)?;
        let quote = RentalQuote::compute(item.hourly_rate_minor, &window);
        Ok((item, quote, window))
    }

    /// Books an item for the window at the current hourly rate.
    ///
    /// # Errors
    ///
    /// Everything [`Self::quote`] can return, plus
    /// [`ApiError::Forbidden`] when the renter owns the item and
    /// [`ApiError::BookingConflict`] when the window overlaps an existing
    /// active booking (enforced by the table's exclusion constraint, so
    /// two racing requests cannot both succeed).
    pub async fn book(
        &self,
        renter_id: Uuid,
        item_id: Uuid,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> Result<Booking, ApiError> {
        let (item, quote, window) = self.quote(item_id, starts_at, ends_at).await?;
        if item.owner_id == renter_id {
            return Err(ApiError::Forbidden);
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            item_id,
            renter_id,
            starts_at: window.starts_at,
            ends_at: window.ends_at,
            billable_hours: quote.billable_hours,
            total_minor: quote.total_minor,
            cancelled: false,
            created_at: Utc::now(),
        };
        if !self.store.insert_booking(&booking).await? {
            return Err(ApiError::BookingConflict);
        }

        tracing::info!(
            booking_id = %booking.id,
            %item_id,
            renter_id = %renter_id,
            hours = booking.billable_hours,
            total_minor = booking.total_minor,
            "rental booked"
        );
        Ok(booking)
    }

    /// Returns a booking to its renter or the item's owner.
    ///
    /// # Errors
    ///
    /// [`ApiError::BookingNotFound`] if absent, [`ApiError::Forbidden`]
    /// for anyone else.
    pub async fn get_booking(&self, viewer: Uuid, booking_id: Uuid) -> Result<Booking, ApiError> {
        let (booking, owner_id) = self
            .store
            .fetch_booking_with_owner(booking_id)
            .await?
            .ok_or(ApiError::BookingNotFound(booking_id))?;

        if viewer != booking.renter_id && viewer != owner_id {
            return Err(ApiError::Forbidden);
        }
        Ok(booking)
    }

    /// Cancels a booking on behalf of its renter or the item's owner,
    /// freeing the window for new bookings.
    ///
    /// # Errors
    ///
    /// [`ApiError::BookingNotFound`] if absent, [`ApiError::Forbidden`]
    /// for anyone else, [`ApiError::BookingAlreadyCancelled`] when it was
    /// cancelled before (including by a racing request).
    pub async fn cancel(&self, viewer: Uuid, booking_id: Uuid) -> Result<Booking, ApiError> {
        let (mut booking, owner_id) = self
            .store
            .fetch_booking_with_owner(booking_id)
            .await?
            .ok_or(ApiError::BookingNotFound(booking_id))?;

        if viewer != booking.renter_id && viewer != owner_id {
            return Err(ApiError::Forbidden);
        }
        if booking.cancelled || !self.store.cancel_booking(booking_id).await? {
            return Err(ApiError::BookingAlreadyCancelled);
        }

        booking.cancelled = true;
        tracing::info!(booking_id = %booking.id, item_id = %booking.item_id, "booking cancelled");
        Ok(booking)
    }

    async fn active_item(&self, item_id: Uuid) -> Result<RentalItem, ApiError> {
        let item = self
            .store
            .fetch_item(item_id)
            .await?
            .ok_or(ApiError::ItemNotFound(item_id))?;
        // Inactive listings read the same as absent ones.
        if !item.active {
            return Err(ApiError::ItemNotFound(item_id));
        }
        Ok(item)
    }
}

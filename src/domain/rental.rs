//! Rental pricing and booking-window rules.
//!
//! Hardware rentals are billed per started hour against the item's hourly
//! rate, in integer minor-currency units. Overlap exclusion between
//! bookings is ultimately enforced by the database, but the window rules
//! here gate every request first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A rentable hardware item listed on the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalItem {
    /// Item identifier.
    pub id: Uuid,
    /// Listing owner; owners cannot book their own items.
    pub owner_id: Uuid,
    /// Display name.
    pub name: String,
    /// Hourly rate in integer minor-currency units.
    pub hourly_rate_minor: i64,
    /// Inactive items cannot be quoted or booked.
    pub active: bool,
}

/// A confirmed time-window booking of a rental item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    /// Booking identifier.
    pub id: Uuid,
    /// Item being rented.
    pub item_id: Uuid,
    /// Renting customer.
    pub renter_id: Uuid,
    /// Window start.
    pub starts_at: DateTime<Utc>,
    /// Window end (exclusive).
    pub ends_at: DateTime<Utc>,
    /// Hours billed (whole started hours, minimum 1).
    pub billable_hours: i64,
    /// Total price in minor units at booking time.
    pub total_minor: i64,
    /// Cancelled bookings no longer block their window.
    pub cancelled: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A validated, half-open rental window `[starts_at, ends_at)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalWindow {
    /// Window start.
    pub starts_at: DateTime<Utc>,
    /// Window end (exclusive).
    pub ends_at: DateTime<Utc>,
}

impl RentalWindow {
    /// Validates a requested window: it must be non-empty and must start
    /// in the future relative to `now`.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description of the first rule violated.
    pub fn new(
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, String> {
        if ends_at <= starts_at {
            return Err("rental window must end after it starts".to_string());
        }
        if starts_at <= now {
            return Err("rental window must start in the future".to_string());
        }
        Ok(Self { starts_at, ends_at })
    }

    /// Whole started hours in the window, minimum 1.
    #[must_use]
    pub fn billable_hours(&self) -> i64 {
        let seconds = (self.ends_at - self.starts_at).num_seconds();
        ((seconds + 3599) / 3600).max(1)
    }

    /// Whether this window overlaps another half-open window.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.starts_at < other.ends_at && other.starts_at < self.ends_at
    }
}

/// A price quote for renting an item over a window.
#[derive(Debug, Clone, Serialize)]
pub struct RentalQuote {
    /// Hours billed.
    pub billable_hours: i64,
    /// Hourly rate applied, in minor units.
    pub hourly_rate_minor: i64,
    /// Total price in minor units.
    pub total_minor: i64,
}

impl RentalQuote {
    /// Computes the quote for `window` at `hourly_rate_minor`.
    ///
    /// Saturates rather than overflowing on absurd inputs; the hourly
    /// rate is schema-checked positive.
    #[must_use]
    pub fn compute(hourly_rate_minor: i64, window: &RentalWindow) -> Self {
        let billable_hours = window.billable_hours();
        Self {
            billable_hours,
            hourly_rate_minor,
            total_minor: hourly_rate_minor.saturating_mul(billable_hours),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn window(start_offset_h: i64, len_minutes: i64) -> RentalWindow {
        let now = Utc::now();
        let starts_at = now + Duration::hours(start_offset_h);
        let Ok(w) = RentalWindow::new(starts_at, starts_at + Duration::minutes(len_minutes), now)
        else {
            panic!("window should be valid");
        };
        w
    }

    #[test]
    fn rejects_empty_and_inverted_windows() {
        let now = Utc::now();
        let start = now + Duration::hours(1);
        assert!(RentalWindow::new(start, start, now).is_err());
        assert!(RentalWindow::new(start, start - Duration::hours(1), now).is_err());
    }

    #[test]
    fn rejects_windows_starting_in_the_past() {
        let now = Utc::now();
        let start = now - Duration::minutes(5);
        assert!(RentalWindow::new(start, now + Duration::hours(2), now).is_err());
    }

    #[test]
    fn exact_hours_bill_exactly() {
        assert_eq!(window(1, 180).billable_hours(), 3);
    }

    #[test]
    fn partial_hours_round_up() {
        assert_eq!(window(1, 61).billable_hours(), 2);
        assert_eq!(window(1, 119).billable_hours(), 2);
    }

    #[test]
    fn minimum_one_hour_billed() {
        assert_eq!(window(1, 10).billable_hours(), 1);
    }

    #[test]
    fn quote_multiplies_rate_by_hours() {
        // 2500.00 in minor units per hour, 90 minutes → 2 hours
        let quote = RentalQuote::compute(250_000, &window(1, 90));
        assert_eq!(quote.billable_hours, 2);
        assert_eq!(quote.total_minor, 500_000);
    }

    #[test]
    fn overlap_is_half_open() {
        let a = window(1, 120);
        let adjacent = RentalWindow {
            starts_at: a.ends_at,
            ends_at: a.ends_at + Duration::hours(1),
        };
        let inside = RentalWindow {
            starts_at: a.starts_at + Duration::minutes(30),
            ends_at: a.ends_at - Duration::minutes(30),
        };
        let disjoint = RentalWindow {
            starts_at: a.ends_at + Duration::hours(5),
            ends_at: a.ends_at + Duration::hours(6),
        };
        assert!(!a.overlaps(&adjacent));
        assert!(a.overlaps(&inside));
        assert!(inside.overlaps(&a));
        assert!(!a.overlaps(&disjoint));
    }
}

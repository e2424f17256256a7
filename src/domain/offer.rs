//! Offer domain model and status state machine.
//!
//! An [`Offer`] is a negotiated price proposal attached to an order,
//! awaiting a customer decision. Its [`OfferStatus`] moves through a
//! closed state machine: `Pending` is the only non-terminal state, and
//! every read path must apply [`Offer::effective_status`] before trusting
//! the stored value (lazy expiry).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::offer_id::OfferId;

/// Lifecycle status of an offer.
///
/// `Pending` → `Accepted` | `Rejected` (customer decision) and
/// `Pending` → `Expired` (system, on read past the deadline) are the only
/// legal transitions. The three non-pending states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    /// Awaiting the customer's decision.
    Pending,
    /// Customer accepted the offered price. Terminal.
    Accepted,
    /// Customer declined, with a stored reason. Terminal.
    Rejected,
    /// Deadline passed before a decision was made. Terminal.
    Expired,
}

impl OfferStatus {
    /// Canonical lowercase name as stored in the `offers.status` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }

    /// Whether no further transition is permitted from this status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "expired" => Ok(Self::Expired),
            other => Err(format!("unknown offer status: {other}")),
        }
    }
}

/// A negotiated price proposal attached to an order.
///
/// Invariants:
/// - exactly one owner (`user_id`);
/// - `rejection_reason` is set if and only if `status` is
///   [`OfferStatus::Rejected`];
/// - an offer past `expires_at` must be treated as expired regardless of
///   the stored status ([`Self::effective_status`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    /// Offer identifier.
    pub id: OfferId,
    /// Order the offer is attached to.
    pub order_id: Uuid,
    /// Offer recipient; the only identity allowed to decide it in-app.
    pub user_id: Uuid,
    /// Proposed amount in integer minor-currency units (e.g. kobo).
    pub amount_minor: i64,
    /// Human-readable description of the proposal.
    pub description: String,
    /// Stored status; callers must go through [`Self::effective_status`].
    pub status: OfferStatus,
    /// Reason supplied on rejection; `None` otherwise.
    pub rejection_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Decision deadline; `None` means the offer never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Offer {
    /// Whether the decision deadline has passed at `now`.
    #[must_use]
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| deadline < now)
    }

    /// The status callers must act on: a pending offer past its deadline
    /// reads as [`OfferStatus::Expired`] even before the row is updated.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> OfferStatus {
        if self.status == OfferStatus::Pending && self.is_past_deadline(now) {
            OfferStatus::Expired
        } else {
            self.status
        }
    }

    /// Whether a pending-to-expired write is due for this row.
    #[must_use]
    pub fn needs_expiry_sweep(&self, now: DateTime<Utc>) -> bool {
        self.status == OfferStatus::Pending && self.is_past_deadline(now)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn offer_with(status: OfferStatus, expires_at: Option<DateTime<Utc>>) -> Offer {
        Offer {
            id: OfferId::new(),
            order_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount_minor: 500_000,
            description: "3D character model, two revisions".to_string(),
            status,
            rejection_reason: None,
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[test]
    fn pending_is_the_only_non_terminal_status() {
        assert!(!OfferStatus::Pending.is_terminal());
        assert!(OfferStatus::Accepted.is_terminal());
        assert!(OfferStatus::Rejected.is_terminal());
        assert!(OfferStatus::Expired.is_terminal());
    }

    #[test]
    fn status_names_round_trip() {
        for status in [
            OfferStatus::Pending,
            OfferStatus::Accepted,
            OfferStatus::Rejected,
            OfferStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<OfferStatus>().ok(), Some(status));
        }
        assert!("cancelled".parse::<OfferStatus>().is_err());
    }

    #[test]
    fn pending_past_deadline_reads_as_expired() {
        let now = Utc::now();
        let offer = offer_with(OfferStatus::Pending, Some(now - Duration::hours(1)));
        assert_eq!(offer.effective_status(now), OfferStatus::Expired);
        assert!(offer.needs_expiry_sweep(now));
    }

    #[test]
    fn pending_before_deadline_stays_pending() {
        let now = Utc::now();
        let offer = offer_with(OfferStatus::Pending, Some(now + Duration::hours(24)));
        assert_eq!(offer.effective_status(now), OfferStatus::Pending);
        assert!(!offer.needs_expiry_sweep(now));
    }

    #[test]
    fn offer_without_deadline_never_expires() {
        let now = Utc::now();
        let offer = offer_with(OfferStatus::Pending, None);
        assert_eq!(offer.effective_status(now), OfferStatus::Pending);
    }

    #[test]
    fn terminal_status_is_unaffected_by_deadline() {
        let now = Utc::now();
        let offer = offer_with(OfferStatus::Accepted, Some(now - Duration::hours(1)));
        assert_eq!(offer.effective_status(now), OfferStatus::Accepted);
        assert!(!offer.needs_expiry_sweep(now));
    }
}

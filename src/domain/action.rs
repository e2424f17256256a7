//! The two customer decisions an offer supports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::offer::OfferStatus;

/// A customer decision on a pending offer.
///
/// Parsed once at the edge (URL path segment or token payload) and matched
/// exhaustively everywhere else; no string comparisons thread through the
/// service layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferAction {
    /// Accept the offered price.
    Accept,
    /// Decline the offered price; requires a non-empty reason.
    Reject,
}

impl OfferAction {
    /// Canonical lowercase name, as embedded in token payloads and stored
    /// in the `offer_tokens.action` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }

    /// The terminal status this action drives the offer into.
    #[must_use]
    pub const fn decided_status(&self) -> OfferStatus {
        match self {
            Self::Accept => OfferStatus::Accepted,
            Self::Reject => OfferStatus::Rejected,
        }
    }

    /// Whether this action requires a rejection reason.
    #[must_use]
    pub const fn requires_reason(&self) -> bool {
        matches!(self, Self::Reject)
    }
}

impl fmt::Display for OfferAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfferAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(Self::Accept),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown offer action: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_canonical_names() {
        assert_eq!("accept".parse::<OfferAction>().ok(), Some(OfferAction::Accept));
        assert_eq!("reject".parse::<OfferAction>().ok(), Some(OfferAction::Reject));
        assert!("approve".parse::<OfferAction>().is_err());
        assert!("Accept".parse::<OfferAction>().is_err());
    }

    #[test]
    fn decided_status_maps_to_terminal_states() {
        assert_eq!(OfferAction::Accept.decided_status(), OfferStatus::Accepted);
        assert_eq!(OfferAction::Reject.decided_status(), OfferStatus::Rejected);
    }

    #[test]
    fn only_reject_requires_reason() {
        assert!(!OfferAction::Accept.requires_reason());
        assert!(OfferAction::Reject.requires_reason());
    }
}

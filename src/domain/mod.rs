//! Domain layer: offer state machine, action tokens, and rental rules.
//!
//! This module contains the service-side domain model including offer
//! identity, the offer status state machine with lazy expiry, the
//! HMAC token codec, and rental pricing/window rules. Everything here is
//! pure; persistence effects live in `crate::persistence`.

pub mod action;
pub mod offer;
pub mod offer_id;
pub mod rental;
pub mod token;

pub use action::OfferAction;
pub use offer::{Offer, OfferStatus};
pub use offer_id::OfferId;
pub use rental::{Booking, RentalItem, RentalQuote, RentalWindow};
pub use token::{IssuedToken, TokenCodec, TokenVerification};

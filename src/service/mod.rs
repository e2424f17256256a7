//! Service layer: orchestration between the HTTP edge, the domain rules,
//! and the PostgreSQL store.

pub mod offer_service;
pub mod rental_service;

pub use offer_service::{Decision, OfferService};
pub use rental_service::RentalService;

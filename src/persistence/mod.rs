//! Persistence layer: PostgreSQL storage for offers, tokens, and rentals.
//!
//! All shared mutable state lives in the `offers`, `offer_tokens`, and
//! `rental_bookings` tables, and every mutation goes through the
//! conditional transactional updates in [`postgres::PostgresStore`]. No
//! other component writes those rows directly.

pub mod models;
pub mod postgres;
pub mod store;

pub use store::OfferStore;

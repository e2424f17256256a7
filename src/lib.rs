//! # bravework-offers
//!
//! Custom-offer negotiation and rental booking service for the Bravework
//! Studio platform.
//!
//! The wider marketing/CRUD site (pages, forms, dashboards, payments,
//! email) lives elsewhere; this service owns the two flows with real
//! state and invariants: the offer lifecycle (pending → accepted /
//! rejected / expired, driven in-app or through HMAC-signed single-use
//! link tokens) and hourly rental booking with overlap exclusion.
//!
//! ## Architecture
//!
//! ```text
//! Clients (web layer, emailed links, back office)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── OfferService / RentalService (service/)
//!     │
//!     ├── State machine, token codec, rental rules (domain/)
//!     │
//!     └── PostgreSQL (persistence/) — conditional transactional updates
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;

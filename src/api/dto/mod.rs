//! Data Transfer Objects for REST request/response serialization.
//!
//! All money amounts are integer minor-currency units; no floats cross
//! the wire.

pub mod common_dto;
pub mod offer_dto;
pub mod rental_dto;

pub use common_dto::*;
pub use offer_dto::*;
pub use rental_dto::*;

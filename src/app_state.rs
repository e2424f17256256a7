//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::{OfferService, RentalService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Offer lifecycle service.
    pub offer_service: Arc<OfferService>,
    /// Rental quote and booking service.
    pub rental_service: Arc<RentalService>,
}

//! Offer service: the single transactional entry point for offer
//! decisions, plus offer creation, token issuance, and reads.
//!
//! Both decision paths — authenticated session and token-bearing link —
//! converge on [`OfferService::decide_in_app`] /
//! [`OfferService::decide_with_token`], which produce identical
//! guarantees: all precondition checks and writes run atomically in the
//! backing [`OfferStore`].

use chrono::Utc;
use uuid::Uuid;

use crate::domain::action::OfferAction;
use crate::domain::offer::{Offer, OfferStatus};
use crate::domain::offer_id::OfferId;
use crate::domain::token::{IssuedToken, TokenCodec, TokenVerification};
use crate::error::ApiError;
use crate::persistence::models::{DecisionOutcome, DecisionRequest, NewOffer};
use crate::persistence::postgres::PostgresStore;
use crate::persistence::store::OfferStore;

/// Result of a successful accept/reject, returned so the caller can
/// update displayed state without re-fetching.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Offer that was decided.
    pub offer_id: OfferId,
    /// The terminal status the offer now holds.
    pub new_status: OfferStatus,
    /// Stored rejection reason, when the action was reject.
    pub rejection_reason: Option<String>,
}

/// Orchestration layer for the offer lifecycle.
#[derive(Debug, Clone)]
pub struct OfferService<S = PostgresStore> {
    store: S,
    tokens: TokenCodec,
    token_ttl_minutes: i64,
}

impl<S: OfferStore> OfferService<S> {
    /// Creates a new `OfferService`. `token_ttl_minutes` is the default
    /// lifetime for issued tokens when the caller does not supply one.
    #[must_use]
    pub fn new(store: S, tokens: TokenCodec, token_ttl_minutes: i64) -> Self {
        Self {
            store,
            tokens,
            token_ttl_minutes,
        }
    }

    /// Creates a new pending offer (administrator action).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] on invalid fields, or a
    /// persistence error.
    pub async fn create_offer(&self, new: NewOffer) -> Result<Offer, ApiError> {
        let now = Utc::now();
        if new.amount_minor <= 0 {
            return Err(ApiError::InvalidRequest(
                "amount_minor must be positive".to_string(),
            ));
        }
        if new.description.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "description must not be empty".to_string(),
            ));
        }
        if let Some(deadline) = new.expires_at
            && deadline <= now
        {
            return Err(ApiError::InvalidRequest(
                "expires_at must be in the future".to_string(),
            ));
        }

        let offer = Offer {
            id: OfferId::new(),
            order_id: new.order_id,
            user_id: new.user_id,
            amount_minor: new.amount_minor,
            description: new.description,
            status: OfferStatus::Pending,
            rejection_reason: None,
            created_at: now,
            expires_at: new.expires_at,
        };
        self.store.insert_offer(&offer).await?;

        tracing::info!(offer_id = %offer.id, user_id = %offer.user_id, "offer created");
        Ok(offer)
    }

    /// Issues a signed action token for a pending offer. The caller (the
    /// platform's notifier) embeds the token in the emailed link.
    /// `ttl_minutes` overrides the configured default lifetime.
    ///
    /// # Errors
    ///
    /// Fails with the usual state errors if the offer is missing, already
    /// decided, or past its deadline (applying the lazy-expiry write),
    /// and with [`ApiError::InvalidRequest`] on a non-positive lifetime.
    pub async fn issue_token(
        &self,
        offer_id: OfferId,
        action: OfferAction,
        ttl_minutes: Option<i64>,
    ) -> Result<IssuedToken, ApiError> {
        let ttl = ttl_minutes.unwrap_or(self.token_ttl_minutes);
        if ttl <= 0 {
            return Err(ApiError::InvalidRequest(
                "ttl_minutes must be positive".to_string(),
            ));
        }

        let offer = self.load_with_expiry(offer_id).await?;
        match offer.status {
            OfferStatus::Pending => {}
            OfferStatus::Expired => return Err(ApiError::OfferExpired(offer_id)),
            status => return Err(ApiError::AlreadyDecided(status)),
        }

        let issued = self.tokens.issue(offer_id, action, ttl)?;
        self.store.insert_token(&issued).await?;

        tracing::info!(%offer_id, token_id = %issued.id, action = action.as_str(), "action token issued");
        Ok(issued)
    }

    /// Returns an offer for its owner, with lazy expiry applied.
    ///
    /// # Errors
    ///
    /// [`ApiError::OfferNotFound`] if absent, [`ApiError::Forbidden`] if
    /// `viewer` is not the recipient.
    pub async fn get_offer(&self, viewer: Uuid, offer_id: OfferId) -> Result<Offer, ApiError> {
        let offer = self.load_with_expiry(offer_id).await?;
        if offer.user_id != viewer {
            return Err(ApiError::Forbidden);
        }
        Ok(offer)
    }

    /// Pages through the viewer's offers, newest first. Overdue pending
    /// rows are expired in one sweep before the page is read.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on database failure.
    pub async fn list_offers(
        &self,
        viewer: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Offer>, i64), ApiError> {
        let expired = self.store.expire_due_for_user(viewer).await?;
        if expired > 0 {
            tracing::info!(user_id = %viewer, count = expired, "expired overdue offers on read");
        }
        self.store.list_offers_for_user(viewer, limit, offset).await
    }

    /// Accepts or rejects an offer on behalf of an authenticated session.
    ///
    /// # Errors
    ///
    /// See the error taxonomy on [`ApiError`]; no state changes on any
    /// failure except the lazy Pending→Expired write.
    pub async fn decide_in_app(
        &self,
        user_id: Uuid,
        offer_id: OfferId,
        action: OfferAction,
        reason: Option<String>,
    ) -> Result<Decision, ApiError> {
        let rejection_reason = normalize_reason(action, reason)?;
        self.run_decision(DecisionRequest {
            offer_id,
            action,
            rejection_reason,
            expected_owner: Some(user_id),
            consume_token: None,
        })
        .await
    }

    /// Accepts or rejects an offer via a signed link token.
    ///
    /// The token must verify cryptographically and its embedded offer and
    /// action must match the request path. Ownership is deliberately not
    /// re-checked against a session on this path: possession of the
    /// emailed link is the credential.
    ///
    /// # Errors
    ///
    /// Invalid, expired, mismatched, or already-used tokens fail with the
    /// corresponding 401 variants before or during the transaction; no
    /// offer mutation occurs on any failure.
    pub async fn decide_with_token(
        &self,
        raw_token: &str,
        offer_id: OfferId,
        action: OfferAction,
        reason: Option<String>,
    ) -> Result<Decision, ApiError> {
        check_token_binding(&self.tokens.verify(raw_token), offer_id, action)?;
        let rejection_reason = normalize_reason(action, reason)?;
        self.run_decision(DecisionRequest {
            offer_id,
            action,
            rejection_reason,
            expected_owner: None,
            consume_token: Some(raw_token.to_string()),
        })
        .await
    }

    async fn run_decision(&self, req: DecisionRequest) -> Result<Decision, ApiError> {
        let offer_id = req.offer_id;
        let action = req.action;
        match self.store.decide(&req).await? {
            DecisionOutcome::DeadlinePassed => {
                // The decision rolled back; persist the lazy
                // Pending→Expired transition before reporting Gone.
                self.store.mark_expired(offer_id, Utc::now()).await?;
                tracing::info!(%offer_id, "offer expired on decision attempt");
                Err(ApiError::OfferExpired(offer_id))
            }
            outcome => {
                let decision = finish_decision(offer_id, outcome)?;
                tracing::info!(
                    %offer_id,
                    action = action.as_str(),
                    new_status = decision.new_status.as_str(),
                    "offer decided"
                );
                Ok(decision)
            }
        }
    }

    /// Fetches an offer, persisting the Pending→Expired transition first
    /// when its deadline has passed, so callers never observe a stale
    /// `pending`.
    async fn load_with_expiry(&self, offer_id: OfferId) -> Result<Offer, ApiError> {
        let offer = self
            .store
            .fetch_offer(offer_id)
            .await?
            .ok_or(ApiError::OfferNotFound(offer_id))?;

        let now = Utc::now();
        if offer.needs_expiry_sweep(now) {
            self.store.mark_expired(offer_id, now).await?;
            // Re-read: a concurrent decision may have won instead.
            return self
                .store
                .fetch_offer(offer_id)
                .await?
                .ok_or(ApiError::OfferNotFound(offer_id));
        }
        Ok(offer)
    }
}

/// Validates and normalizes the rejection reason for an action: reject
/// requires a non-empty reason, accept must not store one.
fn normalize_reason(
    action: OfferAction,
    reason: Option<String>,
) -> Result<Option<String>, ApiError> {
    if !action.requires_reason() {
        return Ok(None);
    }
    match reason.as_deref().map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Ok(Some(trimmed.to_string())),
        _ => Err(ApiError::InvalidRequest(
            "a rejection reason is required".to_string(),
        )),
    }
}

/// Requires a verified token to be bound to the requested offer and
/// action; any mismatch is treated the same as a forged token.
fn check_token_binding(
    verification: &TokenVerification,
    offer_id: OfferId,
    action: OfferAction,
) -> Result<(), ApiError> {
    match verification {
        TokenVerification::Valid {
            offer_id: embedded_offer,
            action: embedded_action,
            ..
        } => {
            if *embedded_offer != offer_id || *embedded_action != action {
                return Err(ApiError::InvalidToken);
            }
            Ok(())
        }
        TokenVerification::Expired => Err(ApiError::TokenExpired),
        TokenVerification::Invalid => Err(ApiError::InvalidToken),
    }
}

/// Maps a non-deadline decision outcome onto the error taxonomy.
fn finish_decision(offer_id: OfferId, outcome: DecisionOutcome) -> Result<Decision, ApiError> {
    match outcome {
        DecisionOutcome::Decided {
            new_status,
            rejection_reason,
        } => Ok(Decision {
            offer_id,
            new_status,
            rejection_reason,
        }),
        DecisionOutcome::OfferMissing => Err(ApiError::OfferNotFound(offer_id)),
        DecisionOutcome::NotOwner => Err(ApiError::Forbidden),
        DecisionOutcome::AlreadyDecided(status) => Err(ApiError::AlreadyDecided(status)),
        DecisionOutcome::TokenMissing => Err(ApiError::InvalidToken),
        DecisionOutcome::TokenUsed => Err(ApiError::TokenAlreadyUsed),
        // Handled by the caller before this point.
        DecisionOutcome::DeadlinePassed => Err(ApiError::OfferExpired(offer_id)),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex, MutexGuard};

    use chrono::{DateTime, Duration};

    use super::*;

    /// In-memory store mirroring the transactional semantics of the
    /// production store: a decision either changes the offer (and burns
    /// the presented token) or changes nothing at all.
    #[derive(Debug, Clone, Default)]
    struct MemoryStore {
        offers: Arc<Mutex<HashMap<OfferId, Offer>>>,
        // raw token string -> used flag
        tokens: Arc<Mutex<HashMap<String, bool>>>,
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("lock poisoned"),
        }
    }

    impl OfferStore for MemoryStore {
        async fn insert_offer(&self, offer: &Offer) -> Result<(), ApiError> {
            lock(&self.offers).insert(offer.id, offer.clone());
            Ok(())
        }

        async fn fetch_offer(&self, offer_id: OfferId) -> Result<Option<Offer>, ApiError> {
            Ok(lock(&self.offers).get(&offer_id).cloned())
        }

        async fn mark_expired(
            &self,
            offer_id: OfferId,
            now: DateTime<Utc>,
        ) -> Result<bool, ApiError> {
            let mut offers = lock(&self.offers);
            if let Some(offer) = offers.get_mut(&offer_id)
                && offer.status == OfferStatus::Pending
                && offer.is_past_deadline(now)
            {
                offer.status = OfferStatus::Expired;
                return Ok(true);
            }
            Ok(false)
        }

        async fn expire_due_for_user(&self, user_id: Uuid) -> Result<u64, ApiError> {
            let now = Utc::now();
            let mut count = 0;
            for offer in lock(&self.offers).values_mut() {
                if offer.user_id == user_id && offer.needs_expiry_sweep(now) {
                    offer.status = OfferStatus::Expired;
                    count += 1;
                }
            }
            Ok(count)
        }

        async fn list_offers_for_user(
            &self,
            user_id: Uuid,
            limit: i64,
            offset: i64,
        ) -> Result<(Vec<Offer>, i64), ApiError> {
            let mut rows: Vec<Offer> = lock(&self.offers)
                .values()
                .filter(|o| o.user_id == user_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let total = i64::try_from(rows.len()).unwrap_or(i64::MAX);
            let page = rows
                .into_iter()
                .skip(usize::try_from(offset).unwrap_or(0))
                .take(usize::try_from(limit).unwrap_or(0))
                .collect();
            Ok((page, total))
        }

        async fn insert_token(&self, token: &IssuedToken) -> Result<(), ApiError> {
            lock(&self.tokens).insert(token.token.clone(), false);
            Ok(())
        }

        async fn decide(&self, req: &DecisionRequest) -> Result<DecisionOutcome, ApiError> {
            let mut tokens = lock(&self.tokens);
            if let Some(raw) = req.consume_token.as_deref() {
                match tokens.get(raw) {
                    None => return Ok(DecisionOutcome::TokenMissing),
                    Some(true) => return Ok(DecisionOutcome::TokenUsed),
                    Some(false) => {}
                }
            }

            let mut offers = lock(&self.offers);
            let Some(offer) = offers.get_mut(&req.offer_id) else {
                return Ok(DecisionOutcome::OfferMissing);
            };
            if let Some(expected) = req.expected_owner
                && offer.user_id != expected
            {
                return Ok(DecisionOutcome::NotOwner);
            }
            if offer.status == OfferStatus::Pending && offer.is_past_deadline(Utc::now()) {
                return Ok(DecisionOutcome::DeadlinePassed);
            }
            if offer.status != OfferStatus::Pending {
                return Ok(DecisionOutcome::AlreadyDecided(offer.status));
            }

            offer.status = req.action.decided_status();
            offer.rejection_reason = req.rejection_reason.clone();
            if let Some(raw) = req.consume_token.as_deref()
                && let Some(used) = tokens.get_mut(raw)
            {
                *used = true;
            }
            Ok(DecisionOutcome::Decided {
                new_status: offer.status,
                rejection_reason: req.rejection_reason.clone(),
            })
        }
    }

    fn service() -> (OfferService<MemoryStore>, MemoryStore) {
        let store = MemoryStore::default();
        let codec = TokenCodec::new(*b"decision-test-secret-32-bytes!!!");
        (OfferService::new(store.clone(), codec, 60), store)
    }

    async fn seeded_pending(service: &OfferService<MemoryStore>) -> Offer {
        let created = service
            .create_offer(NewOffer {
                order_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                amount_minor: 500_000,
                description: "custom logo pack".to_string(),
                expires_at: None,
            })
            .await;
        let Ok(offer) = created else {
            panic!("offer creation failed");
        };
        offer
    }

    fn stored(store: &MemoryStore, offer_id: OfferId) -> Offer {
        let Some(offer) = lock(&store.offers).get(&offer_id).cloned() else {
            panic!("offer missing from store");
        };
        offer
    }

    #[tokio::test]
    async fn deciding_a_terminal_offer_changes_nothing() {
        let (service, store) = service();
        let offer = seeded_pending(&service).await;
        let accepted = service
            .decide_in_app(offer.user_id, offer.id, OfferAction::Accept, None)
            .await;
        assert!(accepted.is_ok());

        let again = service
            .decide_in_app(
                offer.user_id,
                offer.id,
                OfferAction::Reject,
                Some("changed my mind".to_string()),
            )
            .await;
        assert!(matches!(
            again,
            Err(ApiError::AlreadyDecided(OfferStatus::Accepted))
        ));

        let row = stored(&store, offer.id);
        assert_eq!(row.status, OfferStatus::Accepted);
        assert_eq!(row.rejection_reason, None);
    }

    #[tokio::test]
    async fn only_the_recipient_may_decide_in_app() {
        let (service, store) = service();
        let offer = seeded_pending(&service).await;
        let result = service
            .decide_in_app(Uuid::new_v4(), offer.id, OfferAction::Accept, None)
            .await;
        assert!(matches!(result, Err(ApiError::Forbidden)));
        assert_eq!(stored(&store, offer.id).status, OfferStatus::Pending);
    }

    #[tokio::test]
    async fn an_action_token_is_single_use() {
        let (service, store) = service();
        let offer = seeded_pending(&service).await;
        let Ok(issued) = service.issue_token(offer.id, OfferAction::Accept, None).await else {
            panic!("token issuance failed");
        };

        let Ok(first) = service
            .decide_with_token(&issued.token, offer.id, OfferAction::Accept, None)
            .await
        else {
            panic!("first use should succeed");
        };
        assert_eq!(first.new_status, OfferStatus::Accepted);

        let second = service
            .decide_with_token(&issued.token, offer.id, OfferAction::Accept, None)
            .await;
        assert!(matches!(second, Err(ApiError::TokenAlreadyUsed)));
        assert_eq!(stored(&store, offer.id).status, OfferStatus::Accepted);
    }

    #[tokio::test]
    async fn a_failed_attempt_leaves_the_token_usable() {
        let (service, store) = service();
        let offer = seeded_pending(&service).await;
        let Ok(issued) = service.issue_token(offer.id, OfferAction::Reject, None).await else {
            panic!("token issuance failed");
        };

        // Missing reason fails before any state changes.
        let missing_reason = service
            .decide_with_token(&issued.token, offer.id, OfferAction::Reject, None)
            .await;
        assert!(matches!(missing_reason, Err(ApiError::InvalidRequest(_))));
        assert_eq!(stored(&store, offer.id).status, OfferStatus::Pending);

        let retried = service
            .decide_with_token(
                &issued.token,
                offer.id,
                OfferAction::Reject,
                Some("over budget".to_string()),
            )
            .await;
        let Ok(decision) = retried else {
            panic!("retry with a reason should succeed");
        };
        assert_eq!(decision.new_status, OfferStatus::Rejected);
        assert_eq!(decision.rejection_reason.as_deref(), Some("over budget"));
    }

    #[tokio::test]
    async fn deadline_hit_on_decide_is_persisted_as_expired() {
        let (service, store) = service();
        // create_offer rejects past deadlines, so seed the row directly.
        let offer = Offer {
            id: OfferId::new(),
            order_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount_minor: 250_000,
            description: "poster series".to_string(),
            status: OfferStatus::Pending,
            rejection_reason: None,
            created_at: Utc::now() - Duration::days(3),
            expires_at: Some(Utc::now() - Duration::hours(1)),
        };
        let Ok(()) = store.insert_offer(&offer).await else {
            panic!("seed failed");
        };

        let result = service
            .decide_in_app(offer.user_id, offer.id, OfferAction::Accept, None)
            .await;
        assert!(matches!(result, Err(ApiError::OfferExpired(_))));
        // The rolled-back decision still persisted Pending -> Expired.
        assert_eq!(stored(&store, offer.id).status, OfferStatus::Expired);
    }

    #[tokio::test]
    async fn token_ttl_defaults_and_overrides() {
        let (service, _store) = service();
        let offer = seeded_pending(&service).await;

        let Ok(default_ttl) = service.issue_token(offer.id, OfferAction::Accept, None).await
        else {
            panic!("token issuance failed");
        };
        let Ok(day_long) = service
            .issue_token(offer.id, OfferAction::Accept, Some(1440))
            .await
        else {
            panic!("token issuance failed");
        };

        let now = Utc::now();
        let default_minutes = (default_ttl.expires_at - now).num_minutes();
        assert!((59..=60).contains(&default_minutes));
        let day_minutes = (day_long.expires_at - now).num_minutes();
        assert!((1439..=1440).contains(&day_minutes));

        let zero = service.issue_token(offer.id, OfferAction::Accept, Some(0)).await;
        assert!(matches!(zero, Err(ApiError::InvalidRequest(_))));
    }

    #[test]
    fn reject_without_reason_is_an_input_error() {
        assert!(normalize_reason(OfferAction::Reject, None).is_err());
        assert!(normalize_reason(OfferAction::Reject, Some("   ".to_string())).is_err());
        assert!(normalize_reason(OfferAction::Reject, Some(String::new())).is_err());
    }

    #[test]
    fn reject_reason_is_trimmed_and_kept() {
        let reason = normalize_reason(OfferAction::Reject, Some("  too expensive  ".to_string()));
        assert_eq!(reason.ok().flatten().as_deref(), Some("too expensive"));
    }

    #[test]
    fn accept_discards_any_reason() {
        let reason = normalize_reason(OfferAction::Accept, Some("ignored".to_string()));
        assert_eq!(reason.ok().flatten(), None);
    }

    #[test]
    fn token_must_match_requested_offer_and_action() {
        let offer_id = OfferId::new();
        let valid = TokenVerification::Valid {
            token_id: Uuid::new_v4(),
            offer_id,
            action: OfferAction::Accept,
        };
        assert!(check_token_binding(&valid, offer_id, OfferAction::Accept).is_ok());
        // Same token presented against the wrong action or offer.
        assert!(check_token_binding(&valid, offer_id, OfferAction::Reject).is_err());
        assert!(check_token_binding(&valid, OfferId::new(), OfferAction::Accept).is_err());
    }

    #[test]
    fn expired_and_invalid_tokens_map_to_distinct_errors() {
        let offer_id = OfferId::new();
        let expired = check_token_binding(&TokenVerification::Expired, offer_id, OfferAction::Accept);
        let invalid = check_token_binding(&TokenVerification::Invalid, offer_id, OfferAction::Accept);
        assert!(matches!(expired, Err(ApiError::TokenExpired)));
        assert!(matches!(invalid, Err(ApiError::InvalidToken)));
    }

    #[test]
    fn outcomes_map_onto_error_taxonomy() {
        let offer_id = OfferId::new();
        assert!(matches!(
            finish_decision(offer_id, DecisionOutcome::OfferMissing),
            Err(ApiError::OfferNotFound(_))
        ));
        assert!(matches!(
            finish_decision(offer_id, DecisionOutcome::NotOwner),
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            finish_decision(offer_id, DecisionOutcome::AlreadyDecided(OfferStatus::Accepted)),
            Err(ApiError::AlreadyDecided(OfferStatus::Accepted))
        ));
        assert!(matches!(
            finish_decision(offer_id, DecisionOutcome::TokenUsed),
            Err(ApiError::TokenAlreadyUsed)
        ));
        assert!(matches!(
            finish_decision(offer_id, DecisionOutcome::TokenMissing),
            Err(ApiError::InvalidToken)
        ));
    }

    #[test]
    fn decided_outcome_carries_status_and_reason() {
        let offer_id = OfferId::new();
        let decision = finish_decision(
            offer_id,
            DecisionOutcome::Decided {
                new_status: OfferStatus::Rejected,
                rejection_reason: Some("budget cut".to_string()),
            },
        );
        let Ok(decision) = decision else {
            panic!("expected decided outcome");
        };
        assert_eq!(decision.new_status, OfferStatus::Rejected);
        assert_eq!(decision.rejection_reason.as_deref(), Some("budget cut"));
    }
}

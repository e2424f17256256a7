//! HMAC-signed, single-use, time-limited action tokens.
//!
//! A token is a capability granting the right to perform one action on one
//! offer without an authenticated session. Wire format (preserved
//! bit-for-bit for interoperability with previously issued links):
//!
//! ```text
//! payload   = "<uuid>:<offerId>:<action>:<expirationEpochMs>"
//! signature = HMAC_SHA256(secret, payload)          // hex digest
//! token     = base64("<payload>:<signature>")
//! ```
//!
//! [`TokenCodec`] only proves authenticity and freshness; single-use
//! enforcement lives in the persistence layer, which flips the stored
//! `used` flag inside the action transaction.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::action::OfferAction;
use super::offer_id::OfferId;
use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies offer action tokens.
///
/// Holds the server secret injected at construction; business logic never
/// reads it from the environment directly.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print the secret.
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

/// A freshly generated token, ready to persist and embed in a link.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Random token record identifier; makes two tokens for the same
    /// offer and action distinguishable and independently revocable.
    pub id: Uuid,
    /// Opaque encoded token string.
    pub token: String,
    /// Offer the token acts on.
    pub offer_id: OfferId,
    /// Action the token authorizes.
    pub action: OfferAction,
    /// Expiry embedded in the payload, mirrored to the database row.
    pub expires_at: DateTime<Utc>,
}

/// Outcome of verifying a raw token string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenVerification {
    /// Signature checks out and the embedded expiry is in the future.
    Valid {
        /// Token record identifier from the payload.
        token_id: Uuid,
        /// Offer the token acts on.
        offer_id: OfferId,
        /// Action the token authorizes.
        action: OfferAction,
    },
    /// Correctly signed but the embedded expiry has passed.
    Expired,
    /// Decode failure, malformed payload, or signature mismatch.
    Invalid,
}

impl TokenCodec {
    /// Creates a codec with the given server secret.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Generates a signed token for `action` on `offer_id`, valid for
    /// `ttl_minutes` from now.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if the HMAC cannot be initialized.
    pub fn issue(
        &self,
        offer_id: OfferId,
        action: OfferAction,
        ttl_minutes: i64,
    ) -> Result<IssuedToken, ApiError> {
        let id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::minutes(ttl_minutes);
        let payload = format!(
            "{id}:{offer_id}:{}:{}",
            action.as_str(),
            expires_at.timestamp_millis()
        );
        let signature = self
            .signature(&payload)
            .ok_or_else(|| ApiError::Internal("hmac initialization failed".to_string()))?;
        let token = BASE64.encode(format!("{payload}:{signature}"));

        Ok(IssuedToken {
            id,
            token,
            offer_id,
            action,
            expires_at,
        })
    }

    /// Verifies a raw token string without trusting any client input.
    ///
    /// Fails closed: any decode failure, malformed payload, or signature
    /// mismatch yields [`TokenVerification::Invalid`]. A correctly signed
    /// token whose embedded expiry has passed is reported as
    /// [`TokenVerification::Expired`], never merely invalid.
    #[must_use]
    pub fn verify(&self, raw: &str) -> TokenVerification {
        let Ok(bytes) = BASE64.decode(raw) else {
            return TokenVerification::Invalid;
        };
        let Ok(decoded) = String::from_utf8(bytes) else {
            return TokenVerification::Invalid;
        };
        let Some((payload, embedded_sig)) = decoded.rsplit_once(':') else {
            return TokenVerification::Invalid;
        };

        let mut fields = payload.split(':');
        let (Some(id), Some(offer), Some(action), Some(expiry), None) = (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) else {
            return TokenVerification::Invalid;
        };

        let Some(expected_sig) = self.signature(payload) else {
            return TokenVerification::Invalid;
        };
        if !bool::from(expected_sig.as_bytes().ct_eq(embedded_sig.as_bytes())) {
            return TokenVerification::Invalid;
        }

        let Ok(token_id) = Uuid::parse_str(id) else {
            return TokenVerification::Invalid;
        };
        let Ok(offer_id) = offer.parse::<OfferId>() else {
            return TokenVerification::Invalid;
        };
        let Ok(action) = action.parse::<OfferAction>() else {
            return TokenVerification::Invalid;
        };
        let Ok(expiry_ms) = expiry.parse::<i64>() else {
            return TokenVerification::Invalid;
        };

        if Utc::now().timestamp_millis() > expiry_ms {
            return TokenVerification::Expired;
        }

        TokenVerification::Valid {
            token_id,
            offer_id,
            action,
        }
    }

    /// Hex-encoded HMAC-SHA256 over `payload`.
    ///
    /// `None` is unreachable in practice since HMAC accepts keys of any
    /// length, but the failure is propagated rather than panicked on.
    fn signature(&self, payload: &str) -> Option<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(payload.as_bytes());
        Some(hex::encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(*b"test-secret-key-for-offer-tokens")
    }

    fn issued(action: OfferAction, ttl_minutes: i64) -> IssuedToken {
        let Ok(token) = codec().issue(OfferId::new(), action, ttl_minutes) else {
            panic!("issue failed");
        };
        token
    }

    #[test]
    fn issue_then_verify_round_trip() {
        let issued = issued(OfferAction::Accept, 60);
        match codec().verify(&issued.token) {
            TokenVerification::Valid {
                token_id,
                offer_id,
                action,
            } => {
                assert_eq!(token_id, issued.id);
                assert_eq!(offer_id, issued.offer_id);
                assert_eq!(action, OfferAction::Accept);
            }
            other => panic!("expected valid token, got {other:?}"),
        }
    }

    #[test]
    fn wire_format_matches_contract() {
        let issued = issued(OfferAction::Accept, 60);
        let Ok(bytes) = BASE64.decode(&issued.token) else {
            panic!("token is not base64");
        };
        let Ok(decoded) = String::from_utf8(bytes) else {
            panic!("token payload is not utf-8");
        };
        let parts: Vec<&str> = decoded.split(':').collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts.get(1).copied(), Some(issued.offer_id.to_string()).as_deref());
        assert_eq!(parts.get(2).copied(), Some("accept"));
        assert_eq!(
            parts.get(3).and_then(|s| s.parse::<i64>().ok()),
            Some(issued.expires_at.timestamp_millis())
        );
        // hex-encoded SHA-256 digest
        assert_eq!(parts.get(4).map_or(0, |s| s.len()), 64);
    }

    #[test]
    fn expired_token_is_reported_as_expired_not_invalid() {
        let issued = issued(OfferAction::Accept, -5);
        assert_eq!(codec().verify(&issued.token), TokenVerification::Expired);
    }

    #[test]
    fn flipped_signature_character_fails_closed() {
        let issued = issued(OfferAction::Reject, 60);
        let Ok(bytes) = BASE64.decode(&issued.token) else {
            panic!("token is not base64");
        };
        let Ok(mut decoded) = String::from_utf8(bytes) else {
            panic!("token payload is not utf-8");
        };
        let flipped = match decoded.pop() {
            Some('0') => '1',
            _ => '0',
        };
        decoded.push(flipped);
        let tampered = BASE64.encode(decoded);
        assert_eq!(codec().verify(&tampered), TokenVerification::Invalid);
    }

    #[test]
    fn altered_payload_with_original_signature_fails() {
        let issued = issued(OfferAction::Accept, 60);
        let Ok(bytes) = BASE64.decode(&issued.token) else {
            panic!("token is not base64");
        };
        let Ok(decoded) = String::from_utf8(bytes) else {
            panic!("token payload is not utf-8");
        };
        let Some((payload, sig)) = decoded.rsplit_once(':') else {
            panic!("malformed token");
        };
        // Swap the embedded offer id for a different one, keep the signature.
        let Some((head, rest)) = payload.split_once(':') else {
            panic!("malformed payload");
        };
        let Some((_, tail)) = rest.split_once(':') else {
            panic!("malformed payload");
        };
        let forged_payload = format!("{head}:{}:{tail}", OfferId::new());
        let forged = BASE64.encode(format!("{forged_payload}:{sig}"));
        assert_eq!(codec().verify(&forged), TokenVerification::Invalid);
    }

    #[test]
    fn upgrading_action_fails_signature_check() {
        // A reject token re-encoded as an accept token must not verify.
        let issued = issued(OfferAction::Reject, 60);
        let Ok(bytes) = BASE64.decode(&issued.token) else {
            panic!("token is not base64");
        };
        let Ok(decoded) = String::from_utf8(bytes) else {
            panic!("token payload is not utf-8");
        };
        let swapped = decoded.replace(":reject:", ":accept:");
        assert_ne!(swapped, decoded);
        assert_eq!(
            codec().verify(&BASE64.encode(swapped)),
            TokenVerification::Invalid
        );
    }

    #[test]
    fn garbage_inputs_are_invalid() {
        let c = codec();
        assert_eq!(c.verify("not-base64!!"), TokenVerification::Invalid);
        assert_eq!(c.verify(""), TokenVerification::Invalid);
        assert_eq!(
            c.verify(&BASE64.encode("too:few:fields")),
            TokenVerification::Invalid
        );
    }

    #[test]
    fn different_secret_rejects_token() {
        let issued = issued(OfferAction::Accept, 60);
        let other = TokenCodec::new(*b"a-completely-different-secret!!!");
        assert_eq!(other.verify(&issued.token), TokenVerification::Invalid);
    }

    #[test]
    fn two_tokens_for_same_offer_and_action_differ() {
        let offer_id = OfferId::new();
        let c = codec();
        let (Ok(a), Ok(b)) = (
            c.issue(offer_id, OfferAction::Accept, 60),
            c.issue(offer_id, OfferAction::Accept, 60),
        ) else {
            panic!("issue failed");
        };
        assert_ne!(a.id, b.id);
        assert_ne!(a.token, b.token);
    }
}

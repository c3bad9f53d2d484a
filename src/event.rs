//! Event model, structural validation, and cryptographic verification (C1).
//!
//! Canonicalization and signature checking follow the protocol exactly:
//! any deviation here breaks interoperability with real clients, so the
//! canonical form is built by hand rather than derived from `Event`'s own
//! `Serialize` impl (whose field order/omissions are for the wire shape,
//! not the hash preimage).

use secp256k1::schnorr::Signature as SchnorrSignature;
use secp256k1::{Message, XOnlyPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::RelayError;

/// A signed Nostr event, immutable once accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub pubkey: String,
    pub sig: String,
    pub created_at: i64,
    pub kind: i64,
    pub tags: Vec<Vec<String>>,
    pub content: String,
}

impl Event {
    /// Structural validation: non-empty id/pubkey/sig, positive
    /// `created_at`, non-negative `kind`.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.id.is_empty() {
            return Err(RelayError::MalformedEvent {
                reason: "event id is empty".to_string(),
            });
        }
        if self.pubkey.is_empty() {
            return Err(RelayError::MalformedEvent {
                reason: "event pubkey is empty".to_string(),
            });
        }
        if self.sig.is_empty() {
            return Err(RelayError::MalformedEvent {
                reason: "event sig is empty".to_string(),
            });
        }
        if self.created_at <= 0 {
            return Err(RelayError::MalformedEvent {
                reason: "event created_at is invalid".to_string(),
            });
        }
        if self.kind < 0 {
            return Err(RelayError::MalformedEvent {
                reason: "event kind is invalid".to_string(),
            });
        }
        Ok(())
    }

    /// The canonical serialization used for the id hash:
    /// `[0, pubkey, created_at, kind, tags, content]`, compact JSON.
    fn canonical(&self) -> String {
        serde_json::json!([0, self.pubkey, self.created_at, self.kind, self.tags, self.content])
            .to_string()
    }

    fn computed_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Recomputes the canonical hash and checks it against `id`, then
    /// verifies the Schnorr signature over that hash against `pubkey`.
    pub fn verify(&self) -> Result<(), RelayError> {
        let computed = self.computed_id();
        if computed != self.id.to_lowercase() {
            return Err(RelayError::BadId);
        }

        let id_bytes = hex::decode(&self.id).map_err(|_| RelayError::BadSignature)?;
        let message = Message::from_digest_slice(&id_bytes).map_err(|_| RelayError::BadSignature)?;

        let pubkey_bytes = hex::decode(&self.pubkey).map_err(|_| RelayError::BadSignature)?;
        let pubkey =
            XOnlyPublicKey::from_slice(&pubkey_bytes).map_err(|_| RelayError::BadSignature)?;

        let sig_bytes = hex::decode(&self.sig).map_err(|_| RelayError::BadSignature)?;
        let signature =
            SchnorrSignature::from_slice(&sig_bytes).map_err(|_| RelayError::BadSignature)?;

        secp256k1::SECP256K1
            .verify_schnorr(&signature, &message, &pubkey)
            .map_err(|_| RelayError::BadSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{KeyPair, Secp256k1};

    fn signed_event(content: &str, kind: i64, tags: Vec<Vec<String>>) -> Event {
        let secp = Secp256k1::new();
        let keypair = KeyPair::new(&secp, &mut rand::thread_rng());
        let (pubkey, _parity) = XOnlyPublicKey::from_keypair(&keypair);

        let created_at = 1_700_000_000_i64;
        let canonical =
            serde_json::json!([0, hex::encode(pubkey.serialize()), created_at, kind, tags, content])
                .to_string();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let id_bytes = hasher.finalize();
        let id = hex::encode(id_bytes);

        let message = Message::from_digest_slice(&id_bytes).unwrap();
        let sig = secp.sign_schnorr(&message, &keypair);

        Event {
            id,
            pubkey: hex::encode(pubkey.serialize()),
            sig: hex::encode(sig.as_ref()),
            created_at,
            kind,
            tags,
            content: content.to_string(),
        }
    }

    #[test]
    fn verify_accepts_correctly_signed_event() {
        let event = signed_event("hello", 1, vec![]);
        assert!(event.verify().is_ok());
    }

    #[test]
    fn verify_rejects_tampered_content() {
        let mut event = signed_event("hello", 1, vec![]);
        event.content = "goodbye".to_string();
        assert!(matches!(event.verify(), Err(RelayError::BadId)));
    }

    #[test]
    fn verify_rejects_tampered_tags() {
        let mut event = signed_event("hello", 1, vec![vec!["e".to_string(), "abc".to_string()]]);
        event.tags = vec![vec!["e".to_string(), "xyz".to_string()]];
        assert!(matches!(event.verify(), Err(RelayError::BadId)));
    }

    #[test]
    fn verify_rejects_tampered_created_at() {
        let mut event = signed_event("hello", 1, vec![]);
        event.created_at += 1;
        assert!(matches!(event.verify(), Err(RelayError::BadId)));
    }

    #[test]
    fn verify_rejects_wrong_signature() {
        let mut event = signed_event("hello", 1, vec![]);
        let other = signed_event("other", 1, vec![]);
        event.sig = other.sig;
        assert!(matches!(event.verify(), Err(RelayError::BadSignature)));
    }

    #[test]
    fn validate_rejects_empty_fields_and_bad_numbers() {
        let mut event = signed_event("hello", 1, vec![]);
        event.id = String::new();
        assert!(event.validate().is_err());

        let mut event = signed_event("hello", 1, vec![]);
        event.created_at = 0;
        assert!(event.validate().is_err());

        let mut event = signed_event("hello", 1, vec![]);
        event.kind = -1;
        assert!(event.validate().is_err());
    }

    #[test]
    fn validate_accepts_well_formed_event() {
        let event = signed_event("hello", 1, vec![]);
        assert!(event.validate().is_ok());
    }
}

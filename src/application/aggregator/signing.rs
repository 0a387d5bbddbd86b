//! Decision signing, verification and replay protection.

use std::sync::Arc;

use alloy_primitives::hex;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::warn;

use crate::domain::{Identity, OrchestratedDecision, SessionId};
use crate::error::SecurityViolation;
use crate::port::IdentityService;

/// Random 128-bit nonce from the OS RNG, hex encoded.
#[must_use]
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Signs and verifies decisions through an [`IdentityService`].
pub struct DecisionSigner {
    identity: Arc<dyn IdentityService>,
}

impl DecisionSigner {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        Self { identity }
    }

    /// Attach a fresh identity to `decision`.
    ///
    /// # Errors
    /// Returns a [`SecurityViolation`] if the key service cannot sign.
    pub async fn sign(
        &self,
        decision: &mut OrchestratedDecision,
        signer_id: &str,
        session_id: &SessionId,
    ) -> Result<(), SecurityViolation> {
        self.identity.register(signer_id).await?;
        let mut identity = Identity {
            signer_id: signer_id.to_string(),
            nonce: generate_nonce(),
            session_id: session_id.clone(),
            signed_at: Utc::now(),
            signature: String::new(),
        };
        let payload = decision
            .signing_payload(&identity)
            .map_err(|e| SecurityViolation::Signing {
                signer_id: signer_id.to_string(),
                reason: e.to_string(),
            })?;
        identity.signature = self.identity.sign(signer_id, &payload).await?;
        decision.identity = Some(identity);
        Ok(())
    }

    /// Check that `decision` carries a valid signature over its content.
    ///
    /// # Errors
    /// [`SecurityViolation::MissingSignature`] for unsigned decisions and
    /// [`SecurityViolation::InvalidSignature`] for tampered ones.
    pub async fn verify(&self, decision: &OrchestratedDecision) -> Result<(), SecurityViolation> {
        let identity = decision
            .identity
            .as_ref()
            .ok_or(SecurityViolation::MissingSignature)?;
        let invalid = || SecurityViolation::InvalidSignature {
            signer_id: identity.signer_id.clone(),
        };
        let payload = decision.signing_payload(identity).map_err(|_| invalid())?;
        let valid = self
            .identity
            .verify(&identity.signer_id, &payload, &identity.signature)
            .await?;
        if valid {
            Ok(())
        } else {
            Err(invalid())
        }
    }
}

/// Refuses any nonce seen before.
///
/// Nonces are 128-bit random values, so one seen in any session is a replay.
/// Entries older than `retention` are pruned, and decisions signed before
/// the retention window are refused outright. `signed_at` is covered by the
/// signature, so a pruned nonce cannot be re-dated.
pub struct ReplayGuard {
    seen: DashMap<String, DateTime<Utc>>,
    retention: Duration,
}

impl ReplayGuard {
    #[must_use]
    pub fn new(retention: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            retention,
        }
    }

    /// Record the identity's nonce, failing if it was already used.
    ///
    /// # Errors
    /// Returns [`SecurityViolation::Replay`] for reused or expired nonces.
    pub fn check_and_record(&self, identity: &Identity) -> Result<(), SecurityViolation> {
        let now = Utc::now();
        let cutoff = now - self.retention;
        let replay = || SecurityViolation::Replay {
            session_id: identity.session_id.to_string(),
            nonce: identity.nonce.clone(),
        };

        if identity.signed_at < cutoff {
            warn!(target: "security", nonce = %identity.nonce, "Decision signed outside the replay window");
            return Err(replay());
        }

        match self.seen.entry(identity.nonce.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => return Err(replay()),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(identity.signed_at);
            }
        }

        self.seen.retain(|_, signed_at| *signed_at >= cutoff);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::new(Duration::hours(24))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(nonce: &str, signed_at: DateTime<Utc>) -> Identity {
        Identity {
            signer_id: "orchestrator".into(),
            nonce: nonce.into(),
            session_id: SessionId::from("s1"),
            signed_at,
            signature: "00".into(),
        }
    }

    #[test]
    fn nonces_are_unique_and_128_bit() {
        let a = generate_nonce();
        let b = generate_nonce();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn replayed_nonce_is_refused() {
        let guard = ReplayGuard::default();
        let id = identity("abc", Utc::now());
        assert!(guard.check_and_record(&id).is_ok());
        assert!(matches!(
            guard.check_and_record(&id),
            Err(SecurityViolation::Replay { .. })
        ));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn stale_decision_is_refused() {
        let guard = ReplayGuard::new(Duration::minutes(5));
        let id = identity("old", Utc::now() - Duration::minutes(10));
        assert!(guard.check_and_record(&id).is_err());
        assert!(guard.is_empty());
    }
}

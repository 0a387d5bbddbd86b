//! Local secp256k1 identity service.

use std::str::FromStr;

use alloy_primitives::{hex, Signature};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::{ConfigError, SecurityViolation};
use crate::port::IdentityService;

/// Keeps one private key per signer id in process memory.
///
/// Signatures are EIP-191 personal messages; the public key is the derived
/// address. Unconfigured signers get a fresh random key on registration.
#[derive(Default)]
pub struct LocalKeyIdentity {
    keys: DashMap<String, PrivateKeySigner>,
}

impl LocalKeyIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a hex private key for `signer_id`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] if the key does not parse.
    pub fn with_key(self, signer_id: impl Into<String>, private_key: &str) -> Result<Self, ConfigError> {
        let signer = PrivateKeySigner::from_str(private_key.trim()).map_err(|e| {
            ConfigError::InvalidValue {
                field: "identity.keys",
                reason: e.to_string(),
            }
        })?;
        self.keys.insert(signer_id.into(), signer);
        Ok(self)
    }

    fn signer(&self, signer_id: &str) -> Result<PrivateKeySigner, SecurityViolation> {
        self.keys
            .get(signer_id)
            .map(|s| s.value().clone())
            .ok_or_else(|| SecurityViolation::UnknownSigner(signer_id.to_string()))
    }
}

#[async_trait]
impl IdentityService for LocalKeyIdentity {
    async fn register(&self, signer_id: &str) -> Result<String, SecurityViolation> {
        let signer = self
            .keys
            .entry(signer_id.to_string())
            .or_insert_with(|| {
                debug!(signer = signer_id, "Generated signing key");
                PrivateKeySigner::random()
            });
        Ok(signer.address().to_string())
    }

    async fn sign(&self, signer_id: &str, message: &[u8]) -> Result<String, SecurityViolation> {
        let signer = self.signer(signer_id)?;
        let signature = signer
            .sign_message_sync(message)
            .map_err(|e| SecurityViolation::Signing {
                signer_id: signer_id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(hex::encode(signature.as_bytes()))
    }

    async fn verify(
        &self,
        signer_id: &str,
        message: &[u8],
        signature: &str,
    ) -> Result<bool, SecurityViolation> {
        let expected = self.signer(signer_id)?.address();
        let Ok(bytes) = hex::decode(signature) else {
            return Ok(false);
        };
        let Ok(signature) = Signature::try_from(bytes.as_slice()) else {
            return Ok(false);
        };
        Ok(signature
            .recover_address_from_msg(message)
            .is_ok_and(|address| address == expected))
    }
}

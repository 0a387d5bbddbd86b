//! Identity / key service port.

use async_trait::async_trait;

use crate::error::SecurityViolation;

/// Asymmetric signing capability keyed by signer id.
///
/// Private keys never leave the implementation.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Ensure a key pair exists for `signer_id`; returns its public key.
    async fn register(&self, signer_id: &str) -> Result<String, SecurityViolation>;

    /// Sign `message` with the private key of `signer_id`. Returns a hex signature.
    async fn sign(&self, signer_id: &str, message: &[u8]) -> Result<String, SecurityViolation>;

    /// Verify a hex signature. Malformed signatures verify as `false`.
    async fn verify(
        &self,
        signer_id: &str,
        message: &[u8],
        signature: &str,
    ) -> Result<bool, SecurityViolation>;
}

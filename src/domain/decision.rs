//! Weighted, signed decisions produced by the aggregator.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ModuleId, SessionId};
use super::signal::StrategySignal;

/// Non-repudiable attribution attached to a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub signer_id: String,
    /// Random per-decision nonce, hex encoded.
    pub nonce: String,
    pub session_id: SessionId,
    pub signed_at: DateTime<Utc>,
    /// Signature over [`OrchestratedDecision::signing_payload`], hex encoded.
    pub signature: String,
}

/// A signal after weighting, override and signing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratedDecision {
    pub signal: StrategySignal,
    /// Capital weight applied to the signal.
    pub applied_weight: f64,
    pub overridden: bool,
    pub override_reason: Option<String>,
    /// Modules whose signals produced this decision.
    pub contributors: Vec<ModuleId>,
    pub identity: Option<Identity>,
}

/// Fields covered by the signature, serialized in declaration order.
#[derive(Serialize)]
struct SigningPayload<'a> {
    action: &'a str,
    symbol: &'a str,
    allocation: String,
    reasoning: &'a str,
    timestamp: String,
    nonce: &'a str,
    signer_id: &'a str,
    session_id: &'a str,
    signed_at: String,
}

impl OrchestratedDecision {
    /// Wrap a signal without identity.
    #[must_use]
    pub fn unsigned(signal: StrategySignal, applied_weight: f64) -> Self {
        let contributors = vec![signal.module_id.clone()];
        Self {
            signal,
            applied_weight,
            overridden: false,
            override_reason: None,
            contributors,
            identity: None,
        }
    }

    /// Allocation the decision asks for.
    #[must_use]
    pub fn allocation(&self) -> Decimal {
        self.signal.target_allocation
    }

    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.identity.is_some()
    }

    /// Canonical bytes signed for this decision under `identity`.
    ///
    /// Every identity field except the signature itself is covered. Decimal
    /// and timestamp renderings are fixed (normalized decimal, RFC 3339 with
    /// microseconds) so signer and verifier agree byte for byte.
    ///
    /// # Errors
    /// Returns an error if JSON serialization fails.
    pub fn signing_payload(&self, identity: &Identity) -> serde_json::Result<Vec<u8>> {
        let payload = SigningPayload {
            action: self.signal.action.as_str(),
            symbol: self.signal.symbol.as_str(),
            allocation: self.signal.target_allocation.normalize().to_string(),
            reasoning: &self.signal.reasoning,
            timestamp: self
                .signal
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Micros, true),
            nonce: &identity.nonce,
            signer_id: &identity.signer_id,
            session_id: identity.session_id.as_str(),
            signed_at: identity
                .signed_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        };
        serde_json::to_vec(&payload)
    }
}

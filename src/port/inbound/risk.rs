//! Pre-trade verdict types.
//!
//! The gate logic lives in `application::risk::RiskGate`; this module only
//! defines what it answers.

use crate::error::RiskError;

/// Result of a pre-trade check for one decision.
#[derive(Debug, Clone)]
pub enum PreTradeVerdict {
    /// The decision may proceed to routing.
    Allow,

    /// The decision is refused.
    Deny(RiskError),

    /// A BUY is turned into a HOLD (e.g. concentration). Not an error.
    Downgrade {
        /// Structured, human-readable reason.
        reason: String,
    },
}

impl PreTradeVerdict {
    /// Return `true` if the decision may proceed.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Human-readable reason for a denial or downgrade.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Allow => None,
            Self::Deny(e) => Some(e.to_string()),
            Self::Downgrade { reason } => Some(reason.clone()),
        }
    }

    /// Return the denial error, if any.
    #[must_use]
    pub const fn denial(&self) -> Option<&RiskError> {
        match self {
            Self::Deny(e) => Some(e),
            _ => None,
        }
    }
}

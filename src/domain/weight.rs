//! Capital weights assigned to decision modules.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::ModuleId;

/// Execution mode derived from a module's trailing Sharpe ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentMode {
    /// Full allocation.
    Active,
    /// Half allocation.
    Reduced,
    /// Evaluated and logged, never executed.
    Shadow,
}

impl AgentMode {
    /// Allocation multiplier for this mode.
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Active => 1.0,
            Self::Reduced => 0.5,
            Self::Shadow => 0.0,
        }
    }

    /// Whether the mode may receive capital.
    #[must_use]
    pub const fn is_eligible(self) -> bool {
        !matches!(self, Self::Shadow)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Reduced => "REDUCED",
            Self::Shadow => "SHADOW",
        }
    }
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weight of one module for the current cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentWeight {
    pub module_id: ModuleId,
    pub sharpe_ratio: f64,
    pub mode: AgentMode,
    /// Mode multiplier in [0, 1].
    pub weight_multiplier: f64,
    /// Softmax share of capital. Sums to 1.0 over non-SHADOW modules.
    pub capital_weight: f64,
}

impl AgentWeight {
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.mode.is_eligible()
    }
}

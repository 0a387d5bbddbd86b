use rust_decimal::Decimal;
use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Order parameters rejected before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("quantity must be greater than zero (got {0})")]
    ZeroQuantity(Decimal),

    #[error("price must be positive (got {0})")]
    NonPositivePrice(Decimal),

    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),

    #[error("allocation {0} is outside [0, 1]")]
    AllocationOutOfRange(Decimal),

    #[error("decision action {0} does not produce an order")]
    NotExecutable(String),

    #[error("illegal intent transition {from} -> {to}")]
    IllegalTransition { from: String, to: String },
}

/// Missing or malformed input data. Always handled fail-closed.
#[derive(Error, Debug, Clone)]
#[error("{source_name} unavailable: {reason}")]
pub struct DataUnavailable {
    /// Which collaborator failed to provide the data.
    pub source_name: &'static str,
    /// Human-readable cause.
    pub reason: String,
}

impl DataUnavailable {
    pub fn new(source_name: &'static str, reason: impl Into<String>) -> Self {
        Self {
            source_name,
            reason: reason.into(),
        }
    }
}

/// Broker API failures.
#[derive(Error, Debug, Clone)]
pub enum BrokerError {
    #[error("broker call timed out after {0} ms")]
    Timeout(u64),

    #[error("transient broker failure: {0}")]
    Transient(String),

    #[error("order rejected by broker: {0}")]
    Rejected(String),
}

impl BrokerError {
    /// Whether the outcome of the call is unknown and must be reconciled.
    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Transient(_))
    }
}

/// Identity failures. Always an unconditional denial.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecurityViolation {
    #[error("decision has no signature")]
    MissingSignature,

    #[error("signature from '{signer_id}' does not verify")]
    InvalidSignature { signer_id: String },

    #[error("nonce {nonce} already used in session {session_id}")]
    Replay { session_id: String, nonce: String },

    #[error("signing failed for '{signer_id}': {reason}")]
    Signing { signer_id: String, reason: String },

    #[error("unknown signer '{0}'")]
    UnknownSigner(String),

    #[error("signer '{signer_id}' may not issue executable decisions")]
    UnauthorizedSigner { signer_id: String },
}

/// Risk management errors.
#[derive(Error, Debug, Clone)]
pub enum RiskError {
    #[error("trading halted: {reason}")]
    Halted { reason: String },

    #[error("risk state unavailable: {reason}")]
    StateUnavailable { reason: String },

    #[error("position limit exceeded for {symbol}: projected {projected} beyond +/-{limit}")]
    PositionLimitExceeded {
        symbol: String,
        projected: Decimal,
        limit: Decimal,
    },

    #[error("trade limit reached: {count} trades >= {limit} in current period")]
    TradeLimitExceeded { count: u32, limit: u32 },

    #[error("concurrent risk state update lost for account {account_id}")]
    Conflict { account_id: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    DataUnavailable(#[from] DataUnavailable),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Security(#[from] SecurityViolation),

    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error("module error: {0}")]
    Module(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

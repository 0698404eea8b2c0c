use crate::deal::{DealId, DealStatus, PartyId, Role};
use crate::negotiation::Action;

/// Why a negotiation step was refused. Every variant leaves the deal untouched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("`{0}` is not a valid amount")]
    InvalidAmount(String),
    #[error("cannot {action} a deal that is {status}")]
    InvalidTransition { status: DealStatus, action: Action },
    #[error("the other party has not answered your offer yet")]
    NotYourTurn,
    #[error("deal changed since it was read (read version {expected}, stored version {found})")]
    StaleState { expected: u64, found: u64 },
    #[error("{0} is not a party to this deal")]
    Unauthorized(PartyId),
    #[error("a {role} may not {action} a deal")]
    RoleNotPermitted { role: Role, action: Action },
    #[error("buyer and agent must be different parties")]
    SameParty,
    #[error("`{0}` is not a known deal status")]
    UnknownStatus(String),
}

/// Failures of the persistence adapter.
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
    #[error("deal {0} does not exist")]
    NotFound(DealId),
    #[error("deal {0} already exists")]
    AlreadyExists(DealId),
    #[error("stored deal {0} violates its invariants")]
    Corrupt(DealId),
    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),
    #[error("failed to encode record: {0}")]
    Encode(String),
    #[error("failed to decode record: {0}")]
    Decode(#[from] minicbor::decode::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures loading [`crate::config::Config`].
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("fraction digits must be 0 or 2, got {0}")]
    FractionDigits(u8),
    #[error("unsupported currency `{0}`")]
    Currency(String),
}

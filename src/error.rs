//! Error taxonomy for the arbitrage engine.
//!
//! Each external capability fails with its own type so the cycle can decide
//! what is recoverable: quote failures are swallowed by the profitability
//! check, execution failures end the cycle, configuration failures end the
//! process before the event loop starts.

use thiserror::Error;

/// Startup configuration errors. Fatal: the event loop never begins.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("no {venue} pair exists for {token_a} / {token_b}")]
    PairNotFound {
        venue: String,
        token_a: String,
        token_b: String,
    },

    #[error("chain query failed during startup: {0}")]
    Chain(String),
}

/// Reserve reads. A failed read ends the cycle without a trade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VenueError {
    #[error("{venue}: reserve read failed: {reason}")]
    Rpc { venue: String, reason: String },

    #[error("{venue}: pool reports empty reserves")]
    EmptyReserves { venue: String },

    #[error("{venue}: reserve read timed out")]
    Timeout { venue: String },
}

/// Quoting failures. All of these are treated as liquidity problems.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("{venue}: quote call reverted: {reason}")]
    Venue { venue: String, reason: String },

    #[error("{venue}: insufficient liquidity for requested amount")]
    InsufficientLiquidity { venue: String },

    #[error("{venue}: path does not match the configured pair")]
    InvalidPath { venue: String },

    #[error("candidate trade size is not a positive amount")]
    InvalidAmount,

    #[error("{venue}: quote call timed out")]
    Timeout { venue: String },
}

/// On-chain execution failures. Fatal for the cycle, never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("balance read failed: {reason}")]
    Balance { reason: String },

    #[error("transaction submission failed: {reason}")]
    Submission { reason: String },

    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("waiting for transaction inclusion failed: {reason}")]
    Finality { reason: String },

    #[error("execution call timed out")]
    Timeout,
}

/// Anything that terminates an evaluation cycle early.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error(transparent)]
    Venue(#[from] VenueError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

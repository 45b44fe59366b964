//! Unified error types for the eERC SDK.
//!
//! Every fallible path in the crate surfaces one of these variants; errors
//! propagate to the operation boundary and nothing inside the core retries.
//! Retrying with fresh randomness is always safe for the consumer because
//! nonces and encryption randoms are sampled per invocation.

use thiserror::Error;

/// Crate-wide result alias.
pub type EercResult<T> = Result<T, EercError>;

/// Error taxonomy for the SDK.
#[derive(Debug, Error)]
pub enum EercError {
    /// Address string is malformed or the zero address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Amount is zero or exceeds the plaintext balance.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Operation is incompatible with the deployment mode.
    #[error("operation not permitted in {0} mode")]
    NotPermittedInMode(&'static str),

    /// Auditor public key is the identity point (auditor not configured).
    #[error("auditor public key is not set")]
    AuditorNotSet,

    /// Counterparty public key is the identity point (not registered).
    #[error("counterparty is not registered")]
    UnregisteredParty,

    /// No decryption key available in the session.
    #[error("decryption key not present in session")]
    MissingKey,

    /// Point is not on the Baby Jubjub curve or fails a subgroup check.
    #[error("invalid point: {0}")]
    InvalidPoint(&'static str),

    /// Low-level field arithmetic failure.
    #[error("arithmetic error: {0}")]
    ArithmeticError(&'static str),

    /// The external prover reported a failure.
    #[error("prover error: {0}")]
    ProverError(String),

    /// Balance reconstruction cross-check failed; the PCT queue and the
    /// homomorphic total disagree.
    #[error("balance reconstruction is inconsistent with the EGCT total")]
    InconsistentBalance,

    /// Derived secret key reduced to zero.
    #[error("derived key is weak (zero after reduction)")]
    WeakKey,
}

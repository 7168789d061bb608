//! Error types for the botstate-persistence crate.
//!
//! All persistence operations return [`PersistenceError`] via
//! [`PersistenceResult`]. Uses `thiserror` for ergonomic, zero-cost error
//! definitions.

use thiserror::Error;

/// Alias for `Result<T, PersistenceError>`.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Errors that can occur while loading or saving bot state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The persisted snapshot blob could not be decoded.
    ///
    /// A corrupt snapshot is a hard failure. The store never falls back to
    /// empty collections here, which would mask data loss.
    #[error("failed to decode persisted snapshot: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// The in-memory snapshot could not be encoded.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// The remote store failed. Propagated untranslated, one attempt per
    /// operation, no retry or backoff.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

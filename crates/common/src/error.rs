//! Common error types shared across crates.

use thiserror::Error;

/// Top-level error type for masking and stream encryption.
///
/// Variants fall into two groups:
/// - caller-input problems ([`ProtectError::Configuration`],
///   [`ProtectError::OutOfRange`], [`ProtectError::Unsupported`]) surfaced at
///   construction time;
/// - internal failures ([`ProtectError::TypeMismatch`],
///   [`ProtectError::CryptoBackend`]) that abort the batch or stream in progress.
#[derive(Debug, Error)]
pub enum ProtectError {
    /// Options or parameters do not fit what they are applied to: a key or IV
    /// of the wrong length, an unknown algorithm, a malformed mask description.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A numeric input lies outside its permitted range (stripe index, row
    /// range, list offsets).
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// The request is recognised but not implemented.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A mask was applied to a batch of a different shape than the schema
    /// it was built from.
    #[error("type mismatch: {mask} mask applied to {batch} batch")]
    TypeMismatch {
        /// Mask variant name.
        mask: &'static str,
        /// Batch variant name.
        batch: &'static str,
    },

    /// The cipher context failed or was already released.
    #[error("crypto backend failure: {0}")]
    CryptoBackend(String),
}

impl ProtectError {
    /// Returns `true` if the error leaves the current stream or batch unusable.
    ///
    /// Non-fatal errors are reported before any data is touched and can be
    /// fixed by the caller by changing its inputs.
    pub fn is_fatal(&self) -> bool {
        match self {
            ProtectError::Configuration(_) => false,
            ProtectError::OutOfRange(_) => false,
            ProtectError::Unsupported(_) => false,
            ProtectError::TypeMismatch { .. } => true,
            ProtectError::CryptoBackend(_) => true,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T, E = ProtectError> = std::result::Result<T, E>;

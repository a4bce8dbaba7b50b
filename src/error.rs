//! use identitykit::error::IdentityKitError;

use thiserror::Error;

/// Represents errors that can occur in the IdentityKit library.
///
/// The variants keep the failure kind distinct all the way up to the
/// [`Dispatcher`](crate::dispatch::Dispatcher), which is the only place where
/// they are collapsed into an absent result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityKitError {
    /// Input was not well-formed DER, or not the structure that was expected.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// The private key does not correspond to the certificate's public key.
    #[error("Private key does not match the certificate public key")]
    KeyCertMismatch,

    /// Error from the underlying encoding or cryptographic primitives.
    #[error("Failed to encode data: {0}")]
    EncodingFailure(String),

    /// Serialization finished without producing any output.
    #[error("Serialization produced no output: {0}")]
    SerializationFailure(String),

    /// The PKCS#12 MAC did not verify, usually because of a wrong password.
    #[error("PKCS#12 integrity check failed")]
    IntegrityCheckFailed,

    /// A key store lookup found nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error reported by an identity store backend.
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<der::Error> for IdentityKitError {
    /// Converts a `der::Error` into an `IdentityKitError`.
    fn from(err: der::Error) -> Self {
        IdentityKitError::MalformedInput(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for IdentityKitError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        IdentityKitError::MalformedInput(err.to_string())
    }
}

impl From<pkcs8::Error> for IdentityKitError {
    fn from(err: pkcs8::Error) -> Self {
        IdentityKitError::MalformedInput(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for IdentityKitError {
    fn from(err: pkcs8::spki::Error) -> Self {
        IdentityKitError::MalformedInput(err.to_string())
    }
}

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, IdentityKitError>;

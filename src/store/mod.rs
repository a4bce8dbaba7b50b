//! Storage backends for keys and certificates.
//!
//! Private keys are addressed by an application tag and certificates by a
//! label. Both are opaque strings; keeping them unique is up to the store.

mod memory;

pub use memory::MemoryIdentityStore;

use crate::cert::Certificate;
use crate::error::Result;
use crate::identity::Identity;
use crate::key::{KeyAttributes, PublicKey};

/// Trait for identity storage backends (synchronous)
pub trait IdentityStore: Send + Sync {
    /// Store a certificate under `label`.
    ///
    /// Storing the same certificate under the same label again is a no-op.
    fn store_certificate(&self, certificate: &Certificate, label: &str) -> Result<()>;

    /// Find the private key stored under `tag` together with a stored
    /// certificate that matches it.
    fn find_identity(&self, tag: &str) -> Result<Option<Identity>>;

    /// Find the public half of the key stored under `tag`.
    fn find_public_key(&self, tag: &str) -> Result<Option<PublicKey>>;

    /// Generate a new key pair as described by `attributes`.
    fn generate_key(&self, attributes: &KeyAttributes) -> Result<PublicKey>;

    /// Delete every certificate stored under `label`. An unknown label is not an error.
    fn delete_certificate(&self, label: &str) -> Result<()>;

    /// Delete the key stored under `tag`. An unknown tag is not an error.
    fn delete_key(&self, tag: &str) -> Result<()>;
}

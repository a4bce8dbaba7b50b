//! Password-protected PKCS#12 (RFC 7292) archives.
//!
//! [`build`] bundles a matched private key and certificate into a DER
//! encoded PFX that standard tools such as `openssl pkcs12` can open with
//! the same password, and [`parse`] reads such an archive back.

pub mod asn1;
mod builder;
pub mod mac;
mod reader;

use std::fmt;

use bon::Builder;
use zeroize::Zeroizing;

pub use mac::MacAlgorithm;
pub use reader::ParsedPkcs12;

use crate::cert::Certificate;
use crate::error::{IdentityKitError, Result};
use crate::key::PrivateKey;

/// Default PBKDF2 and MAC iteration count, matching OpenSSL.
pub const DEFAULT_ITERATIONS: u32 = 2048;

/// Largest PBKDF2 or MAC iteration count written or accepted.
pub const MAX_ITERATIONS: u32 = 10_000_000;

/// Options for writing a PKCS#12 archive.
///
/// # Fields
/// * `encryption_iterations` - PBKDF2 rounds for the PBES2-protected bags.
/// * `mac_iterations` - KDF rounds for the integrity MAC key.
/// * `mac_algorithm` - HMAC digest of the integrity MAC.
#[derive(Clone, Debug, Builder)]
pub struct ExportOptions {
    #[builder(default = DEFAULT_ITERATIONS)]
    pub encryption_iterations: u32,
    #[builder(default = DEFAULT_ITERATIONS)]
    pub mac_iterations: u32,
    #[builder(default)]
    pub mac_algorithm: MacAlgorithm,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ExportOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        let range = 1..=MAX_ITERATIONS;
        if !range.contains(&self.encryption_iterations) || !range.contains(&self.mac_iterations) {
            return Err(IdentityKitError::InvalidInput(format!(
                "PKCS#12 iteration counts must be between 1 and {MAX_ITERATIONS}"
            )));
        }
        Ok(())
    }
}

/// A serialized PKCS#12 archive.
///
/// The bytes are wiped from memory when the container is dropped.
pub struct Pkcs12Container {
    der: Zeroizing<Vec<u8>>,
    friendly_name: String,
}

impl Pkcs12Container {
    fn new(der: Zeroizing<Vec<u8>>, friendly_name: &str) -> Self {
        Self {
            der,
            friendly_name: friendly_name.to_string(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.der
    }

    /// Moves the archive bytes out; the caller becomes responsible for them.
    pub fn into_bytes(mut self) -> Vec<u8> {
        std::mem::take(&mut *self.der)
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn len(&self) -> usize {
        self.der.len()
    }

    pub fn is_empty(&self) -> bool {
        self.der.is_empty()
    }
}

impl fmt::Debug for Pkcs12Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pkcs12Container")
            .field("friendly_name", &self.friendly_name)
            .field("len", &self.der.len())
            .finish()
    }
}

/// Builds a PKCS#12 archive with the default [`ExportOptions`].
///
/// Fails with [`IdentityKitError::KeyCertMismatch`] unless `key` is the
/// private half of the certificate's public key.
pub fn build(
    key: &PrivateKey,
    certificate: &Certificate,
    friendly_name: &str,
    password: &str,
) -> Result<Pkcs12Container> {
    builder::build(
        key,
        certificate,
        friendly_name,
        password,
        &ExportOptions::default(),
    )
}

pub fn build_with_options(
    key: &PrivateKey,
    certificate: &Certificate,
    friendly_name: &str,
    password: &str,
    options: &ExportOptions,
) -> Result<Pkcs12Container> {
    builder::build(key, certificate, friendly_name, password, options)
}

/// Parses a PKCS#12 archive, verifying its MAC with `password` before any
/// content is decrypted.
///
/// A wrong password fails with [`IdentityKitError::IntegrityCheckFailed`].
pub fn parse(der: &[u8], password: &str) -> Result<ParsedPkcs12> {
    reader::parse(der, password)
}

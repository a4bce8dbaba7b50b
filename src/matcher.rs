//! Checks that a private key is the counterpart of a certificate's public key.
//!
//! The check works on key material only. Tags and labels say nothing about
//! whether a key can sign for a certificate.

use crate::cert::Certificate;
use crate::error::{IdentityKitError, Result};
use crate::key::{PrivateKey, PublicKey};

/// Returns whether `key` corresponds to the public key in `certificate`.
///
/// Keys of different algorithms never match. An error is returned only when
/// the certificate claims an RSA key whose bits do not decode.
pub fn matches(key: &PrivateKey, certificate: &Certificate) -> Result<bool> {
    let spki = certificate.subject_public_key_info();
    match key {
        PrivateKey::Rsa(_) if spki.algorithm.oid != const_oid::db::rfc5912::RSA_ENCRYPTION => {
            log::debug!(
                "certificate key algorithm {} cannot match an RSA private key",
                spki.algorithm.oid
            );
            return Ok(false);
        }
        PrivateKey::Rsa(_) => {}
    }

    let certificate_key = PublicKey::from_x509spki(spki)?;
    let matched = certificate_key.same_key_material(&key.public_key());
    if !matched {
        log::debug!(
            "{}-bit private key does not match the certificate public key",
            key.bits()
        );
    }
    Ok(matched)
}

/// Like [`matches`], but a mismatch is reported as
/// [`IdentityKitError::KeyCertMismatch`].
pub fn ensure_matches(key: &PrivateKey, certificate: &Certificate) -> Result<()> {
    if matches(key, certificate)? {
        Ok(())
    } else {
        Err(IdentityKitError::KeyCertMismatch)
    }
}

//! Typed identity operations on top of an [`IdentityStore`].

use crate::cert::Certificate;
use crate::error::{IdentityKitError, Result};
use crate::key::{KeyAttributes, PrivateKey};
use crate::pkcs12::{self, ExportOptions, Pkcs12Container};
use crate::store::IdentityStore;

/// A private key together with the certificate for its public key.
///
/// Identities are assembled from a store lookup and never stored as such.
#[derive(Clone, Debug)]
pub struct Identity {
    pub private_key: PrivateKey,
    pub certificate: Certificate,
}

impl Identity {
    /// Pairs `private_key` with `certificate`, failing with
    /// [`IdentityKitError::KeyCertMismatch`] if they do not belong together.
    pub fn new(private_key: PrivateKey, certificate: Certificate) -> Result<Self> {
        crate::matcher::ensure_matches(&private_key, &certificate)?;
        Ok(Self {
            private_key,
            certificate,
        })
    }

    /// Exports the identity as a password-protected PKCS#12 archive.
    pub fn to_pkcs12(
        &self,
        friendly_name: &str,
        password: &str,
        options: &ExportOptions,
    ) -> Result<Pkcs12Container> {
        pkcs12::build_with_options(
            &self.private_key,
            &self.certificate,
            friendly_name,
            password,
            options,
        )
    }
}

/// Key and certificate management over an identity store.
pub struct IdentityManager<S> {
    store: S,
    options: ExportOptions,
}

impl<S: IdentityStore> IdentityManager<S> {
    pub fn new(store: S) -> Self {
        Self::with_options(store, ExportOptions::default())
    }

    pub fn with_options(store: S, options: ExportOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Generates a key pair and returns its public key as DER SubjectPublicKeyInfo.
    pub fn generate_key(&self, attributes: &KeyAttributes) -> Result<Vec<u8>> {
        let public_key = self.store.generate_key(attributes)?;
        log::info!(
            "generated {}-bit key for tag {:?}",
            attributes.size,
            attributes.tag
        );
        public_key.to_spki_der()
    }

    pub fn delete_key(&self, tag: &str) -> Result<()> {
        self.store.delete_key(tag)
    }

    pub fn delete_certificate(&self, label: &str) -> Result<()> {
        self.store.delete_certificate(label)
    }

    /// Returns the DER SubjectPublicKeyInfo of the key stored under `tag`.
    pub fn load_public_key(&self, tag: &str) -> Result<Vec<u8>> {
        self.store
            .find_public_key(tag)?
            .ok_or_else(|| IdentityKitError::NotFound(format!("no key under tag {tag:?}")))?
            .to_spki_der()
    }

    /// Decodes `certificate_der` and stores it under `label`.
    ///
    /// Nothing is stored when the certificate does not decode, or when it
    /// claims an RSA key whose bits do not decode.
    pub fn create_identity(&self, certificate_der: &[u8], label: &str) -> Result<()> {
        let certificate = Certificate::from_der(certificate_der)?;
        let spki = certificate.subject_public_key_info();
        if spki.algorithm.oid == const_oid::db::rfc5912::RSA_ENCRYPTION {
            certificate.public_key()?;
        }
        self.store.store_certificate(&certificate, label)
    }

    /// Exports the identity for the key under `tag` as a PKCS#12 archive
    /// named `friendly_name` and protected by `password`.
    pub fn load_identity(
        &self,
        tag: &str,
        friendly_name: &str,
        password: &str,
    ) -> Result<Pkcs12Container> {
        let identity = self.store.find_identity(tag)?.ok_or_else(|| {
            IdentityKitError::NotFound(format!("no identity for tag {tag:?}"))
        })?;
        let container = identity.to_pkcs12(friendly_name, password, &self.options)?;
        log::info!(
            "exported identity for tag {tag:?} as {:?} ({} bytes)",
            container.friendly_name(),
            container.len()
        );
        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::{CertificateParams, DistinguishedName};
    use crate::store::MemoryIdentityStore;

    #[test]
    fn create_identity_rejects_undecodable_rsa_key() {
        let key = PrivateKey::generate_rsa(1024).unwrap();
        let params = CertificateParams::builder()
            .subject(DistinguishedName::builder().common_name("junk").build())
            .build();
        let mut inner = Certificate::new_self_signed(&params, &key).unwrap().inner;
        inner.tbs_certificate.subject_public_key_info.subject_public_key =
            der::asn1::BitString::from_bytes(&[1, 2, 3, 4]).unwrap();
        let junk = Certificate::from_inner(inner).unwrap();

        let manager = IdentityManager::new(MemoryIdentityStore::new());
        let err = manager.create_identity(junk.to_der(), "c1").unwrap_err();
        assert!(matches!(err, IdentityKitError::MalformedInput(_)));
        assert_eq!(manager.store().certificate_count("c1").unwrap(), 0);
    }
}

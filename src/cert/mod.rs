pub mod params;

use const_oid::ObjectIdentifier;
use der::asn1::{Ia5StringRef, PrintableStringRef, Utf8StringRef};
use der::{Decode, Encode, EncodePem};
use sha1::{Digest, Sha1};
use x509_cert::name::Name;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::error::{IdentityKitError, Result};
use crate::issuer::{Issuer, SelfIssuer};
use crate::key::{PrivateKey, PublicKey};
use params::CertificateParams;

/// Common name (CN) attribute type.
const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// Represents an X.509 certificate.
///
/// The DER the certificate was decoded from (or encoded as, when it was
/// issued locally) is kept alongside the parsed structure, so handing the
/// certificate on never re-encodes it.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: x509_cert::Certificate,
    der: Vec<u8>,
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl Certificate {
    /// Decodes a DER-encoded X.509 certificate.
    ///
    /// Truncated input, trailing bytes and anything that is not a
    /// certificate fail with [`IdentityKitError::MalformedInput`].
    pub fn from_der(der: &[u8]) -> Result<Self> {
        if der.is_empty() {
            return Err(IdentityKitError::MalformedInput(
                "certificate data is empty".to_string(),
            ));
        }
        let inner = x509_cert::Certificate::from_der(der)?;
        Ok(Self {
            inner,
            der: der.to_vec(),
        })
    }

    pub(crate) fn from_inner(inner: x509_cert::Certificate) -> Result<Self> {
        let der = inner
            .to_der()
            .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))?;
        Ok(Self { inner, der })
    }

    /// The DER encoding of the certificate.
    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    /// Re-encodes the parsed certificate in canonical DER.
    pub fn to_canonical_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))
    }

    pub fn subject(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn subject_public_key_info(&self) -> &SubjectPublicKeyInfoOwned {
        &self.inner.tbs_certificate.subject_public_key_info
    }

    /// The certificate's public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(self.subject_public_key_info())
    }

    /// SHA-1 digest of the DER encoding, used as the PKCS#12 `localKeyId`.
    pub fn sha1_fingerprint(&self) -> [u8; 20] {
        Sha1::digest(&self.der).into()
    }

    /// First common name in the subject, if it is a string type we can read.
    pub fn common_name(&self) -> Option<String> {
        self.subject()
            .0
            .iter()
            .flat_map(|rdn| rdn.0.iter())
            .filter(|attr| attr.oid == COMMON_NAME)
            .find_map(|attr| {
                if let Ok(s) = attr.value.decode_as::<Utf8StringRef<'_>>() {
                    Some(s.as_str().to_string())
                } else if let Ok(s) = attr.value.decode_as::<PrintableStringRef<'_>>() {
                    Some(s.as_str().to_string())
                } else {
                    attr.value
                        .decode_as::<Ia5StringRef<'_>>()
                        .ok()
                        .map(|s| s.as_str().to_string())
                }
            })
    }

    /// Creates a new self-signed certificate for `key`.
    ///
    /// # Arguments
    /// * `params` - Subject, validity and CA flag of the certificate.
    /// * `key` - The key pair used to sign the certificate.
    pub fn new_self_signed(params: &CertificateParams, key: &PrivateKey) -> Result<Self> {
        let self_issuer = SelfIssuer {
            name: params.subject.as_x509_name()?,
            key,
        };
        self_issuer.issue(params, &key.public_key())
    }
}

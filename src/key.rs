use std::fmt;

use bon::Builder;
use pkcs8::SecretDocument;
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey},
    traits::PublicKeyParts,
};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::error::{IdentityKitError, Result};

/// Default RSA modulus size used when [`KeyAttributes`] does not name one.
pub const DEFAULT_RSA_BITS: usize = 4096;

/// Smallest RSA modulus accepted for generation.
pub const MIN_RSA_BITS: usize = 1024;

/// Largest RSA modulus accepted for generation.
pub const MAX_RSA_BITS: usize = 16384;

/// Supported private key types.
///
/// Key material is zeroized when the key is dropped.
#[derive(Clone)]
pub enum PrivateKey {
    Rsa(Box<RsaPrivateKey>),
}

impl PrivateKey {
    /// Generate an RSA private key with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        if !(MIN_RSA_BITS..=MAX_RSA_BITS).contains(&bits) {
            return Err(IdentityKitError::InvalidInput(format!(
                "RSA key size must be between {MIN_RSA_BITS} and {MAX_RSA_BITS} bits, got {bits}"
            )));
        }
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| IdentityKitError::KeyGenerationError(e.to_string()))?;
        Ok(PrivateKey::Rsa(Box::new(private)))
    }

    /// Decodes a DER private key, detecting PKCS#8 `PrivateKeyInfo` or
    /// PKCS#1 `RSAPrivateKey` encoding.
    ///
    /// The decoded key is checked for internal consistency before it is
    /// returned, so a structurally valid but mathematically broken key is
    /// rejected as malformed.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let private = match RsaPrivateKey::from_pkcs8_der(der) {
            Ok(key) => key,
            Err(pkcs8_err) => RsaPrivateKey::from_pkcs1_der(der).map_err(|pkcs1_err| {
                IdentityKitError::MalformedInput(format!(
                    "not a PKCS#8 ({pkcs8_err}) or PKCS#1 ({pkcs1_err}) RSA private key"
                ))
            })?,
        };
        private
            .validate()
            .map_err(|e| IdentityKitError::MalformedInput(e.to_string()))?;
        Ok(PrivateKey::Rsa(Box::new(private)))
    }

    /// Encodes the key as an unencrypted PKCS#8 document.
    pub fn to_pkcs8_der(&self) -> Result<SecretDocument> {
        match self {
            PrivateKey::Rsa(private) => private
                .to_pkcs8_der()
                .map_err(|e| IdentityKitError::EncodingFailure(e.to_string())),
        }
    }

    /// The public half of this key.
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::Rsa(private) => PublicKey::Rsa(private.to_public_key()),
        }
    }

    /// Modulus length in bits.
    pub fn bits(&self) -> usize {
        match self {
            PrivateKey::Rsa(private) => private.size() * 8,
        }
    }

    pub fn as_rsa(&self) -> &RsaPrivateKey {
        match self {
            PrivateKey::Rsa(private) => private,
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivateKey::Rsa(_) => f
                .debug_struct("PrivateKey::Rsa")
                .field("bits", &self.bits())
                .finish_non_exhaustive(),
        }
    }
}

/// Supported public key types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
}

impl PublicKey {
    pub fn from_private_key(key: &PrivateKey) -> Self {
        key.public_key()
    }

    /// Decodes a DER `SubjectPublicKeyInfo`.
    pub fn from_spki_der(der: &[u8]) -> Result<Self> {
        let public = RsaPublicKey::from_public_key_der(der)?;
        Ok(PublicKey::Rsa(public))
    }

    /// Encodes the key as a DER `SubjectPublicKeyInfo`.
    pub fn to_spki_der(&self) -> Result<Vec<u8>> {
        match self {
            PublicKey::Rsa(public) => public
                .to_public_key_der()
                .map(|doc| doc.as_bytes().to_vec())
                .map_err(|e| IdentityKitError::EncodingFailure(e.to_string())),
        }
    }

    /// Converts an x509 `SubjectPublicKeyInfo` into a `PublicKey`.
    ///
    /// Returns `InvalidInput` for algorithms other than `rsaEncryption` and
    /// `MalformedInput` when the RSA key bits do not decode.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        if spki.algorithm.oid != const_oid::db::rfc5912::RSA_ENCRYPTION {
            return Err(IdentityKitError::InvalidInput(format!(
                "unsupported public key algorithm {}",
                spki.algorithm.oid
            )));
        }
        let key_bits = spki.subject_public_key.as_bytes().ok_or_else(|| {
            IdentityKitError::MalformedInput(
                "subject public key is not an octet-aligned bit string".to_string(),
            )
        })?;
        let public = RsaPublicKey::from_pkcs1_der(key_bits)?;
        Ok(PublicKey::Rsa(public))
    }

    /// Converts the key into an x509 `SubjectPublicKeyInfo`.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        match self {
            PublicKey::Rsa(public) => SubjectPublicKeyInfoOwned::from_key(public.clone())
                .map_err(|e| IdentityKitError::EncodingFailure(e.to_string())),
        }
    }

    /// Whether both keys carry the same modulus and public exponent.
    pub fn same_key_material(&self, other: &PublicKey) -> bool {
        match (self, other) {
            (PublicKey::Rsa(a), PublicKey::Rsa(b)) => a.n() == b.n() && a.e() == b.e(),
        }
    }
}

/// Key algorithms a store can be asked to generate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyType {
    #[default]
    Rsa,
}

/// Describes how an [`IdentityStore`](crate::store::IdentityStore) creates a
/// new key pair.
///
/// # Fields
/// * `tag` - The application tag the private key is stored under.
/// * `size` - The key size in bits, 4096 unless set.
/// * `permanent` - Whether the store persists the private key.
/// * `key_type` - The key algorithm, RSA unless set.
#[derive(Clone, Debug, Builder)]
pub struct KeyAttributes {
    #[builder(into)]
    pub tag: String,
    #[builder(default = DEFAULT_RSA_BITS)]
    pub size: usize,
    #[builder(default = true)]
    pub permanent: bool,
    #[builder(default)]
    pub key_type: KeyType,
}

impl KeyAttributes {
    /// Attributes for a permanent 4096-bit RSA key under `tag`.
    pub fn new(tag: impl Into<String>) -> Self {
        Self::builder().tag(tag).build()
    }
}

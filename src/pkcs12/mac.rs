use ::pkcs12::kdf::{self, Pkcs12KeyType};
use const_oid::ObjectIdentifier;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use x509_cert::spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

use super::asn1::{ID_SHA1, ID_SHA256, null_parameters};
use crate::error::{IdentityKitError, Result};

/// Integrity algorithms for the PKCS#12 `MacData`.
///
/// SHA-1 is only kept so that archives written by older tools can be read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MacAlgorithm {
    HmacSha1,
    #[default]
    HmacSha256,
}

impl MacAlgorithm {
    pub fn digest_oid(self) -> ObjectIdentifier {
        match self {
            MacAlgorithm::HmacSha1 => ID_SHA1,
            MacAlgorithm::HmacSha256 => ID_SHA256,
        }
    }

    pub fn from_digest_oid(oid: ObjectIdentifier) -> Result<Self> {
        match oid {
            ID_SHA1 => Ok(MacAlgorithm::HmacSha1),
            ID_SHA256 => Ok(MacAlgorithm::HmacSha256),
            other => Err(IdentityKitError::MalformedInput(format!(
                "unsupported MAC digest algorithm {other}"
            ))),
        }
    }

    pub fn digest_algorithm(self) -> Result<AlgorithmIdentifierOwned> {
        Ok(AlgorithmIdentifierOwned {
            oid: self.digest_oid(),
            parameters: Some(null_parameters()?),
        })
    }

    /// Digest output length in bytes.
    pub fn output_len(self) -> usize {
        match self {
            MacAlgorithm::HmacSha1 => 20,
            MacAlgorithm::HmacSha256 => 32,
        }
    }

    /// Derives the HMAC key with the RFC 7292 KDF (ID=3), over the password
    /// as a NUL-terminated BMPString.
    pub(crate) fn derive_key(
        self,
        password: &str,
        salt: &[u8],
        iterations: i32,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let len = self.output_len();
        let key = match self {
            MacAlgorithm::HmacSha1 => {
                kdf::derive_key_utf8::<Sha1>(password, salt, Pkcs12KeyType::Mac, iterations, len)
            }
            MacAlgorithm::HmacSha256 => {
                kdf::derive_key_utf8::<Sha256>(password, salt, Pkcs12KeyType::Mac, iterations, len)
            }
        };
        key.map(Zeroizing::new)
            .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))
    }

    pub(crate) fn compute(self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        match self {
            MacAlgorithm::HmacSha1 => {
                let mut mac = Hmac::<Sha1>::new_from_slice(key)
                    .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))?;
                mac.update(data);
                Ok(mac.finalize().into_bytes().to_vec())
            }
            MacAlgorithm::HmacSha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key)
                    .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))?;
                mac.update(data);
                Ok(mac.finalize().into_bytes().to_vec())
            }
        }
    }

    /// Constant-time comparison of the MAC over `data` with `expected`.
    pub(crate) fn verify(self, key: &[u8], data: &[u8], expected: &[u8]) -> Result<bool> {
        let verified = match self {
            MacAlgorithm::HmacSha1 => {
                let mut mac = Hmac::<Sha1>::new_from_slice(key)
                    .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))?;
                mac.update(data);
                mac.verify_slice(expected).is_ok()
            }
            MacAlgorithm::HmacSha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key)
                    .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))?;
                mac.update(data);
                mac.verify_slice(expected).is_ok()
            }
        };
        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_key_depends_on_password_and_salt() {
        let algorithm = MacAlgorithm::HmacSha256;
        let key = algorithm.derive_key("secret", &[1u8; 8], 2048).unwrap();
        assert_eq!(key.len(), 32);
        assert_ne!(*key, *algorithm.derive_key("wrong", &[1u8; 8], 2048).unwrap());
        assert_ne!(*key, *algorithm.derive_key("secret", &[2u8; 8], 2048).unwrap());

        let mac = algorithm.compute(&key, b"auth safe").unwrap();
        assert!(algorithm.verify(&key, b"auth safe", &mac).unwrap());
        assert!(!algorithm.verify(&key, b"auth safe!", &mac).unwrap());
    }

    #[test]
    fn sha1_mac_key_is_twenty_bytes() {
        let key = MacAlgorithm::HmacSha1.derive_key("", &[0u8; 8], 1).unwrap();
        assert_eq!(key.len(), 20);
    }
}

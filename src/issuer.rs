use const_oid::AssociatedOid;
use der::Encode;
use der::asn1::BitString;
use der::flagset::FlagSet;
use rand_core::{OsRng, RngCore};
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use x509_cert::Version;
use x509_cert::certificate::{CertificateInner, TbsCertificateInner};
use x509_cert::ext::Extension;
use x509_cert::ext::pkix::{
    AuthorityKeyIdentifier, BasicConstraints, KeyUsage, KeyUsages, SubjectKeyIdentifier,
};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::Certificate;
use crate::cert::params::CertificateParams;
use crate::error::{IdentityKitError, Result};
use crate::identity::Identity;
use crate::key::{PrivateKey, PublicKey};
use crate::pkcs12::asn1::{encode, null_parameters, octet_string};

/// Length of generated certificate serial numbers.
const SERIAL_LEN: usize = 16;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> Result<Name>;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &PrivateKey;

    /// Issues a certificate for `subject_key`.
    ///
    /// # Arguments
    /// * `params` - Subject, validity and CA flag of the new certificate.
    /// * `subject_key` - The public key the certificate binds to the subject.
    ///
    /// # Returns
    /// A v3 certificate signed with sha256WithRSAEncryption.
    fn issue(&self, params: &CertificateParams, subject_key: &PublicKey) -> Result<Certificate> {
        let signing_key = self.signing_key();
        let issuer_spki = signing_key.public_key().as_spki()?;
        let subject_spki = subject_key.as_spki()?;

        let mut key_usages: FlagSet<KeyUsages> =
            KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment;
        if params.is_ca {
            key_usages |= KeyUsages::KeyCertSign;
            key_usages |= KeyUsages::CRLSign;
        }

        let extensions = vec![
            extension(
                &BasicConstraints {
                    ca: params.is_ca,
                    path_len_constraint: None,
                },
                true,
            )?,
            extension(&KeyUsage(key_usages), true)?,
            extension(&SubjectKeyIdentifier(octet_string(key_id(&subject_spki))?), false)?,
            extension(
                &AuthorityKeyIdentifier {
                    key_identifier: Some(octet_string(key_id(&issuer_spki))?),
                    authority_cert_issuer: None,
                    authority_cert_serial_number: None,
                },
                false,
            )?,
        ];

        let signature_algorithm = AlgorithmIdentifierOwned {
            oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            parameters: Some(null_parameters()?),
        };

        let tbs_certificate = TbsCertificateInner {
            version: Version::V3,
            serial_number: random_serial()?,
            signature: signature_algorithm.clone(),
            issuer: self.issuer_name()?,
            validity: params.validity.to_x509()?,
            subject: params.subject.as_x509_name()?,
            subject_public_key_info: subject_spki,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        };

        let tbs_der = encode(&tbs_certificate)?;
        let signer = SigningKey::<Sha256>::new(signing_key.as_rsa().clone());
        let signature = signer
            .try_sign(&tbs_der)
            .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))?;
        let signature = BitString::from_bytes(&signature.to_bytes())
            .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))?;

        let certificate = Certificate::from_inner(CertificateInner {
            tbs_certificate,
            signature_algorithm,
            signature,
        })?;
        log::debug!(
            "issued certificate for {:?}",
            certificate.common_name().unwrap_or_default()
        );
        Ok(certificate)
    }
}

/// Issues a certificate signed by its own subject key.
pub(crate) struct SelfIssuer<'a> {
    pub(crate) name: Name,
    pub(crate) key: &'a PrivateKey,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Result<Name> {
        Ok(self.name.clone())
    }

    fn signing_key(&self) -> &PrivateKey {
        self.key
    }
}

impl Issuer for Identity {
    fn issuer_name(&self) -> Result<Name> {
        Ok(self.certificate.subject().clone())
    }

    fn signing_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

fn extension<T: AssociatedOid + Encode>(value: &T, critical: bool) -> Result<Extension> {
    Ok(Extension {
        extn_id: T::OID,
        critical,
        extn_value: octet_string(encode(value)?)?,
    })
}

/// SHA-1 of the subject public key bits (RFC 5280 section 4.2.1.2, method 1).
fn key_id(spki: &SubjectPublicKeyInfoOwned) -> Vec<u8> {
    Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec()
}

/// A random serial with the high bit clear and the next bit set, so the
/// encoding is always positive and exactly `SERIAL_LEN` bytes long.
fn random_serial() -> Result<SerialNumber> {
    let mut bytes = [0u8; SERIAL_LEN];
    OsRng.fill_bytes(&mut bytes);
    bytes[0] = (bytes[0] & 0x7f) | 0x40;
    SerialNumber::new(&bytes).map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_is_positive_and_full_length() {
        for _ in 0..32 {
            let serial = random_serial().unwrap();
            let bytes = serial.as_bytes();
            assert_eq!(bytes.len(), SERIAL_LEN);
            assert_eq!(bytes[0] & 0xc0, 0x40);
        }
    }

    #[test]
    fn serials_differ() {
        assert_ne!(
            random_serial().unwrap().as_bytes(),
            random_serial().unwrap().as_bytes()
        );
    }
}

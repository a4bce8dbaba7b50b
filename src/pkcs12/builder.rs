use ::pkcs12::cert_type::CertBag;
use ::pkcs12::digest_info::DigestInfo;
use ::pkcs12::mac_data::MacData;
use ::pkcs12::pfx::{Pfx, Version};
use ::pkcs12::safe_bag::SafeContents;
use ::pkcs12::{PKCS_12_CERT_BAG_OID, PKCS_12_PKCS8_KEY_BAG_OID, PKCS_12_X509_CERT_OID};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::encrypted_data::EncryptedData;
use cms::enveloped_data::EncryptedContentInfo;
use der::Decode;
use pkcs5::pbes2;
use rand_core::{OsRng, RngCore};
use x509_cert::spki::AlgorithmIdentifierOwned;
use zeroize::Zeroizing;

use super::asn1::{
    ID_DATA, ID_ENCRYPTED_DATA, bag_attributes, data_content_info, encode, octet_string,
    safe_bag, to_any,
};
use super::{ExportOptions, Pkcs12Container};
use crate::cert::Certificate;
use crate::error::{IdentityKitError, Result};
use crate::key::PrivateKey;
use crate::matcher;

/// Salt length for PBKDF2 and for the MAC key derivation.
const SALT_LEN: usize = 8;

const AES_BLOCK_LEN: usize = 16;

/// Assembles and serializes a PKCS#12 archive holding `key` and `certificate`.
///
/// The certificate bag is stored in an `encryptedData` content and the key
/// in a `pkcs8ShroudedKeyBag`, both under PBES2 (PBKDF2-HMAC-SHA256 with
/// AES-256-CBC). The whole authenticated safe is covered by an HMAC keyed
/// through the RFC 7292 KDF, the same layout OpenSSL 3 writes.
pub(crate) fn build(
    key: &PrivateKey,
    certificate: &Certificate,
    friendly_name: &str,
    password: &str,
    options: &ExportOptions,
) -> Result<Pkcs12Container> {
    options.validate()?;
    matcher::ensure_matches(key, certificate)?;

    let local_key_id = certificate.sha1_fingerprint();
    let attributes = bag_attributes(friendly_name, &local_key_id)?;

    let cert_bag = CertBag {
        cert_id: PKCS_12_X509_CERT_OID,
        cert_value: octet_string(certificate.to_der())?,
    };
    let cert_contents: SafeContents = vec![safe_bag(
        PKCS_12_CERT_BAG_OID,
        encode(&cert_bag)?,
        attributes.clone(),
    )];

    let shrouded_key = shroud_private_key(key, password, options)?;
    let key_contents: SafeContents = vec![safe_bag(
        PKCS_12_PKCS8_KEY_BAG_OID,
        shrouded_key.as_bytes().to_vec(),
        attributes,
    )];

    let auth_safe: Vec<ContentInfo> = vec![
        encrypted_content_info(&cert_contents, password, options)?,
        data_content_info(encode(&key_contents)?)?,
    ];
    let auth_safe_der = encode(&auth_safe)?;
    let mac_data = mac_data(&auth_safe_der, password, options)?;

    let pfx = Pfx {
        version: Version::V3,
        auth_safe: data_content_info(auth_safe_der)?,
        mac_data: Some(mac_data),
    };
    let der = Zeroizing::new(encode(&pfx)?);
    if der.is_empty() {
        return Err(IdentityKitError::SerializationFailure(
            "PFX encoding is empty".to_string(),
        ));
    }

    log::debug!(
        "built PKCS#12 archive of {} bytes for a {}-bit key",
        der.len(),
        key.bits()
    );
    Ok(Pkcs12Container::new(der, friendly_name))
}

/// Encrypts the private key as a PKCS#8 `EncryptedPrivateKeyInfo`.
fn shroud_private_key(
    key: &PrivateKey,
    password: &str,
    options: &ExportOptions,
) -> Result<pkcs8::SecretDocument> {
    let plaintext = key.to_pkcs8_der()?;
    let key_info = pkcs8::PrivateKeyInfo::from_der(plaintext.as_bytes())
        .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))?;

    let salt = random_bytes::<SALT_LEN>();
    let iv = random_bytes::<AES_BLOCK_LEN>();
    let params = pbes2_params(&salt, &iv, options.encryption_iterations)?;
    key_info
        .encrypt_with_params(params, password.as_bytes())
        .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))
}

/// Encrypts `contents` into an `encryptedData` ContentInfo.
fn encrypted_content_info(
    contents: &SafeContents,
    password: &str,
    options: &ExportOptions,
) -> Result<ContentInfo> {
    let plaintext = Zeroizing::new(encode(contents)?);

    let salt = random_bytes::<SALT_LEN>();
    let iv = random_bytes::<AES_BLOCK_LEN>();
    let scheme = pkcs5::EncryptionScheme::from(pbes2_params(
        &salt,
        &iv,
        options.encryption_iterations,
    )?);
    let ciphertext = scheme
        .encrypt(password.as_bytes(), &plaintext)
        .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))?;
    let algorithm = AlgorithmIdentifierOwned::from_der(&encode(&scheme)?)
        .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))?;

    let encrypted_data = EncryptedData {
        version: CmsVersion::V0,
        enc_content_info: EncryptedContentInfo {
            content_type: ID_DATA,
            content_enc_alg: algorithm,
            encrypted_content: Some(octet_string(ciphertext)?),
        },
        unprotected_attrs: None,
    };
    Ok(ContentInfo {
        content_type: ID_ENCRYPTED_DATA,
        content: to_any(&encrypted_data)?,
    })
}

fn mac_data(auth_safe_der: &[u8], password: &str, options: &ExportOptions) -> Result<MacData> {
    let salt = random_bytes::<SALT_LEN>();
    let algorithm = options.mac_algorithm;
    let iterations = i32::try_from(options.mac_iterations)
        .map_err(|e| IdentityKitError::InvalidInput(e.to_string()))?;
    let mac_key = algorithm.derive_key(password, &salt, iterations)?;
    let digest = algorithm.compute(&mac_key, auth_safe_der)?;

    Ok(MacData {
        mac: DigestInfo {
            algorithm: algorithm.digest_algorithm()?,
            digest: octet_string(digest)?,
        },
        mac_salt: octet_string(salt.as_slice())?,
        iterations,
    })
}

fn pbes2_params<'a>(
    salt: &'a [u8; SALT_LEN],
    iv: &'a [u8; AES_BLOCK_LEN],
    iterations: u32,
) -> Result<pbes2::Parameters<'a>> {
    pbes2::Parameters::pbkdf2_sha256_aes256cbc(iterations, salt, iv)
        .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

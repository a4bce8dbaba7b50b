use ::pkcs12::cert_type::CertBag;
use ::pkcs12::mac_data::MacData;
use ::pkcs12::pfx::Pfx;
use ::pkcs12::safe_bag::{SafeBag, SafeContents};
use ::pkcs12::{
    PKCS_12_CERT_BAG_OID, PKCS_12_KEY_BAG_OID, PKCS_12_PKCS8_KEY_BAG_OID, PKCS_12_X509_CERT_OID,
};
use cms::content_info::ContentInfo;
use cms::encrypted_data::EncryptedData;
use der::Decode;
use der::asn1::OctetString;
use zeroize::Zeroizing;

use super::MAX_ITERATIONS;
use super::asn1::{
    FRIENDLY_NAME, ID_DATA, ID_ENCRYPTED_DATA, LOCAL_KEY_ID, bag_attribute, bag_value,
    data_payload, decode_bmp_string, encode,
};
use super::mac::MacAlgorithm;
use crate::cert::Certificate;
use crate::error::{IdentityKitError, Result};
use crate::key::PrivateKey;

/// The identity recovered from a PKCS#12 archive.
#[derive(Debug, Clone)]
pub struct ParsedPkcs12 {
    pub private_key: PrivateKey,
    pub certificate: Certificate,
    /// `friendlyName` of the key bag, or of the certificate bag when the key
    /// bag carries none.
    pub friendly_name: Option<String>,
    pub local_key_id: Option<Vec<u8>>,
}

#[derive(Default)]
struct Collected {
    private_key: Option<PrivateKey>,
    certificate: Option<Certificate>,
    key_friendly_name: Option<String>,
    cert_friendly_name: Option<String>,
    local_key_id: Option<Vec<u8>>,
}

pub(crate) fn parse(der: &[u8], password: &str) -> Result<ParsedPkcs12> {
    // Versions other than v3 fail to decode.
    let pfx = Pfx::from_der(der)?;

    let auth_safe_der = data_payload(&pfx.auth_safe)?;
    let mac_data = pfx.mac_data.as_ref().ok_or_else(|| {
        IdentityKitError::MalformedInput("PFX carries no password integrity MAC".to_string())
    })?;
    verify_mac(mac_data, auth_safe_der.as_bytes(), password)?;

    let auth_safe = Vec::<ContentInfo>::from_der(auth_safe_der.as_bytes())?;
    let mut collected = Collected::default();
    for content_info in &auth_safe {
        let bags = match content_info.content_type {
            ID_DATA => SafeContents::from_der(data_payload(content_info)?.as_bytes())?,
            ID_ENCRYPTED_DATA => decrypt_safe_contents(content_info, password)?,
            other => {
                return Err(IdentityKitError::MalformedInput(format!(
                    "unsupported authenticated safe content {other}"
                )));
            }
        };
        for bag in &bags {
            collect_bag(bag, password, &mut collected)?;
        }
    }

    let private_key = collected.private_key.ok_or_else(|| {
        IdentityKitError::MalformedInput("archive contains no private key".to_string())
    })?;
    let certificate = collected.certificate.ok_or_else(|| {
        IdentityKitError::MalformedInput("archive contains no certificate".to_string())
    })?;

    Ok(ParsedPkcs12 {
        private_key,
        certificate,
        friendly_name: collected.key_friendly_name.or(collected.cert_friendly_name),
        local_key_id: collected.local_key_id,
    })
}

fn verify_mac(mac_data: &MacData, auth_safe_der: &[u8], password: &str) -> Result<()> {
    let algorithm = MacAlgorithm::from_digest_oid(mac_data.mac.algorithm.oid)?;
    check_iterations("MAC", mac_data.iterations)?;
    let mac_key =
        algorithm.derive_key(password, mac_data.mac_salt.as_bytes(), mac_data.iterations)?;
    if !algorithm.verify(&mac_key, auth_safe_der, mac_data.mac.digest.as_bytes())? {
        return Err(IdentityKitError::IntegrityCheckFailed);
    }
    Ok(())
}

fn decrypt_safe_contents(content_info: &ContentInfo, password: &str) -> Result<SafeContents> {
    let encrypted = content_info.content.decode_as::<EncryptedData>()?;
    let info = &encrypted.enc_content_info;

    let algorithm_der = encode(&info.content_enc_alg)?;
    let scheme = pkcs5::EncryptionScheme::from_der(&algorithm_der).map_err(|e| {
        IdentityKitError::MalformedInput(format!("unsupported content encryption: {e}"))
    })?;
    check_scheme(&scheme)?;
    let ciphertext = info.encrypted_content.as_ref().ok_or_else(|| {
        IdentityKitError::MalformedInput("encrypted data has no content".to_string())
    })?;

    let plaintext = Zeroizing::new(
        scheme
            .decrypt(password.as_bytes(), ciphertext.as_bytes())
            .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))?,
    );
    Ok(SafeContents::from_der(&plaintext)?)
}

/// Only PBES2 with PBKDF2 is read, and its iteration count must be in range
/// before any key is derived.
fn check_scheme(scheme: &pkcs5::EncryptionScheme<'_>) -> Result<()> {
    let iterations = scheme
        .pbes2()
        .and_then(|params| params.kdf.pbkdf2())
        .map(|kdf| kdf.iteration_count)
        .ok_or_else(|| {
            IdentityKitError::MalformedInput(
                "only PBES2 with PBKDF2 is supported for encrypted content".to_string(),
            )
        })?;
    check_iterations("PBKDF2", iterations)
}

fn check_iterations<T>(what: &str, count: T) -> Result<()>
where
    T: TryInto<u32> + Copy + std::fmt::Display,
{
    match count.try_into() {
        Ok(n) if (1..=MAX_ITERATIONS).contains(&n) => Ok(()),
        _ => Err(IdentityKitError::MalformedInput(format!(
            "{what} iteration count {count} is outside 1..={MAX_ITERATIONS}"
        ))),
    }
}

fn collect_bag(bag: &SafeBag, password: &str, collected: &mut Collected) -> Result<()> {
    match bag.bag_id {
        PKCS_12_CERT_BAG_OID => {
            let cert_bag = CertBag::from_der(bag_value(bag)?)?;
            if cert_bag.cert_id != PKCS_12_X509_CERT_OID {
                log::debug!("skipping certificate bag of type {}", cert_bag.cert_id);
                return Ok(());
            }
            if collected.certificate.is_none() {
                collected.certificate =
                    Some(Certificate::from_der(cert_bag.cert_value.as_bytes())?);
                collected.cert_friendly_name = friendly_name(bag)?;
            }
        }
        PKCS_12_PKCS8_KEY_BAG_OID => {
            if collected.private_key.is_none() {
                let encrypted = pkcs8::EncryptedPrivateKeyInfo::from_der(bag_value(bag)?)?;
                check_scheme(&encrypted.encryption_algorithm)?;
                let plaintext = encrypted
                    .decrypt(password.as_bytes())
                    .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))?;
                collect_key(PrivateKey::from_der(plaintext.as_bytes())?, bag, collected)?;
            }
        }
        PKCS_12_KEY_BAG_OID => {
            if collected.private_key.is_none() {
                collect_key(PrivateKey::from_der(bag_value(bag)?)?, bag, collected)?;
            }
        }
        other => log::debug!("skipping unsupported safe bag {other}"),
    }
    Ok(())
}

fn collect_key(key: PrivateKey, bag: &SafeBag, collected: &mut Collected) -> Result<()> {
    collected.private_key = Some(key);
    collected.key_friendly_name = friendly_name(bag)?;
    collected.local_key_id = bag_attribute(bag, LOCAL_KEY_ID)
        .map(|value| value.decode_as::<OctetString>())
        .transpose()?
        .map(|id| id.as_bytes().to_vec());
    Ok(())
}

fn friendly_name(bag: &SafeBag) -> Result<Option<String>> {
    bag_attribute(bag, FRIENDLY_NAME)
        .map(decode_bmp_string)
        .transpose()
}

//! Helpers around the RFC 7292 structures of the `pkcs12` crate and the
//! PKCS #7 content types of the `cms` crate, with the object identifiers
//! those crates leave to the caller.

use ::pkcs12::safe_bag::SafeBag;
use cms::content_info::ContentInfo;
use const_oid::ObjectIdentifier;
use der::asn1::{OctetString, SetOfVec};
use der::{Any, AnyRef, Decode, Encode, Tag, TagNumber, Tagged};
use x509_cert::attr::{Attribute, Attributes};

use crate::error::{IdentityKitError, Result};

/// PKCS #7 `data` content type.
pub const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
/// PKCS #7 `encryptedData` content type.
pub const ID_ENCRYPTED_DATA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.6");

/// PKCS #9 `friendlyName` attribute (BMPString).
pub const FRIENDLY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.20");
/// PKCS #9 `localKeyId` attribute (OCTET STRING).
pub const LOCAL_KEY_ID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.21");

pub const ID_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");
pub const ID_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");

/// `bagValue [0] EXPLICIT` wrapper of a SafeBag.
const BAG_VALUE_TAG: Tag = Tag::ContextSpecific {
    constructed: true,
    number: TagNumber::N0,
};

/// DER-encodes `value`, reporting failures as [`IdentityKitError::EncodingFailure`].
pub fn encode<T: Encode>(value: &T) -> Result<Vec<u8>> {
    value
        .to_der()
        .map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))
}

/// Re-wraps an encodable value as `Any`.
pub fn to_any<T: Encode>(value: &T) -> Result<Any> {
    Any::from_der(&encode(value)?).map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))
}

pub fn octet_string(bytes: impl Into<Vec<u8>>) -> Result<OctetString> {
    OctetString::new(bytes).map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))
}

/// Wraps a DER payload as a `data` ContentInfo.
pub fn data_content_info(payload: Vec<u8>) -> Result<ContentInfo> {
    Ok(ContentInfo {
        content_type: ID_DATA,
        content: to_any(&octet_string(payload)?)?,
    })
}

/// Unwraps the OCTET STRING payload of a `data` ContentInfo.
pub fn data_payload(content_info: &ContentInfo) -> Result<OctetString> {
    if content_info.content_type != ID_DATA {
        return Err(IdentityKitError::MalformedInput(format!(
            "expected data content, found {}",
            content_info.content_type
        )));
    }
    Ok(content_info.content.decode_as::<OctetString>()?)
}

/// `NULL` algorithm parameters, as written by OpenSSL for digest algorithms.
pub fn null_parameters() -> Result<Any> {
    to_any(&der::asn1::Null)
}

/// A SafeBag of type `bag_id` carrying the DER value `bag_value`.
pub fn safe_bag(bag_id: ObjectIdentifier, bag_value: Vec<u8>, attributes: Attributes) -> SafeBag {
    SafeBag {
        bag_id,
        bag_value,
        bag_attributes: Some(attributes),
    }
}

/// DER of the value inside a decoded SafeBag.
///
/// Decoded bags keep the `[0]` wrapper around the value, bags built by
/// [`safe_bag`] do not; both are accepted.
pub fn bag_value(bag: &SafeBag) -> Result<&[u8]> {
    let value = AnyRef::from_der(&bag.bag_value)?;
    if value.tag() == BAG_VALUE_TAG {
        Ok(value.value())
    } else {
        Ok(&bag.bag_value)
    }
}

/// First value of the bag attribute identified by `oid`.
pub fn bag_attribute(bag: &SafeBag, oid: ObjectIdentifier) -> Option<&Any> {
    bag.bag_attributes
        .as_ref()?
        .iter()
        .find(|attr| attr.oid == oid)?
        .values
        .iter()
        .next()
}

/// Encodes `value` as an ASN.1 BMPString (big-endian UTF-16).
pub fn bmp_string(value: &str) -> Result<Any> {
    let bytes: Vec<u8> = value.encode_utf16().flat_map(u16::to_be_bytes).collect();
    Any::new(Tag::BmpString, bytes).map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))
}

/// Decodes an ASN.1 BMPString.
pub fn decode_bmp_string(value: &Any) -> Result<String> {
    if value.tag() != Tag::BmpString {
        return Err(IdentityKitError::MalformedInput(format!(
            "expected BMPString, found {}",
            value.tag()
        )));
    }
    let bytes = value.value();
    if bytes.len() % 2 != 0 {
        return Err(IdentityKitError::MalformedInput(
            "BMPString has an odd number of bytes".to_string(),
        ));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| IdentityKitError::MalformedInput(e.to_string()))
}

/// The `friendlyName` and `localKeyId` attributes shared by the key and
/// certificate bags. An empty friendly name is left out.
pub fn bag_attributes(friendly_name: &str, local_key_id: &[u8]) -> Result<Attributes> {
    let mut attributes = Vec::with_capacity(2);
    if !friendly_name.is_empty() {
        attributes.push(Attribute {
            oid: FRIENDLY_NAME,
            values: set_of(vec![bmp_string(friendly_name)?])?,
        });
    }
    attributes.push(Attribute {
        oid: LOCAL_KEY_ID,
        values: set_of(vec![to_any(&octet_string(local_key_id)?)?])?,
    });
    set_of(attributes)
}

fn set_of<T: der::DerOrd>(values: Vec<T>) -> Result<SetOfVec<T>> {
    SetOfVec::try_from(values).map_err(|e| IdentityKitError::EncodingFailure(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bmp_string_is_big_endian_utf16() {
        let any = bmp_string("ab").unwrap();
        assert_eq!(any.tag(), Tag::BmpString);
        assert_eq!(any.value(), &[0x00, 0x61, 0x00, 0x62]);
        assert_eq!(decode_bmp_string(&any).unwrap(), "ab");
    }

    #[test]
    fn odd_length_bmp_string_is_rejected() {
        let any = Any::new(Tag::BmpString, vec![0x00, 0x61, 0x00]).unwrap();
        assert!(matches!(
            decode_bmp_string(&any),
            Err(IdentityKitError::MalformedInput(_))
        ));
    }

    #[test]
    fn bag_value_survives_encoding() {
        let payload = octet_string(vec![9u8; 4]).unwrap();
        let bag = safe_bag(
            ::pkcs12::PKCS_12_CERT_BAG_OID,
            encode(&payload).unwrap(),
            bag_attributes("bundle", &[7u8; 20]).unwrap(),
        );
        assert_eq!(bag_value(&bag).unwrap(), encode(&payload).unwrap());

        let decoded = SafeBag::from_der(&bag.to_der().unwrap()).unwrap();
        assert_eq!(bag_value(&decoded).unwrap(), encode(&payload).unwrap());
    }

    #[test]
    fn attributes_carry_name_and_key_id() {
        let bag = safe_bag(
            ::pkcs12::PKCS_12_CERT_BAG_OID,
            encode(&der::asn1::Null).unwrap(),
            bag_attributes("bundle", &[7u8; 20]).unwrap(),
        );
        let decoded = SafeBag::from_der(&bag.to_der().unwrap()).unwrap();
        let name = bag_attribute(&decoded, FRIENDLY_NAME).unwrap();
        assert_eq!(decode_bmp_string(name).unwrap(), "bundle");
        let key_id = bag_attribute(&decoded, LOCAL_KEY_ID)
            .unwrap()
            .decode_as::<OctetString>()
            .unwrap();
        assert_eq!(key_id.as_bytes(), &[7u8; 20]);
    }

    #[test]
    fn empty_friendly_name_is_left_out() {
        let attributes = bag_attributes("", &[1, 2, 3]).unwrap();
        assert_eq!(attributes.len(), 1);
        assert!(attributes.iter().all(|attr| attr.oid == LOCAL_KEY_ID));
    }
}

#![allow(dead_code)]

use identitykit::cert::Certificate;
use identitykit::cert::params::{CertificateParams, DistinguishedName};
use identitykit::key::PrivateKey;
use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::{HasPublic, PKey, PKeyRef, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509, X509Name, X509NameBuilder};

/// Generates an RSA key with our own code and a self-signed certificate for it.
pub fn generate_identity(common_name: &str) -> (PrivateKey, Certificate) {
    let key = PrivateKey::generate_rsa(1024).unwrap();
    let params = CertificateParams::builder()
        .subject(
            DistinguishedName::builder()
                .common_name(common_name)
                .organization("IdentityKit Tests".to_string())
                .build(),
        )
        .build();
    let cert = Certificate::new_self_signed(&params, &key).unwrap();
    (key, cert)
}

/// Generates an RSA key with openssl.
pub fn openssl_rsa_key(bits: u32) -> PKey<Private> {
    PKey::from_rsa(Rsa::generate(bits).unwrap()).unwrap()
}

fn name(common_name: &str) -> X509Name {
    let mut builder = X509NameBuilder::new().unwrap();
    builder.append_entry_by_text("CN", common_name).unwrap();
    builder.build()
}

/// Issues a certificate for `subject_key` with openssl, signed by `ca_key`.
pub fn openssl_issue<T: HasPublic>(
    subject: &str,
    subject_key: &PKeyRef<T>,
    ca_name: &str,
    ca_key: &PKeyRef<Private>,
) -> X509 {
    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(4242).unwrap();
    builder
        .set_serial_number(&Asn1Integer::from_bn(&serial).unwrap())
        .unwrap();
    builder.set_subject_name(&name(subject)).unwrap();
    builder.set_issuer_name(&name(ca_name)).unwrap();
    builder.set_pubkey(subject_key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    builder.sign(ca_key, MessageDigest::sha256()).unwrap();
    builder.build()
}

/// Generates a self-signed certificate and key entirely with openssl.
pub fn openssl_self_signed(common_name: &str) -> (PKey<Private>, X509) {
    let key = openssl_rsa_key(2048);
    let cert = openssl_issue(common_name, &key, common_name, &key);
    (key, cert)
}

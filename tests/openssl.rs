mod util;

use identitykit::cert::Certificate;
use identitykit::dispatch::{Dispatcher, MethodCall, Value};
use identitykit::identity::IdentityManager;
use identitykit::key::PrivateKey;
use identitykit::matcher;
use identitykit::pkcs12;
use identitykit::store::MemoryIdentityStore;
use openssl::ec::{EcGroup, EcKey};
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::x509::X509;

#[test]
fn test_openssl_parses_pkcs12() {
    let (key, cert) = util::generate_identity("device-01");
    let archive = pkcs12::build(&key, &cert, "bundle", "secret").unwrap();

    let parsed = Pkcs12::from_der(archive.as_bytes())
        .unwrap()
        .parse2("secret")
        .expect("openssl should open the archive with the right password");

    // The certificate comes back byte for byte
    let x509 = parsed.cert.expect("archive should carry a certificate");
    assert_eq!(x509.to_der().unwrap(), cert.to_der());

    // And the key is the private half of it
    let pkey = parsed.pkey.expect("archive should carry a private key");
    assert!(x509.public_key().unwrap().public_eq(&pkey));
    let decoded = PrivateKey::from_der(&pkey.private_key_to_pkcs8().unwrap()).unwrap();
    assert!(matcher::matches(&decoded, &cert).unwrap());
}

#[test]
fn test_openssl_rejects_wrong_password() {
    let (key, cert) = util::generate_identity("device-01");
    let archive = pkcs12::build(&key, &cert, "bundle", "secret").unwrap();

    let result = Pkcs12::from_der(archive.as_bytes())
        .unwrap()
        .parse2("wrong");
    assert!(result.is_err(), "openssl accepted the wrong password");
}

#[test]
fn test_openssl_verifies_self_signed_certificate() {
    let (_, cert) = util::generate_identity("server.myca.local");
    let x509 = X509::from_der(cert.to_der()).unwrap();

    assert!(x509.verify(&x509.public_key().unwrap()).unwrap());
    assert_eq!(x509.version(), 2, "X509 version should be 3 (0-based index)");

    let subject = x509
        .subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap();
    assert_eq!(subject.to_string(), "server.myca.local");
    assert_eq!(
        x509.signature_algorithm().object().nid(),
        Nid::SHA256WITHRSAENCRYPTION
    );
}

#[test]
fn test_decode_openssl_certificate_is_byte_identical() {
    let (_, x509) = util::openssl_self_signed("foreign.example");
    let der = x509.to_der().unwrap();

    let cert = Certificate::from_der(&der).unwrap();
    assert_eq!(cert.to_der(), &der[..]);
    assert_eq!(cert.to_canonical_der().unwrap(), der);
    assert_eq!(cert.common_name().as_deref(), Some("foreign.example"));
}

#[test]
fn test_decode_openssl_private_keys() {
    let (pkey, x509) = util::openssl_self_signed("foreign.example");
    let cert = Certificate::from_der(&x509.to_der().unwrap()).unwrap();

    let pkcs1 = pkey.rsa().unwrap().private_key_to_der().unwrap();
    let from_pkcs1 = PrivateKey::from_der(&pkcs1).unwrap();
    assert!(matcher::matches(&from_pkcs1, &cert).unwrap());

    let pkcs8 = pkey.private_key_to_pkcs8().unwrap();
    let from_pkcs8 = PrivateKey::from_der(&pkcs8).unwrap();
    assert!(matcher::matches(&from_pkcs8, &cert).unwrap());
    assert_eq!(from_pkcs8.bits(), 2048);
}

#[test]
fn test_non_rsa_certificate_never_matches() {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let ec_key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();
    let x509 = util::openssl_issue("ec.example", &ec_key, "ec.example", &ec_key);
    let cert = Certificate::from_der(&x509.to_der().unwrap()).unwrap();

    let (key, _) = util::generate_identity("device-01");
    assert!(!matcher::matches(&key, &cert).unwrap());
    assert!(pkcs12::build(&key, &cert, "bundle", "secret").is_err());
}

/// Generate a key under "t1", have openssl certify its public key, store
/// the certificate under "c1" and export the pair as "bundle".
#[test]
fn test_end_to_end_export() {
    let dispatcher = Dispatcher::new(IdentityManager::new(MemoryIdentityStore::new()));

    let generated = dispatcher.handle(
        &MethodCall::new("generateKey")
            .arg("tag", "t1")
            .arg("size", 2048i64),
    );
    let spki = match generated {
        Some(Value::Bytes(spki)) => spki,
        other => panic!("generateKey returned {other:?}"),
    };
    assert!(!spki.is_empty());
    let public_key = PKey::public_key_from_der(&spki).unwrap();
    assert_eq!(public_key.bits(), 2048);

    let ca_key = util::openssl_rsa_key(2048);
    let issued = util::openssl_issue("t1.example", &public_key, "Test CA", &ca_key);
    let cert_der = issued.to_der().unwrap();

    let stored = dispatcher.handle(
        &MethodCall::new("createIdentity")
            .arg("data", cert_der.clone())
            .arg("label", "c1"),
    );
    assert_eq!(stored, Some(Value::Bool(true)));

    let exported = dispatcher.handle(
        &MethodCall::new("loadIdentity")
            .arg("tag", "t1")
            .arg("name", "bundle")
            .arg("password", "secret"),
    );
    let bundle = match exported {
        Some(Value::Bytes(bundle)) => bundle,
        other => panic!("loadIdentity returned {other:?}"),
    };
    assert!(!bundle.is_empty());

    let parsed = Pkcs12::from_der(&bundle).unwrap().parse2("secret").unwrap();
    assert_eq!(parsed.cert.unwrap().to_der().unwrap(), cert_der);
    assert!(public_key.public_eq(&parsed.pkey.unwrap()));

    assert!(Pkcs12::from_der(&bundle).unwrap().parse2("wrong").is_err());
}

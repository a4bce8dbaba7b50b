mod util;

use identitykit::dispatch::{Dispatcher, MethodCall, Value};
use identitykit::identity::IdentityManager;
use identitykit::key::PrivateKey;
use identitykit::store::MemoryIdentityStore;

fn dispatcher() -> Dispatcher<MemoryIdentityStore> {
    Dispatcher::new(IdentityManager::new(MemoryIdentityStore::new()))
}

#[test]
fn unknown_method_is_absent() {
    assert_eq!(dispatcher().handle(&MethodCall::new("signData")), None);
}

#[test]
fn deletes_twice_both_succeed() {
    let dispatcher = dispatcher();
    for _ in 0..2 {
        assert_eq!(
            dispatcher.handle(&MethodCall::new("deleteKey").arg("tag", "t1")),
            Some(Value::Bool(true))
        );
        assert_eq!(
            dispatcher.handle(&MethodCall::new("deleteCert").arg("label", "c1")),
            Some(Value::Bool(true))
        );
    }
}

#[test]
fn missing_arguments_collapse_to_false_or_absent() {
    let dispatcher = dispatcher();
    assert_eq!(
        dispatcher.handle(&MethodCall::new("deleteKey")),
        Some(Value::Bool(false))
    );
    assert_eq!(
        dispatcher.handle(&MethodCall::new("createIdentity").arg("label", "c1")),
        Some(Value::Bool(false))
    );
    assert_eq!(dispatcher.handle(&MethodCall::new("generateKey")), None);
    assert_eq!(dispatcher.handle(&MethodCall::new("loadPublicKey")), None);
    assert_eq!(
        dispatcher.handle(
            &MethodCall::new("loadIdentity")
                .arg("tag", "t1")
                .arg("name", "bundle")
        ),
        None
    );
}

#[test]
fn non_positive_key_size_is_rejected() {
    let dispatcher = dispatcher();
    for size in [0i64, -2048] {
        let call = MethodCall::new("generateKey")
            .arg("tag", "t1")
            .arg("size", size);
        assert_eq!(dispatcher.handle(&call), None);
    }
}

#[test]
fn malformed_certificate_is_not_stored() {
    let dispatcher = dispatcher();
    let call = MethodCall::new("createIdentity")
        .arg("data", b"-----BEGIN CERTIFICATE-----".to_vec())
        .arg("label", "c1");
    assert_eq!(dispatcher.handle(&call), Some(Value::Bool(false)));
    assert_eq!(
        dispatcher.manager().store().certificate_count("c1").unwrap(),
        0
    );
}

#[test]
fn generated_key_is_loadable() {
    let dispatcher = dispatcher();
    let generated = dispatcher.handle(
        &MethodCall::new("generateKey")
            .arg("tag", "t1")
            .arg("size", 1024i64)
            .arg("permanent", true),
    );
    assert!(matches!(generated, Some(Value::Bytes(ref b)) if !b.is_empty()));

    let loaded = dispatcher.handle(&MethodCall::new("loadPublicKey").arg("tag", "t1"));
    assert_eq!(loaded, generated);

    assert_eq!(
        dispatcher.handle(&MethodCall::new("loadPublicKey").arg("tag", "t2")),
        None
    );
}

#[test]
fn load_identity_without_certificate_is_absent() {
    let dispatcher = dispatcher();
    dispatcher
        .manager()
        .store()
        .import_key("t1", PrivateKey::generate_rsa(1024).unwrap())
        .unwrap();
    let call = MethodCall::new("loadIdentity")
        .arg("tag", "t1")
        .arg("name", "bundle")
        .arg("password", "secret");
    assert_eq!(dispatcher.handle(&call), None);

    let (_, cert) = util::generate_identity("someone-else");
    let stored = dispatcher.handle(
        &MethodCall::new("createIdentity")
            .arg("data", cert.to_der().to_vec())
            .arg("label", "c1"),
    );
    assert_eq!(stored, Some(Value::Bool(true)));
    assert_eq!(dispatcher.handle(&call), None);
}

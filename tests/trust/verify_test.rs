//! Trust assertions and verification, in memory and on disk.

use std::sync::Arc;

use eap8021x::certificate::PemSource;
use eap8021x::store::{FileStore, InMemoryStore, TrustDomain, TrustResult};
use eap8021x::trust::{CertificateTrustManager, TrustError};

const CORP_ROOT: &str = include_str!("../fixtures/corp_root_ca.pem");
const RADIUS_NO_CN: &str = include_str!("../fixtures/radius_no_cn.pem");

fn manager() -> (Arc<InMemoryStore>, CertificateTrustManager) {
    let store = Arc::new(InMemoryStore::new());
    let manager = CertificateTrustManager::new(Arc::<InMemoryStore>::clone(&store), Arc::<InMemoryStore>::clone(&store));
    (store, manager)
}

#[test]
fn import_then_trust_then_verify() {
    let (_, manager) = manager();
    let source = PemSource::text(CORP_ROOT);
    let handle = manager.import_certificate(&source, None).expect("import");

    assert!(!manager.verify(&source, TrustDomain::User));
    manager
        .trust(&handle, TrustDomain::User, TrustResult::TrustAsRoot)
        .expect("trust");
    assert!(manager.verify(&source, TrustDomain::User));
    assert!(!manager.verify(&source, TrustDomain::System));
}

#[test]
fn verify_requires_the_certificate_in_store() {
    let (_, manager) = manager();
    assert!(!manager.verify(&PemSource::text(CORP_ROOT), TrustDomain::User));
    assert!(!manager.verify(&PemSource::default(), TrustDomain::User));
}

#[test]
fn verify_distinguishes_certificates() {
    let (_, manager) = manager();
    let corp = manager
        .import_certificate(&PemSource::text(CORP_ROOT), None)
        .expect("import corp");
    manager
        .import_certificate(&PemSource::text(RADIUS_NO_CN), None)
        .expect("import radius");
    manager
        .trust(&corp, TrustDomain::User, TrustResult::TrustRoot)
        .expect("trust");

    assert!(manager.verify(&PemSource::text(CORP_ROOT), TrustDomain::User));
    assert!(!manager.verify(&PemSource::text(RADIUS_NO_CN), TrustDomain::User));
}

#[test]
fn locked_system_domain_rejects_trust() {
    let (store, manager) = manager();
    store.lock_system_trust();
    let handle = manager
        .import_certificate(&PemSource::text(CORP_ROOT), None)
        .expect("import");

    let result = manager.trust(&handle, TrustDomain::System, TrustResult::TrustRoot);
    match result {
        Err(err @ TrustError::TrustRejected { .. }) => assert_eq!(err.code(), Some(-60005)),
        other => panic!("expected TrustRejected, got {other:?}"),
    }
    assert!(!manager.verify(&PemSource::text(CORP_ROOT), TrustDomain::System));
}

#[test]
fn file_store_keeps_trust_across_instances() {
    let dir = tempfile::tempdir().expect("tempdir");
    let user = dir.path().join("user.json");
    let system = dir.path().join("system.json");
    let source = PemSource::text(CORP_ROOT);

    {
        let store = Arc::new(FileStore::new(&user, &system));
        let manager = CertificateTrustManager::new(Arc::<FileStore>::clone(&store), store);
        let handle = manager.import_certificate(&source, Some("ABCDE12345")).expect("import");
        manager
            .trust(&handle, TrustDomain::System, TrustResult::TrustAsRoot)
            .expect("trust");
    }

    let store = Arc::new(FileStore::new(&user, &system));
    let manager = CertificateTrustManager::new(Arc::<FileStore>::clone(&store), store);
    assert!(manager.verify(&source, TrustDomain::System));
    assert!(!manager.verify(&source, TrustDomain::User));
}

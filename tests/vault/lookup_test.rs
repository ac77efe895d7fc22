//! Lookup and delete semantics: wildcards, symmetry and misses.

use std::sync::Arc;

use eap8021x::credential::EapCredential;
use eap8021x::store::memory::Operation;
use eap8021x::store::{InMemoryStore, StoreError};
use eap8021x::vault::{CredentialFilter, CredentialVault, FetchMode, VaultError};

fn vault() -> (Arc<InMemoryStore>, CredentialVault) {
    let store = Arc::new(InMemoryStore::new());
    (Arc::clone(&store), CredentialVault::new(store))
}

fn seed(vault: &CredentialVault) {
    let credentials = [
        EapCredential::new("corp-wifi")
            .with_username("alice")
            .with_password("p1")
            .with_kind("enterprise"),
        EapCredential::new("corp-wifi")
            .with_username("bob")
            .with_password("p2")
            .with_kind("enterprise"),
        EapCredential::new("guest")
            .with_username("visitor")
            .with_password("p3"),
    ];
    for credential in &credentials {
        vault.save(credential, false).expect("seed");
    }
}

#[test]
fn saved_fields_find_the_credential() {
    let (_, vault) = vault();
    let credential = EapCredential::new("lab")
        .with_username("carol")
        .with_password("secret")
        .with_kind("802.1x Password")
        .with_service("com.example.lab");
    vault.save(&credential, false).expect("save");

    let filter = CredentialFilter::new()
        .ssid("lab")
        .username("carol")
        .kind("802.1x Password")
        .service("com.example.lab");
    let found = vault.get(&filter, true).expect("get").expect("present");
    assert_eq!(found.ssid, "lab");
    assert_eq!(found.service.as_deref(), Some("com.example.lab"));
    assert_eq!(found.password.as_ref().map(|p| p.expose()), Some("secret"));
}

#[test]
fn empty_fields_are_wildcards() {
    let (_, vault) = vault();
    seed(&vault);

    let filter = CredentialFilter::new().ssid("corp-wifi").username("");
    let all = vault.get_all(&filter, FetchMode::AttributesOnly).expect("get_all");
    assert_eq!(all.len(), 2);
}

#[test]
fn narrowing_a_filter_never_adds_matches() {
    let (_, vault) = vault();
    seed(&vault);

    let broad = vault
        .get_all(&CredentialFilter::new().ssid("corp-wifi"), FetchMode::AttributesOnly)
        .expect("broad");
    let narrow = vault
        .get_all(
            &CredentialFilter::new().ssid("corp-wifi").username("alice"),
            FetchMode::AttributesOnly,
        )
        .expect("narrow");

    assert_eq!(broad.len(), 2);
    assert_eq!(narrow.len(), 1);
    assert!(narrow.iter().all(|n| broad.contains(n)));

    let everything = vault
        .get_all(&CredentialFilter::new(), FetchMode::AttributesOnly)
        .expect("everything");
    assert_eq!(everything.len(), 3);
}

#[test]
fn get_all_payloads_are_opt_in() {
    let (_, vault) = vault();
    seed(&vault);
    let filter = CredentialFilter::new().ssid("corp-wifi");

    let attributes = vault
        .get_all(&filter, FetchMode::AttributesOnly)
        .expect("attributes");
    assert!(attributes.iter().all(|c| c.password.is_none()));

    let mut payloads: Vec<String> = vault
        .get_all(&filter, FetchMode::WithPayload)
        .expect("payloads")
        .iter()
        .filter_map(|c| c.password.as_ref().map(|p| p.expose().to_owned()))
        .collect();
    payloads.sort();
    assert_eq!(payloads, vec!["p1".to_owned(), "p2".to_owned()]);
}

#[test]
fn get_miss_is_none() {
    let (_, vault) = vault();
    seed(&vault);
    let missing = vault
        .get(&CredentialFilter::new().ssid("corp-wifi").username("mallory"), true)
        .expect("get");
    assert!(missing.is_none());
    let none = vault
        .get_all(&CredentialFilter::new().ssid("nowhere"), FetchMode::WithPayload)
        .expect("get_all");
    assert!(none.is_empty());
}

#[test]
fn delete_miss_is_false() {
    let (_, vault) = vault();
    seed(&vault);
    let deleted = vault
        .delete(&CredentialFilter::new().ssid("no-such-ssid"))
        .expect("delete");
    assert!(!deleted);
}

#[test]
fn delete_removes_only_matches() {
    let (_, vault) = vault();
    seed(&vault);

    let deleted = vault
        .delete(&CredentialFilter::new().ssid("corp-wifi").username("alice"))
        .expect("delete");
    assert!(deleted);

    let remaining = vault
        .get_all(&CredentialFilter::new().ssid("corp-wifi"), FetchMode::AttributesOnly)
        .expect("get_all");
    assert_eq!(remaining.len(), 1);
    assert_eq!(
        remaining.first().and_then(|c| c.username.as_deref()),
        Some("bob")
    );
}

#[test]
fn delete_requires_ssid() {
    let (_, vault) = vault();
    let result = vault.delete(&CredentialFilter::new().username("alice"));
    assert!(matches!(result, Err(VaultError::InvalidArgument(_))));
}

#[test]
fn lookup_failures_surface_with_status() {
    let (store, vault) = vault();
    seed(&vault);
    store.fail_next(Operation::Find, StoreError::other(-25293, "auth failed"));

    let result = vault.get(&CredentialFilter::new().ssid("corp-wifi"), true);
    assert_eq!(result.err().and_then(|e| e.code()), Some(-25293));
}

//! Saving credentials: replacement, access objects and failure propagation.

use std::sync::Arc;

use eap8021x::access::{AccessPolicy, Authorization, Caller, AIRPORT_GROUP};
use eap8021x::credential::EapCredential;
use eap8021x::store::memory::Operation;
use eap8021x::store::{Attribute, InMemoryStore, Keychain, StoreError};
use eap8021x::vault::{CredentialFilter, CredentialVault, FetchMode, VaultError};

fn vault() -> (Arc<InMemoryStore>, CredentialVault) {
    let store = Arc::new(InMemoryStore::new());
    (Arc::clone(&store), CredentialVault::new(store))
}

fn corp(password: &str) -> EapCredential {
    EapCredential::new("corp-wifi")
        .with_username("alice")
        .with_password(password)
        .with_kind("enterprise")
}

#[test]
fn corp_wifi_scenario() {
    let (_, vault) = vault();
    vault.save(&corp("p1"), false).expect("save");

    let with_data = vault
        .get(&CredentialFilter::new().ssid("corp-wifi"), true)
        .expect("get")
        .expect("credential present");
    assert_eq!(with_data.username.as_deref(), Some("alice"));
    assert_eq!(with_data.kind.as_deref(), Some("enterprise"));
    assert_eq!(with_data.password.as_ref().map(|p| p.expose()), Some("p1"));

    let without_data = vault
        .get(&CredentialFilter::new().ssid("corp-wifi"), false)
        .expect("get")
        .expect("credential present");
    assert_eq!(without_data.username.as_deref(), Some("alice"));
    assert!(without_data.password.is_none());
}

#[test]
fn saving_same_slot_replaces() {
    let (store, vault) = vault();
    vault.save(&corp("p1"), false).expect("first save");
    vault.save(&corp("p2"), false).expect("second save");

    assert_eq!(store.item_count(Keychain::User), 1);
    let credential = vault
        .get(&CredentialFilter::new().ssid("corp-wifi"), true)
        .expect("get")
        .expect("credential present");
    assert_eq!(credential.password.as_ref().map(|p| p.expose()), Some("p2"));
}

#[test]
fn networks_without_username_or_service_coexist() {
    let (store, vault) = vault();
    vault
        .save(&EapCredential::new("net-a").with_password("pa"), false)
        .expect("save net-a");
    vault
        .save(&EapCredential::new("net-b").with_password("pb"), false)
        .expect("save net-b");

    assert_eq!(store.item_count(Keychain::User), 2);
    let all = vault
        .get_all(&CredentialFilter::new(), FetchMode::WithPayload)
        .expect("get_all");
    let mut pairs: Vec<(String, String)> = all
        .iter()
        .filter_map(|c| {
            c.password
                .as_ref()
                .map(|p| (c.ssid.clone(), p.expose().to_owned()))
        })
        .collect();
    pairs.sort();
    assert_eq!(
        pairs,
        vec![
            ("net-a".to_owned(), "pa".to_owned()),
            ("net-b".to_owned(), "pb".to_owned())
        ]
    );
}

#[test]
fn same_username_on_two_networks() {
    let (_, vault) = vault();
    vault.save(&corp("p1"), false).expect("save corp-wifi");
    let home = EapCredential::new("home-wifi")
        .with_username("alice")
        .with_password("h1")
        .with_kind("enterprise");
    vault.save(&home, false).expect("save home-wifi");

    let alice = vault
        .get_all(
            &CredentialFilter::new().username("alice"),
            FetchMode::AttributesOnly,
        )
        .expect("get_all");
    let mut ssids: Vec<&str> = alice.iter().map(|c| c.ssid.as_str()).collect();
    ssids.sort_unstable();
    assert_eq!(ssids, vec!["corp-wifi", "home-wifi"]);

    let home_back = vault
        .get(&CredentialFilter::new().ssid("home-wifi"), true)
        .expect("get")
        .expect("home-wifi present");
    assert_eq!(home_back.password.as_ref().map(|p| p.expose()), Some("h1"));
}

#[test]
fn kind_separates_credentials_on_one_network() {
    let (store, vault) = vault();
    let with_kind = |kind: &str, password: &str| {
        EapCredential::new("corp")
            .with_username("alice")
            .with_password(password)
            .with_kind(kind)
    };
    vault.save(&with_kind("k1", "p1"), false).expect("save k1");
    vault.save(&with_kind("k2", "p2"), false).expect("save k2");
    assert_eq!(store.item_count(Keychain::User), 2);

    let k2 = vault
        .get(&CredentialFilter::new().ssid("corp").kind("k2"), true)
        .expect("get")
        .expect("k2 present");
    assert_eq!(k2.password.as_ref().map(|p| p.expose()), Some("p2"));
}

#[test]
fn comment_is_not_part_of_identity() {
    let (store, vault) = vault();
    vault
        .save(&corp("p1").with_comment("old note"), false)
        .expect("first save");
    vault
        .save(&corp("p1").with_comment("new note"), false)
        .expect("second save");

    let items = store.items(Keychain::User);
    assert_eq!(items.len(), 1);
    assert_eq!(
        items.first().and_then(|item| item.attribute(Attribute::Comment)),
        Some("new note")
    );
}

#[test]
fn empty_ssid_is_invalid_argument() {
    let (store, vault) = vault();
    let result = vault.save(&EapCredential::new("").with_password("p1"), false);
    assert!(matches!(result, Err(VaultError::InvalidArgument(_))));
    assert_eq!(store.item_count(Keychain::User), 0);
}

#[test]
fn system_store_is_separate() {
    let (store, vault) = vault();
    vault.save(&corp("p1"), true).expect("save");

    assert_eq!(store.item_count(Keychain::System), 1);
    assert_eq!(store.item_count(Keychain::User), 0);
    let user = vault
        .get(&CredentialFilter::new().ssid("corp-wifi"), false)
        .expect("get");
    assert!(user.is_none());
    let system = vault
        .get(&CredentialFilter::new().ssid("corp-wifi").system(true), false)
        .expect("get");
    assert!(system.is_some());
}

#[test]
fn all_applications_policy_lets_anyone_decrypt() {
    let (store, vault) = vault();
    let credential = corp("p1").with_access_control(AccessPolicy::AllApplications);
    vault.save(&credential, false).expect("save");

    let items = store.items(Keychain::User);
    let access = items
        .first()
        .and_then(|item| item.access.clone())
        .expect("access attached");
    assert_eq!(access.descriptor(), "corp-wifi");
    assert!(access.permits(
        &Caller::application("/Applications/Anything.app"),
        Authorization::Decrypt
    ));
}

#[test]
fn system_default_policy_limits_decrypt() {
    let (store, vault) = vault();
    let credential = corp("p1").with_access_control(AccessPolicy::system_default());
    vault.save(&credential, false).expect("save");

    let access = store
        .items(Keychain::User)
        .first()
        .and_then(|item| item.access.clone())
        .expect("access attached");
    assert!(access.permits(&Caller::current(), Authorization::Decrypt));
    assert!(access.permits(
        &Caller::application("/usr/local/bin/helper").in_group(AIRPORT_GROUP),
        Authorization::Decrypt
    ));
    assert!(!access.permits(
        &Caller::application("/usr/local/bin/stranger"),
        Authorization::Decrypt
    ));
}

#[test]
fn credential_without_policy_has_no_access_object() {
    let (store, vault) = vault();
    vault.save(&corp("p1"), false).expect("save");
    assert!(store
        .items(Keychain::User)
        .first()
        .is_some_and(|item| item.access.is_none()));
}

#[test]
fn delete_failure_aborts_save() {
    let (store, vault) = vault();
    store.fail_next(Operation::Delete, StoreError::other(-25291, "keychain locked"));

    let result = vault.save(&corp("p1"), false);
    match result {
        Err(err) => assert_eq!(err.code(), Some(-25291)),
        Ok(()) => panic!("save should fail when the old item cannot be removed"),
    }
    assert_eq!(store.item_count(Keychain::User), 0);
}

#[test]
fn insert_failure_preserves_status() {
    let (store, vault) = vault();
    store.fail_next(Operation::Insert, StoreError::other(-25308, "interaction not allowed"));

    let result = vault.save(&corp("p1"), false);
    assert!(matches!(result, Err(VaultError::Platform(_))));
    assert_eq!(result.err().and_then(|e| e.code()), Some(-25308));
}

#[test]
fn wlan_layout_uses_system_service_name() {
    let (store, vault) = vault();
    vault
        .save(&EapCredential::wlan("corp-wifi", "alice", "p1"), false)
        .expect("save");

    let items = store.items(Keychain::User);
    let item = items.first().expect("saved");
    assert_eq!(
        item.attribute(Attribute::Service),
        Some("com.apple.network.eap.user.item.wlan.ssid.corp-wifi")
    );
    assert_eq!(item.attribute(Attribute::Description), Some("802.1x Password"));
}

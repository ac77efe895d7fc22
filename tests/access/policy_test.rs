//! Access object assembly for both policy shapes.

use std::collections::BTreeSet;

use eap8021x::access::{
    assemble, build_all_applications_policy, build_specific_policy, AccessPolicy, Authorization,
    Caller, TrustedApplication,
};

fn decrypt_applications(
    access: &eap8021x::access::Access,
) -> Vec<Option<BTreeSet<TrustedApplication>>> {
    access
        .matching_acls(Authorization::Decrypt)
        .map(|acl| acl.applications.clone())
        .collect()
}

#[test]
fn missing_paths_leave_only_the_writer() {
    let paths = BTreeSet::from(["/nonexistent".to_owned()]);
    let access = build_specific_policy("corp-wifi", &paths, &BTreeSet::new(), true);

    assert_eq!(
        decrypt_applications(&access),
        vec![Some(BTreeSet::from([TrustedApplication::Current]))]
    );
    assert!(access.permits(&Caller::current(), Authorization::Decrypt));
    assert!(!access.permits(&Caller::application("/nonexistent"), Authorization::Decrypt));
}

#[test]
fn existing_paths_and_groups_are_trusted() {
    let dir = tempfile::tempdir().expect("tempdir");
    let helper = dir.path().join("helper");
    std::fs::write(&helper, b"").expect("write helper");
    let helper_path = helper.to_string_lossy().into_owned();

    let access = build_specific_policy(
        "corp-wifi",
        &BTreeSet::from([helper_path.clone()]),
        &BTreeSet::from(["AirPort".to_owned()]),
        false,
    );

    assert!(access.permits(&Caller::application(&helper_path), Authorization::Decrypt));
    assert!(access.permits(
        &Caller::application("/opt/other").in_group("AirPort"),
        Authorization::Decrypt
    ));
    assert!(!access.permits(&Caller::current(), Authorization::Decrypt));
}

#[test]
fn empty_specific_policy_denies_decrypt() {
    let access = build_specific_policy("corp-wifi", &BTreeSet::new(), &BTreeSet::new(), false);
    assert_eq!(decrypt_applications(&access), vec![Some(BTreeSet::new())]);
    assert!(!access.permits(&Caller::current(), Authorization::Decrypt));
}

#[test]
fn all_applications_has_single_open_decrypt_rule() {
    let access = build_all_applications_policy("corp-wifi").expect("assemble");
    assert_eq!(decrypt_applications(&access), vec![None]);
    assert_eq!(access.acls().len(), 3);
    assert!(access.permits(&Caller::application("/anything"), Authorization::ExportClear));
}

#[test]
fn acl_changes_stay_with_the_writer() {
    for access in [
        build_all_applications_policy("corp-wifi").expect("assemble"),
        build_specific_policy("corp-wifi", &BTreeSet::new(), &BTreeSet::new(), false),
    ] {
        assert!(access.permits(&Caller::current(), Authorization::ChangeAcl));
        assert!(!access.permits(&Caller::application("/anything"), Authorization::ChangeAcl));
        assert!(access.permits(&Caller::application("/anything"), Authorization::Verify));
    }
}

#[test]
fn assemble_dispatches_on_policy() {
    let open = assemble(&AccessPolicy::AllApplications, "guest").expect("assemble");
    assert_eq!(open.descriptor(), "guest");
    assert_eq!(decrypt_applications(&open), vec![None]);

    let system = assemble(&AccessPolicy::system_default(), "guest").expect("assemble");
    let applications = decrypt_applications(&system)
        .into_iter()
        .flatten()
        .next()
        .expect("limited decrypt rule");
    assert!(applications.contains(&TrustedApplication::Group("AirPort".to_owned())));
    assert!(applications.contains(&TrustedApplication::Current));
}

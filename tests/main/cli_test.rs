//! CLI contract tests against temporary stores.

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;

const CORP_ROOT: &str = include_str!("../fixtures/corp_root_ca.pem");

/// Isolated workspace: a config file whose stores live next to it.
struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("config.toml"),
            "[access]\ntrusted_app_paths = []\n",
        )
        .expect("write config");
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn config(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("eap8021x");
        cmd.env("EAP8021X_CONFIG_PATH", self.config())
            .env("HOME", self.path())
            .env_remove("EAP8021X_STORE_DIR")
            .env_remove("EAP8021X_LOG")
            .env_remove("RUST_LOG");
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.cmd().args(args).output().expect("run eap8021x");
        assert!(
            output.status.success(),
            "eap8021x {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        match serde_json::from_slice(&output.stdout) {
            Ok(value) => value,
            Err(err) => panic!("stdout of {args:?} is not JSON: {err}"),
        }
    }
}

#[test]
fn help_lists_command_groups() {
    Workspace::new().cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("credential")
            .and(predicate::str::contains("cert"))
            .and(predicate::str::contains("profile")),
    );
}

#[test]
fn credential_lifecycle() {
    let ws = Workspace::new();
    let saved = ws.json(&[
        "credential", "save", "--ssid", "corp-wifi", "--username", "alice", "--password", "p1",
        "--kind", "enterprise",
    ]);
    assert_eq!(saved["saved"], Value::Bool(true));
    assert!(ws.path().join("user-keychain.json").exists());

    let hidden = ws.json(&["credential", "get", "--ssid", "corp-wifi"]);
    assert_eq!(hidden["username"], "alice");
    assert!(hidden.get("password").is_none());

    let shown = ws.json(&["credential", "get", "--ssid", "corp-wifi", "--show-password"]);
    assert_eq!(shown["password"], "p1");

    let listed = ws.json(&["credential", "list", "--show-password"]);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["password"], "p1");

    let deleted = ws.json(&["credential", "delete", "--ssid", "corp-wifi"]);
    assert_eq!(deleted["deleted"], Value::Bool(true));
    let again = ws.json(&["credential", "delete", "--ssid", "corp-wifi"]);
    assert_eq!(again["deleted"], Value::Bool(false));
    assert_eq!(ws.json(&["credential", "get", "--ssid", "corp-wifi"]), Value::Null);
}

#[test]
fn saved_credential_gets_configured_defaults() {
    let ws = Workspace::new();
    ws.json(&["credential", "save", "--ssid", "lab", "--password", "p1"]);
    let credential = ws.json(&["credential", "get", "--ssid", "lab"]);
    assert_eq!(credential["kind"], "802.1x Password");
    assert_eq!(
        credential["service"],
        "com.apple.network.eap.user.item.wlan.ssid.lab"
    );
}

#[test]
fn delete_without_ssid_fails() {
    Workspace::new()
        .cmd()
        .args(["credential", "delete", "--username", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ssid"));
}

#[test]
fn certificate_import_trust_verify() {
    let ws = Workspace::new();
    let pem = ws.path().join("corp.pem");
    std::fs::write(&pem, CORP_ROOT).expect("write pem");
    let pem = pem.to_string_lossy().into_owned();

    let imported = ws.json(&["cert", "import", "--file", &pem]);
    assert_eq!(imported["label"], "Example Corp Root CA");
    assert_eq!(
        ws.json(&["cert", "verify", "--file", &pem])["trusted"],
        Value::Bool(false)
    );

    let trusted = ws.json(&["cert", "import", "--file", &pem, "--trust", "user"]);
    assert_eq!(trusted["trusted"], Value::Bool(true));
    assert_eq!(
        ws.json(&["cert", "verify", "--file", &pem])["trusted"],
        Value::Bool(true)
    );
    assert_eq!(
        ws.json(&["cert", "verify", "--file", &pem, "--domain", "system"])["trusted"],
        Value::Bool(false)
    );
}

#[test]
fn certificate_import_rejects_empty_input() {
    Workspace::new()
        .cmd()
        .args(["cert", "import", "--pem", ""])
        .assert()
        .failure();
}

#[test]
fn profile_lifecycle() {
    let ws = Workspace::new();
    let created = ws.json(&[
        "profile", "create", "--ssid", "corp-wifi", "--eap", "PEAP,ttls,99", "--security",
        "WPA2", "--inner-auth", "mschapv2",
    ]);
    assert_eq!(created["created"], Value::Bool(true));

    let shown = ws.json(&["profile", "show", "--ssid", "corp-wifi"]);
    assert_eq!(shown["accept_eap_types"], serde_json::json!([25, 21, 99]));
    assert_eq!(shown["security_type"], 3);
    assert_eq!(shown["ttls_inner_auth_type"], 4);
    assert!(shown["profile_id"].is_string());

    assert_eq!(
        ws.json(&["profile", "list"]).as_array().map(Vec::len),
        Some(1)
    );
    assert_eq!(
        ws.json(&["profile", "remove", "--ssid", "corp-wifi"])["removed"],
        Value::Bool(true)
    );
    assert_eq!(ws.json(&["profile", "show", "--ssid", "corp-wifi"]), Value::Null);
}

#[test]
fn profile_rejects_unknown_eap_name() {
    Workspace::new()
        .cmd()
        .args(["profile", "create", "--ssid", "lab", "--eap", "quantum"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quantum"));
}

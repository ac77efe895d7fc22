//! eap8021x CLI entry point.
//!
//! Manages 802.1x credentials, certificates and EAP profiles held in the
//! file-backed stores named by the configuration. Every command prints JSON
//! on stdout.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use tracing::debug;

use eap8021x::certificate::{Certificate, PemSource};
use eap8021x::config::{self, Config};
use eap8021x::credential::{wlan_service, EapCredential};
use eap8021x::logging;
use eap8021x::profile::{
    Eap8021xProfile, EapType, FileProfileController, InnerAuthType, ProfileAdapter,
    ProfileSelector, SecurityType,
};
use eap8021x::store::{FileStore, Keychain, TrustDomain, TrustResult};
use eap8021x::trust::CertificateTrustManager;
use eap8021x::vault::{CredentialFilter, CredentialVault, FetchMode};

/// Manage 802.1x credentials, certificate trust and EAP profiles.
#[derive(Parser)]
#[command(name = "eap8021x", version, about)]
struct Cli {
    /// Config file (default: `$EAP8021X_CONFIG_PATH` or `~/.eap8021x/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Command {
    /// Credential vault operations.
    #[command(subcommand)]
    Credential(CredentialCommand),
    /// Certificate import and verification.
    #[command(subcommand)]
    Cert(CertCommand),
    /// EAP profile operations.
    #[command(subcommand)]
    Profile(ProfileCommand),
}

/// Fields that select credentials.
#[derive(Args)]
struct FilterArgs {
    /// Network identifier.
    #[arg(long)]
    ssid: Option<String>,
    /// Account name.
    #[arg(long)]
    username: Option<String>,
    /// Credential kind.
    #[arg(long)]
    kind: Option<String>,
    /// Service name.
    #[arg(long)]
    service: Option<String>,
    /// Use the system keychain.
    #[arg(long)]
    system: bool,
}

impl FilterArgs {
    fn filter(&self) -> CredentialFilter {
        let mut filter = CredentialFilter::new().system(self.system);
        filter.ssid = self.ssid.clone();
        filter.username = self.username.clone();
        filter.kind = self.kind.clone();
        filter.service = self.service.clone();
        filter
    }
}

#[derive(Subcommand)]
enum CredentialCommand {
    /// Save a credential, replacing any with the same ssid, username, kind and service.
    Save {
        /// Network identifier.
        #[arg(long)]
        ssid: String,
        /// Account name.
        #[arg(long)]
        username: Option<String>,
        /// Password.
        #[arg(long)]
        password: Option<String>,
        /// Credential kind (default from config).
        #[arg(long)]
        kind: Option<String>,
        /// Service name (default derived from the ssid).
        #[arg(long)]
        service: Option<String>,
        /// Free-form note.
        #[arg(long)]
        comment: Option<String>,
        /// Use the system keychain.
        #[arg(long)]
        system: bool,
        /// Let any application decrypt the password.
        #[arg(long)]
        all_apps: bool,
    },
    /// Show the first matching credential.
    Get {
        #[command(flatten)]
        filter: FilterArgs,
        /// Item comment.
        #[arg(long)]
        comment: Option<String>,
        /// Include the password in the output.
        #[arg(long)]
        show_password: bool,
    },
    /// List matching credentials.
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Include passwords (one extra lookup per credential).
        #[arg(long)]
        show_password: bool,
    },
    /// Delete matching credentials.
    Delete {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

/// Where to read a PEM certificate from.
#[derive(Args)]
struct PemArgs {
    /// Inline PEM text.
    #[arg(long)]
    pem: Option<String>,
    /// PEM file.
    #[arg(long)]
    file: Option<PathBuf>,
}

impl PemArgs {
    fn source(&self) -> PemSource {
        PemSource::new(self.pem.clone(), self.file.clone())
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DomainArg {
    User,
    System,
}

impl From<DomainArg> for TrustDomain {
    fn from(value: DomainArg) -> Self {
        match value {
            DomainArg::User => Self::User,
            DomainArg::System => Self::System,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ResultArg {
    TrustRoot,
    TrustAsRoot,
    Deny,
    Unspecified,
}

impl From<ResultArg> for TrustResult {
    fn from(value: ResultArg) -> Self {
        match value {
            ResultArg::TrustRoot => Self::TrustRoot,
            ResultArg::TrustAsRoot => Self::TrustAsRoot,
            ResultArg::Deny => Self::Deny,
            ResultArg::Unspecified => Self::Unspecified,
        }
    }
}

#[derive(Subcommand)]
enum CertCommand {
    /// Import a certificate and optionally trust it.
    Import {
        #[command(flatten)]
        source: PemArgs,
        /// Team identifier for the shared access group.
        #[arg(long)]
        team_id: Option<String>,
        /// Record a trust assertion in this domain.
        #[arg(long, value_enum)]
        trust: Option<DomainArg>,
        /// Trust result to record.
        #[arg(long, value_enum, default_value = "trust-as-root")]
        result: ResultArg,
    },
    /// Check that a certificate is stored and trusted.
    Verify {
        #[command(flatten)]
        source: PemArgs,
        /// Trust domain to check.
        #[arg(long, value_enum, default_value = "user")]
        domain: DomainArg,
    },
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// List every profile.
    List,
    /// Show the profile for an ssid.
    Show {
        /// Network identifier.
        #[arg(long)]
        ssid: String,
    },
    /// Create or replace a profile.
    Create {
        /// Network identifier.
        #[arg(long)]
        ssid: String,
        /// Display name.
        #[arg(long)]
        name: Option<String>,
        /// Domain name.
        #[arg(long)]
        domain: Option<String>,
        /// Outer identity.
        #[arg(long)]
        outer_identity: Option<String>,
        /// Accepted EAP methods in preference order, by name or code.
        #[arg(long = "eap", value_delimiter = ',')]
        eap_types: Vec<EapType>,
        /// Security type, by name or code.
        #[arg(long, default_value = "Any")]
        security: SecurityType,
        /// TTLS inner authentication, by name or code.
        #[arg(long, default_value = "Unknown")]
        inner_auth: InnerAuthType,
        /// Trusted server name (repeatable).
        #[arg(long = "server-name")]
        server_names: Vec<String>,
        /// Trusted certificate PEM file (repeatable).
        #[arg(long = "cert-file")]
        cert_files: Vec<PathBuf>,
    },
    /// Remove a profile by id or ssid.
    Remove {
        /// Profile identifier.
        #[arg(long, conflicts_with = "ssid", required_unless_present = "ssid")]
        id: Option<String>,
        /// Network identifier.
        #[arg(long)]
        ssid: Option<String>,
    },
}

/// Loaded configuration plus the directory store paths are relative to.
struct Workspace {
    config: Config,
    base: PathBuf,
}

impl Workspace {
    fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => config::config_path_with(env)?,
        };
        let mut config = Config::load_from(&path)
            .with_context(|| format!("failed to load {}", path.display()))?;
        config.apply_overrides(env);
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Self { config, base })
    }

    fn store(&self) -> Arc<FileStore> {
        Arc::new(FileStore::new(
            self.config.store.user_keychain_path(&self.base),
            self.config.store.system_keychain_path(&self.base),
        ))
    }

    fn profiles(&self) -> ProfileAdapter {
        ProfileAdapter::new(Arc::new(FileProfileController::new(
            self.config.store.profiles_path(&self.base),
        )))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let ctx = Workspace::load(cli.config.as_deref())?;

    let _logging_guard = match &ctx.config.logging.dir {
        Some(dir) => Some(logging::init_file(dir, &ctx.config.logging.level)?),
        None => {
            if !logging::init_cli(&ctx.config.logging.level) {
                debug!("keeping existing log subscriber");
            }
            None
        }
    };
    debug!(base = %ctx.base.display(), "configuration loaded");

    let output = match cli.command {
        Command::Credential(command) => handle_credential(&ctx, command)?,
        Command::Cert(command) => handle_cert(&ctx, command)?,
        Command::Profile(command) => handle_profile(&ctx, command)?,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("failed to encode output")?
    );
    Ok(())
}

fn credential_json(credential: &EapCredential, show_password: bool) -> anyhow::Result<Value> {
    let mut value = serde_json::to_value(credential).context("failed to encode credential")?;
    if let (Some(object), Some(password)) = (value.as_object_mut(), &credential.password) {
        if show_password {
            object.insert("password".to_owned(), Value::String(password.expose().to_owned()));
        }
    }
    Ok(value)
}

fn handle_credential(ctx: &Workspace, command: CredentialCommand) -> anyhow::Result<Value> {
    let vault = CredentialVault::new(ctx.store());
    match command {
        CredentialCommand::Save {
            ssid,
            username,
            password,
            kind,
            service,
            comment,
            system,
            all_apps,
        } => {
            let defaults = &ctx.config.credential;
            let service =
                service.unwrap_or_else(|| wlan_service(&defaults.service_prefix, &ssid));
            let policy = if all_apps {
                eap8021x::access::AccessPolicy::AllApplications
            } else {
                ctx.config.access.policy()
            };
            let mut credential = EapCredential::new(ssid)
                .with_kind(kind.unwrap_or_else(|| defaults.default_kind.clone()))
                .with_service(service)
                .with_access_control(policy);
            credential.username = username;
            credential.password = password.map(eap8021x::credential::SecretValue::new);
            credential.comment = comment;

            vault
                .save(&credential, system)
                .with_context(|| format!("failed to save credential for {}", credential.ssid))?;
            Ok(json!({ "saved": true, "ssid": credential.ssid }))
        }
        CredentialCommand::Get {
            filter,
            comment,
            show_password,
        } => {
            let mut query = filter.filter();
            query.comment = comment;
            match vault.get(&query, show_password).context("credential lookup failed")? {
                Some(credential) => credential_json(&credential, show_password),
                None => Ok(Value::Null),
            }
        }
        CredentialCommand::List {
            filter,
            show_password,
        } => {
            let mode = if show_password {
                FetchMode::WithPayload
            } else {
                FetchMode::AttributesOnly
            };
            let credentials = vault
                .get_all(&filter.filter(), mode)
                .context("credential listing failed")?;
            let values = credentials
                .iter()
                .map(|credential| credential_json(credential, show_password))
                .collect::<anyhow::Result<Vec<_>>>()?;
            Ok(Value::Array(values))
        }
        CredentialCommand::Delete { filter } => {
            let deleted = vault
                .delete(&filter.filter())
                .context("credential delete failed")?;
            Ok(json!({ "deleted": deleted }))
        }
    }
}

fn handle_cert(ctx: &Workspace, command: CertCommand) -> anyhow::Result<Value> {
    let store = ctx.store();
    let manager = CertificateTrustManager::new(store.clone(), store).with_keychain(Keychain::User);
    match command {
        CertCommand::Import {
            source,
            team_id,
            trust,
            result,
        } => {
            let handle = manager
                .import_certificate(&source.source(), team_id.as_deref())
                .context("certificate import failed")?;
            if let Some(domain) = trust {
                manager
                    .trust(&handle, domain.into(), result.into())
                    .context("certificate trust failed")?;
            }
            Ok(json!({
                "label": handle.label(),
                "trusted": trust.is_some(),
            }))
        }
        CertCommand::Verify { source, domain } => {
            let trusted = manager.verify(&source.source(), domain.into());
            Ok(json!({ "trusted": trusted }))
        }
    }
}

fn handle_profile(ctx: &Workspace, command: ProfileCommand) -> anyhow::Result<Value> {
    let adapter = ctx.profiles();
    match command {
        ProfileCommand::List => {
            serde_json::to_value(adapter.list_profiles()).context("failed to encode profiles")
        }
        ProfileCommand::Show { ssid } => match adapter.profile(&ssid) {
            Some(profile) => serde_json::to_value(profile).context("failed to encode profile"),
            None => Ok(Value::Null),
        },
        ProfileCommand::Create {
            ssid,
            name,
            domain,
            outer_identity,
            eap_types,
            security,
            inner_auth,
            server_names,
            cert_files,
        } => {
            let certificates = cert_files
                .iter()
                .map(|path| {
                    Certificate::from_source(&PemSource::file(path))
                        .map(|certificate| certificate.der().to_vec())
                        .with_context(|| format!("failed to read {}", path.display()))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            let profile = Eap8021xProfile {
                ssid: Some(ssid.clone()),
                user_defined_name: name,
                domain_name: domain,
                outer_identity,
                accept_eap_types: eap_types,
                security_type: security,
                ttls_inner_auth_type: inner_auth,
                trusted_server_name: (!server_names.is_empty()).then_some(server_names),
                trusted_certificate: (!certificates.is_empty()).then_some(certificates),
                ..Eap8021xProfile::default()
            };
            let created = adapter.create_profile(profile);
            Ok(json!({ "created": created, "ssid": ssid }))
        }
        ProfileCommand::Remove { id, ssid } => {
            let removed = match (id.as_deref(), ssid.as_deref()) {
                (Some(id), _) => adapter.remove_profile(ProfileSelector::Id(id)),
                (None, Some(ssid)) => adapter.remove_profile(ProfileSelector::Ssid(ssid)),
                (None, None) => false,
            };
            Ok(json!({ "removed": removed }))
        }
    }
}
